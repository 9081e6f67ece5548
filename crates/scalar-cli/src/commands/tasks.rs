//! Tasks command - list the compile tasks derived from the source sets

use anyhow::{Context, Result};
use scalar_build::{BuildGraph, Builder, CompileTask};
use std::path::Path;

pub fn run(project_dir: &Path, show_classpath: bool, json: bool) -> Result<()> {
    let builder = Builder::new(project_dir).context("Failed to load project configuration")?;
    let graph = builder.tasks().context("Failed to derive compile tasks")?;

    if json {
        let tasks: Vec<_> = graph.tasks().map(task_json).collect();
        println!("{}", serde_json::to_string_pretty(&tasks)?);
    } else {
        print!("{}", render(&graph, show_classpath));
    }
    Ok(())
}

fn render(graph: &BuildGraph, show_classpath: bool) -> String {
    let mut out = String::from("Scala compile tasks\n-------------------\n");
    for task in graph.tasks() {
        out.push_str(&format!("{} - {}\n", task.name, task.description));

        let mut after = vec![task.host_depends_on.clone()];
        after.extend(task.depends_on.iter().cloned());
        out.push_str(&format!("    after: {}\n", after.join(", ")));
        out.push_str(&format!("    sources: {}\n", task.sources.len()));

        if show_classpath {
            for entry in task.classpath.entries() {
                out.push_str(&format!("    classpath: {}\n", entry.display()));
            }
        }
    }
    out
}

fn task_json(task: &CompileTask) -> serde_json::Value {
    serde_json::json!({
        "name": task.name,
        "description": task.description,
        "source_set": task.source_set_name,
        "kind": task.kind.to_string(),
        "depends_on": task.depends_on,
        "host_depends_on": task.host_depends_on,
        "sources": task.sources,
        "destination_dir": task.destination_dir,
        "classpath": task.classpath,
    })
}
