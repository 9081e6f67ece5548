use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Scala compilation for source-set based builds.
///
/// Every source set (main, test, and any configured in scalar.toml) gets a
/// compile task that runs after the source set's Java compile step and sees
/// the output of the source sets it depends on.
///
/// EXAMPLES:
///     scalar build                      Compile every source set
///     scalar build compileTestScala     Compile test sources and what they need
///     scalar tasks                      List compile tasks
///     scalar idea --json                Print IDE metadata
///
/// ENVIRONMENT VARIABLES:
///     SCALAR_JSON            Set to '1' for JSON output by default
///     SCALAR_SCALA_VERSION   Override the configured Scala version
///     SCALAR_JAVA            Override the JVM launcher
///     RUST_LOG               Log filter (e.g. scalar_build=debug)
#[derive(Parser)]
#[command(name = "scalar")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory (defaults to the current directory)
    #[arg(long, short = 'p', global = true)]
    project_dir: Option<PathBuf>,

    /// More log output; repeat for more
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile Scala sources
    ///
    /// Runs the requested compile tasks, or all of them, together with the
    /// tasks they depend on. Tasks whose inputs did not change are skipped.
    ///
    /// EXAMPLES:
    ///     scalar build                      Build everything
    ///     scalar build compileScala         Build main sources only
    ///     scalar build --rerun -j 1         Ignore up-to-date checks, one task at a time
    #[command(visible_alias = "b")]
    Build {
        /// Tasks to run (default: all)
        tasks: Vec<String>,
        /// Maximum number of tasks compiling at once
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
        /// Run tasks even when they are up to date
        #[arg(long)]
        rerun: bool,
        /// Quiet output (errors only)
        #[arg(long, short = 'q')]
        quiet: bool,
        /// JSON output
        #[arg(long, env = "SCALAR_JSON")]
        json: bool,
    },

    /// List compile tasks with their dependencies
    Tasks {
        /// Show compile classpaths
        #[arg(long)]
        classpath: bool,
        /// JSON output
        #[arg(long, env = "SCALAR_JSON")]
        json: bool,
    },

    /// Print the Scala SDK name and source directories for IDE integration
    Idea {
        /// JSON output
        #[arg(long, env = "SCALAR_JSON")]
        json: bool,
    },

    /// Delete Scala output directories and build state
    Clean,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "scalar_build=info",
        2 => "scalar_build=debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let project_dir = cli.project_dir.unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Build {
            tasks,
            jobs,
            rerun,
            quiet,
            json,
        } => {
            let args = commands::build::BuildArgs {
                tasks,
                jobs,
                rerun,
                quiet,
                json,
                project_dir,
            };
            commands::build::run(args)?;
        }
        Commands::Tasks { classpath, json } => {
            commands::tasks::run(&project_dir, classpath, json)?;
        }
        Commands::Idea { json } => {
            commands::idea::run(&project_dir, json)?;
        }
        Commands::Clean => {
            commands::clean::run(&project_dir)?;
        }
    }

    Ok(())
}
