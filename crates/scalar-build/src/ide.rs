//! Metadata handed to IDE project writers

use crate::source_set::SourceSetRegistry;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source directories of one source set as an IDE sees them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeSourceSet {
    /// Source set name
    pub name: String,
    /// Scala source directories
    pub source_dirs: Vec<PathBuf>,
    /// Whether the directories hold test sources
    pub is_test: bool,
}

/// Everything an IDE integration needs to set up a Scala SDK
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeMetadata {
    /// Name of the Scala SDK library
    pub sdk_name: String,
    /// Source sets in registration order
    pub source_sets: Vec<IdeSourceSet>,
}

impl IdeMetadata {
    /// Collect metadata from a registry
    pub fn from_registry(sdk_name: impl Into<String>, registry: &SourceSetRegistry) -> Self {
        let source_sets = registry
            .list()
            .map(|set| IdeSourceSet {
                name: set.name().to_string(),
                source_dirs: registry
                    .scala(set.id())
                    .map(|scala| scala.source_dirs().to_vec())
                    .unwrap_or_default(),
                is_test: set.kind().is_test(),
            })
            .collect();

        Self {
            sdk_name: sdk_name.into(),
            source_sets,
        }
    }
}

impl SourceSetRegistry {
    /// IDE passthrough for this registry
    pub fn ide_metadata(&self, sdk_name: impl Into<String>) -> IdeMetadata {
        IdeMetadata::from_registry(sdk_name, self)
    }
}
