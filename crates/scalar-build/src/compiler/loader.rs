//! Locating toolchain archives and caching compiler instances per build

use super::artifacts::{artifact_version, ArtifactPatterns, ArtifactRole, ArtifactSet};
use super::instance::{CompilerInstance, Launcher};
use crate::error::{BuildError, BuildResult};
use scalar_config::ToolchainVersion;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn, Span};

type CacheKey = (ToolchainVersion, String);
type CacheSlot = Arc<Mutex<Option<Arc<CompilerInstance>>>>;

/// Builds compiler instances from artifact sets and caches them per build
pub struct CompilerInstanceLoader {
    patterns: ArtifactPatterns,
    launcher: Launcher,
    strict_versions: bool,
    cache: Mutex<HashMap<CacheKey, CacheSlot>>,
    loads: AtomicUsize,
    span: Span,
}

impl CompilerInstanceLoader {
    /// Create a loader
    pub fn new(patterns: ArtifactPatterns, launcher: Launcher, span: Span) -> Self {
        Self {
            patterns,
            launcher,
            strict_versions: false,
            cache: Mutex::new(HashMap::new()),
            loads: AtomicUsize::new(0),
            span,
        }
    }

    /// Fail instead of warning when library and compiler versions differ
    pub fn with_strict_versions(mut self, strict: bool) -> Self {
        self.strict_versions = strict;
        self
    }

    /// Artifact name patterns
    pub fn patterns(&self) -> &ArtifactPatterns {
        &self.patterns
    }

    /// Number of instances constructed so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Construct a compiler instance without consulting the cache
    pub fn load(
        &self,
        version: &ToolchainVersion,
        artifacts: &ArtifactSet,
    ) -> BuildResult<CompilerInstance> {
        let library = artifacts
            .find(self.patterns.library_prefixes().iter().map(String::as_str))
            .ok_or_else(|| self.not_found(ArtifactRole::Library, version, artifacts))?
            .to_path_buf();

        let (compiler, family) = artifacts
            .find_compiler(self.patterns.compiler_families())
            .ok_or_else(|| self.not_found(ArtifactRole::Compiler, version, artifacts))?;
        let compiler = compiler.to_path_buf();

        if let (Some(lib_version), Some(compiler_version)) =
            (artifact_version(&library), artifact_version(&compiler))
        {
            if lib_version != compiler_version {
                let message = format!(
                    "library archive {} (version {}) does not match compiler archive {} (version {})",
                    library.display(),
                    lib_version,
                    compiler.display(),
                    compiler_version
                );
                if self.strict_versions {
                    return Err(BuildError::InvalidConfiguration(message));
                }
                warn!(parent: &self.span, "{}", message);
            }
        }

        self.loads.fetch_add(1, Ordering::SeqCst);
        info!(
            parent: &self.span,
            version = %version,
            compiler = %compiler.display(),
            main_class = %family.main_class,
            "loaded Scala compiler"
        );

        Ok(CompilerInstance {
            version: version.clone(),
            library,
            compiler,
            artifacts: artifacts.clone(),
            main_class: family.main_class.clone(),
            launcher: self.launcher.clone(),
            patterns: self.patterns.clone(),
        })
    }

    /// Cached instance for (version, artifact set), loading it at most once
    ///
    /// Concurrent callers asking for the same key wait for the first load.
    /// A failed load is not cached.
    pub fn get_or_load(
        &self,
        version: &ToolchainVersion,
        artifacts: &ArtifactSet,
    ) -> BuildResult<Arc<CompilerInstance>> {
        let slot = {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(
                cache
                    .entry((version.clone(), artifacts.id().to_string()))
                    .or_default(),
            )
        };

        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(instance) = guard.as_ref() {
            return Ok(Arc::clone(instance));
        }

        let instance = Arc::new(self.load(version, artifacts)?);
        *guard = Some(Arc::clone(&instance));
        Ok(instance)
    }

    fn not_found(
        &self,
        role: ArtifactRole,
        version: &ToolchainVersion,
        artifacts: &ArtifactSet,
    ) -> BuildError {
        BuildError::ArtifactNotFound {
            role,
            prefixes: self.patterns.describe(role),
            searched: artifacts.paths().to_vec(),
            hint: format!(
                "Make sure the Scala {} toolchain is available: list its archives under \
                 [toolchain] artifacts or add a directory holding them to [toolchain] repositories.",
                version
            ),
        }
    }
}

impl std::fmt::Debug for CompilerInstanceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilerInstanceLoader")
            .field("patterns", &self.patterns)
            .field("launcher", &self.launcher)
            .field("strict_versions", &self.strict_versions)
            .field("loads", &self.load_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::artifacts::{SCALA2_MAIN_CLASS, SCALA3_MAIN_CLASS};
    use pretty_assertions::assert_eq;
    use std::path::{Path, PathBuf};
    use std::thread;

    fn loader() -> CompilerInstanceLoader {
        CompilerInstanceLoader::new(
            ArtifactPatterns::default(),
            Launcher::new("java"),
            Span::none(),
        )
    }

    fn set(names: &[&str]) -> ArtifactSet {
        ArtifactSet::new(names.iter().map(|n| PathBuf::from("/repo").join(n)))
    }

    #[test]
    fn test_load_scala2() {
        let artifacts = set(&[
            "scala-reflect-2.12.8.jar",
            "scala-library-2.12.8.jar",
            "scala-compiler-2.12.8.jar",
        ]);
        let instance = loader()
            .load(&ToolchainVersion::new("2.12.8"), &artifacts)
            .unwrap();

        assert_eq!(
            instance.library_artifact(),
            Path::new("/repo/scala-library-2.12.8.jar")
        );
        assert_eq!(
            instance.compiler_artifact(),
            Path::new("/repo/scala-compiler-2.12.8.jar")
        );
        assert_eq!(instance.main_class(), SCALA2_MAIN_CLASS);
        assert_eq!(instance.artifacts().paths().len(), 3);
    }

    #[test]
    fn test_load_scala3() {
        let artifacts = set(&["scala3-library_3-3.3.1.jar", "scala3-compiler_3-3.3.1.jar"]);
        let instance = loader()
            .load(&ToolchainVersion::new("3.3.1"), &artifacts)
            .unwrap();
        assert_eq!(instance.main_class(), SCALA3_MAIN_CLASS);
    }

    #[test]
    fn test_missing_compiler_names_role() {
        let artifacts = set(&["scala-library-2.12.8.jar"]);
        match loader().load(&ToolchainVersion::new("2.12.8"), &artifacts) {
            Err(BuildError::ArtifactNotFound { role, searched, .. }) => {
                assert_eq!(role, ArtifactRole::Compiler);
                assert_eq!(searched, artifacts.paths().to_vec());
            }
            other => panic!("Expected ArtifactNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_library_names_role() {
        let artifacts = set(&["scala-compiler-2.12.8.jar"]);
        match loader().load(&ToolchainVersion::new("2.12.8"), &artifacts) {
            Err(BuildError::ArtifactNotFound { role, .. }) => {
                assert_eq!(role, ArtifactRole::Library)
            }
            other => panic!("Expected ArtifactNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_version_mismatch_warns_by_default() {
        let artifacts = set(&["scala-library-2.12.8.jar", "scala-compiler-2.13.8.jar"]);
        assert!(loader()
            .load(&ToolchainVersion::new("2.12.8"), &artifacts)
            .is_ok());
    }

    #[test]
    fn test_version_mismatch_strict() {
        let artifacts = set(&["scala-library-2.12.8.jar", "scala-compiler-2.13.8.jar"]);
        let err = loader()
            .with_strict_versions(true)
            .load(&ToolchainVersion::new("2.12.8"), &artifacts)
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_cache_returns_same_instance() {
        let loader = loader();
        let version = ToolchainVersion::new("2.12.8");
        let artifacts = set(&["scala-library-2.12.8.jar", "scala-compiler-2.12.8.jar"]);

        let first = loader.get_or_load(&version, &artifacts).unwrap();
        let second = loader.get_or_load(&version, &artifacts).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.load_count(), 1);
    }

    #[test]
    fn test_distinct_versions_get_distinct_instances() {
        let loader = loader();
        let v12 = set(&["scala-library-2.12.8.jar", "scala-compiler-2.12.8.jar"]);
        let v13 = set(&["scala-library-2.13.8.jar", "scala-compiler-2.13.8.jar"]);

        let a = loader
            .get_or_load(&ToolchainVersion::new("2.12.8"), &v12)
            .unwrap();
        let b = loader
            .get_or_load(&ToolchainVersion::new("2.13.8"), &v13)
            .unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(loader.load_count(), 2);
    }

    #[test]
    fn test_concurrent_get_or_load_loads_once() {
        let loader = Arc::new(loader());
        let version = ToolchainVersion::new("2.12.8");
        let artifacts = set(&["scala-library-2.12.8.jar", "scala-compiler-2.12.8.jar"]);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let loader = Arc::clone(&loader);
                let version = version.clone();
                let artifacts = artifacts.clone();
                thread::spawn(move || loader.get_or_load(&version, &artifacts).unwrap())
            })
            .collect();

        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(loader.load_count(), 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let loader = loader();
        let artifacts = set(&["scala-library-2.12.8.jar"]);
        let version = ToolchainVersion::new("2.12.8");

        assert!(loader.get_or_load(&version, &artifacts).is_err());
        assert!(loader.get_or_load(&version, &artifacts).is_err());
        assert_eq!(loader.load_count(), 0);
    }
}
