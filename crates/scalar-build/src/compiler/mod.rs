//! Scala compiler loading
//!
//! Toolchain archives are picked out of an arbitrary artifact set by file name
//! prefix. The resulting [`CompilerInstance`] runs every compilation in a fresh
//! JVM whose class path is exactly that artifact set, so two toolchain versions
//! never share loaded code.

pub mod artifacts;
pub mod instance;
pub mod loader;

pub use artifacts::{
    artifact_version, ArtifactPatterns, ArtifactRole, ArtifactSet, CompilerFamily,
    SCALA2_MAIN_CLASS, SCALA3_MAIN_CLASS,
};
pub use instance::{CompileOutput, CompileRequest, CompilerInstance, Launcher};
pub use loader::CompilerInstanceLoader;
