pub mod build;
pub mod clean;
pub mod idea;
pub mod tasks;
