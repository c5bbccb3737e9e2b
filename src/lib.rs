pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{bootstrap_workspace, WorkspacePaths};
pub use application::commands::AppState;
