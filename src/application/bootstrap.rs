use crate::infrastructure::config::{ensure_default_configs, load_configs};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::{database_path, initialize_database};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory layout carved out under the workspace root. Callers keep the
/// returned paths instead of re-deriving them.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub config_dir: PathBuf,
    pub state_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub database_path: PathBuf,
}

impl WorkspacePaths {
    pub fn under(workspace_root: &Path) -> Self {
        let state_dir = workspace_root.join("state");
        Self {
            config_dir: workspace_root.join("config"),
            database_path: database_path(&state_dir),
            state_dir,
            logs_dir: workspace_root.join("logs"),
        }
    }
}

/// Creates the workspace directories, seeds default config files, and
/// opens the ledger cache once so schema errors surface at startup
/// rather than on the first dashboard load.
pub fn bootstrap_workspace(workspace_root: &Path) -> Result<WorkspacePaths, InfraError> {
    let paths = WorkspacePaths::under(workspace_root);

    for dir in [&paths.config_dir, &paths.state_dir, &paths.logs_dir] {
        fs::create_dir_all(dir)?;
    }

    ensure_default_configs(&paths.config_dir)?;
    // Parse the configs now; a malformed file should fail bootstrap, not
    // a later command.
    let _ = load_configs(&paths.config_dir)?;
    initialize_database(&paths.database_path)?;

    Ok(paths)
}
