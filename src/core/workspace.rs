//! Workspace discovery and session persistence
//!
//! A workspace is any directory holding a `.qcm/` folder. The in-progress
//! inspection lives in `.qcm/session.yaml`.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::inspection::Inspection;
use crate::yaml::{parse_yaml_file, write_yaml_file, YamlError};

pub const WORKSPACE_DIR: &str = ".qcm";
const SESSION_FILE: &str = "session.yaml";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Not inside a qcm workspace (no .qcm directory found); run `qcm init` first")]
    NotFound,

    #[error("A qcm workspace already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("Session file {path} is unreadable: {source}")]
    Session { path: PathBuf, source: YamlError },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Find the workspace containing the current directory
    pub fn discover() -> Result<Self, WorkspaceError> {
        Self::discover_from(&std::env::current_dir()?)
    }

    pub fn discover_from(start: &Path) -> Result<Self, WorkspaceError> {
        start
            .ancestors()
            .find(|dir| dir.join(WORKSPACE_DIR).is_dir())
            .map(|root| Self {
                root: root.to_path_buf(),
            })
            .ok_or(WorkspaceError::NotFound)
    }

    /// Create a workspace and write its first session
    pub fn init(root: &Path, inspection: &Inspection, force: bool) -> Result<Self, WorkspaceError> {
        let workspace = Self {
            root: root.to_path_buf(),
        };
        if workspace.session_path().exists() && !force {
            return Err(WorkspaceError::AlreadyExists(root.to_path_buf()));
        }
        std::fs::create_dir_all(workspace.dir())?;
        workspace.save(inspection)?;
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    pub fn session_path(&self) -> PathBuf {
        self.dir().join(SESSION_FILE)
    }

    pub fn load(&self) -> Result<Inspection, WorkspaceError> {
        let path = self.session_path();
        parse_yaml_file(&path).map_err(|source| WorkspaceError::Session { path, source })
    }

    pub fn save(&self, inspection: &Inspection) -> Result<(), WorkspaceError> {
        let path = self.session_path();
        write_yaml_file(&path, inspection).map_err(|source| WorkspaceError::Session { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::context::OrderContext;

    #[test]
    fn test_init_and_discover_from_subdirectory() {
        let tmp = tempfile::tempdir().unwrap();
        let inspection = Inspection::new(OrderContext::new("PO-1", "Red"), Vec::new(), 3);
        Workspace::init(tmp.path(), &inspection, false).unwrap();

        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        let workspace = Workspace::discover_from(&nested).unwrap();
        assert_eq!(workspace.root(), tmp.path());
        assert_eq!(workspace.load().unwrap(), inspection);

        assert!(matches!(
            Workspace::init(tmp.path(), &inspection, false),
            Err(WorkspaceError::AlreadyExists(_))
        ));
        assert!(Workspace::init(tmp.path(), &inspection, true).is_ok());
    }

    #[test]
    fn test_discover_outside_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            Workspace::discover_from(tmp.path()),
            Err(WorkspaceError::NotFound)
        ));
    }
}
