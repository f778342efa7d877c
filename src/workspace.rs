use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

use crate::error::EngineError;

/// Hands out uniquely named scratch areas under a common root.
///
/// Concurrent evaluations share nothing but the filesystem namespace, so the
/// only protection needed is that no two in-flight workspaces ever get the
/// same identifier.
#[derive(Clone, Debug)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn acquire(&self) -> Result<Workspace, EngineError> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            EngineError::Environment(format!(
                "failed to create scratch root {}: {e}",
                self.root.display()
            ))
        })?;

        let id = format!(
            "program_{}_{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        let source_path = self.root.join(format!("{id}.c"));
        let artifact_path = self.root.join(format!("{id}.out"));

        tracing::debug!(%id, "workspace acquired");
        Ok(Workspace {
            id,
            source_path,
            artifact_path,
        })
    }
}

/// One evaluation's scratch area: a source path and an artifact path that are
/// never reused across concurrent calls. Owned exclusively by the evaluation
/// that acquired it; both files are removed when it goes out of scope.
#[derive(Debug)]
pub struct Workspace {
    id: String,
    source_path: PathBuf,
    artifact_path: PathBuf,
}

impl Workspace {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }
}

// Release runs on every exit path, including early returns on compile
// failure, propagated errors, and panics. NotFound is expected (the artifact
// never exists after a failed build); anything else is logged.
impl Drop for Workspace {
    fn drop(&mut self) {
        for path in [&self.source_path, &self.artifact_path] {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove scratch file");
                }
            }
        }
        tracing::debug!(id = %self.id, "workspace released");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn test_root(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("labgrader_ws_{tag}_{}", Uuid::new_v4().simple()))
    }

    #[tokio::test]
    async fn identifiers_are_unique_sequentially() {
        let manager = WorkspaceManager::new(test_root("seq"));
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let ws = manager.acquire().await.unwrap();
            assert!(seen.insert(ws.id().to_string()), "duplicate id {}", ws.id());
        }
    }

    #[tokio::test]
    async fn identifiers_are_unique_concurrently() {
        let manager = WorkspaceManager::new(test_root("conc"));

        let mut handles = Vec::new();
        for _ in 0..100 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                manager.acquire().await.unwrap().id().to_string()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            let id = handle.await.unwrap();
            assert!(seen.insert(id.clone()), "duplicate id {id}");
        }
        assert_eq!(seen.len(), 100);
    }

    #[tokio::test]
    async fn drop_removes_both_scratch_files() {
        let manager = WorkspaceManager::new(test_root("drop"));
        let ws = manager.acquire().await.unwrap();
        let source = ws.source_path().to_path_buf();
        let artifact = ws.artifact_path().to_path_buf();

        fs::write(&source, "int main(void) { return 0; }").await.unwrap();
        fs::write(&artifact, b"\x7fELF").await.unwrap();

        drop(ws);

        assert!(!source.exists());
        assert!(!artifact.exists());
    }

    #[tokio::test]
    async fn drop_tolerates_files_that_never_existed() {
        let manager = WorkspaceManager::new(test_root("missing"));
        let ws = manager.acquire().await.unwrap();
        // Neither path was ever written; dropping must not panic or log errors.
        drop(ws);
    }

    #[tokio::test]
    async fn paths_live_under_the_configured_root() {
        let root = test_root("root");
        let manager = WorkspaceManager::new(&root);
        let ws = manager.acquire().await.unwrap();
        assert!(ws.source_path().starts_with(&root));
        assert!(ws.artifact_path().starts_with(&root));
        assert!(ws.source_path().extension().is_some_and(|e| e == "c"));
        assert!(ws.artifact_path().extension().is_some_and(|e| e == "out"));
    }
}
