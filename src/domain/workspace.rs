use std::io;
use std::path::Path;
use tempfile::TempDir;

/// Scratch directory owned by one pipeline run.
///
/// Removed recursively on drop, whichever way the run ends.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub async fn create(root: &Path, prefix: &str) -> io::Result<Self> {
        tokio::fs::create_dir_all(root).await?;
        let dir = tempfile::Builder::new().prefix(prefix).tempdir_in(root)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_workspace_removed_on_drop() {
        let root = tempdir().unwrap();
        let ws = Workspace::create(&root.path().join("nested"), "run-")
            .await
            .unwrap();
        let path = ws.path().to_path_buf();
        std::fs::create_dir_all(path.join("deep/er")).unwrap();
        std::fs::write(path.join("deep/er/file.mp4"), b"x").unwrap();
        assert!(path.starts_with(root.path()));

        drop(ws);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_workspaces_do_not_collide() {
        let root = tempdir().unwrap();
        let a = Workspace::create(root.path(), "run-").await.unwrap();
        let b = Workspace::create(root.path(), "run-").await.unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_missing_root_is_created() {
        let root = tempdir().unwrap();
        let nested = root.path().join("a/b/c");
        let ws = Workspace::create(&nested, "fallback-").await.unwrap();
        assert!(nested.is_dir());
        assert!(ws.path().parent() == Some(nested.as_path()));
        assert!(ws
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("fallback-")));
    }
}
