use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::errors::BotResult;

/// Scratch directory for one job under the work dir, removed with
/// everything in it when dropped.
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    pub async fn create(root: &Path) -> BotResult<Self> {
        let dir = root.join(format!("job_{}", Uuid::new_v4().simple()));
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Fresh file name inside the workspace
    pub fn file(&self, prefix: &str, extension: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}.{}", prefix, Uuid::new_v4().simple(), extension))
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.dir) {
                log::warn!("Failed to remove {}: {}", self.dir.display(), e);
            }
        }
    }
}

/// Remove job directories left behind by a previous run
pub async fn clear_stale(root: &Path) -> BotResult<()> {
    if !fs::try_exists(root).await? {
        return Ok(());
    }

    let mut entries = fs::read_dir(root).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_job = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("job_"));
        if is_job && entry.file_type().await?.is_dir() {
            log::debug!("Removing stale {}", path.display());
            fs::remove_dir_all(&path).await?;
        }
    }
    Ok(())
}
