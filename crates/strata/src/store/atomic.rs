use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Hidden sibling path used to stage a write to `target`.
fn temp_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    target.with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), seq))
}

async fn stage(target: &Path, bytes: &[u8]) -> io::Result<PathBuf> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = temp_path(target);
    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await
    }
    .await;

    match result {
        Ok(()) => Ok(tmp),
        Err(e) => {
            let _ = tokio::fs::remove_file(&tmp).await;
            Err(e)
        },
    }
}

/// Replace `target` with `bytes` so readers see either the old or the new file, never a
/// partial one.
pub async fn write_replace(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = stage(target, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, target).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

/// Create `target` with `bytes`, failing with `AlreadyExists` if it is already present.
///
/// The file is staged then hard-linked into place, so the existence check and the
/// publication are one atomic step even across processes.
pub async fn write_new(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = stage(target, bytes).await?;
    let linked = tokio::fs::hard_link(&tmp, target).await;
    let _ = tokio::fs::remove_file(&tmp).await;
    linked
}

/// Whether a directory entry name belongs to staging or other hidden state.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}
