use std::{io::ErrorKind, path::Path};

use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{self, AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

/// Reads the whole file under a shared lock. A missing file is `None`.
pub async fn read_locked(path: &Path) -> Result<Option<String>, io::Error> {
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    file.lock_shared()?;
    let mut content = String::new();
    let result = file.read_to_string(&mut content).await;
    file.unlock_async().await?;
    result?;

    debug!("Read {} bytes from {path:?}", content.len());
    Ok(Some(content))
}

/// Replaces the file contents under an exclusive lock, creating the file if needed.
pub async fn write_locked(path: &Path, content: &str) -> Result<(), io::Error> {
    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .await?;

    // Truncate only once the lock is held so a concurrent reader never sees a half written blob.
    file.lock_exclusive()?;
    let result = overwrite(&mut file, content).await;
    file.unlock_async().await?;
    result?;

    debug!("Wrote {} bytes to {path:?}", content.len());
    Ok(())
}

async fn overwrite(file: &mut File, content: &str) -> Result<(), io::Error> {
    file.set_len(0).await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await?;
    file.sync_data().await
}

/// Removes the file. Removing a file that doesn't exist is not an error.
pub async fn remove_if_exists(path: &Path) -> Result<(), io::Error> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use crate::fs::operations::{read_locked, remove_if_exists, write_locked};

    #[tokio::test]
    async fn test_read_missing_file() -> Result<()> {
        let dir = tempdir()?;

        assert_eq!(read_locked(&dir.path().join("nothing.json")).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_write_replaces_longer_content() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("blob.json");

        write_locked(&path, "[1,2,3,4,5,6,7,8]").await?;
        write_locked(&path, "[]").await?;

        assert_eq!(read_locked(&path).await?.as_deref(), Some("[]"));
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("blob.json");

        write_locked(&path, "{}").await?;
        remove_if_exists(&path).await?;
        remove_if_exists(&path).await?;

        assert_eq!(read_locked(&path).await?, None);
        Ok(())
    }
}
