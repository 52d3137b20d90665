use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, warn};

use crate::fs::operations::{read_locked, remove_if_exists, write_locked};

use super::store::RecordStore;

/// Names the collections are persisted under.
pub mod keys {
    pub const TRANSACTIONS: &str = "myAppTransactions";
    pub const MEMOS: &str = "myAppMemos";
    pub const TODOS: &str = "myAppTodos";
    pub const CREDENTIALS: &str = "myAppPasswords";
    pub const CUSTOM_CATEGORIES: &str = "myAppCustomTags";
    pub const THEME: &str = "myAppTheme";

    pub const ALL: [&str; 6] = [
        TRANSACTIONS,
        MEMOS,
        TODOS,
        CREDENTIALS,
        CUSTOM_CATEGORIES,
        THEME,
    ];
}

/// String blobs addressed by key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>>;
    async fn save(&self, key: &str, blob: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Keeps every key in `<dir>/<key>.json`.
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(read_locked(&self.path_for(key)).await?)
    }

    async fn save(&self, key: &str, blob: &str) -> Result<()> {
        Ok(write_locked(&self.path_for(key), blob).await?)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        Ok(remove_if_exists(&self.path_for(key)).await?)
    }
}

/// Missing or malformed blobs yield the default value. Only failing to read is an error.
async fn load_or_default<T: DeserializeOwned + Default>(
    kv: &(impl KeyValueStore + ?Sized),
    key: &str,
) -> Result<T> {
    let Some(blob) = kv.load(key).await? else {
        debug!("Nothing stored under {key}");
        return Ok(T::default());
    };
    match serde_json::from_str(&blob) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!("Stored {key} is malformed, starting it over: {e}");
            Ok(T::default())
        }
    }
}

async fn save_json<T: Serialize + ?Sized>(
    kv: &(impl KeyValueStore + ?Sized),
    key: &str,
    value: &T,
) -> Result<()> {
    kv.save(key, &serde_json::to_string(value)?).await
}

impl RecordStore {
    #[instrument(skip(kv))]
    pub async fn load(kv: &(impl KeyValueStore + ?Sized)) -> Result<Self> {
        Ok(Self {
            transactions: load_or_default(kv, keys::TRANSACTIONS).await?,
            memos: load_or_default(kv, keys::MEMOS).await?,
            todos: load_or_default(kv, keys::TODOS).await?,
            credentials: load_or_default(kv, keys::CREDENTIALS).await?,
            custom_categories: load_or_default(kv, keys::CUSTOM_CATEGORIES).await?,
            theme: load_or_default(kv, keys::THEME).await?,
        })
    }

    /// Writes every collection.
    #[instrument(skip_all)]
    pub async fn save(&self, kv: &(impl KeyValueStore + ?Sized)) -> Result<()> {
        save_json(kv, keys::TRANSACTIONS, &self.transactions).await?;
        save_json(kv, keys::MEMOS, &self.memos).await?;
        save_json(kv, keys::TODOS, &self.todos).await?;
        save_json(kv, keys::CREDENTIALS, &self.credentials).await?;
        save_json(kv, keys::CUSTOM_CATEGORIES, &self.custom_categories).await?;
        save_json(kv, keys::THEME, &self.theme).await?;
        Ok(())
    }
}

/// Removes every key.
pub async fn clear_all(kv: &(impl KeyValueStore + ?Sized)) -> Result<()> {
    for key in keys::ALL {
        kv.remove(key).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, anyhow};
    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;
    use tempfile::tempdir;

    use crate::{
        storage::{entities::Memo, store::RecordStore},
        utils::logging::TEST_LOGGING,
    };

    use super::{FileKeyValueStore, KeyValueStore, MockKeyValueStore, clear_all, keys};

    #[tokio::test]
    async fn test_round_trip_through_files() -> Result<()> {
        let dir = tempdir()?;
        let kv = FileKeyValueStore::new(dir.path().join("data"))?;
        let moment = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let mut store = RecordStore::default();
        store.add_transaction("奶茶", 15., moment)?;
        store.add_memo("hello", None, moment)?;
        store.add_todo("todo")?;
        store.add_category("电影")?;
        store.set_theme(Some("#ff0000"), None);
        store.save(&kv).await?;

        assert!(dir.path().join("data/myAppTransactions.json").exists());
        assert_eq!(RecordStore::load(&kv).await?, store);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_directory_is_default_store() -> Result<()> {
        let dir = tempdir()?;
        let kv = FileKeyValueStore::new(dir.path().to_owned())?;

        assert_eq!(RecordStore::load(&kv).await?, RecordStore::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_blob_resets_only_that_collection() -> Result<()> {
        *TEST_LOGGING;
        let mut kv = MockKeyValueStore::new();
        kv.expect_load().returning(|key| {
            Ok(match key {
                keys::MEMOS => Some(r#"[{"text":"kept","time":"5月3日 10:00"}]"#.into()),
                keys::TRANSACTIONS => Some("{not json".into()),
                keys::THEME => Some(r##"{"gradient":false}"##.into()),
                _ => None,
            })
        });

        let store = RecordStore::load(&kv).await?;

        assert!(store.transactions().is_empty());
        assert_eq!(store.memos(), [Memo::legacy("kept", "5月3日 10:00")]);
        assert!(!store.theme().gradient);
        assert_eq!(store.theme().color, "#007aff");
        Ok(())
    }

    #[tokio::test]
    async fn test_read_failure_is_an_error() {
        let mut kv = MockKeyValueStore::new();
        kv.expect_load()
            .returning(|_| Err(anyhow!("permission denied")));

        assert!(RecordStore::load(&kv).await.is_err());
    }

    #[tokio::test]
    async fn test_clear_removes_every_key() -> Result<()> {
        let mut kv = MockKeyValueStore::new();
        for key in keys::ALL {
            kv.expect_remove()
                .with(eq(key))
                .times(1)
                .returning(|_| Ok(()));
        }

        clear_all(&kv).await
    }

    #[tokio::test]
    async fn test_file_store_remove() -> Result<()> {
        let dir = tempdir()?;
        let kv = FileKeyValueStore::new(dir.path().to_owned())?;
        kv.save(keys::TODOS, "[]").await?;
        clear_all(&kv).await?;

        assert_eq!(kv.load(keys::TODOS).await?, None);
        Ok(())
    }
}
