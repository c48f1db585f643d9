use std::{
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{anyhow, Context, Result};
use fs4::tokio::AsyncFileExt;
use serde_json::{Map, Value};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::debug;

/// Flat JSON document keyed by strings.
pub type Items = Map<String, Value>;

/// Interface for abstracting the key-value storage both the tracker and the cli work against.
/// Every call is a single read or a single write of the whole selection, there are no
/// transactions spanning calls.
pub trait KeyValueStore {
    /// Returns the subset of `keys` that is present.
    fn get(&self, keys: &[&str]) -> impl Future<Output = Result<Items>>;

    fn get_all(&self) -> impl Future<Output = Result<Items>>;

    /// Inserts or overwrites all `items` at once.
    fn set(&self, items: Items) -> impl Future<Output = Result<()>>;

    /// Removing a missing key is not an error.
    fn remove(&self, keys: &[&str]) -> impl Future<Output = Result<()>>;
}

impl<T: Deref> KeyValueStore for T
where
    T::Target: KeyValueStore,
{
    fn get(&self, keys: &[&str]) -> impl Future<Output = Result<Items>> {
        self.deref().get(keys)
    }

    fn get_all(&self) -> impl Future<Output = Result<Items>> {
        self.deref().get_all()
    }

    fn set(&self, items: Items) -> impl Future<Output = Result<()>> {
        self.deref().set(items)
    }

    fn remove(&self, keys: &[&str]) -> impl Future<Output = Result<()>> {
        self.deref().remove(keys)
    }
}

fn select(items: &Items, keys: &[&str]) -> Items {
    keys.iter()
        .filter_map(|key| items.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect()
}

/// Store that lives as long as the process. Used by tests and as a scratch store.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<Items>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Items>> {
        self.items
            .lock()
            .map_err(|_| anyhow!("Memory store lock was poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Items> {
        Ok(select(&*self.lock()?, keys))
    }

    async fn get_all(&self) -> Result<Items> {
        Ok(self.lock()?.clone())
    }

    async fn set(&self, items: Items) -> Result<()> {
        self.lock()?.extend(items);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut stored = self.lock()?;
        for key in keys {
            stored.remove(*key);
        }
        Ok(())
    }
}

/// The main realization of [KeyValueStore]. Keeps the whole document in one JSON file and takes
/// an advisory lock for every operation, so the cli can read while the tracker writes.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory {parent:?}"))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(file: &mut File) -> Result<Items> {
        let mut content = String::new();
        file.rewind().await?;
        file.read_to_string(&mut content).await?;
        if content.trim().is_empty() {
            return Ok(Items::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(items) => Ok(items),
            other => Err(anyhow!("Store document must be an object, found {other}")),
        }
    }

    async fn read_shared(&self) -> Result<Items> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Items::new()),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to open store {:?}", self.path)))
            }
        };
        file.lock_shared()?;
        let result = Self::read_document(&mut file).await;
        file.unlock_async().await?;
        result.with_context(|| format!("Failed to read store {:?}", self.path))
    }

    /// Semi-safe read-modify-write under an exclusive lock.
    async fn update(&self, change: impl FnOnce(&mut Items)) -> Result<()> {
        let mut file = File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open store {:?}", self.path))?;

        file.lock_exclusive()?;
        let result = Self::update_with_file(&mut file, change).await;
        file.unlock_async().await?;
        result.with_context(|| format!("Failed to update store {:?}", self.path))
    }

    async fn update_with_file(file: &mut File, change: impl FnOnce(&mut Items)) -> Result<()> {
        let mut items = Self::read_document(file).await?;
        change(&mut items);

        let buffer = serde_json::to_vec(&items)?;
        file.rewind().await?;
        file.set_len(0).await?;
        file.write_all(&buffer).await?;
        file.flush().await?;
        debug!("Wrote {} bytes to the store", buffer.len());
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    async fn get(&self, keys: &[&str]) -> Result<Items> {
        Ok(select(&self.read_shared().await?, keys))
    }

    async fn get_all(&self) -> Result<Items> {
        self.read_shared().await
    }

    async fn set(&self, items: Items) -> Result<()> {
        self.update(|stored| stored.extend(items)).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        self.update(|stored| {
            for key in keys {
                stored.remove(*key);
            }
        })
        .await
    }
}
