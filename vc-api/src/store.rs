//  STORE.rs
//    by Lut99
//
//  Created:
//    05 Oct 2026, 13:41:55
//  Last edited:
//    20 Oct 2026, 11:12:08
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the per-node key/value store that holds the state objects
//!   exchanged through the API. The store lives in memory, and may
//!   optionally be mirrored to a directory of JSON files so that it
//!   survives a restart of the node.
//!
//!   Changes are serialized by an async write lock and reach the disk
//!   before they reach the map; reads only take the map lock.
//

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, warn};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::fs as tfs;
use tokio::sync::Mutex as AsyncMutex;

use specifications::item::Item;

pub use crate::errors::StoreError as Error;


/***** TESTS *****/





/***** HELPER FUNCTIONS *****/
/// Turns an arbitrary state ID into something that is safe to use as a filename.
fn file_name(id: &str) -> String {
    let mut name: String = id.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' }).collect();
    name.push_str(".json");
    name
}

/// Serializes the definition of the given item to a JSON value.
fn to_value<T: Serialize>(id: &str, definition: &T) -> Result<Value, Error> {
    serde_json::to_value(definition).map_err(|err| Error::SerializeError{ id: id.into(), err })
}





/***** LIBRARY *****/
/// The key/value store with the state objects of a node.
///
/// Definitions are stored as raw JSON values so that the API does not have to know what kind of state it is serving.
#[derive(Debug, Default)]
pub struct StateStore {
    /// The items in the store, by ID. Only ever held for in-memory work.
    items : Mutex<HashMap<String, Item<Value>>>,
    /// Serializes all changes, including their disk writes.
    write : AsyncMutex<()>,
    /// If given, the directory to which every change is mirrored.
    dir   : Option<PathBuf>,
}

impl StateStore {
    /// Constructor for an in-memory StateStore.
    #[inline]
    pub fn new() -> Self { Self::default() }

    /// Constructor for a StateStore that is mirrored to the given directory.
    ///
    /// # Arguments
    /// - `dir`: The directory to mirror the states to. It is created if it does not exist, and any states already in it are loaded.
    ///
    /// # Returns
    /// A new StateStore with the states found in the directory.
    ///
    /// # Errors
    /// This function errors if the directory could not be created or read, or if any of the files in it is not a valid state.
    pub async fn with_dir(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir: &Path = dir.as_ref();
        if let Err(err) = tfs::create_dir_all(dir).await { return Err(Error::DirCreateError{ path: dir.into(), err }); }

        // Load whatever is already there
        let mut entries: tfs::ReadDir = match tfs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(err)    => { return Err(Error::DirReadError{ path: dir.into(), err }); },
        };
        let mut items: HashMap<String, Item<Value>> = HashMap::new();
        loop {
            let entry: tfs::DirEntry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None)        => { break; },
                Err(err)        => { return Err(Error::DirReadError{ path: dir.into(), err }); },
            };
            let path: PathBuf = entry.path();
            if path.extension().map(|ext| ext != "json").unwrap_or(true) { continue; }

            let raw: String = match tfs::read_to_string(&path).await {
                Ok(raw)  => raw,
                Err(err) => { return Err(Error::FileReadError{ path, err }); },
            };
            let item: Item<Value> = match serde_json::from_str(&raw) {
                Ok(item) => item,
                Err(err) => { return Err(Error::FileParseError{ path, err }); },
            };
            debug!("Loaded persisted state '{}'", item.id);
            items.insert(item.id.clone(), item);
        }

        Ok(Self {
            items : Mutex::new(items),
            write : AsyncMutex::new(()),
            dir   : Some(dir.into()),
        })
    }



    /// Mirrors the given item to disk, if we have a directory.
    async fn persist(&self, item: &Item<Value>) -> Result<(), Error> {
        let dir: &Path = match &self.dir { Some(dir) => dir, None => { return Ok(()); } };
        let path: PathBuf = dir.join(file_name(&item.id));
        let raw: String = match serde_json::to_string_pretty(item) {
            Ok(raw)  => raw,
            Err(err) => { return Err(Error::SerializeError{ id: item.id.clone(), err }); },
        };
        if let Err(err) = tfs::write(&path, raw).await { return Err(Error::FileWriteError{ path, err }); }
        Ok(())
    }

    /// Removes the mirrored file of the item with the given ID, if we have a directory.
    async fn unpersist(&self, id: &str) -> Result<(), Error> {
        let dir: &Path = match &self.dir { Some(dir) => dir, None => { return Ok(()); } };
        let path: PathBuf = dir.join(file_name(id));
        match tfs::remove_file(&path).await {
            Ok(_)                                                   => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound  => Ok(()),
            Err(err)                                                => Err(Error::FileRemoveError{ path, err }),
        }
    }

    /// Writes the given item to disk, then to the map. Must be called with the write lock held.
    async fn store(&self, item: Item<Value>) -> Result<Item<Value>, Error> {
        self.persist(&item).await?;
        self.items.lock().insert(item.id.clone(), item.clone());
        Ok(item)
    }



    /// Returns the item with the given ID, if any.
    #[inline]
    pub fn get(&self, id: &str) -> Option<Item<Value>> { self.items.lock().get(id).cloned() }

    /// Returns the item with the given ID, if any, with its definition parsed as the given type.
    ///
    /// # Errors
    /// This function errors if the stored definition is not a valid `T`.
    pub fn get_as<T: DeserializeOwned>(&self, id: &str) -> Result<Option<Item<T>>, Error> {
        let item: Item<Value> = match self.get(id) {
            Some(item) => item,
            None       => { return Ok(None); },
        };
        let definition: T = match serde_json::from_value(item.definition.clone()) {
            Ok(definition) => definition,
            Err(err)       => { return Err(Error::SerializeError{ id: id.into(), err }); },
        };
        Ok(Some(Item{ id: item.id, created: item.created, last_modified: item.last_modified, definition }))
    }

    /// Adds a new item to the store.
    ///
    /// # Returns
    /// The item as it is stored.
    ///
    /// # Errors
    /// This function errors if an item with the same ID already exists, or if we failed to persist it.
    pub async fn create(&self, item: Item<Value>) -> Result<Item<Value>, Error> {
        let _write = self.write.lock().await;
        if self.items.lock().contains_key(&item.id) { return Err(Error::Exists{ id: item.id }); }
        debug!("Creating state '{}'", item.id);
        self.store(item).await
    }

    /// Replaces the definition of an existing item. Its creation time is kept and its modification time is bumped.
    ///
    /// # Arguments
    /// - `id`: The ID of the item to update (i.e., as given in the path).
    /// - `item`: The new item. Its ID must match `id`.
    ///
    /// # Returns
    /// The item as it is stored.
    ///
    /// # Errors
    /// This function errors if the IDs do not match, no such item exists or we failed to persist it.
    pub async fn update(&self, id: &str, item: Item<Value>) -> Result<Item<Value>, Error> {
        if item.id != id { return Err(Error::IdMismatch{ path_id: id.into(), body_id: item.id }); }

        let _write = self.write.lock().await;
        let created = match self.items.lock().get(id) {
            Some(old) => old.created,
            None      => { return Err(Error::NotFound{ id: id.into() }); },
        };
        debug!("Updating state '{}'", id);
        self.store(Item { id: item.id, created, last_modified: Utc::now(), definition: item.definition }).await
    }

    /// Creates or replaces the given item, keeping the creation time of any existing item.
    ///
    /// # Errors
    /// This function errors if the definition could not be serialized or we failed to persist it.
    pub async fn upsert<T: Serialize>(&self, item: &Item<T>) -> Result<(), Error> {
        let definition: Value = to_value(&item.id, &item.definition)?;

        let _write = self.write.lock().await;
        let created = self.items.lock().get(&item.id).map(|old| old.created).unwrap_or(item.created);
        self.store(Item { id: item.id.clone(), created, last_modified: Utc::now(), definition }).await?;
        Ok(())
    }

    /// Changes the definition of an existing item in place. Nothing happens if there is no such item, so a deleted state is never brought back.
    ///
    /// # Arguments
    /// - `id`: The ID of the item to change.
    /// - `change`: Changes the parsed definition.
    ///
    /// # Returns
    /// Whether there was such an item.
    ///
    /// # Errors
    /// This function errors if the stored definition is not a valid `T` or if we failed to persist the change.
    pub async fn modify<T, F>(&self, id: &str, change: F) -> Result<bool, Error>
    where
        T: DeserializeOwned + Serialize,
        F: FnOnce(&mut T),
    {
        let _write = self.write.lock().await;
        let mut item: Item<T> = match self.get_as::<T>(id)? {
            Some(item) => item,
            None       => { return Ok(false); },
        };
        change(&mut item.definition);
        let definition: Value = to_value(id, &item.definition)?;
        self.store(Item { id: item.id, created: item.created, last_modified: Utc::now(), definition }).await?;
        Ok(true)
    }

    /// Removes the item with the given ID. Its persisted file goes first; if that fails, the item stays.
    ///
    /// # Returns
    /// Whether there was such an item in the first place.
    ///
    /// # Errors
    /// This function errors if we failed to remove its persisted file.
    pub async fn delete(&self, id: &str) -> Result<bool, Error> {
        let _write = self.write.lock().await;
        if let Err(err) = self.unpersist(id).await {
            warn!("{}", err);
            return Err(err);
        }
        let existed: bool = self.items.lock().remove(id).is_some();
        if existed { debug!("Deleted state '{}'", id); }
        Ok(existed)
    }

    /// Returns the number of items in the store.
    #[inline]
    pub fn len(&self) -> usize { self.items.lock().len() }

    /// Returns whether the store is empty.
    #[inline]
    pub fn is_empty(&self) -> bool { self.items.lock().is_empty() }
}
