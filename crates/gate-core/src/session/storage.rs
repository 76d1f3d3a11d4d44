//! ============================================================================
//! Tab Storage - Per-tab string key/value store
//! ============================================================================
//! Same surface as a browser tab's `sessionStorage`: string values, no
//! types, and `clear` wipes everything the tab holds.
//! ============================================================================

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Volatile key/value storage scoped to one tab
pub trait TabStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
    /// Remove every item in the tab
    fn clear(&self) -> Result<()>;
}

impl<T: TabStorage + ?Sized> TabStorage for Arc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

/// In-process tab storage, lost when dropped
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items currently held
    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TabStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self
            .items
            .lock()
            .map_err(|e| anyhow!("Tab storage lock poisoned: {}", e))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|e| anyhow!("Tab storage lock poisoned: {}", e))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|e| anyhow!("Tab storage lock poisoned: {}", e))?;
        items.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|e| anyhow!("Tab storage lock poisoned: {}", e))?;
        items.clear();
        Ok(())
    }
}
