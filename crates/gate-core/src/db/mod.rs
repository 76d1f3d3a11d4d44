// ============================================================================
// TabDb - Simulated browser tabs (redb)
// ============================================================================
// Gives each simulated tab its own string key/value namespace so the command
// line harness can carry a session across invocations, the way a real tab
// carries `sessionStorage` across page loads.
// Default path: ~/.purge/tabs.redb (override via PURGE_GATE_DB_PATH env var)
// ============================================================================

use anyhow::{anyhow, Result};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::session::TabStorage;

/// Env var overriding the database location
pub const DB_PATH_ENV: &str = "PURGE_GATE_DB_PATH";

// Table definitions
const ITEMS: TableDefinition<&str, &str> = TableDefinition::new("tab_items");
const TABS: TableDefinition<&str, i64> = TableDefinition::new("tabs");
const META: TableDefinition<&str, &str> = TableDefinition::new("meta");

const CURRENT_TAB: &str = "current_tab";

/// A known tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub tab_id: String,
    /// Milliseconds since the epoch
    pub opened_at: i64,
    /// Items currently stored in the tab
    pub items: usize,
}

/// Embedded database holding every simulated tab
pub struct TabDb {
    db: Arc<Database>,
    path: PathBuf,
}

impl TabDb {
    /// Open (or create) the database at the given path.
    /// If `path` is None, uses PURGE_GATE_DB_PATH env var or ~/.purge/tabs.redb
    pub fn open(path: Option<&str>) -> Result<Self> {
        let db_path = if let Some(p) = path {
            PathBuf::from(p)
        } else if let Ok(env_path) = std::env::var(DB_PATH_ENV) {
            PathBuf::from(env_path)
        } else {
            let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
            let purge_dir = home.join(".purge");
            std::fs::create_dir_all(&purge_dir)
                .map_err(|e| anyhow!("Failed to create .purge directory: {}", e))?;
            purge_dir.join("tabs.redb")
        };

        debug!("Opening tab database at: {}", db_path.display());

        let db = Database::create(&db_path)
            .map_err(|e| anyhow!("Failed to open database: {}", e))?;

        // Ensure tables exist by doing a write transaction
        let write_txn = db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let _ = write_txn.open_table(ITEMS).map_err(|e| anyhow!("Failed to create items table: {}", e))?;
            let _ = write_txn.open_table(TABS).map_err(|e| anyhow!("Failed to create tabs table: {}", e))?;
            let _ = write_txn.open_table(META).map_err(|e| anyhow!("Failed to create meta table: {}", e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit init: {}", e))?;

        Ok(Self {
            db: Arc::new(db),
            path: db_path,
        })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ========================================================================
    // Tab Operations
    // ========================================================================

    /// Open a new empty tab and make it current
    pub fn open_tab(&self) -> Result<TabInfo> {
        let tab_id = uuid::Uuid::new_v4().to_string();
        let opened_at = chrono::Utc::now().timestamp_millis();

        let write_txn = self.db.begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut tabs = write_txn.open_table(TABS)
                .map_err(|e| anyhow!("Failed to open tabs table: {}", e))?;
            tabs.insert(tab_id.as_str(), opened_at)
                .map_err(|e| anyhow!("Failed to insert tab: {}", e))?;

            let mut meta = write_txn.open_table(META)
                .map_err(|e| anyhow!("Failed to open meta table: {}", e))?;
            meta.insert(CURRENT_TAB, tab_id.as_str())
                .map_err(|e| anyhow!("Failed to set current tab: {}", e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit: {}", e))?;

        info!("Opened tab {}", tab_id);
        Ok(TabInfo {
            tab_id,
            opened_at,
            items: 0,
        })
    }

    /// Storage handle for a known tab
    pub fn tab(&self, tab_id: &str) -> Result<DbTab> {
        if !self.tab_exists(tab_id)? {
            return Err(anyhow!("Tab not found: {}", tab_id));
        }
        Ok(DbTab {
            db: Arc::clone(&self.db),
            tab_id: tab_id.to_string(),
        })
    }

    pub fn tab_exists(&self, tab_id: &str) -> Result<bool> {
        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let tabs = read_txn.open_table(TABS)
            .map_err(|e| anyhow!("Failed to open tabs table: {}", e))?;
        Ok(tabs.get(tab_id).map_err(|e| anyhow!("Failed to get tab: {}", e))?.is_some())
    }

    /// Tab most recently opened, if it is still open
    pub fn current_tab(&self) -> Result<Option<String>> {
        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let meta = read_txn.open_table(META)
            .map_err(|e| anyhow!("Failed to open meta table: {}", e))?;

        let current = meta
            .get(CURRENT_TAB)
            .map_err(|e| anyhow!("Failed to get current tab: {}", e))?
            .map(|v| v.value().to_string());
        Ok(current)
    }

    pub fn list_tabs(&self) -> Result<Vec<TabInfo>> {
        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let tabs = read_txn.open_table(TABS)
            .map_err(|e| anyhow!("Failed to open tabs table: {}", e))?;
        let items = read_txn.open_table(ITEMS)
            .map_err(|e| anyhow!("Failed to open items table: {}", e))?;

        let mut results = Vec::new();
        let iter = tabs.range::<&str>(..)
            .map_err(|e| anyhow!("Failed to iterate tabs: {}", e))?;
        for entry in iter {
            let (key, value) = entry.map_err(|e| anyhow!("Failed to read entry: {}", e))?;
            let tab_id = key.value().to_string();
            let prefix = item_prefix(&tab_id);

            let mut count = 0;
            for item in items.range::<&str>(prefix.as_str()..)
                .map_err(|e| anyhow!("Failed to iterate items: {}", e))?
            {
                let (item_key, _) = item.map_err(|e| anyhow!("Failed to read item: {}", e))?;
                if !item_key.value().starts_with(&prefix) {
                    break;
                }
                count += 1;
            }

            results.push(TabInfo {
                tab_id,
                opened_at: value.value(),
                items: count,
            });
        }
        Ok(results)
    }

    /// Close a tab, dropping everything it stored. Returns false if the tab
    /// was not open.
    pub fn close_tab(&self, tab_id: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        let removed;
        {
            let mut tabs = write_txn.open_table(TABS)
                .map_err(|e| anyhow!("Failed to open tabs table: {}", e))?;
            removed = tabs.remove(tab_id)
                .map_err(|e| anyhow!("Failed to remove tab: {}", e))?
                .is_some();

            let mut items = write_txn.open_table(ITEMS)
                .map_err(|e| anyhow!("Failed to open items table: {}", e))?;
            clear_items(&mut items, tab_id)?;

            let mut meta = write_txn.open_table(META)
                .map_err(|e| anyhow!("Failed to open meta table: {}", e))?;
            let is_current = meta
                .get(CURRENT_TAB)
                .map_err(|e| anyhow!("Failed to get current tab: {}", e))?
                .map(|v| v.value() == tab_id)
                .unwrap_or(false);
            if is_current {
                meta.remove(CURRENT_TAB)
                    .map_err(|e| anyhow!("Failed to unset current tab: {}", e))?;
            }
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit close: {}", e))?;

        if removed {
            info!("Closed tab {}", tab_id);
        }
        Ok(removed)
    }
}

/// Storage of one tab inside a `TabDb`
#[derive(Clone)]
pub struct DbTab {
    db: Arc<Database>,
    tab_id: String,
}

impl DbTab {
    pub fn tab_id(&self) -> &str {
        &self.tab_id
    }

    fn item_key(&self, key: &str) -> String {
        format!("{}{}", item_prefix(&self.tab_id), key)
    }
}

impl TabStorage for DbTab {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let item_key = self.item_key(key);

        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn.open_table(ITEMS)
            .map_err(|e| anyhow!("Failed to open items table: {}", e))?;

        let value = table
            .get(item_key.as_str())
            .map_err(|e| anyhow!("Failed to get item: {}", e))?
            .map(|v| v.value().to_string());
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let item_key = self.item_key(key);

        let write_txn = self.db.begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut table = write_txn.open_table(ITEMS)
                .map_err(|e| anyhow!("Failed to open items table: {}", e))?;
            table.insert(item_key.as_str(), value)
                .map_err(|e| anyhow!("Failed to insert item: {}", e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit: {}", e))?;

        debug!("Tab {}: set {}", self.tab_id, key);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let item_key = self.item_key(key);

        let write_txn = self.db.begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut table = write_txn.open_table(ITEMS)
                .map_err(|e| anyhow!("Failed to open items table: {}", e))?;
            table.remove(item_key.as_str())
                .map_err(|e| anyhow!("Failed to remove item: {}", e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit: {}", e))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let write_txn = self.db.begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        let cleared;
        {
            let mut table = write_txn.open_table(ITEMS)
                .map_err(|e| anyhow!("Failed to open items table: {}", e))?;
            cleared = clear_items(&mut table, &self.tab_id)?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit clear: {}", e))?;

        debug!("Tab {}: cleared {} items", self.tab_id, cleared);
        Ok(())
    }
}

fn item_prefix(tab_id: &str) -> String {
    format!("{}:", tab_id)
}

/// Remove every item of `tab_id`, returning how many went
fn clear_items(table: &mut redb::Table<'_, &'static str, &'static str>, tab_id: &str) -> Result<usize> {
    let prefix = item_prefix(tab_id);

    let mut keys = Vec::new();
    for entry in table.range::<&str>(prefix.as_str()..)
        .map_err(|e| anyhow!("Failed to iterate items: {}", e))?
    {
        let (key, _) = entry.map_err(|e| anyhow!("Failed to read item: {}", e))?;
        let key = key.value();
        if !key.starts_with(&prefix) {
            break;
        }
        keys.push(key.to_string());
    }

    for key in &keys {
        table.remove(key.as_str())
            .map_err(|e| anyhow!("Failed to remove item: {}", e))?;
    }
    Ok(keys.len())
}
