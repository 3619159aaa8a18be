//! # Storage Module - Data Persistence Layer
//!
//! File-backed persistence for the meshgate system. Every table is a single
//! JSON document in the data directory, read and written whole:
//!
//! ```text
//! data/
//! ├── nodes.json        ← node registry (node_id → display name)
//! ├── owners.json       ← ownership records (node_id → owner principal)
//! ├── preferences.json  ← per-principal notification preferences
//! ├── alerts.json       ← scheduled alerts
//! ├── messages.json     ← inbound mesh message log
//! └── about.json        ← gateway metadata for the about command
//! ```
//!
//! Writes go through an exclusive-lock + temp-file + atomic-rename helper so a
//! crash mid-write never leaves a torn document. Callers must treat each save
//! as replacing the entire table; two independent read-modify-write sequences
//! on the same table must not interleave (the gateway event loop is the single
//! writer).
//!
//! Two tables are size-bounded: the message log and the preferences table each
//! carry a serialized byte ceiling, and the oldest entries are evicted first
//! once a save would exceed it.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use fs2::FileExt;

/// How often an alert fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Once,
    Hourly,
    Daily,
    Weekly,
}

impl Frequency {
    /// Fixed reschedule increment in seconds; `None` for one-shot alerts.
    ///
    /// Rescheduling is additive from the previous due time, so "daily" drifts
    /// relative to wall-clock boundaries. That matches the recorded behavior
    /// of the system this replaces and is relied on by operators.
    pub fn interval_secs(&self) -> Option<i64> {
        match self {
            Frequency::Once => None,
            Frequency::Hourly => Some(3600),
            Frequency::Daily => Some(86_400),
            Frequency::Weekly => Some(604_800),
        }
    }

    pub fn parse(s: &str) -> Option<Frequency> {
        match s.to_ascii_lowercase().as_str() {
            "once" => Some(Frequency::Once),
            "hourly" => Some(Frequency::Hourly),
            "daily" => Some(Frequency::Daily),
            "weekly" => Some(Frequency::Weekly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Once => "once",
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
        }
    }
}

/// A scheduled announcement, fired to one or both sinks when due.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub message: String,
    pub frequency: Frequency,
    pub to_chat: bool,
    pub to_mesh: bool,
    pub next_run: DateTime<Utc>,
}

/// One relayed inbound mesh text message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageLogEntry {
    pub node_id: String,
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

/// Per-principal notification preference. Entries keep insertion order so the
/// eviction policy can drop the oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceEntry {
    pub principal: String,
    pub dm_notifications: bool,
}

/// Operator-maintained metadata surfaced by the `about` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboutInfo {
    pub version: String,
    pub network_size: u32,
    pub contact_info: String,
    pub last_maintenance: String,
    pub custom_message: String,
}

impl Default for AboutInfo {
    fn default() -> Self {
        AboutInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            network_size: 0,
            contact_info: String::new(),
            last_maintenance: String::new(),
            custom_message: String::new(),
        }
    }
}

/// Main storage interface
pub struct Storage {
    data_dir: String,
    max_message_log_bytes: usize,
    max_preferences_bytes: usize,
}

impl Storage {
    /// Initialize storage with the given data directory
    pub async fn new(data_dir: &str) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .await
            .map_err(|e| anyhow!("Failed to create data directory {}: {}", data_dir, e))?;

        Ok(Storage {
            data_dir: data_dir.to_string(),
            max_message_log_bytes: 500_000_000,
            max_preferences_bytes: 10_000_000,
        })
    }

    /// Initialize storage with explicit table size ceilings.
    pub async fn new_with_limits(
        data_dir: &str,
        max_message_log_bytes: usize,
        max_preferences_bytes: usize,
    ) -> Result<Self> {
        let mut storage = Self::new(data_dir).await?;
        storage.max_message_log_bytes = max_message_log_bytes;
        storage.max_preferences_bytes = max_preferences_bytes;
        Ok(storage)
    }

    fn table_path(&self, file: &str) -> PathBuf {
        Path::new(&self.data_dir).join(file)
    }

    /// Load a whole-document table; a missing file yields the default value.
    async fn load_table<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T> {
        let path = self.table_path(file);
        match fs::read_to_string(&path).await {
            Ok(data) => {
                // Guard against any accidental leading NULs
                let cleaned = data.trim_start_matches('\0');
                serde_json::from_str(cleaned)
                    .map_err(|e| anyhow!("Failed to parse {}: {}", file, e))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(anyhow!("Failed reading {}: {}", file, e)),
        }
    }

    async fn save_table<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.table_path(file);
        let content = serde_json::to_string_pretty(value)
            .map_err(|e| anyhow!("Failed to serialize {}: {}", file, e))?;
        Self::write_file_locked(&path, &content)
    }

    /// Write content to a file with exclusive locking and atomic replace.
    fn write_file_locked(path: &Path, content: &str) -> Result<()> {
        use std::fs::{self, File, OpenOptions};
        use std::io::Write;

        // Use synchronous I/O for file locking since fs2 doesn't support async
        // Step 1: Open (or create) the destination file to acquire an exclusive lock
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;

        lock_file.lock_exclusive()?;

        // Step 2: Create a unique temp file in the same directory
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let base = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("table.json");
        let mut counter = 0u32;
        let tmp_path = loop {
            let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(mut tmp) => {
                    tmp.write_all(content.as_bytes())?;
                    tmp.flush()?;
                    let _ = tmp.sync_all();
                    break candidate;
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    counter = counter.saturating_add(1);
                    continue;
                }
                Err(e) => return Err(anyhow!("Failed to create temp file for atomic write: {}", e)),
            }
        };

        // Step 3: Atomically replace the destination with the temp file
        fs::rename(&tmp_path, path)?;

        // Step 4: Fsync the directory to persist the rename (best-effort)
        if let Ok(dir_file) = File::open(dir) {
            let _ = dir_file.sync_all();
        }

        // Step 5: Unlock by dropping the lock file
        drop(lock_file);

        Ok(())
    }

    // ---- node registry ----------------------------------------------------

    pub async fn load_nodes(&self) -> Result<HashMap<String, String>> {
        self.load_table("nodes.json").await
    }

    pub async fn save_nodes(&self, nodes: &HashMap<String, String>) -> Result<()> {
        self.save_table("nodes.json", nodes).await
    }

    /// Create or update a registry entry. Registry entries are never deleted.
    pub async fn upsert_node(&self, node_id: &str, display_name: &str) -> Result<()> {
        let mut nodes = self.load_nodes().await?;
        nodes.insert(node_id.to_string(), display_name.to_string());
        self.save_nodes(&nodes).await
    }

    pub async fn node_display_name(&self, node_id: &str) -> Result<String> {
        let nodes = self.load_nodes().await?;
        Ok(nodes
            .get(node_id)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string()))
    }

    // ---- ownership --------------------------------------------------------

    pub async fn load_owners(&self) -> Result<HashMap<String, String>> {
        self.load_table("owners.json").await
    }

    /// Bind a node to an owner. A node has at most one owner; rebinding
    /// replaces the previous owner.
    pub async fn set_owner(&self, node_id: &str, principal: &str) -> Result<()> {
        let mut owners = self.load_owners().await?;
        owners.insert(node_id.to_string(), principal.to_string());
        self.save_table("owners.json", &owners).await
    }

    /// Remove the ownership record for a node, returning the former owner.
    pub async fn remove_owner(&self, node_id: &str) -> Result<Option<String>> {
        let mut owners = self.load_owners().await?;
        let previous = owners.remove(node_id);
        if previous.is_some() {
            self.save_table("owners.json", &owners).await?;
        }
        Ok(previous)
    }

    pub async fn owner_of(&self, node_id: &str) -> Result<Option<String>> {
        let owners = self.load_owners().await?;
        Ok(owners.get(node_id).cloned())
    }

    /// All node ids owned by a principal (a principal may own several nodes).
    pub async fn nodes_owned_by(&self, principal: &str) -> Result<Vec<String>> {
        let owners = self.load_owners().await?;
        let mut owned: Vec<String> = owners
            .iter()
            .filter(|(_, owner)| owner.as_str() == principal)
            .map(|(node_id, _)| node_id.clone())
            .collect();
        owned.sort();
        Ok(owned)
    }

    // ---- preferences ------------------------------------------------------

    pub async fn load_preferences(&self) -> Result<Vec<PreferenceEntry>> {
        self.load_table("preferences.json").await
    }

    /// Create or overwrite a principal's preference. Updating keeps the
    /// entry's position in the eviction order.
    pub async fn set_preference(&self, principal: &str, dm_notifications: bool) -> Result<()> {
        let mut prefs = self.load_preferences().await?;
        match prefs.iter_mut().find(|p| p.principal == principal) {
            Some(entry) => entry.dm_notifications = dm_notifications,
            None => prefs.push(PreferenceEntry {
                principal: principal.to_string(),
                dm_notifications,
            }),
        }
        // Oldest-key eviction once the serialized table exceeds its ceiling
        while !prefs.is_empty() && serialized_len(&prefs)? > self.max_preferences_bytes {
            prefs.remove(0);
        }
        self.save_table("preferences.json", &prefs).await
    }

    pub async fn dm_notifications_enabled(&self, principal: &str) -> Result<bool> {
        let prefs = self.load_preferences().await?;
        Ok(prefs
            .iter()
            .find(|p| p.principal == principal)
            .map(|p| p.dm_notifications)
            .unwrap_or(false))
    }

    // ---- alerts -----------------------------------------------------------

    pub async fn load_alerts(&self) -> Result<Vec<Alert>> {
        self.load_table("alerts.json").await
    }

    pub async fn save_alerts(&self, alerts: &[Alert]) -> Result<()> {
        self.save_table("alerts.json", &alerts).await
    }

    pub async fn push_alert(&self, alert: Alert) -> Result<()> {
        let mut alerts = self.load_alerts().await?;
        alerts.push(alert);
        self.save_alerts(&alerts).await
    }

    // ---- message log ------------------------------------------------------

    pub async fn load_messages(&self) -> Result<Vec<MessageLogEntry>> {
        self.load_table("messages.json").await
    }

    /// Append an entry to the message log, evicting oldest entries while the
    /// serialized log exceeds the configured byte ceiling.
    pub async fn append_message(&self, entry: MessageLogEntry) -> Result<()> {
        let mut messages = self.load_messages().await?;
        messages.push(entry);
        while !messages.is_empty() && serialized_len(&messages)? > self.max_message_log_bytes {
            messages.remove(0);
        }
        self.save_table("messages.json", &messages).await
    }

    // ---- about ------------------------------------------------------------

    pub async fn load_about(&self) -> Result<AboutInfo> {
        self.load_table("about.json").await
    }

    pub async fn save_about(&self, about: &AboutInfo) -> Result<()> {
        self.save_table("about.json", about).await
    }
}

fn serialized_len<T: Serialize>(value: &T) -> Result<usize> {
    Ok(serde_json::to_string_pretty(value)?.len())
}
