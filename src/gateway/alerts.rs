//! Recurring announcement scheduler.
//!
//! Alerts live in the persistent alert table; the gateway event loop calls
//! [`AlertScheduler::run_tick`] once a minute. A tick loads the table, fires
//! every due alert to its sinks, reschedules or removes it, and saves the
//! table back if anything changed.
//!
//! Rescheduling is additive: the next due time is the previous due time plus
//! the fixed frequency interval, not a wall-clock boundary. An alert that was
//! due while the gateway was down fires once on the first tick after startup
//! and then resumes its cadence from where it left off.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};

use crate::chat::ChatTransport;
use crate::logutil::escape_log;
use crate::mesh::{Destination, MeshTransport};
use crate::storage::Storage;

/// Fires due alerts from the persistent alert table.
pub struct AlertScheduler {
    chat_channel_id: String,
    mesh_channel: u8,
}

impl AlertScheduler {
    pub fn new(chat_channel_id: &str, mesh_channel: u8) -> Self {
        AlertScheduler {
            chat_channel_id: chat_channel_id.to_string(),
            mesh_channel,
        }
    }

    /// Fire every alert whose due time has arrived. Returns how many fired.
    ///
    /// Delivery failures are logged and do not block rescheduling: a sink
    /// outage must not cause a once-alert to fire twice or a recurring alert
    /// to pile up. `mesh` is `None` when the radio is not connected; mesh
    /// sinks are skipped with a warning in that case.
    pub async fn run_tick(
        &self,
        storage: &Storage,
        chat: &mut dyn ChatTransport,
        mut mesh: Option<&mut (dyn MeshTransport + 'static)>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let mut alerts = storage.load_alerts().await?;
        let mut fired = 0usize;
        let mut changed = false;
        let mut index = 0;

        while index < alerts.len() {
            if alerts[index].next_run > now {
                index += 1;
                continue;
            }

            let alert = &alerts[index];
            info!(
                "firing {} alert: {}",
                alert.frequency.as_str(),
                escape_log(&alert.message)
            );

            if alert.to_chat {
                if let Err(e) = chat
                    .send_channel_message(&self.chat_channel_id, &format!("🔔 {}", alert.message))
                    .await
                {
                    warn!("alert chat delivery failed: {}", e);
                }
            }
            if alert.to_mesh {
                match mesh.as_deref_mut() {
                    Some(mesh) => {
                        if let Err(e) = mesh
                            .send_text(&alert.message, Destination::Broadcast, self.mesh_channel)
                            .await
                        {
                            warn!("alert mesh delivery failed: {}", e);
                        }
                    }
                    None => warn!("alert mesh delivery skipped: radio not connected"),
                }
            }

            fired += 1;
            changed = true;
            match alerts[index].frequency.interval_secs() {
                Some(secs) => {
                    alerts[index].next_run += Duration::seconds(secs);
                    index += 1;
                }
                None => {
                    alerts.remove(index);
                }
            }
        }

        if changed {
            storage.save_alerts(&alerts).await?;
        }
        Ok(fired)
    }
}
