//! Message routing between the mesh and the chat platform.
//!
//! Inbound text packets (after claim-code consumption upstream) are logged to
//! the persistent message log, announced on the mesh channel, and fanned out
//! as DMs to the sending node's owners who opted in. Outbound traffic covers
//! the admin `ack` and `broadcast` operations. Forwarding is verbatim and
//! fire-and-forget; there is no retry on either side.

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{info, warn};

use super::GatewayError;
use crate::chat::ChatTransport;
use crate::logutil::escape_log;
use crate::mesh::{Destination, MeshTransport, TextPacket, MAX_CHANNEL_INDEX};
use crate::storage::{MessageLogEntry, Storage};

/// Routes mesh traffic into chat channels and DMs, and chat commands out to
/// the radio.
pub struct RelayRouter {
    mesh_channel_id: String,
    node_channel_id: String,
}

impl RelayRouter {
    pub fn new(mesh_channel_id: &str, node_channel_id: &str) -> Self {
        RelayRouter {
            mesh_channel_id: mesh_channel_id.to_string(),
            node_channel_id: node_channel_id.to_string(),
        }
    }

    /// Relay one inbound text packet: persist it, announce it on the mesh
    /// channel, and DM each opted-in owner of the sending node.
    ///
    /// Per-recipient DM failures are logged and skipped; one blocked inbox
    /// must not silence the rest of the fan-out.
    pub async fn relay_text(
        &self,
        storage: &Storage,
        chat: &mut dyn ChatTransport,
        packet: &TextPacket,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let display_name = storage.node_display_name(&packet.from_node_id).await?;

        storage
            .append_message(MessageLogEntry {
                node_id: packet.from_node_id.clone(),
                timestamp: now,
                text: packet.text.clone(),
            })
            .await?;

        let notification = format_notification(&display_name, packet);
        info!(
            "relaying mesh text from {} ({}): {}",
            packet.from_node_id,
            display_name,
            escape_log(&packet.text)
        );
        chat.send_channel_message(&self.mesh_channel_id, &notification)
            .await?;

        if let Some(owner) = storage.owner_of(&packet.from_node_id).await? {
            if storage.dm_notifications_enabled(&owner).await? {
                if let Err(e) = chat.send_direct_message(&owner, &notification).await {
                    warn!("dm fan-out to {} failed: {}", owner, e);
                }
            }
        }
        Ok(())
    }

    /// Record a newly discovered node in the registry and announce it on the
    /// node channel.
    pub async fn announce_node(
        &self,
        storage: &Storage,
        chat: &mut dyn ChatTransport,
        mesh: &dyn MeshTransport,
        node_id: &str,
    ) -> Result<()> {
        let snapshot = match mesh.node_snapshot(node_id) {
            Some(s) => s,
            None => return Ok(()),
        };
        let display_name = if snapshot.long_name.is_empty() {
            node_id.to_string()
        } else {
            snapshot.long_name.clone()
        };

        let known = storage.load_nodes().await?.contains_key(node_id);
        storage.upsert_node(node_id, &display_name).await?;
        if known {
            return Ok(());
        }

        info!("new node discovered: {} ({})", node_id, display_name);
        let announcement = format!(
            "📡 New node on the mesh: **{}** (`{}`), hardware {}",
            display_name,
            node_id,
            if snapshot.hw_model.is_empty() {
                "unknown"
            } else {
                &snapshot.hw_model
            }
        );
        chat.send_channel_message(&self.node_channel_id, &announcement)
            .await?;
        Ok(())
    }

    /// Send an acknowledgement text to a specific node.
    pub async fn send_ack(
        &self,
        mesh: Option<&mut (dyn MeshTransport + 'static)>,
        node_id: &str,
        message: &str,
        channel_index: u8,
    ) -> Result<(), GatewayError> {
        validate_channel(channel_index)?;
        let mesh = mesh.ok_or(GatewayError::TransportUnavailable)?;
        if !mesh.node_exists(node_id) {
            return Err(GatewayError::NotFound(format!("node {}", node_id)));
        }
        mesh.send_text(message, Destination::Node(node_id.to_string()), channel_index)
            .await
            .map_err(|_| GatewayError::TransportUnavailable)?;
        Ok(())
    }

    /// Broadcast a text on a mesh channel.
    pub async fn send_broadcast(
        &self,
        mesh: Option<&mut (dyn MeshTransport + 'static)>,
        text: &str,
        channel_index: u8,
    ) -> Result<(), GatewayError> {
        validate_channel(channel_index)?;
        let mesh = mesh.ok_or(GatewayError::TransportUnavailable)?;
        mesh.send_text(text, Destination::Broadcast, channel_index)
            .await
            .map_err(|_| GatewayError::TransportUnavailable)?;
        Ok(())
    }
}

fn validate_channel(channel_index: u8) -> Result<(), GatewayError> {
    if channel_index > MAX_CHANNEL_INDEX {
        return Err(GatewayError::InvalidRange(format!(
            "channel index must be 0-{}",
            MAX_CHANNEL_INDEX
        )));
    }
    Ok(())
}

fn format_notification(display_name: &str, packet: &TextPacket) -> String {
    let mut line = format!(
        "📨 **{}** (`{}`): {}",
        display_name, packet.from_node_id, packet.text
    );
    if let Some(snr) = packet.snr {
        line.push_str(&format!(" | SNR {:.1} dB", snr));
    }
    if let Some(battery) = packet.battery {
        line.push_str(&format!(" | 🔋 {}%", battery));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    #[derive(Default)]
    struct RecordingChat {
        channel_messages: Vec<(String, String)>,
        direct_messages: Vec<(String, String)>,
        fail_dms_to: Option<String>,
    }

    #[async_trait]
    impl ChatTransport for RecordingChat {
        async fn send_direct_message(&mut self, principal: &str, content: &str) -> Result<()> {
            if self.fail_dms_to.as_deref() == Some(principal) {
                anyhow::bail!("dm blocked");
            }
            self.direct_messages
                .push((principal.to_string(), content.to_string()));
            Ok(())
        }
        async fn send_channel_message(&mut self, channel_id: &str, content: &str) -> Result<()> {
            self.channel_messages
                .push((channel_id.to_string(), content.to_string()));
            Ok(())
        }
        async fn grant_role(&mut self, _principal: &str, _role_id: &str) -> Result<()> {
            Ok(())
        }
        async fn revoke_role(&mut self, _principal: &str, _role_id: &str) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeMesh {
        nodes: HashMap<String, crate::mesh::NodeSnapshot>,
        sent: Vec<(String, Destination, u8)>,
    }

    #[async_trait]
    impl MeshTransport for FakeMesh {
        async fn send_text(
            &mut self,
            text: &str,
            dest: Destination,
            channel_index: u8,
        ) -> Result<()> {
            self.sent.push((text.to_string(), dest, channel_index));
            Ok(())
        }
        fn node_exists(&self, node_id: &str) -> bool {
            self.nodes.contains_key(node_id)
        }
        fn node_snapshot(&self, node_id: &str) -> Option<crate::mesh::NodeSnapshot> {
            self.nodes.get(node_id).cloned()
        }
        fn all_nodes(&self) -> Vec<crate::mesh::NodeSnapshot> {
            self.nodes.values().cloned().collect()
        }
        fn my_node(&self) -> Option<crate::mesh::NodeSnapshot> {
            None
        }
        async fn reboot(&mut self, _delay_secs: u32) -> Result<()> {
            Ok(())
        }
    }

    async fn temp_storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_str().unwrap()).await.unwrap();
        (dir, storage)
    }

    fn packet(text: &str) -> TextPacket {
        TextPacket {
            from_node_id: "!abcd".into(),
            text: text.into(),
            snr: Some(7.25),
            battery: Some(83),
        }
    }

    #[tokio::test]
    async fn relay_logs_announces_and_fans_out() {
        let (_dir, storage) = temp_storage().await;
        storage.upsert_node("!abcd", "Hilltop").await.unwrap();
        storage.set_owner("!abcd", "alice").await.unwrap();
        storage.set_preference("alice", true).await.unwrap();

        let router = RelayRouter::new("mesh-chan", "node-chan");
        let mut chat = RecordingChat::default();
        router
            .relay_text(&storage, &mut chat, &packet("hello from the hill"), Utc::now())
            .await
            .unwrap();

        assert_eq!(chat.channel_messages.len(), 1);
        assert_eq!(chat.channel_messages[0].0, "mesh-chan");
        let body = &chat.channel_messages[0].1;
        assert!(body.contains("Hilltop"));
        assert!(body.contains("hello from the hill"));
        assert!(body.contains("SNR 7.2 dB"));
        assert!(body.contains("83%"));

        assert_eq!(chat.direct_messages.len(), 1);
        assert_eq!(chat.direct_messages[0].0, "alice");

        let log = storage.load_messages().await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].node_id, "!abcd");
    }

    #[tokio::test]
    async fn unknown_node_relays_with_fallback_name() {
        let (_dir, storage) = temp_storage().await;
        let router = RelayRouter::new("mesh-chan", "node-chan");
        let mut chat = RecordingChat::default();
        router
            .relay_text(&storage, &mut chat, &packet("anon"), Utc::now())
            .await
            .unwrap();
        assert!(chat.channel_messages[0].1.contains("Unknown"));
        assert!(chat.direct_messages.is_empty());
    }

    #[tokio::test]
    async fn opted_out_owner_gets_no_dm() {
        let (_dir, storage) = temp_storage().await;
        storage.set_owner("!abcd", "alice").await.unwrap();
        storage.set_preference("alice", false).await.unwrap();

        let router = RelayRouter::new("mesh-chan", "node-chan");
        let mut chat = RecordingChat::default();
        router
            .relay_text(&storage, &mut chat, &packet("quiet"), Utc::now())
            .await
            .unwrap();
        assert!(chat.direct_messages.is_empty());
        // Channel notification still goes out
        assert_eq!(chat.channel_messages.len(), 1);
    }

    #[tokio::test]
    async fn blocked_dm_does_not_fail_relay() {
        let (_dir, storage) = temp_storage().await;
        storage.set_owner("!abcd", "alice").await.unwrap();
        storage.set_preference("alice", true).await.unwrap();

        let router = RelayRouter::new("mesh-chan", "node-chan");
        let mut chat = RecordingChat {
            fail_dms_to: Some("alice".into()),
            ..Default::default()
        };
        router
            .relay_text(&storage, &mut chat, &packet("still relayed"), Utc::now())
            .await
            .unwrap();
        assert_eq!(chat.channel_messages.len(), 1);
        assert!(chat.direct_messages.is_empty());
    }

    #[tokio::test]
    async fn node_discovery_announces_once() {
        let (_dir, storage) = temp_storage().await;
        let mut mesh = FakeMesh::default();
        mesh.nodes.insert(
            "!abcd".into(),
            crate::mesh::NodeSnapshot {
                node_id: "!abcd".into(),
                long_name: "Hilltop".into(),
                hw_model: "TBEAM".into(),
                ..Default::default()
            },
        );

        let router = RelayRouter::new("mesh-chan", "node-chan");
        let mut chat = RecordingChat::default();
        router
            .announce_node(&storage, &mut chat, &mesh, "!abcd")
            .await
            .unwrap();
        assert_eq!(chat.channel_messages.len(), 1);
        assert_eq!(chat.channel_messages[0].0, "node-chan");
        assert!(chat.channel_messages[0].1.contains("Hilltop"));

        // Re-announcing a known node refreshes the registry silently
        router
            .announce_node(&storage, &mut chat, &mesh, "!abcd")
            .await
            .unwrap();
        assert_eq!(chat.channel_messages.len(), 1);
        assert_eq!(
            storage.node_display_name("!abcd").await.unwrap(),
            "Hilltop"
        );
    }

    #[tokio::test]
    async fn ack_requires_known_node_and_radio() {
        let router = RelayRouter::new("mesh-chan", "node-chan");
        assert_eq!(
            router.send_ack(None, "!abcd", "ok", 0).await,
            Err(GatewayError::TransportUnavailable)
        );

        let mut mesh = FakeMesh::default();
        let err = router
            .send_ack(Some(&mut mesh), "!abcd", "ok", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));

        mesh.nodes
            .insert("!abcd".into(), crate::mesh::NodeSnapshot::default());
        router
            .send_ack(Some(&mut mesh), "!abcd", "ok", 2)
            .await
            .unwrap();
        assert_eq!(
            mesh.sent,
            vec![("ok".to_string(), Destination::Node("!abcd".into()), 2)]
        );
    }

    #[tokio::test]
    async fn broadcast_rejects_bad_channel() {
        let router = RelayRouter::new("mesh-chan", "node-chan");
        let mut mesh = FakeMesh::default();
        let err = router
            .send_broadcast(Some(&mut mesh), "hi", 8)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRange(_)));
        assert!(mesh.sent.is_empty());

        router.send_broadcast(Some(&mut mesh), "hi", 7).await.unwrap();
        assert_eq!(mesh.sent.len(), 1);
    }
}
