//! # Mesh Transport Boundary
//!
//! The Meshtastic radio driver (serial link, packet framing, protobuf
//! decoding) is an external collaborator. Inbound traffic reaches the gateway
//! as [`MeshEvent`]s; outbound operations go through the [`MeshTransport`]
//! trait.
//!
//! ## Foreign-thread handoff
//!
//! Radio drivers typically deliver callbacks on their own I/O thread. No
//! gateway state may be touched from that thread: the driver gets a cloneable
//! [`MeshEventSender`] and pushes events through it; the gateway event loop
//! receives them on its own task. The sender is `Send + Sync + Clone`, so the
//! handoff is safe from any thread.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Highest valid mesh channel index (channels are numbered 0-7).
pub const MAX_CHANNEL_INDEX: u8 = 7;

/// An inbound text-message packet. Non-text packets are dropped by the driver
/// before reaching the gateway.
#[derive(Debug, Clone)]
pub struct TextPacket {
    pub from_node_id: String,
    pub text: String,
    pub snr: Option<f32>,
    pub battery: Option<u32>,
}

/// An inbound event from the mesh network.
#[derive(Debug, Clone)]
pub enum MeshEvent {
    Text(TextPacket),
    /// The driver learned about a node or refreshed its info.
    NodeUpdated { node_id: String },
}

/// The driver's current view of a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub node_id: String,
    pub long_name: String,
    pub short_name: String,
    pub hw_model: String,
    pub role: String,
    pub battery: Option<u32>,
    pub snr: Option<f32>,
    pub last_heard: Option<DateTime<Utc>>,
}

/// Destination for an outbound text send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Broadcast,
    Node(String),
}

/// Thread-safe handle for pushing mesh events onto the gateway event loop.
///
/// Safe to call from the radio driver's callback thread; a closed receiver
/// (gateway shutting down) makes `send` a silent no-op.
#[derive(Clone)]
pub struct MeshEventSender {
    tx: mpsc::UnboundedSender<MeshEvent>,
}

impl MeshEventSender {
    pub fn send(&self, event: MeshEvent) {
        let _ = self.tx.send(event);
    }
}

/// Create the mesh event channel: a cloneable sender for the driver thread and
/// the receiver owned by the gateway event loop.
pub fn event_channel() -> (MeshEventSender, mpsc::UnboundedReceiver<MeshEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MeshEventSender { tx }, rx)
}

/// Outbound operations on the mesh radio.
///
/// Snapshot accessors are synchronous: drivers maintain a local node database
/// mirrored from the radio, so lookups never touch the wire.
#[async_trait]
pub trait MeshTransport: Send {
    /// Send a text message. `channel_index` must already be validated to the
    /// 0..=[`MAX_CHANNEL_INDEX`] range by the caller.
    async fn send_text(&mut self, text: &str, dest: Destination, channel_index: u8) -> Result<()>;

    fn node_exists(&self, node_id: &str) -> bool;

    fn node_snapshot(&self, node_id: &str) -> Option<NodeSnapshot>;

    /// All nodes currently known to the driver, including the local one.
    fn all_nodes(&self) -> Vec<NodeSnapshot>;

    /// Snapshot of the locally attached node, if the radio is responsive.
    fn my_node(&self) -> Option<NodeSnapshot>;

    /// Ask the local node to reboot after `delay_secs`.
    async fn reboot(&mut self, delay_secs: u32) -> Result<()>;
}
