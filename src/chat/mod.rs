//! # Chat Transport Boundary
//!
//! The chat platform (client connection, slash-command registration, embed
//! rendering) lives outside this crate. The gateway consumes inbound events as
//! [`ChatEvent`]s pushed over an unbounded channel and performs all outbound
//! I/O through the [`ChatTransport`] trait. A concrete adapter for a given
//! platform implements the trait and feeds the event channel.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// An inbound event from the chat platform.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// A slash-command invocation. `is_admin` carries the adapter's
    /// admin-capability check for the invoking principal.
    Interaction {
        principal: String,
        is_admin: bool,
        command: String,
        args: Vec<String>,
    },
    /// A reaction added by a principal (drives the setup wizard).
    Reaction { principal: String, emoji: String },
}

/// Create the inbound chat event channel. The sender side is handed to the
/// chat adapter; the receiver is owned by the gateway event loop.
pub fn event_channel() -> (
    mpsc::UnboundedSender<ChatEvent>,
    mpsc::UnboundedReceiver<ChatEvent>,
) {
    mpsc::unbounded_channel()
}

/// Outbound operations on the chat platform.
///
/// Errors from any method are adapter-specific; the gateway converts them to
/// its own taxonomy at the call site (a failed direct message is treated as
/// the recipient being unreachable).
#[async_trait]
pub trait ChatTransport: Send {
    async fn send_direct_message(&mut self, principal: &str, content: &str) -> Result<()>;
    async fn send_channel_message(&mut self, channel_id: &str, content: &str) -> Result<()>;
    async fn grant_role(&mut self, principal: &str, role_id: &str) -> Result<()>;
    async fn revoke_role(&mut self, principal: &str, role_id: &str) -> Result<()>;
}

/// A [`ChatTransport`] that writes outbound traffic to the log and succeeds.
///
/// Used by the `start` subcommand when no platform adapter is wired in; useful
/// for dry runs and for exercising the mesh side in isolation.
pub struct LoggingChatTransport;

#[async_trait]
impl ChatTransport for LoggingChatTransport {
    async fn send_direct_message(&mut self, principal: &str, content: &str) -> Result<()> {
        log::info!(
            "chat dm -> {}: {}",
            principal,
            crate::logutil::escape_log(content)
        );
        Ok(())
    }

    async fn send_channel_message(&mut self, channel_id: &str, content: &str) -> Result<()> {
        log::info!(
            "chat channel {} -> {}",
            channel_id,
            crate::logutil::escape_log(content)
        );
        Ok(())
    }

    async fn grant_role(&mut self, principal: &str, role_id: &str) -> Result<()> {
        log::info!("chat grant role {} -> {}", role_id, principal);
        Ok(())
    }

    async fn revoke_role(&mut self, principal: &str, role_id: &str) -> Result<()> {
        log::info!("chat revoke role {} -> {}", role_id, principal);
        Ok(())
    }
}
