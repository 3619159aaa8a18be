//! # Gateway Core
//!
//! The stateful heart of meshgate: claim-code coordination, the interactive
//! setup wizard, the alert scheduler, and the relay router, all owned by a
//! single [`GatewayServer`] event loop.
//!
//! - [`claims`] - one-time pairing codes binding a mesh node to a principal
//! - [`wizard`] - per-principal setup finite-state machine
//! - [`alerts`] - recurring announcement scheduler
//! - [`relay`] - inbound/outbound message routing and fan-out
//! - [`commands`] - typed command surface
//! - [`server`] - event loop and orchestration

pub mod alerts;
pub mod claims;
pub mod commands;
pub mod relay;
pub mod server;
pub mod wizard;

pub use server::GatewayServer;

use thiserror::Error;

/// Errors surfaced to the invoking principal by gateway operations.
///
/// Transport and store failures are caught at the boundary of each public
/// operation and converted to this taxonomy; they never escape to crash the
/// event loop.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// A claim code is already pending for this principal.
    #[error("you already have a pending claim; check your DMs for the code")]
    AlreadyPending,

    /// A setup wizard session is already active for this principal.
    #[error("you already have an active setup session; check your DMs")]
    AlreadyActive,

    /// Unknown node or alert index.
    #[error("not found: {0}")]
    NotFound(String),

    /// Direct-message delivery blocked by the recipient.
    #[error("cannot send you a direct message; enable DMs and try again")]
    Unreachable,

    /// The mesh radio is not connected.
    #[error("mesh radio is not connected")]
    TransportUnavailable,

    /// Channel index or frequency outside the allowed set.
    #[error("{0}")]
    InvalidRange(String),

    /// The setup wizard session expired from inactivity.
    #[error("setup session expired; run setup again")]
    SessionExpired,
}
