//! # meshgate
//!
//! A gateway service bridging a chat platform and a Meshtastic mesh network.
//! Users claim ownership of mesh nodes with one-time pairing codes, configure
//! themselves through an interactive reaction-driven setup wizard, and get
//! mesh traffic relayed into chat channels and DMs. Admins schedule recurring
//! alerts that fire to chat, the mesh, or both.
//!
//! ## Architecture
//!
//! - [`gateway`] - claim coordination, setup wizard, alert scheduler, relay
//!   routing, and the single-task event loop that owns all of it
//! - [`chat`] / [`mesh`] - transport trait boundaries; concrete platform and
//!   radio adapters live outside this crate and plug in at these seams
//! - [`storage`] - whole-document JSON tables with atomic locked writes
//! - [`config`] - TOML configuration
//! - [`logutil`] - log sanitization helpers
//!
//! All gateway state lives on one Tokio task; adapters hand events in through
//! cloneable channel senders and perform outbound I/O via the transport
//! traits.

pub mod chat;
pub mod config;
pub mod gateway;
pub mod logutil;
pub mod mesh;
pub mod storage;
