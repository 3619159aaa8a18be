//! Pairing-code claim protocol.
//!
//! A principal requests a claim and receives a one-time code; sending that
//! code as a mesh text message from a node proves physical access and binds
//! the node to the principal. The pending-claim table lives only in memory:
//! all access goes through [`ClaimCoordinator`] methods, and the coordinator
//! itself lives inside the single-threaded gateway event loop, which gives
//! the single-writer discipline the table needs. A restart drops in-flight
//! claims; codes are only valid for five minutes anyway.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use rand::Rng;
use std::collections::HashMap;

use super::GatewayError;

/// Validity window for an issued claim code, in seconds.
pub const CLAIM_TTL_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct PendingClaim {
    pub code: String,
    pub issued_at: DateTime<Utc>,
}

impl PendingClaim {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.issued_at >= Duration::seconds(CLAIM_TTL_SECS)
    }
}

/// Emitted when a mesh message redeems a pending claim. Downstream consumers
/// handle ownership persistence, role grant, announcements, and wizard
/// advancement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimCompleted {
    pub principal: String,
    pub node_id: String,
}

/// Issues and validates one-time pairing codes.
#[derive(Debug, Default)]
pub struct ClaimCoordinator {
    pending: HashMap<String, PendingClaim>,
}

impl ClaimCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate and record a claim code for a principal. At most one pending
    /// claim per principal; an expired leftover counts as absent and is
    /// replaced.
    pub fn request_claim(
        &mut self,
        principal: &str,
        now: DateTime<Utc>,
    ) -> Result<String, GatewayError> {
        if let Some(existing) = self.pending.get(principal) {
            if !existing.is_expired(now) {
                return Err(GatewayError::AlreadyPending);
            }
        }
        let code = generate_code();
        self.pending.insert(
            principal.to_string(),
            PendingClaim {
                code: code.clone(),
                issued_at: now,
            },
        );
        info!("issued claim code for principal {}", principal);
        Ok(code)
    }

    /// Whether the principal has an unexpired pending claim.
    pub fn has_pending(&self, principal: &str, now: DateTime<Utc>) -> bool {
        self.pending
            .get(principal)
            .map(|claim| !claim.is_expired(now))
            .unwrap_or(false)
    }

    /// Try to redeem an inbound mesh text as a claim code.
    ///
    /// The first pending claim whose code matches the trimmed text wins
    /// (codes are unique among pending claims) and is consumed; a second
    /// identical message finds nothing. Expired-but-unevicted claims are
    /// treated exactly like absent ones.
    pub fn match_code(
        &mut self,
        sender_node_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Option<ClaimCompleted> {
        let text = text.trim();
        let principal = self
            .pending
            .iter()
            .find(|(_, claim)| claim.code == text && !claim.is_expired(now))
            .map(|(principal, _)| principal.clone())?;
        self.pending.remove(&principal);
        info!(
            "claim completed: node {} bound to principal {}",
            sender_node_id, principal
        );
        Some(ClaimCompleted {
            principal,
            node_id: sender_node_id.to_string(),
        })
    }

    /// Evict expired claims to bound memory. Returns how many were dropped.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.pending.len();
        self.pending.retain(|principal, claim| {
            let keep = !claim.is_expired(now);
            if !keep {
                debug!("claim code for principal {} expired", principal);
            }
            keep
        });
        before - self.pending.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Eight lowercase hex characters; collision probability over the pending set
/// is negligible.
fn generate_code() -> String {
    let bytes: [u8; 4] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
