//! Interactive setup wizard.
//!
//! A per-principal finite-state machine that walks a user through claiming a
//! node and configuring preferences, driven by reaction events from the chat
//! platform. The engine is deliberately pure: handling an input returns a
//! list of [`WizardAction`]s describing what to send or persist, and the
//! server executes them. That keeps every transition unit-testable without a
//! transport and gives the server one place to handle delivery failures
//! (which always terminate the session).
//!
//! Steps mirror the guided flow: Welcome → ClaimOffer → AwaitingClaim →
//! Preferences → Commands. AwaitingClaim accepts no direct input; it resolves
//! when the claim completes, or falls back to ClaimOffer after the claim
//! window elapses.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use std::collections::HashMap;

use super::GatewayError;

/// Inactivity window after which a session expires, in seconds.
pub const SESSION_TTL_SECS: i64 = 1800;

/// How long a session waits in AwaitingClaim before re-offering, in seconds.
/// Matches the claim-code validity window.
pub const CLAIM_WAIT_SECS: i64 = super::claims::CLAIM_TTL_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Welcome,
    ClaimOffer,
    AwaitingClaim,
    Preferences,
    Commands,
}

/// Abstract wizard inputs, decoded from reaction emoji per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardInput {
    Advance,
    Back,
    Skip,
    Cancel,
    Yes,
    No,
    Finish,
    FinishWithHelp,
}

/// Short fixed notices the server renders and DMs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardNotice {
    Cancelled,
    SessionExpired,
    CodeExpired,
    ClaimConfirmed,
    SetupComplete,
}

/// What the server must do after a wizard transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardAction {
    /// DM the prompt for a step.
    Prompt(WizardStep),
    /// DM a fixed notice.
    Notice(WizardNotice),
    /// Ask the claim coordinator for a code and DM it; on success the server
    /// calls [`WizardEngine::begin_awaiting`].
    RequestClaim,
    /// Persist the principal's preference record.
    SavePreference { dm_notifications: bool },
    /// DM the full command reference.
    ShowFullHelp,
}

#[derive(Debug, Clone)]
pub struct WizardSession {
    pub step: WizardStep,
    pub node_claimed: bool,
    pub dm_notifications: bool,
    pub last_activity: DateTime<Utc>,
    awaiting_since: Option<DateTime<Utc>>,
}

impl WizardSession {
    fn new(now: DateTime<Utc>) -> Self {
        WizardSession {
            step: WizardStep::Welcome,
            node_claimed: false,
            dm_notifications: false,
            last_activity: now,
            awaiting_since: None,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.last_activity > Duration::seconds(SESSION_TTL_SECS)
    }
}

/// Decode a reaction emoji into an input for the given step. Emoji meaning is
/// step-dependent; anything unrecognized for the step is ignored.
fn decode_emoji(step: WizardStep, emoji: &str) -> Option<WizardInput> {
    match step {
        WizardStep::Welcome => match emoji {
            "➡️" => Some(WizardInput::Advance),
            "❌" => Some(WizardInput::Cancel),
            _ => None,
        },
        WizardStep::ClaimOffer => match emoji {
            "➡️" => Some(WizardInput::Advance),
            "⬅️" => Some(WizardInput::Back),
            "✅" => Some(WizardInput::Skip),
            "❌" => Some(WizardInput::Cancel),
            _ => None,
        },
        // Resolved externally; reactions are not processed.
        WizardStep::AwaitingClaim => None,
        WizardStep::Preferences => match emoji {
            "✅" => Some(WizardInput::Yes),
            "🔕" => Some(WizardInput::No),
            "⬅️" => Some(WizardInput::Back),
            "❌" => Some(WizardInput::Cancel),
            _ => None,
        },
        WizardStep::Commands => match emoji {
            "✅" => Some(WizardInput::FinishWithHelp),
            "🏁" => Some(WizardInput::Finish),
            "⬅️" => Some(WizardInput::Back),
            "❌" => Some(WizardInput::Cancel),
            _ => None,
        },
    }
}

/// Owns the wizard-session table; all access goes through its methods.
#[derive(Debug, Default)]
pub struct WizardEngine {
    sessions: HashMap<String, WizardSession>,
}

impl WizardEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for a principal. Fails if one is already active.
    pub fn start(
        &mut self,
        principal: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<WizardAction>, GatewayError> {
        if self.sessions.contains_key(principal) {
            return Err(GatewayError::AlreadyActive);
        }
        self.sessions
            .insert(principal.to_string(), WizardSession::new(now));
        info!("setup wizard started for principal {}", principal);
        Ok(vec![WizardAction::Prompt(WizardStep::Welcome)])
    }

    /// Handle a reaction from a principal. `owned_nodes` is the principal's
    /// current owned-node count (gates the Skip input). Returns the actions
    /// to execute; an empty vec means the input was ignored.
    pub fn handle_reaction(
        &mut self,
        principal: &str,
        emoji: &str,
        now: DateTime<Utc>,
        owned_nodes: usize,
    ) -> Vec<WizardAction> {
        let session = match self.sessions.get(principal) {
            Some(s) => s,
            None => return Vec::new(),
        };

        // Expiry short-circuit: checked before any input processing,
        // independent of state.
        if session.is_expired(now) {
            self.sessions.remove(principal);
            info!("setup session for principal {} expired", principal);
            return vec![WizardAction::Notice(WizardNotice::SessionExpired)];
        }

        let step = session.step;
        let input = match decode_emoji(step, emoji) {
            Some(i) => i,
            None => {
                debug!(
                    "ignoring reaction {} for principal {} at step {:?}",
                    emoji, principal, step
                );
                return Vec::new();
            }
        };

        if input == WizardInput::Cancel {
            self.sessions.remove(principal);
            info!("principal {} cancelled setup wizard", principal);
            return vec![WizardAction::Notice(WizardNotice::Cancelled)];
        }

        match (step, input) {
            (WizardStep::Welcome, WizardInput::Advance) => {
                self.transition(principal, WizardStep::ClaimOffer, now)
            }
            (WizardStep::ClaimOffer, WizardInput::Back) => {
                self.transition(principal, WizardStep::Welcome, now)
            }
            (WizardStep::ClaimOffer, WizardInput::Advance) => {
                // State is unchanged until the claim request succeeds; the
                // server confirms via begin_awaiting.
                self.touch(principal, now);
                vec![WizardAction::RequestClaim]
            }
            (WizardStep::ClaimOffer, WizardInput::Skip) if owned_nodes >= 1 => {
                if let Some(s) = self.sessions.get_mut(principal) {
                    s.node_claimed = true;
                }
                self.transition(principal, WizardStep::Preferences, now)
            }
            (WizardStep::Preferences, WizardInput::Back) => {
                self.transition(principal, WizardStep::ClaimOffer, now)
            }
            (WizardStep::Preferences, yes_no @ (WizardInput::Yes | WizardInput::No)) => {
                if let Some(s) = self.sessions.get_mut(principal) {
                    s.dm_notifications = yes_no == WizardInput::Yes;
                }
                self.transition(principal, WizardStep::Commands, now)
            }
            (WizardStep::Commands, WizardInput::Back) => {
                self.transition(principal, WizardStep::Preferences, now)
            }
            (WizardStep::Commands, WizardInput::Finish) => {
                let dm = self.finish(principal);
                vec![
                    WizardAction::SavePreference {
                        dm_notifications: dm,
                    },
                    WizardAction::Notice(WizardNotice::SetupComplete),
                ]
            }
            (WizardStep::Commands, WizardInput::FinishWithHelp) => {
                let dm = self.finish(principal);
                vec![
                    WizardAction::SavePreference {
                        dm_notifications: dm,
                    },
                    WizardAction::ShowFullHelp,
                ]
            }
            _ => Vec::new(),
        }
    }

    /// Confirm a successful claim request: the session enters AwaitingClaim.
    pub fn begin_awaiting(&mut self, principal: &str, now: DateTime<Utc>) {
        if let Some(session) = self.sessions.get_mut(principal) {
            session.step = WizardStep::AwaitingClaim;
            session.awaiting_since = Some(now);
            session.last_activity = now;
        }
    }

    /// External resolution of AwaitingClaim: the principal's claim completed.
    /// Also records the claim on a session parked at any other step.
    pub fn claim_completed(&mut self, principal: &str, now: DateTime<Utc>) -> Vec<WizardAction> {
        let session = match self.sessions.get_mut(principal) {
            Some(s) => s,
            None => return Vec::new(),
        };
        session.node_claimed = true;
        if session.step != WizardStep::AwaitingClaim {
            return Vec::new();
        }
        session.step = WizardStep::Preferences;
        session.awaiting_since = None;
        session.last_activity = now;
        vec![
            WizardAction::Notice(WizardNotice::ClaimConfirmed),
            WizardAction::Prompt(WizardStep::Preferences),
        ]
    }

    /// Housekeeping: sessions that waited out the claim window fall back to
    /// the claim offer with a "code expired" notice. Returns per-principal
    /// actions for the server to execute.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<(String, Vec<WizardAction>)> {
        let timed_out: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, s)| {
                s.step == WizardStep::AwaitingClaim
                    && s.awaiting_since
                        .map(|since| now - since >= Duration::seconds(CLAIM_WAIT_SECS))
                        .unwrap_or(false)
            })
            .map(|(principal, _)| principal.clone())
            .collect();

        timed_out
            .into_iter()
            .map(|principal| {
                let mut actions = vec![WizardAction::Notice(WizardNotice::CodeExpired)];
                if let Some(session) = self.sessions.get_mut(&principal) {
                    session.step = WizardStep::ClaimOffer;
                    session.awaiting_since = None;
                    session.last_activity = now;
                }
                actions.push(WizardAction::Prompt(WizardStep::ClaimOffer));
                (principal, actions)
            })
            .collect()
    }

    /// Remove a session unconditionally (cancellation path for delivery
    /// failures and processing errors). Returns whether one existed.
    pub fn terminate(&mut self, principal: &str) -> bool {
        self.sessions.remove(principal).is_some()
    }

    pub fn is_active(&self, principal: &str) -> bool {
        self.sessions.contains_key(principal)
    }

    pub fn session(&self, principal: &str) -> Option<&WizardSession> {
        self.sessions.get(principal)
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    fn transition(
        &mut self,
        principal: &str,
        step: WizardStep,
        now: DateTime<Utc>,
    ) -> Vec<WizardAction> {
        if let Some(session) = self.sessions.get_mut(principal) {
            session.step = step;
            session.last_activity = now;
        }
        vec![WizardAction::Prompt(step)]
    }

    fn touch(&mut self, principal: &str, now: DateTime<Utc>) {
        if let Some(session) = self.sessions.get_mut(principal) {
            session.last_activity = now;
        }
    }

    fn finish(&mut self, principal: &str) -> bool {
        self.sessions
            .remove(principal)
            .map(|s| s.dm_notifications)
            .unwrap_or(false)
    }
}
