//! Gateway server and event loop.
//!
//! [`GatewayServer`] owns every stateful component (claim coordinator, wizard
//! engine, alert scheduler, relay router, storage) and multiplexes all inputs
//! on a single task: mesh events, chat events, the one-minute alert tick, the
//! housekeeping tick, and ctrl-c. Because nothing else touches the state,
//! every handler gets `&mut self` with no further locking.
//!
//! Handlers are public and take `now` as a parameter so integration tests can
//! drive the server without a clock or a radio.

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::sync::mpsc;

use super::alerts::AlertScheduler;
use super::claims::{ClaimCompleted, ClaimCoordinator};
use super::commands::{full_help, Command, MessageFilter};
use super::relay::RelayRouter;
use super::wizard::{WizardAction, WizardEngine, WizardNotice, WizardStep};
use super::GatewayError;
use crate::chat::{ChatEvent, ChatTransport};
use crate::config::Config;
use crate::logutil::escape_log;
use crate::mesh::{MeshEvent, MeshTransport, NodeSnapshot};
use crate::storage::{Alert, MessageLogEntry, Storage};

/// How many entries `filtermessages` renders.
const FILTER_RENDER_LIMIT: usize = 5;

pub struct GatewayServer {
    config: Config,
    storage: Storage,
    claims: ClaimCoordinator,
    wizard: WizardEngine,
    scheduler: AlertScheduler,
    relay: RelayRouter,
    chat: Box<dyn ChatTransport>,
    mesh: Option<Box<dyn MeshTransport>>,
    mesh_rx: Option<mpsc::UnboundedReceiver<MeshEvent>>,
    chat_rx: Option<mpsc::UnboundedReceiver<ChatEvent>>,
    awaiting_reboot: bool,
}

impl GatewayServer {
    /// Create a server from configuration with a chat transport attached. The
    /// mesh transport and the inbound event channels are attached separately.
    pub async fn new(config: Config, chat: Box<dyn ChatTransport>) -> Result<Self> {
        let storage = Storage::new_with_limits(
            &config.storage.data_dir,
            config.storage.max_message_log_bytes,
            config.storage.max_preferences_bytes,
        )
        .await?;
        let scheduler = AlertScheduler::new(&config.chat.mesh_channel_id, config.mesh.channel);
        let relay = RelayRouter::new(&config.chat.mesh_channel_id, &config.chat.node_channel_id);
        Ok(GatewayServer {
            config,
            storage,
            claims: ClaimCoordinator::new(),
            wizard: WizardEngine::new(),
            scheduler,
            relay,
            chat,
            mesh: None,
            mesh_rx: None,
            chat_rx: None,
            awaiting_reboot: false,
        })
    }

    pub fn attach_mesh(
        &mut self,
        transport: Box<dyn MeshTransport>,
        rx: mpsc::UnboundedReceiver<MeshEvent>,
    ) {
        self.mesh = Some(transport);
        self.mesh_rx = Some(rx);
    }

    pub fn attach_chat_events(&mut self, rx: mpsc::UnboundedReceiver<ChatEvent>) {
        self.chat_rx = Some(rx);
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Run until ctrl-c. Handler errors are logged; they never stop the loop.
    pub async fn run(&mut self) -> Result<()> {
        info!("gateway '{}' started", self.config.gateway.name);
        self.announce_startup().await;

        let mut alert_tick = tokio::time::interval(Duration::from_secs(60));
        alert_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut housekeeping_tick = tokio::time::interval(Duration::from_secs(5));
        housekeeping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = alert_tick.tick() => {
                    if let Err(e) = self.run_alert_tick(Utc::now()).await {
                        warn!("alert tick error: {}", e);
                    }
                }

                _ = housekeeping_tick.tick() => {
                    self.run_housekeeping(Utc::now()).await;
                }

                event = async {
                    if let Some(ref mut rx) = self.mesh_rx {
                        rx.recv().await
                    } else {
                        std::future::pending().await
                    }
                } => {
                    if let Some(event) = event {
                        if let Err(e) = self.handle_mesh_event(event, Utc::now()).await {
                            warn!("mesh event error: {:?}", e);
                        }
                    } else {
                        warn!("mesh event channel closed");
                        self.mesh_rx = None;
                    }
                }

                event = async {
                    if let Some(ref mut rx) = self.chat_rx {
                        rx.recv().await
                    } else {
                        std::future::pending().await
                    }
                } => {
                    if let Some(event) = event {
                        if let Err(e) = self.handle_chat_event(event, Utc::now()).await {
                            warn!("chat event error: {:?}", e);
                        }
                    } else {
                        warn!("chat event channel closed");
                        self.chat_rx = None;
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("received shutdown signal");
                    break;
                }
            }
        }
        Ok(())
    }

    pub async fn run_alert_tick(&mut self, now: DateTime<Utc>) -> Result<()> {
        let fired = self
            .scheduler
            .run_tick(
                &self.storage,
                self.chat.as_mut(),
                self.mesh.as_deref_mut(),
                now,
            )
            .await?;
        if fired > 0 {
            debug!("alert tick fired {} alert(s)", fired);
        }
        Ok(())
    }

    /// Periodic maintenance: evict expired claim codes, time out sessions
    /// stuck waiting for a claim, and watch for the radio coming back after
    /// an admin reboot.
    pub async fn run_housekeeping(&mut self, now: DateTime<Utc>) {
        let evicted = self.claims.sweep_expired(now);
        if evicted > 0 {
            debug!("evicted {} expired claim code(s)", evicted);
        }

        for (principal, actions) in self.wizard.sweep(now) {
            self.execute_wizard_actions(&principal, actions, now).await;
        }

        if self.awaiting_reboot {
            let back = self
                .mesh
                .as_deref()
                .and_then(|m| m.my_node())
                .is_some();
            if back {
                self.awaiting_reboot = false;
                info!("radio reconnected after reboot");
                if let Some(channel) = self.config.chat.admin_log_channel_id.clone() {
                    if let Err(e) = self
                        .chat
                        .send_channel_message(&channel, "📻 Radio back online after reboot")
                        .await
                    {
                        warn!("reboot recovery notice failed: {}", e);
                    }
                }
            }
        }
    }

    pub async fn handle_mesh_event(&mut self, event: MeshEvent, now: DateTime<Utc>) -> Result<()> {
        match event {
            MeshEvent::Text(packet) => {
                // Claim codes are consumed before the packet can reach the
                // relay, so they never land in the public channel or the log.
                if let Some(done) = self.claims.match_code(&packet.from_node_id, &packet.text, now)
                {
                    self.complete_claim(done, now).await?;
                    return Ok(());
                }
                self.relay
                    .relay_text(&self.storage, self.chat.as_mut(), &packet, now)
                    .await?;
            }
            MeshEvent::NodeUpdated { node_id } => {
                if let Some(mesh) = self.mesh.as_deref() {
                    self.relay
                        .announce_node(&self.storage, self.chat.as_mut(), mesh, &node_id)
                        .await?;
                }
            }
        }
        Ok(())
    }

    pub async fn handle_chat_event(&mut self, event: ChatEvent, now: DateTime<Utc>) -> Result<()> {
        match event {
            ChatEvent::Interaction {
                principal,
                is_admin,
                command,
                args,
            } => {
                let parsed = match Command::parse(&command, &args) {
                    Ok(cmd) => cmd,
                    Err(usage) => {
                        self.dm(&principal, &usage).await;
                        return Ok(());
                    }
                };
                if parsed.requires_admin() && !is_admin {
                    debug!("principal {} denied admin command {}", principal, command);
                    self.dm(&principal, "⛔ That command requires the admin role.")
                        .await;
                    return Ok(());
                }
                self.dispatch(&principal, parsed, now).await
            }
            ChatEvent::Reaction { principal, emoji } => {
                if !self.wizard.is_active(&principal) {
                    return Ok(());
                }
                let owned = self.storage.nodes_owned_by(&principal).await?.len();
                let actions = self.wizard.handle_reaction(&principal, &emoji, now, owned);
                self.execute_wizard_actions(&principal, actions, now).await;
                Ok(())
            }
        }
    }

    async fn dispatch(
        &mut self,
        principal: &str,
        command: Command,
        now: DateTime<Utc>,
    ) -> Result<()> {
        match command {
            Command::ClaimNode => match self.claims.request_claim(principal, now) {
                Ok(code) => {
                    let text = claim_instructions(&code);
                    if self.chat.send_direct_message(principal, &text).await.is_err() {
                        warn!("claim code DM to {} failed", principal);
                    }
                }
                Err(e) => self.dm(principal, &e.to_string()).await,
            },
            Command::ReleaseNode { node_id } => {
                let reply = self.release_node(principal, &node_id, false).await?;
                self.dm(principal, &reply).await;
            }
            Command::OwnedNodes => {
                let owned = self.storage.nodes_owned_by(principal).await?;
                let reply = if owned.is_empty() {
                    "You don't own any nodes yet. Use `claimnode` to pair one.".to_string()
                } else {
                    let mut lines = vec!["**Your nodes**".to_string()];
                    for node_id in owned {
                        let name = self.storage.node_display_name(&node_id).await?;
                        lines.push(format!("• **{}** (`{}`)", name, node_id));
                    }
                    lines.join("\n")
                };
                self.dm(principal, &reply).await;
            }
            Command::NodeInfo { node_id } => {
                let reply = self.render_node_info(&node_id).await?;
                self.dm(principal, &reply).await;
            }
            Command::Setup => match self.wizard.start(principal, now) {
                Ok(actions) => self.execute_wizard_actions(principal, actions, now).await,
                Err(e) => self.dm(principal, &e.to_string()).await,
            },
            Command::Help => self.dm(principal, &full_help()).await,
            Command::ListAlerts => {
                let alerts = self.storage.load_alerts().await?;
                let reply = render_alerts(&alerts);
                self.dm(principal, &reply).await;
            }
            Command::FilterMessages { filter } => {
                let reply = self.render_filtered_messages(principal, &filter).await?;
                self.dm(principal, &reply).await;
            }
            Command::MeshtasticStatus => {
                let reply = self.render_mesh_status().await?;
                self.dm(principal, &reply).await;
            }
            Command::About => {
                let reply = self.render_about().await?;
                self.dm(principal, &reply).await;
            }
            Command::Alert {
                frequency,
                sinks,
                message,
            } => {
                self.storage
                    .push_alert(Alert {
                        message: message.clone(),
                        frequency,
                        to_chat: sinks.to_chat(),
                        to_mesh: sinks.to_mesh(),
                        next_run: now,
                    })
                    .await?;
                info!(
                    "alert scheduled ({}) by {}: {}",
                    frequency.as_str(),
                    principal,
                    escape_log(&message)
                );
                self.dm(
                    principal,
                    &format!("✅ {} alert scheduled.", frequency.as_str()),
                )
                .await;
            }
            Command::DeleteAlert { index } => {
                let mut alerts = self.storage.load_alerts().await?;
                if index >= alerts.len() {
                    self.dm(
                        principal,
                        &GatewayError::NotFound(format!("alert {}", index)).to_string(),
                    )
                    .await;
                } else {
                    let removed = alerts.remove(index);
                    self.storage.save_alerts(&alerts).await?;
                    self.dm(
                        principal,
                        &format!("🗑️ Deleted alert: {}", removed.message),
                    )
                    .await;
                }
            }
            Command::ClearAlerts => {
                self.storage.save_alerts(&[]).await?;
                self.dm(principal, "🗑️ All alerts cleared.").await;
            }
            Command::AddNode { node_id, principal: new_owner } => {
                self.storage.set_owner(&node_id, &new_owner).await?;
                let role = self.config.chat.node_owner_role_id.clone();
                if let Err(e) = self.chat.grant_role(&new_owner, &role).await {
                    warn!("role grant to {} failed: {}", new_owner, e);
                }
                info!("admin {} bound node {} to {}", principal, node_id, new_owner);
                self.dm(
                    principal,
                    &format!("✅ Node `{}` bound to {}.", node_id, new_owner),
                )
                .await;
            }
            Command::RemoveNode { node_id } => {
                let reply = self.release_node(principal, &node_id, true).await?;
                self.dm(principal, &reply).await;
            }
            Command::Ack { node_id, message } => {
                let channel = self.config.mesh.channel;
                let result = self
                    .relay
                    .send_ack(self.mesh.as_deref_mut(), &node_id, &message, channel)
                    .await;
                let reply = match result {
                    Ok(()) => format!("✅ Ack sent to `{}`.", node_id),
                    Err(e) => e.to_string(),
                };
                self.dm(principal, &reply).await;
            }
            Command::Broadcast { channel_index, message } => {
                let result = self
                    .relay
                    .send_broadcast(self.mesh.as_deref_mut(), &message, channel_index)
                    .await;
                let reply = match result {
                    Ok(()) => format!("📢 Broadcast sent on channel {}.", channel_index),
                    Err(e) => e.to_string(),
                };
                self.dm(principal, &reply).await;
            }
            Command::Reboot { delay_secs } => {
                let reply = match self.mesh.as_deref_mut() {
                    Some(mesh) => match mesh.reboot(delay_secs).await {
                        Ok(()) => {
                            self.awaiting_reboot = true;
                            info!("reboot requested by {} ({}s delay)", principal, delay_secs);
                            format!("♻️ Radio rebooting in {}s; I'll announce when it's back.", delay_secs)
                        }
                        Err(e) => {
                            error!("reboot request failed: {}", e);
                            GatewayError::TransportUnavailable.to_string()
                        }
                    },
                    None => GatewayError::TransportUnavailable.to_string(),
                };
                self.dm(principal, &reply).await;
            }
        }
        Ok(())
    }

    /// Claim redemption side effects: persist ownership, grant the owner
    /// role, confirm to the owner, announce on the mesh channel, and advance
    /// any wizard session that was waiting on it.
    async fn complete_claim(&mut self, done: ClaimCompleted, now: DateTime<Utc>) -> Result<()> {
        self.storage.set_owner(&done.node_id, &done.principal).await?;

        let role = self.config.chat.node_owner_role_id.clone();
        if let Err(e) = self.chat.grant_role(&done.principal, &role).await {
            warn!("role grant to {} failed: {}", done.principal, e);
        }

        let snapshot = self
            .mesh
            .as_deref()
            .and_then(|m| m.node_snapshot(&done.node_id));
        if let Some(ref snap) = snapshot {
            if !snap.long_name.is_empty() {
                self.storage.upsert_node(&done.node_id, &snap.long_name).await?;
            }
        }
        let display_name = self.storage.node_display_name(&done.node_id).await?;

        self.dm(
            &done.principal,
            &format!(
                "🎉 Node **{}** (`{}`) is now yours.",
                display_name, done.node_id
            ),
        )
        .await;

        let channel = self.config.chat.mesh_channel_id.clone();
        let announcement = format!(
            "🔗 **{}** (`{}`) was claimed by {}.",
            display_name, done.node_id, done.principal
        );
        if let Err(e) = self.chat.send_channel_message(&channel, &announcement).await {
            warn!("claim announcement failed: {}", e);
        }

        let actions = self.wizard.claim_completed(&done.principal, now);
        self.execute_wizard_actions(&done.principal, actions, now)
            .await;
        Ok(())
    }

    /// Execute wizard actions for a principal. A failed DM terminates the
    /// session: the principal has no way to see further prompts.
    async fn execute_wizard_actions(
        &mut self,
        principal: &str,
        actions: Vec<WizardAction>,
        now: DateTime<Utc>,
    ) {
        for action in actions {
            match action {
                WizardAction::Prompt(step) => {
                    let text = match step {
                        // The claim offer reminds the principal what they
                        // already own, which is what makes Skip meaningful.
                        WizardStep::ClaimOffer => {
                            let owned = self
                                .storage
                                .nodes_owned_by(principal)
                                .await
                                .map(|nodes| nodes.len())
                                .unwrap_or(0);
                            format!("{}\nYou currently own {} node(s).", wizard_prompt(step), owned)
                        }
                        _ => wizard_prompt(step).to_string(),
                    };
                    if self
                        .chat
                        .send_direct_message(principal, &text)
                        .await
                        .is_err()
                    {
                        warn!("wizard prompt DM to {} failed; terminating session", principal);
                        self.wizard.terminate(principal);
                        return;
                    }
                }
                WizardAction::Notice(notice) => {
                    self.dm(principal, notice_text(notice)).await;
                }
                WizardAction::RequestClaim => match self.claims.request_claim(principal, now) {
                    Ok(code) => {
                        if self
                            .chat
                            .send_direct_message(principal, &claim_instructions(&code))
                            .await
                            .is_err()
                        {
                            warn!("claim code DM to {} failed; terminating session", principal);
                            self.wizard.terminate(principal);
                            return;
                        }
                        self.wizard.begin_awaiting(principal, now);
                    }
                    Err(e) => self.dm(principal, &e.to_string()).await,
                },
                WizardAction::SavePreference { dm_notifications } => {
                    if let Err(e) = self.storage.set_preference(principal, dm_notifications).await
                    {
                        error!("saving preference for {} failed: {}", principal, e);
                    }
                }
                WizardAction::ShowFullHelp => {
                    self.dm(principal, &full_help()).await;
                }
            }
        }
    }

    /// Shared by `releasenode` (owner-initiated) and admin `removenode`.
    async fn release_node(
        &mut self,
        principal: &str,
        node_id: &str,
        admin: bool,
    ) -> Result<String> {
        let owner = match self.storage.owner_of(node_id).await? {
            Some(owner) => owner,
            None => return Ok(GatewayError::NotFound(format!("node {}", node_id)).to_string()),
        };
        if !admin && owner != principal {
            return Ok(GatewayError::NotFound(format!("node {}", node_id)).to_string());
        }

        self.storage.remove_owner(node_id).await?;
        if self.storage.nodes_owned_by(&owner).await?.is_empty() {
            let role = self.config.chat.node_owner_role_id.clone();
            if let Err(e) = self.chat.revoke_role(&owner, &role).await {
                warn!("role revoke from {} failed: {}", owner, e);
            }
        }
        info!("node {} released from {}", node_id, owner);
        Ok(format!("✅ Node `{}` released.", node_id))
    }

    async fn render_node_info(&self, node_id: &str) -> Result<String> {
        let registered = self.storage.node_display_name(node_id).await?;
        match self.mesh.as_deref().and_then(|m| m.node_snapshot(node_id)) {
            Some(snap) => Ok(render_snapshot(&snap)),
            None => {
                if registered == "Unknown" {
                    Ok(GatewayError::NotFound(format!("node {}", node_id)).to_string())
                } else {
                    Ok(format!(
                        "**{}** (`{}`)\nNot currently visible on the mesh.",
                        registered, node_id
                    ))
                }
            }
        }
    }

    async fn render_filtered_messages(
        &self,
        principal: &str,
        filter: &MessageFilter,
    ) -> Result<String> {
        let messages = self.storage.load_messages().await?;
        let node_ids: Vec<String> = match filter {
            MessageFilter::Node(node_id) => vec![node_id.clone()],
            MessageFilter::Owner(owner) => self.storage.nodes_owned_by(owner).await?,
            MessageFilter::Mine => self.storage.nodes_owned_by(principal).await?,
        };

        let matching: Vec<&MessageLogEntry> = messages
            .iter()
            .filter(|m| node_ids.contains(&m.node_id))
            .collect();
        if matching.is_empty() {
            return Ok("No matching messages.".to_string());
        }

        let mut lines = vec!["**Recent messages**".to_string()];
        let start = matching.len().saturating_sub(FILTER_RENDER_LIMIT);
        for entry in &matching[start..] {
            let name = self.storage.node_display_name(&entry.node_id).await?;
            lines.push(format!(
                "`{}` **{}**: {}",
                entry.timestamp.format("%Y-%m-%d %H:%M"),
                name,
                entry.text
            ));
        }
        Ok(lines.join("\n"))
    }

    /// Radio and network health. Also refreshes the registry from the
    /// transport's node list so display names stay current.
    async fn render_mesh_status(&self) -> Result<String> {
        let mesh = match self.mesh.as_deref() {
            Some(mesh) => mesh,
            None => return Ok("📻 Radio: ❌ not connected".to_string()),
        };
        let nodes = mesh.all_nodes();
        for node in &nodes {
            if !node.long_name.is_empty() {
                self.storage.upsert_node(&node.node_id, &node.long_name).await?;
            }
        }
        let local = mesh.my_node();
        let connected = nodes.len() > 1;
        Ok(format!(
            "📻 Radio: {}\n🌐 Mesh network: {}\n🗺️ Known nodes: {}",
            if local.is_some() { "✅ online" } else { "❌ unresponsive" },
            if connected { "✅ connected" } else { "⚠️ no peers heard" },
            nodes.len()
        ))
    }

    async fn render_about(&self) -> Result<String> {
        let about = self.storage.load_about().await?;
        let mut lines = vec![
            format!("**{}** v{}", self.config.gateway.name, about.version),
            format!("Contact: {}", if about.contact_info.is_empty() {
                &self.config.gateway.contact_info
            } else {
                &about.contact_info
            }),
        ];
        if about.network_size > 0 {
            lines.push(format!("Network size: {} nodes", about.network_size));
        }
        if !about.last_maintenance.is_empty() {
            lines.push(format!("Last maintenance: {}", about.last_maintenance));
        }
        if !about.custom_message.is_empty() {
            lines.push(about.custom_message.clone());
        }
        if let Some(snap) = self.mesh.as_deref().and_then(|m| m.my_node()) {
            lines.push(format!("Local node: {} (`{}`)", snap.long_name, snap.node_id));
        }
        Ok(lines.join("\n"))
    }

    async fn announce_startup(&mut self) {
        if let Some(channel) = self.config.chat.admin_log_channel_id.clone() {
            let notice = format!("🟢 {} online", self.config.gateway.name);
            if let Err(e) = self.chat.send_channel_message(&channel, &notice).await {
                warn!("startup announcement failed: {}", e);
            }
        }
    }

    /// DM with the failure logged and swallowed. Used for replies where a
    /// blocked inbox should not abort the surrounding operation.
    async fn dm(&mut self, principal: &str, content: &str) {
        if let Err(e) = self.chat.send_direct_message(principal, content).await {
            warn!("DM to {} failed: {}", principal, e);
        }
    }
}

fn claim_instructions(code: &str) -> String {
    format!(
        "🔑 Your pairing code is `{}`.\n\
         Send it as a text message from your radio within 5 minutes to claim the node.",
        code
    )
}

fn render_snapshot(snap: &NodeSnapshot) -> String {
    let mut lines = vec![format!("**{}** (`{}`)", snap.long_name, snap.node_id)];
    if !snap.short_name.is_empty() {
        lines.push(format!("Short name: {}", snap.short_name));
    }
    if !snap.hw_model.is_empty() {
        lines.push(format!("Hardware: {}", snap.hw_model));
    }
    if !snap.role.is_empty() {
        lines.push(format!("Role: {}", snap.role));
    }
    if let Some(battery) = snap.battery {
        lines.push(format!("🔋 {}%", battery));
    }
    if let Some(snr) = snap.snr {
        lines.push(format!("SNR: {:.1} dB", snr));
    }
    if let Some(last_heard) = snap.last_heard {
        lines.push(format!("Last heard: {}", last_heard.format("%Y-%m-%d %H:%M UTC")));
    }
    lines.join("\n")
}

fn render_alerts(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return "No alerts scheduled.".to_string();
    }
    let mut lines = vec!["**Scheduled alerts**".to_string()];
    for (index, alert) in alerts.iter().enumerate() {
        let sinks = match (alert.to_chat, alert.to_mesh) {
            (true, true) => "chat+mesh",
            (true, false) => "chat",
            (false, true) => "mesh",
            (false, false) => "none",
        };
        lines.push(format!(
            "{}. [{}] ({}) next {} - {}",
            index,
            alert.frequency.as_str(),
            sinks,
            alert.next_run.format("%Y-%m-%d %H:%M UTC"),
            alert.message
        ));
    }
    lines.join("\n")
}

fn wizard_prompt(step: WizardStep) -> &'static str {
    match step {
        WizardStep::Welcome => {
            "👋 **Welcome to gateway setup!**\n\
             I'll walk you through claiming your radio and picking your\n\
             notification preferences.\n\
             ➡️ continue • ❌ cancel"
        }
        WizardStep::ClaimOffer => {
            "📡 **Claim your node**\n\
             React ➡️ and I'll DM you a one-time pairing code to send from\n\
             your radio. Already claimed one? React ✅ to skip.\n\
             ➡️ get code • ✅ skip • ⬅️ back • ❌ cancel"
        }
        WizardStep::AwaitingClaim => {
            "⏳ Waiting for your pairing code from the mesh (valid 5 minutes)..."
        }
        WizardStep::Preferences => {
            "🔔 **Notifications**\n\
             Want a DM whenever your node sends a message?\n\
             ✅ yes • 🔕 no • ⬅️ back • ❌ cancel"
        }
        WizardStep::Commands => {
            "🧭 **Almost done**\n\
             React ✅ to finish and see the full command reference, or 🏁 to\n\
             just finish.\n\
             ✅ finish + help • 🏁 finish • ⬅️ back • ❌ cancel"
        }
    }
}

fn notice_text(notice: WizardNotice) -> &'static str {
    match notice {
        WizardNotice::Cancelled => "Setup cancelled. Run `setup` anytime to start over.",
        WizardNotice::SessionExpired => "Your setup session expired from inactivity. Run `setup` to start over.",
        WizardNotice::CodeExpired => "⌛ Your pairing code expired before a radio sent it.",
        WizardNotice::ClaimConfirmed => "✅ Pairing code received; your node is claimed!",
        WizardNotice::SetupComplete => "🎉 Setup complete. Use `help` to see what I can do.",
    }
}
