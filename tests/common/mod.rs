//! Shared fixtures for gateway integration tests: recording transports and a
//! config pointed at a temp data directory.
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use meshgate::chat::{ChatEvent, ChatTransport};
use meshgate::config::Config;
use meshgate::mesh::{Destination, MeshTransport, NodeSnapshot};

/// Shared view into everything a [`RecordingChat`] sent. Clone it before
/// boxing the transport into the server.
#[derive(Clone, Default)]
pub struct ChatLog {
    inner: Arc<Mutex<ChatLogInner>>,
}

#[derive(Default)]
struct ChatLogInner {
    dms: Vec<(String, String)>,
    channel_messages: Vec<(String, String)>,
    roles_granted: Vec<(String, String)>,
    roles_revoked: Vec<(String, String)>,
    fail_dms_to: Option<String>,
}

impl ChatLog {
    pub fn dms(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().dms.clone()
    }

    pub fn dms_to(&self, principal: &str) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .dms
            .iter()
            .filter(|(p, _)| p == principal)
            .map(|(_, content)| content.clone())
            .collect()
    }

    pub fn channel_messages(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().channel_messages.clone()
    }

    pub fn roles_granted(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().roles_granted.clone()
    }

    pub fn roles_revoked(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().roles_revoked.clone()
    }

    pub fn fail_dms_to(&self, principal: &str) {
        self.inner.lock().unwrap().fail_dms_to = Some(principal.to_string());
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.dms.clear();
        inner.channel_messages.clear();
    }
}

pub struct RecordingChat {
    pub log: ChatLog,
}

impl RecordingChat {
    pub fn new() -> (Self, ChatLog) {
        let log = ChatLog::default();
        (RecordingChat { log: log.clone() }, log)
    }
}

#[async_trait]
impl ChatTransport for RecordingChat {
    async fn send_direct_message(&mut self, principal: &str, content: &str) -> Result<()> {
        let mut inner = self.log.inner.lock().unwrap();
        if inner.fail_dms_to.as_deref() == Some(principal) {
            anyhow::bail!("dm blocked");
        }
        inner.dms.push((principal.to_string(), content.to_string()));
        Ok(())
    }

    async fn send_channel_message(&mut self, channel_id: &str, content: &str) -> Result<()> {
        self.log
            .inner
            .lock()
            .unwrap()
            .channel_messages
            .push((channel_id.to_string(), content.to_string()));
        Ok(())
    }

    async fn grant_role(&mut self, principal: &str, role_id: &str) -> Result<()> {
        self.log
            .inner
            .lock()
            .unwrap()
            .roles_granted
            .push((principal.to_string(), role_id.to_string()));
        Ok(())
    }

    async fn revoke_role(&mut self, principal: &str, role_id: &str) -> Result<()> {
        self.log
            .inner
            .lock()
            .unwrap()
            .roles_revoked
            .push((principal.to_string(), role_id.to_string()));
        Ok(())
    }
}

/// Shared view into what a [`ScriptedMesh`] sent.
#[derive(Clone, Default)]
pub struct MeshLog {
    sent: Arc<Mutex<Vec<(String, Destination, u8)>>>,
}

impl MeshLog {
    pub fn sent(&self) -> Vec<(String, Destination, u8)> {
        self.sent.lock().unwrap().clone()
    }
}

/// A mesh transport with a scripted node database and a send recorder.
pub struct ScriptedMesh {
    pub nodes: HashMap<String, NodeSnapshot>,
    pub local: Option<NodeSnapshot>,
    pub log: MeshLog,
}

impl ScriptedMesh {
    pub fn new() -> (Self, MeshLog) {
        let log = MeshLog::default();
        (
            ScriptedMesh {
                nodes: HashMap::new(),
                local: None,
                log: log.clone(),
            },
            log,
        )
    }

    pub fn with_node(mut self, node_id: &str, long_name: &str) -> Self {
        self.nodes.insert(
            node_id.to_string(),
            NodeSnapshot {
                node_id: node_id.to_string(),
                long_name: long_name.to_string(),
                ..Default::default()
            },
        );
        self
    }
}

#[async_trait]
impl MeshTransport for ScriptedMesh {
    async fn send_text(&mut self, text: &str, dest: Destination, channel_index: u8) -> Result<()> {
        self.log
            .sent
            .lock()
            .unwrap()
            .push((text.to_string(), dest, channel_index));
        Ok(())
    }

    fn node_exists(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    fn node_snapshot(&self, node_id: &str) -> Option<NodeSnapshot> {
        self.nodes.get(node_id).cloned()
    }

    fn all_nodes(&self) -> Vec<NodeSnapshot> {
        self.nodes.values().cloned().collect()
    }

    fn my_node(&self) -> Option<NodeSnapshot> {
        self.local.clone()
    }

    async fn reboot(&mut self, _delay_secs: u32) -> Result<()> {
        Ok(())
    }
}

pub fn test_config(data_dir: &str) -> Config {
    let mut config = Config::default();
    config.gateway.name = "Test Gateway".to_string();
    config.chat.mesh_channel_id = "mesh-chan".to_string();
    config.chat.node_channel_id = "node-chan".to_string();
    config.chat.admin_log_channel_id = Some("admin-chan".to_string());
    config.chat.admin_role_id = "role-admin".to_string();
    config.chat.node_owner_role_id = "role-owner".to_string();
    config.storage.data_dir = data_dir.to_string();
    config
}

pub fn interaction(principal: &str, is_admin: bool, command: &str, args: &[&str]) -> ChatEvent {
    ChatEvent::Interaction {
        principal: principal.to_string(),
        is_admin,
        command: command.to_string(),
        args: args.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn reaction(principal: &str, emoji: &str) -> ChatEvent {
    ChatEvent::Reaction {
        principal: principal.to_string(),
        emoji: emoji.to_string(),
    }
}
