//! Setup wizard driven end-to-end through chat reactions and mesh events.

mod common;

use chrono::{Duration, Utc};
use common::*;
use meshgate::gateway::GatewayServer;
use meshgate::mesh::{self, MeshEvent, TextPacket};

async fn wizard_server() -> (tempfile::TempDir, GatewayServer, ChatLog) {
    let dir = tempfile::tempdir().unwrap();
    let (chat, log) = RecordingChat::new();
    let config = test_config(dir.path().to_str().unwrap());
    let mut server = GatewayServer::new(config, Box::new(chat)).await.unwrap();
    let (mesh, _mesh_log) = ScriptedMesh::new();
    let (_tx, rx) = mesh::event_channel();
    server.attach_mesh(Box::new(mesh.with_node("!c0de", "Balcony Node")), rx);
    (dir, server, log)
}

fn extract_code(dm: &str) -> String {
    let start = dm.find('`').unwrap() + 1;
    let end = dm[start..].find('`').unwrap() + start;
    dm[start..end].to_string()
}

#[tokio::test]
async fn full_walkthrough_with_claim() {
    let (_dir, mut server, log) = wizard_server().await;
    let now = Utc::now();

    server
        .handle_chat_event(interaction("alice", false, "setup", &[]), now)
        .await
        .unwrap();
    assert!(log.dms_to("alice")[0].contains("Welcome"));

    // Welcome -> claim offer
    server
        .handle_chat_event(reaction("alice", "➡️"), now)
        .await
        .unwrap();
    assert!(log.dms_to("alice")[1].contains("Claim your node"));

    // Request a pairing code
    server
        .handle_chat_event(reaction("alice", "➡️"), now)
        .await
        .unwrap();
    let code = extract_code(&log.dms_to("alice")[2]);

    // While waiting, reactions are inert (even cancel)
    server
        .handle_chat_event(reaction("alice", "❌"), now)
        .await
        .unwrap();
    assert_eq!(log.dms_to("alice").len(), 3);

    // The radio sends the code: claim confirmed, wizard moves to preferences
    server
        .handle_mesh_event(
            MeshEvent::Text(TextPacket {
                from_node_id: "!c0de".to_string(),
                text: code,
                snr: None,
                battery: None,
            }),
            now + Duration::seconds(30),
        )
        .await
        .unwrap();
    let dms = log.dms_to("alice");
    assert!(dms.iter().any(|d| d.contains("node is claimed")));
    assert!(dms.last().unwrap().contains("Notifications"));

    // Yes to DM notifications, then finish
    server
        .handle_chat_event(reaction("alice", "✅"), now + Duration::seconds(40))
        .await
        .unwrap();
    server
        .handle_chat_event(reaction("alice", "🏁"), now + Duration::seconds(50))
        .await
        .unwrap();

    assert!(log.dms_to("alice").last().unwrap().contains("Setup complete"));
    assert!(server
        .storage()
        .dm_notifications_enabled("alice")
        .await
        .unwrap());
    assert_eq!(
        server.storage().owner_of("!c0de").await.unwrap().as_deref(),
        Some("alice")
    );
}

#[tokio::test]
async fn idle_session_expires_after_half_hour() {
    let (_dir, mut server, log) = wizard_server().await;
    let now = Utc::now();

    server
        .handle_chat_event(interaction("alice", false, "setup", &[]), now)
        .await
        .unwrap();

    // 1801 seconds of silence, then any reaction
    server
        .handle_chat_event(reaction("alice", "➡️"), now + Duration::seconds(1801))
        .await
        .unwrap();
    assert!(log.dms_to("alice").last().unwrap().contains("expired"));

    // A fresh setup is allowed immediately
    server
        .handle_chat_event(
            interaction("alice", false, "setup", &[]),
            now + Duration::seconds(1802),
        )
        .await
        .unwrap();
    assert!(log.dms_to("alice").last().unwrap().contains("Welcome"));
}

#[tokio::test]
async fn second_setup_rejected_while_active() {
    let (_dir, mut server, log) = wizard_server().await;
    let now = Utc::now();

    server
        .handle_chat_event(interaction("alice", false, "setup", &[]), now)
        .await
        .unwrap();
    server
        .handle_chat_event(interaction("alice", false, "setup", &[]), now)
        .await
        .unwrap();
    assert!(log.dms_to("alice")[1].contains("already have an active setup"));
}

#[tokio::test]
async fn unclaimed_code_times_out_back_to_offer() {
    let (_dir, mut server, log) = wizard_server().await;
    let now = Utc::now();

    server
        .handle_chat_event(interaction("alice", false, "setup", &[]), now)
        .await
        .unwrap();
    server
        .handle_chat_event(reaction("alice", "➡️"), now)
        .await
        .unwrap();
    server
        .handle_chat_event(reaction("alice", "➡️"), now)
        .await
        .unwrap();
    assert!(log.dms_to("alice")[2].contains("pairing code"));

    // Housekeeping after the claim window: back to the claim offer
    server.run_housekeeping(now + Duration::seconds(300)).await;
    let dms = log.dms_to("alice");
    assert!(dms[3].contains("expired"));
    assert!(dms[4].contains("Claim your node"));

    // The session is still alive; cancel works again
    server
        .handle_chat_event(reaction("alice", "❌"), now + Duration::seconds(310))
        .await
        .unwrap();
    assert!(log.dms_to("alice").last().unwrap().contains("cancelled"));
}

#[tokio::test]
async fn skip_path_saves_preference_without_new_claim() {
    let (_dir, mut server, log) = wizard_server().await;
    let now = Utc::now();
    server.storage().set_owner("!c0de", "alice").await.unwrap();

    server
        .handle_chat_event(interaction("alice", false, "setup", &[]), now)
        .await
        .unwrap();
    server
        .handle_chat_event(reaction("alice", "➡️"), now)
        .await
        .unwrap();
    // Skip the claim step (alice already owns a node)
    server
        .handle_chat_event(reaction("alice", "✅"), now)
        .await
        .unwrap();
    assert!(log.dms_to("alice").last().unwrap().contains("Notifications"));

    server
        .handle_chat_event(reaction("alice", "🔕"), now)
        .await
        .unwrap();
    // Finish with the full command reference
    server
        .handle_chat_event(reaction("alice", "✅"), now)
        .await
        .unwrap();
    assert!(log.dms_to("alice").last().unwrap().contains("Gateway commands"));
    assert!(!server
        .storage()
        .dm_notifications_enabled("alice")
        .await
        .unwrap());
}

#[tokio::test]
async fn failed_prompt_delivery_terminates_session() {
    let (_dir, mut server, log) = wizard_server().await;
    let now = Utc::now();

    server
        .handle_chat_event(interaction("alice", false, "setup", &[]), now)
        .await
        .unwrap();
    log.fail_dms_to("alice");
    server
        .handle_chat_event(reaction("alice", "➡️"), now)
        .await
        .unwrap();

    // Session is gone: a later reaction produces nothing
    server
        .handle_chat_event(reaction("alice", "➡️"), now)
        .await
        .unwrap();
    assert_eq!(log.dms_to("alice").len(), 1);
}
