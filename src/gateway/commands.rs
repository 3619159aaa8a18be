//! Typed command surface.
//!
//! Chat interactions arrive as a command name plus string arguments; this
//! module parses them into a [`Command`] so the dispatcher works with typed
//! values. Parse errors are user-facing usage strings. Admin gating is
//! declared here ([`Command::requires_admin`]) and enforced by the
//! dispatcher against the `is_admin` capability the chat adapter supplies.

use crate::storage::Frequency;

/// Which sinks a scheduled alert fires to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSinks {
    Chat,
    Mesh,
    Both,
}

impl AlertSinks {
    pub fn to_chat(&self) -> bool {
        matches!(self, AlertSinks::Chat | AlertSinks::Both)
    }

    pub fn to_mesh(&self) -> bool {
        matches!(self, AlertSinks::Mesh | AlertSinks::Both)
    }
}

/// Message-log filter for `filtermessages`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageFilter {
    /// Messages from one node.
    Node(String),
    /// Messages from any node owned by a principal.
    Owner(String),
    /// Messages from the caller's own nodes.
    Mine,
}

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ClaimNode,
    ReleaseNode { node_id: String },
    OwnedNodes,
    NodeInfo { node_id: String },
    Setup,
    Help,
    ListAlerts,
    FilterMessages { filter: MessageFilter },
    MeshtasticStatus,
    About,
    Alert {
        frequency: Frequency,
        sinks: AlertSinks,
        message: String,
    },
    DeleteAlert { index: usize },
    ClearAlerts,
    AddNode { node_id: String, principal: String },
    RemoveNode { node_id: String },
    Ack { node_id: String, message: String },
    Broadcast { channel_index: u8, message: String },
    Reboot { delay_secs: u32 },
}

impl Command {
    /// Parse a command name and its arguments. Errors are usage strings
    /// suitable for sending straight back to the invoking principal.
    pub fn parse(name: &str, args: &[String]) -> Result<Command, String> {
        match name {
            "claimnode" => Ok(Command::ClaimNode),
            "releasenode" => {
                let node_id = one_arg(args, "usage: releasenode <node_id>")?;
                Ok(Command::ReleaseNode { node_id })
            }
            "ownednodes" => Ok(Command::OwnedNodes),
            "nodeinfo" => {
                let node_id = one_arg(args, "usage: nodeinfo <node_id>")?;
                Ok(Command::NodeInfo { node_id })
            }
            "setup" => Ok(Command::Setup),
            "help" => Ok(Command::Help),
            "listalerts" => Ok(Command::ListAlerts),
            "filtermessages" => {
                let filter = match args.first().map(String::as_str) {
                    None => MessageFilter::Mine,
                    Some(target) if target.starts_with('!') => {
                        MessageFilter::Node(target.to_string())
                    }
                    Some(target) => MessageFilter::Owner(target.to_string()),
                };
                Ok(Command::FilterMessages { filter })
            }
            "meshtastic_status" => Ok(Command::MeshtasticStatus),
            "about" => Ok(Command::About),
            "alert" => {
                if args.len() < 3 {
                    return Err(
                        "usage: alert <once|hourly|daily|weekly> <chat|mesh|both> <message>"
                            .to_string(),
                    );
                }
                let frequency = Frequency::parse(&args[0]).ok_or_else(|| {
                    format!("unknown frequency '{}'; use once, hourly, daily or weekly", args[0])
                })?;
                let sinks = match args[1].to_ascii_lowercase().as_str() {
                    "chat" => AlertSinks::Chat,
                    "mesh" => AlertSinks::Mesh,
                    "both" => AlertSinks::Both,
                    other => return Err(format!("unknown sink '{}'; use chat, mesh or both", other)),
                };
                Ok(Command::Alert {
                    frequency,
                    sinks,
                    message: args[2..].join(" "),
                })
            }
            "deletealert" => {
                let raw = one_arg(args, "usage: deletealert <index>")?;
                let index = raw
                    .parse::<usize>()
                    .map_err(|_| format!("'{}' is not a valid alert index", raw))?;
                Ok(Command::DeleteAlert { index })
            }
            "clearalerts" => Ok(Command::ClearAlerts),
            "addnode" => {
                if args.len() != 2 {
                    return Err("usage: addnode <node_id> <principal>".to_string());
                }
                Ok(Command::AddNode {
                    node_id: args[0].clone(),
                    principal: args[1].clone(),
                })
            }
            "removenode" => {
                let node_id = one_arg(args, "usage: removenode <node_id>")?;
                Ok(Command::RemoveNode { node_id })
            }
            "ack" => {
                if args.is_empty() {
                    return Err("usage: ack <node_id> [message]".to_string());
                }
                let message = if args.len() > 1 {
                    args[1..].join(" ")
                } else {
                    "ACK".to_string()
                };
                Ok(Command::Ack {
                    node_id: args[0].clone(),
                    message,
                })
            }
            "broadcast" => {
                if args.len() < 2 {
                    return Err("usage: broadcast <channel 0-7> <message>".to_string());
                }
                let channel_index = args[0]
                    .parse::<u8>()
                    .map_err(|_| format!("'{}' is not a valid channel index", args[0]))?;
                Ok(Command::Broadcast {
                    channel_index,
                    message: args[1..].join(" "),
                })
            }
            "reboot" => {
                let delay_secs = match args.first() {
                    Some(raw) => raw
                        .parse::<u32>()
                        .map_err(|_| format!("'{}' is not a valid delay in seconds", raw))?,
                    None => 10,
                };
                Ok(Command::Reboot { delay_secs })
            }
            other => Err(format!("unknown command '{}'", other)),
        }
    }

    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::Alert { .. }
                | Command::DeleteAlert { .. }
                | Command::ClearAlerts
                | Command::AddNode { .. }
                | Command::RemoveNode { .. }
                | Command::Ack { .. }
                | Command::Broadcast { .. }
                | Command::Reboot { .. }
        )
    }
}

fn one_arg(args: &[String], usage: &str) -> Result<String, String> {
    if args.len() == 1 {
        Ok(args[0].clone())
    } else {
        Err(usage.to_string())
    }
}

/// Full command reference, DMed by `help` and at the end of the setup wizard.
pub fn full_help() -> String {
    "**Gateway commands**\n\
     `claimnode` - get a pairing code to bind your radio\n\
     `releasenode <node_id>` - give up ownership of a node\n\
     `ownednodes` - list the nodes you own\n\
     `nodeinfo <node_id>` - radio details for a node\n\
     `setup` - interactive setup wizard\n\
     `listalerts` - scheduled alerts\n\
     `filtermessages [node|owner]` - recent messages, filtered\n\
     `meshtastic_status` - radio and network health\n\
     `about` - gateway info\n\
     `help` - this text\n\
     \n\
     **Admin commands**\n\
     `alert <frequency> <chat|mesh|both> <message>` - schedule an alert\n\
     `deletealert <index>` / `clearalerts`\n\
     `addnode <node_id> <principal>` / `removenode <node_id>`\n\
     `ack <node_id> [message]` / `broadcast <channel> <message>`\n\
     `reboot [delay_secs]` - reboot the local radio"
        .to_string()
}
