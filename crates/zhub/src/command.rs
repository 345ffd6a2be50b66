use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use core::fmt;
use core::time::Duration;

use log::debug;

use serde::{Deserialize, Serialize};

use crate::address::DeviceAddress;

// Coprocessor command lines.
const FORM_NETWORK: &str = "plugin network-creator start 1";
const LEAVE_NETWORK: &str = "network leave";
const PERMIT_JOIN: &str = "plugin network-creator-security open-network";
const PERMIT_STOP_JOIN: &str = "plugin network-creator-security close-network";
const ON: &str = "zcl on-off on";
const OFF: &str = "zcl on-off off";

/// A single command line for the network coprocessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// The command line.
    pub command: String,
    /// Milliseconds the coprocessor waits after running the command.
    pub post_delay_ms: u64,
}

impl Command {
    /// Creates a [`Command`].
    #[must_use]
    #[inline]
    pub fn new(command: impl Into<String>, post_delay_ms: u64) -> Self {
        Self {
            command: command.into(),
            post_delay_ms,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (+{}ms)", self.command, self.post_delay_ms)
    }
}

/// All hub-level command kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CommandKind {
    /// Forms a centralized network.
    FormNetwork,
    /// Leaves the current network.
    LeaveNetwork,
    /// Opens the network for joining devices.
    PermitJoin,
    /// Closes the network for joining devices.
    PermitStopJoin,
    /// Switches a device on or off.
    OnOff {
        /// Target device.
        address: DeviceAddress,
        /// Whether to switch it on.
        on: bool,
    },
    /// Moves a device to a level.
    MoveToLevel {
        /// Target device.
        address: DeviceAddress,
        /// Target level.
        level: u8,
        /// Transition time, in tenths of a second.
        transition_time: u16,
    },
    /// Makes a device identify itself.
    ///
    /// Not supported by the coprocessor commands yet.
    Identify {
        /// Target device.
        address: DeviceAddress,
        /// Identify time, in seconds.
        duration: u16,
    },
    /// Recalls a scene on a device.
    ///
    /// Not supported by the coprocessor commands yet.
    RecallScene {
        /// Target device.
        address: DeviceAddress,
        /// Group identifier.
        group_id: u16,
        /// Scene identifier.
        scene_id: u8,
    },
}

impl CommandKind {
    /// Returns the [`CommandKind`] name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FormNetwork => "Form Network",
            Self::LeaveNetwork => "Leave Network",
            Self::PermitJoin => "Permit Join",
            Self::PermitStopJoin => "Permit Stop Join",
            Self::OnOff { .. } => "On/Off",
            Self::MoveToLevel { .. } => "Move To Level",
            Self::Identify { .. } => "Identify",
            Self::RecallScene { .. } => "Recall Scene",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A builder of coprocessor [`Command`]s.
///
/// Device commands are followed by a device table command which tells the
/// coprocessor which node and endpoint the previous command is sent to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandBuilder {
    post_delay_ms: u64,
}

impl CommandBuilder {
    /// Creates a [`CommandBuilder`] without any delay between commands.
    #[must_use]
    pub const fn new() -> Self {
        Self { post_delay_ms: 0 }
    }

    /// Sets the delay hint attached to every built [`Command`].
    ///
    /// Delays beyond [`u64::MAX`] milliseconds are saturated.
    #[must_use]
    pub fn post_delay(mut self, delay: Duration) -> Self {
        self.post_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Builds the ordered sequence of [`Command`]s for a [`CommandKind`].
    ///
    /// An empty sequence means there is nothing to send, which is the case of
    /// the command kinds not supported yet.
    #[must_use]
    pub fn build(&self, kind: &CommandKind) -> Vec<Command> {
        match *kind {
            CommandKind::FormNetwork => self.single(FORM_NETWORK),
            CommandKind::LeaveNetwork => self.single(LEAVE_NETWORK),
            CommandKind::PermitJoin => self.single(PERMIT_JOIN),
            CommandKind::PermitStopJoin => self.single(PERMIT_STOP_JOIN),
            CommandKind::OnOff { address, on } => {
                self.addressed(if on { ON } else { OFF }, address)
            }
            CommandKind::MoveToLevel {
                address,
                level,
                transition_time,
            } => self.addressed(
                format!("zcl level-control o-mv-to-level 0x{level:02X} 0x{transition_time:04X}"),
                address,
            ),
            CommandKind::Identify { .. } | CommandKind::RecallScene { .. } => {
                debug!("`{kind}` command not supported yet, nothing to send");
                Vec::new()
            }
        }
    }

    fn single(&self, command: &str) -> Vec<Command> {
        alloc::vec![Command::new(command, self.post_delay_ms)]
    }

    fn addressed(&self, command: impl Into<String>, address: DeviceAddress) -> Vec<Command> {
        alloc::vec![
            Command::new(command, self.post_delay_ms),
            Command::new(device_table_send(address), self.post_delay_ms),
        ]
    }
}

// The `EUI-64` is rendered without any `0x` prefix.
fn device_table_send(address: DeviceAddress) -> String {
    format!(
        "plugin device-table send {{{}}} {}",
        address.eui64, address.endpoint
    )
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use serde_json::json;

    use crate::address::DeviceAddress;
    use crate::{deserialize, serialize};

    use super::{Command, CommandBuilder, CommandKind};

    fn address() -> DeviceAddress {
        DeviceAddress::parse("0x000D6F000123ABCD", 1).unwrap()
    }

    #[test]
    fn network_commands() {
        let builder = CommandBuilder::new();

        for (kind, line) in [
            (CommandKind::FormNetwork, "plugin network-creator start 1"),
            (CommandKind::LeaveNetwork, "network leave"),
            (
                CommandKind::PermitJoin,
                "plugin network-creator-security open-network",
            ),
            (
                CommandKind::PermitStopJoin,
                "plugin network-creator-security close-network",
            ),
        ] {
            assert_eq!(builder.build(&kind), [Command::new(line, 0)]);
        }
    }

    #[test]
    fn on_off() {
        let commands = CommandBuilder::new().build(&CommandKind::OnOff {
            address: address(),
            on: true,
        });

        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].command, "zcl on-off on");
        assert_eq!(
            commands[1].command,
            "plugin device-table send {000D6F000123ABCD} 1"
        );
        assert!(commands[1].command.contains("000D6F000123ABCD"));
        assert!(!commands[1].command.contains("0x"));

        let commands = CommandBuilder::new().build(&CommandKind::OnOff {
            address: address(),
            on: false,
        });
        assert_eq!(commands[0].command, "zcl on-off off");
    }

    #[test]
    fn move_to_level() {
        let commands = CommandBuilder::new()
            .post_delay(Duration::from_millis(100))
            .build(&CommandKind::MoveToLevel {
                address: DeviceAddress::parse("000d6f000123abcd", 11).unwrap(),
                level: 0x7F,
                transition_time: 10,
            });

        assert_eq!(
            commands,
            [
                Command::new("zcl level-control o-mv-to-level 0x7F 0x000A", 100),
                Command::new("plugin device-table send {000D6F000123ABCD} 11", 100),
            ]
        );
    }

    #[test]
    fn saturated_delay() {
        let commands = CommandBuilder::new()
            .post_delay(Duration::MAX)
            .build(&CommandKind::LeaveNetwork);

        assert_eq!(commands, [Command::new("network leave", u64::MAX)]);
    }

    #[test]
    fn unsupported_kinds() {
        let builder = CommandBuilder::default();

        assert!(
            builder
                .build(&CommandKind::Identify {
                    address: address(),
                    duration: 5,
                })
                .is_empty()
        );
        assert!(
            builder
                .build(&CommandKind::RecallScene {
                    address: address(),
                    group_id: 1,
                    scene_id: 2,
                })
                .is_empty()
        );
    }

    #[test]
    fn serde_command() {
        let command = Command::new("network leave", 250);
        let value = json!({ "command": "network leave", "postDelayMs": 250 });

        assert_eq!(serialize(&command), value);
        assert_eq!(deserialize::<Command>(value), command);
    }

    #[test]
    fn serde_kind() {
        let kind = CommandKind::OnOff {
            address: address(),
            on: true,
        };
        let value = json!({
            "kind": "on-off",
            "address": { "eui64": "000D6F000123ABCD", "endpoint": 1 },
            "on": true,
        });

        assert_eq!(serialize(kind), value);
        assert_eq!(deserialize::<CommandKind>(value), kind);
        assert_eq!(
            deserialize::<CommandKind>(json!({ "kind": "permit-join" })),
            CommandKind::PermitJoin
        );
    }
}
