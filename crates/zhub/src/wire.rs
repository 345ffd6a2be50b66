use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::address::Eui64;
use crate::codec::RawAttributeReport;
use crate::command::Command;
use crate::hex::{parse_u8, parse_u16};

/// A device endpoint, as written in gateway messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    /// Device `EUI-64`.
    pub eui64: Eui64,
    /// Device endpoint.
    pub endpoint: u8,
}

/// The body of a `devicejoined` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceJoinedMessage {
    /// Device type.
    pub device_type: String,
    /// The joined endpoint.
    pub device_endpoint: DeviceEndpoint,
}

/// The body of a `deviceleft` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceLeftMessage {
    /// Device `EUI-64`.
    pub eui64: Eui64,
}

/// The body of a `zclresponse` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZclResponseMessage {
    /// The responding endpoint.
    pub device_endpoint: DeviceEndpoint,
    /// Cluster identifier, written as `0xXXXX`.
    pub cluster_id: String,
    /// Command identifier, written as `0xXX`.
    pub command_id: String,
    /// Hex-encoded command data.
    #[serde(default)]
    pub command_data: Option<String>,
}

impl ZclResponseMessage {
    /// Returns the [`RawAttributeReport`] carried by the message.
    ///
    /// Missing command data produces a report with an empty payload.
    /// Returns [`None`] when the cluster or command identifiers are malformed.
    #[must_use]
    pub fn report(&self) -> Option<RawAttributeReport<'_>> {
        Some(RawAttributeReport::new(
            parse_u16(&self.cluster_id)?,
            parse_u8(&self.command_id)?,
            self.command_data.as_deref().unwrap_or_default(),
        ))
    }
}

/// The body of a `commands` message.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct CommandsPayload<'a> {
    /// Commands to run in order.
    pub commands: &'a [Command],
}

impl<'a> CommandsPayload<'a> {
    /// Creates a [`CommandsPayload`].
    #[must_use]
    pub const fn new(commands: &'a [Command]) -> Self {
        Self { commands }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::address::Eui64;
    use crate::codec::RawAttributeReport;
    use crate::command::Command;
    use crate::{deserialize, serialize};

    use super::{
        CommandsPayload, DeviceEndpoint, DeviceJoinedMessage, DeviceLeftMessage,
        ZclResponseMessage,
    };

    fn eui64() -> Eui64 {
        Eui64::parse("000D6F000123ABCD").unwrap()
    }

    #[test]
    fn device_joined() {
        let message = deserialize::<DeviceJoinedMessage>(json!({
            "deviceType": "0x0100",
            "deviceEndpoint": { "eui64": "0x000D6F000123ABCD", "endpoint": 1 },
        }));

        assert_eq!(
            message,
            DeviceJoinedMessage {
                device_type: "0x0100".into(),
                device_endpoint: DeviceEndpoint {
                    eui64: eui64(),
                    endpoint: 1,
                },
            }
        );
    }

    #[test]
    fn device_left() {
        assert_eq!(
            deserialize::<DeviceLeftMessage>(json!({ "eui64": "0x000D6F000123ABCD" })),
            DeviceLeftMessage { eui64: eui64() }
        );
    }

    #[test]
    fn zcl_response() {
        let message = deserialize::<ZclResponseMessage>(json!({
            "deviceEndpoint": { "eui64": "0x000D6F000123ABCD", "endpoint": 1 },
            "clusterId": "0x0006",
            "commandId": "0x0A",
            "commandData": "00001001",
        }));

        assert_eq!(
            message.report(),
            Some(RawAttributeReport::new(0x0006, 0x0A, "00001001"))
        );
    }

    #[test]
    fn zcl_response_without_data() {
        let message = deserialize::<ZclResponseMessage>(json!({
            "deviceEndpoint": { "eui64": "000D6F000123ABCD", "endpoint": 1 },
            "clusterId": "0x0006",
            "commandId": "0x01",
        }));

        assert_eq!(message.command_data, None);
        assert_eq!(
            message.report(),
            Some(RawAttributeReport::new(0x0006, 0x01, ""))
        );
    }

    #[test]
    fn zcl_response_malformed_identifiers() {
        let message = deserialize::<ZclResponseMessage>(json!({
            "deviceEndpoint": { "eui64": "000D6F000123ABCD", "endpoint": 1 },
            "clusterId": "on-off",
            "commandId": "0x0A",
            "commandData": "00001001",
        }));

        assert_eq!(message.report(), None);
    }

    #[test]
    fn commands_payload() {
        let commands = [
            Command::new("zcl on-off on", 0),
            Command::new("plugin device-table send {000D6F000123ABCD} 1", 0),
        ];

        assert_eq!(
            serialize(CommandsPayload::new(&commands)),
            json!({
                "commands": [
                    { "command": "zcl on-off on", "postDelayMs": 0 },
                    { "command": "plugin device-table send {000D6F000123ABCD} 1", "postDelayMs": 0 },
                ]
            })
        );
    }
}
