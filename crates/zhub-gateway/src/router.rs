use serde::de::DeserializeOwned;

use zhub::codec::AttributeCodec;
use zhub::events::HubEvent;
use zhub::wire::{DeviceJoinedMessage, DeviceLeftMessage, ZclResponseMessage};

use tracing::{debug, warn};

use crate::topics::{InboundTopic, Topics};

#[inline]
fn parse_message<T: DeserializeOwned>(topic: InboundTopic, payload: &[u8]) -> Option<T> {
    match serde_json::from_slice(payload) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!("Malformed `{topic}` message, discard it: {e}");
            None
        }
    }
}

/// A router converting inbound gateway messages into [`HubEvent`]s.
///
/// Join and leave messages are converted directly, attribute reports are
/// decoded through an [`AttributeCodec`]. Malformed messages and reports
/// without any decoded field are logged and dropped.
#[derive(Debug, Clone)]
pub struct EventRouter {
    topics: Topics,
    codec: AttributeCodec,
}

impl EventRouter {
    /// Creates an [`EventRouter`] for the gateway with the given address.
    #[must_use]
    pub fn new(gateway_address: &str) -> Self {
        Self::with_codec(gateway_address, AttributeCodec::default())
    }

    /// Creates an [`EventRouter`] decoding reports with the given
    /// [`AttributeCodec`].
    #[must_use]
    pub fn with_codec(gateway_address: &str, codec: AttributeCodec) -> Self {
        Self {
            topics: Topics::new(gateway_address),
            codec,
        }
    }

    /// Returns the gateway [`Topics`].
    #[must_use]
    pub const fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Routes an inbound message.
    ///
    /// Returns [`None`] when the message does not produce any event.
    #[must_use]
    pub fn route(&self, topic: &str, payload: &[u8]) -> Option<HubEvent> {
        let Some(inbound) = self.topics.classify(topic) else {
            debug!("Message on unknown topic `{topic}` ignored");
            return None;
        };

        match inbound {
            InboundTopic::DeviceJoined => {
                let message: DeviceJoinedMessage = parse_message(inbound, payload)?;
                Some(HubEvent::DeviceJoined {
                    device_type: message.device_type,
                    eui64: message.device_endpoint.eui64,
                    endpoint: message.device_endpoint.endpoint,
                })
            }
            InboundTopic::DeviceLeft => {
                let message: DeviceLeftMessage = parse_message(inbound, payload)?;
                Some(HubEvent::DeviceLeft {
                    eui64: message.eui64,
                })
            }
            InboundTopic::ZclResponse => {
                let message: ZclResponseMessage = parse_message(inbound, payload)?;
                self.attribute_changed(&message)
            }
        }
    }

    fn attribute_changed(&self, message: &ZclResponseMessage) -> Option<HubEvent> {
        let Some(report) = message.report() else {
            warn!(
                "Malformed identifiers `{}`/`{}` in `{}` message, discard it",
                message.cluster_id,
                message.command_id,
                InboundTopic::ZclResponse
            );
            return None;
        };

        let delta = self.codec.decode(&report);
        if delta.is_empty() {
            debug!(
                "No state change from device `{}` for cluster {:#06X}",
                message.device_endpoint.eui64, report.cluster_id
            );
            return None;
        }

        Some(HubEvent::DeviceAttributeChanged {
            eui64: message.device_endpoint.eui64,
            endpoint: message.device_endpoint.endpoint,
            delta,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use zhub::address::Eui64;
    use zhub::events::HubEvent;
    use zhub::state::{DeviceStateDelta, StateField, StateValue};

    use super::EventRouter;

    const EUI64: &str = "000D6F000123ABCD";

    fn router() -> EventRouter {
        EventRouter::new("G1")
    }

    fn eui64() -> Eui64 {
        Eui64::parse(EUI64).unwrap()
    }

    fn payload(value: &serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(value).unwrap()
    }

    fn zcl_response(command_data: Option<&str>) -> Vec<u8> {
        let mut value = json!({
            "deviceEndpoint": { "eui64": "0x000D6F000123ABCD", "endpoint": 1 },
            "clusterId": "0x0008",
            "commandId": "0x0A",
        });
        if let Some(data) = command_data {
            value["commandData"] = json!(data);
        }
        payload(&value)
    }

    #[test]
    fn device_joined() {
        let event = router().route(
            "gw/G1/devicejoined",
            &payload(&json!({
                "deviceType": "0x0100",
                "deviceEndpoint": { "eui64": "0x000D6F000123ABCD", "endpoint": 1 },
            })),
        );

        assert_eq!(
            event,
            Some(HubEvent::DeviceJoined {
                device_type: "0x0100".into(),
                eui64: eui64(),
                endpoint: 1,
            })
        );
    }

    #[test]
    fn device_left() {
        let event = router().route("gw/G1/deviceleft", &payload(&json!({ "eui64": EUI64 })));

        assert_eq!(event, Some(HubEvent::DeviceLeft { eui64: eui64() }));
    }

    #[test]
    fn attribute_changed() {
        let event = router().route("gw/G1/zclresponse", &zcl_response(Some("00002080")));

        assert_eq!(
            event,
            Some(HubEvent::DeviceAttributeChanged {
                eui64: eui64(),
                endpoint: 1,
                delta: DeviceStateDelta::single(StateField::Brightness, StateValue::Integer(50)),
            })
        );
    }

    #[test]
    fn missing_or_empty_command_data() {
        assert_eq!(router().route("gw/G1/zclresponse", &zcl_response(None)), None);
        assert_eq!(
            router().route("gw/G1/zclresponse", &zcl_response(Some(""))),
            None
        );
    }

    #[test]
    fn undecodable_report() {
        // Unknown cluster.
        let value = json!({
            "deviceEndpoint": { "eui64": EUI64, "endpoint": 1 },
            "clusterId": "0x0300",
            "commandId": "0x0A",
            "commandData": "00002080",
        });
        assert_eq!(router().route("gw/G1/zclresponse", &payload(&value)), None);

        // Malformed cluster identifier.
        let value = json!({
            "deviceEndpoint": { "eui64": EUI64, "endpoint": 1 },
            "clusterId": "level",
            "commandId": "0x0A",
            "commandData": "00002080",
        });
        assert_eq!(router().route("gw/G1/zclresponse", &payload(&value)), None);
    }

    #[test]
    fn malformed_json() {
        let router = router();

        assert_eq!(router.route("gw/G1/devicejoined", b"{"), None);
        assert_eq!(router.route("gw/G1/deviceleft", b"[]"), None);
        assert_eq!(
            router.route("gw/G1/deviceleft", &payload(&json!({ "eui64": "0x12" }))),
            None
        );
        assert_eq!(router.route("gw/G1/zclresponse", &[0xFF, 0xFE]), None);
    }

    #[test]
    fn foreign_topics() {
        let router = router();
        let body = payload(&json!({ "eui64": EUI64 }));

        assert_eq!(router.route("gw/G2/deviceleft", &body), None);
        assert_eq!(router.route("gw/G1/commands", &body), None);
    }
}
