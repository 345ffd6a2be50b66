use alloc::string::String;

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Eui64;
use crate::state::DeviceStateDelta;

/// An event emitted by the hub towards its collaborators.
///
/// Events carry normalized data: `EUI-64`s are always rendered without any
/// network-address prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum HubEvent {
    /// A device has joined the network.
    DeviceJoined {
        /// Device type.
        #[serde(rename = "type")]
        device_type: String,
        /// Device `EUI-64`.
        eui64: Eui64,
        /// Device endpoint.
        endpoint: u8,
    },
    /// A device has left the network.
    DeviceLeft {
        /// Device `EUI-64`.
        eui64: Eui64,
    },
    /// A device has reported a change of its state.
    #[serde(rename = "device-response")]
    DeviceAttributeChanged {
        /// Device `EUI-64`.
        eui64: Eui64,
        /// Device endpoint.
        endpoint: u8,
        /// The state update.
        delta: DeviceStateDelta,
    },
}

impl HubEvent {
    /// Returns the [`HubEvent`] name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DeviceJoined { .. } => "device-joined",
            Self::DeviceLeft { .. } => "device-left",
            Self::DeviceAttributeChanged { .. } => "device-response",
        }
    }

    /// Returns the `EUI-64` of the device that originated the event.
    #[must_use]
    pub const fn eui64(&self) -> Eui64 {
        match self {
            Self::DeviceJoined { eui64, .. }
            | Self::DeviceLeft { eui64 }
            | Self::DeviceAttributeChanged { eui64, .. } => *eui64,
        }
    }
}

impl fmt::Display for HubEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceJoined {
                device_type,
                eui64,
                endpoint,
            } => write!(
                f,
                "Device `{eui64}` joined with endpoint {endpoint} (type {device_type})"
            ),
            Self::DeviceLeft { eui64 } => write!(f, "Device `{eui64}` left"),
            Self::DeviceAttributeChanged {
                eui64,
                endpoint,
                delta,
            } => {
                writeln!(f, "Device `{eui64}` endpoint {endpoint} changed")?;
                fmt::Display::fmt(delta, f)
            }
        }
    }
}
