//! The translation layer between a home-automation hub and a Zigbee network
//! coprocessor (`NCP`).
//!
//! This crate provides APIs to:
//!
//! - Describe the Zigbee Cluster Library (`ZCL`) clusters and attributes the
//!   hub understands, together with their wire types and the device state
//!   field each one populates.
//! - Decode the hex-encoded attribute reports sent back by the `NCP` into a
//!   sparse device state update. Decoding never fails: a report that cannot
//!   be understood simply produces an empty update.
//! - Encode hub-level commands, such as turning a light on or opening the
//!   network for joining, into the command lines accepted by the `NCP`
//!   firmware, addressed to the right device and endpoint.
//! - Represent the `JSON` message bodies exchanged with the gateway and the
//!   events the hub emits for its collaborators.
//!
//! Every operation in this crate is a pure and synchronous transformation,
//! hence it can be shared among any number of concurrent callers.
//!
//! This crate can be compiled for both `std` and `no_std` environments.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![no_std]

extern crate alloc;

mod macros;

/// Device addressing.
pub mod address;
/// Attribute report decoding.
pub mod codec;
/// Coprocessor commands and their builder.
pub mod command;
/// Error management.
pub mod error;
/// Hub-level events.
pub mod events;
/// Hex string helpers.
pub mod hex;
/// Clusters and attributes known to the hub.
pub mod registry;
/// Device state updates.
pub mod state;
/// Message bodies exchanged with the gateway.
pub mod wire;

#[cfg(test)]
pub(crate) fn serialize<T: serde::Serialize>(value: T) -> serde_json::Value {
    serde_json::to_value(value).unwrap()
}

#[cfg(test)]
pub(crate) fn deserialize<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).unwrap()
}
