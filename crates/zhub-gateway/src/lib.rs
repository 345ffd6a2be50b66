//! The `zhub-gateway` library crate connects a hub to a Zigbee gateway
//! through an `MQTT` broker.
//!
//! The gateway process drives a Zigbee network coprocessor and exchanges
//! `JSON` messages with the hub on a set of topics scoped to its own address.
//! This crate provides:
//!
//! - A [`session::GatewaySession`] owning the broker connection, which
//!   subscribes to the inbound topics, reconnects with an exponential backoff
//!   and publishes coprocessor commands
//! - An [`router::EventRouter`] turning inbound messages into
//!   [`zhub::events::HubEvent`]s
//! - A [`session::GatewayHandle`] to drive a session running on its own task
//!
//! `zhub-gateway` leverages `tokio` as asynchronous executor and `rumqttc`
//! as `MQTT` client.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Reconnection backoff.
pub mod backoff;
/// Session configuration.
pub mod config;
/// Error management.
pub mod error;
/// Inbound message routing.
pub mod router;
/// A session connected to a gateway.
pub mod session;
/// Gateway topics.
pub mod topics;
