//! # fanq
//!
//! `fanq` is a small attribute-filtered publish/subscribe fan-out broker
//! built with Rust. A published message is duplicated to every subscriber
//! queue whose filter policy matches its attributes; each queue delivers
//! at least once through visibility timeouts, and a worker pool consumes
//! each queue in batches.
//!
//! ## Core Modules
//!
//! The library is structured into several modules, each with a distinct
//! responsibility:
//!
//! - `broker`: the fan-out engine, the filter matcher, the per-subscriber
//!   queues, the subscription registry and the workers.
//! - `consumer`: the concrete classify-and-acknowledge handlers.
//! - `config`: loading and merging server and broker configuration.
//! - `persistence`: the sled-backed durable store behind each queue.
//! - `transport`: the WebSocket publish endpoint.
//! - `utils`: shared error type and tracing setup.

pub mod broker;
pub mod config;
pub mod consumer;
pub mod persistence;
pub mod transport;
pub mod utils;
