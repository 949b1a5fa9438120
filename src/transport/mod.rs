//! The `transport` module exposes the publish endpoint over WebSockets.
//!
//! It defines the frame protocol producers speak and implements the
//! server that parses publish frames, hands them to the broker and
//! replies with the assigned message id or an error.

pub mod message;
pub mod websocket;
