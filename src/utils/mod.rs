//! The `utils` module collects definitions shared across the `fanq`
//! application: the crate error type and the tracing setup.

pub mod error;
pub mod logging;
