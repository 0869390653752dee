//! Structured logging

mod logging;

pub use logging::{env_filter, init_tracing, InitError};
