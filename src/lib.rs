pub mod config;
pub mod http;
pub mod interaction;
pub mod observability;
pub mod tsdb;

pub use config::Config;
pub use interaction::{InteractionService, InMemoryAppRegistry};
pub use tsdb::{InMemoryTsdb, ModelRollups, TsdbBackend};
