pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::GatewayApp;
pub use config::GatewayConfig;
pub use crate::core::{
    aggregator::PassportAggregator, handler::PassportHandler, invoker::ResilientInvoker,
};
pub use domain::model::{Bookmark, Contact, Passport, ServiceEndpoint, UserId};
pub use utils::error::{GatewayError, Result};
