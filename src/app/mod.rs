pub mod gateway;

pub use gateway::GatewayApp;
