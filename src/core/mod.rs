pub mod aggregator;
pub mod breaker;
pub mod client;
pub mod handler;
pub mod invoker;
pub mod resolver;

pub use crate::domain::model::{Bookmark, Contact, Passport, ServiceEndpoint, UserId};
pub use crate::domain::ports::{EndpointResolver, RemoteFetch};
pub use crate::utils::error::Result;
