//! Declarative command tables and their HTTP execution.
//!
//! Each backend microservice is described in configuration as an ordered
//! list of command specs: a regex pattern that selects the spec from the
//! raw user utterance, an HTTP method and endpoint, positional argument
//! bindings (query string, JSON body, or URL path), and a response
//! projection that turns the HTTP reply into a short text answer.
//!
//! [`Service`] compiles one such table and executes inputs against it;
//! [`Catalog`] holds a pool of services per command name.

mod catalog;
mod config;
mod error;
mod path;
mod service;
mod spec;

pub use catalog::{Catalog, ServiceHandle};
pub use config::{ArgConfig, CommandConfig, ResponseConfig, ServiceConfig, TypeInfoConfig};
pub use error::CatalogError;
pub use service::Service;
pub use spec::{ArgKind, ArgSpec, CommandSpec, DataType, HttpMethod, ResponseKind, ResponseSpec};
