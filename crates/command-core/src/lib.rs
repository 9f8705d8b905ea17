//! Core command types shared across the courier crates.
//!
//! This crate is the leaf of the dependency graph: the parser, the polling
//! workers, and the service layer all consume [`UserInput`] without
//! depending on one another. It also carries the [`Whitelist`] that decides
//! which contact numbers may run which services.

mod input;
mod whitelist;

pub use input::{ParseError, UserInput};
pub use whitelist::Whitelist;
