//! Raw configuration model for services, as deserialized from the config
//! file. Compiled into [`Service`](crate::Service) values at startup.

use serde::{Deserialize, Serialize};

/// One backend microservice: its command name, base URI, the contacts
/// allowed to call it, and its command table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub name: String,
    pub base_uri: String,
    #[serde(default)]
    pub client_numbers: Vec<String>,
    #[serde(default)]
    pub commands: Vec<CommandConfig>,
}

/// One command signature within a service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandConfig {
    /// Regex matched against the raw utterance; absent means match-all.
    #[serde(default)]
    pub pattern: Option<String>,
    pub method: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub args: Vec<ArgConfig>,
    #[serde(default)]
    pub response: ResponseConfig,
}

/// Binding of one positional argument to a request location.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArgConfig {
    pub index: usize,
    /// Where the value goes: `query`, `json`, or `endpoint`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Scalar type for JSON values; defaults to string.
    #[serde(default)]
    pub datatype: Option<String>,
    /// Query key or dotted JSON path; unused for endpoint args.
    #[serde(default)]
    pub path: String,
    /// Absorb every later positional argument into this binding.
    #[serde(default)]
    pub compress_rest: bool,
    /// When present, the value must be one of these literals.
    #[serde(default)]
    pub filter: Vec<String>,
}

/// Response projection settings for one command.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResponseConfig {
    /// `plain_text` (default) or `json`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub success: TypeInfoConfig,
    #[serde(default)]
    pub error: TypeInfoConfig,
}

/// A dotted path plus scalar type, used for response projection.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TypeInfoConfig {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub datatype: Option<String>,
}
