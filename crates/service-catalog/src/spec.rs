//! Compiled command specs.
//!
//! Configuration arrives as loose strings; compilation turns it into typed
//! specs and rejects inconsistent tables before the process starts serving.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use serde_json::Value;

use crate::config::{ArgConfig, CommandConfig, ResponseConfig, TypeInfoConfig};
use crate::error::CatalogError;

/// HTTP methods a command may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    fn parse(raw: &str) -> Result<Self, CatalogError> {
        match raw.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            "put" => Ok(Self::Put),
            "patch" => Ok(Self::Patch),
            "delete" => Ok(Self::Delete),
            other => Err(CatalogError::InvalidSpec(format!(
                "unsupported method \"{other}\""
            ))),
        }
    }

    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Where an argument's value lands in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    Query,
    Json,
    Endpoint,
}

impl ArgKind {
    fn parse(raw: &str) -> Result<Self, CatalogError> {
        match raw.to_ascii_lowercase().as_str() {
            "query" => Ok(Self::Query),
            "json" => Ok(Self::Json),
            "endpoint" => Ok(Self::Endpoint),
            other => Err(CatalogError::InvalidSpec(format!(
                "unsupported arg type \"{other}\""
            ))),
        }
    }
}

/// Scalar type of a JSON argument or projected response node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DataType {
    #[default]
    String,
    Int,
    Float,
    Bool,
}

impl DataType {
    fn parse(raw: &Option<String>) -> Result<Self, CatalogError> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };
        match raw.to_ascii_lowercase().as_str() {
            "string" | "" => Ok(Self::String),
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "bool" => Ok(Self::Bool),
            other => Err(CatalogError::InvalidSpec(format!(
                "unsupported datatype \"{other}\""
            ))),
        }
    }

    /// Convert a positional argument into a typed JSON value.
    pub fn coerce(self, value: &str) -> Result<Value, CatalogError> {
        match self {
            Self::String => Ok(Value::String(value.to_string())),
            Self::Int => value
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| CatalogError::BadArgType {
                    value: value.to_string(),
                    expected: "int",
                }),
            Self::Float => value
                .parse::<f64>()
                .ok()
                .and_then(|f| serde_json::Number::from_f64(f).map(Value::Number))
                .ok_or_else(|| CatalogError::BadArgType {
                    value: value.to_string(),
                    expected: "float",
                }),
            Self::Bool => value
                .parse::<bool>()
                .map(Value::Bool)
                .map_err(|_| CatalogError::BadArgType {
                    value: value.to_string(),
                    expected: "bool",
                }),
        }
    }
}

/// One positional argument binding.
#[derive(Debug, Clone)]
pub struct ArgSpec {
    /// Query key or dotted JSON path; ignored for endpoint args.
    pub path: String,
    pub data_type: DataType,
    pub compress_rest: bool,
    pub filter: Option<HashSet<String>>,
}

impl ArgSpec {
    /// Reject the value when a filter is declared and the value is not in it.
    pub fn check_filter(&self, value: &str) -> Result<(), CatalogError> {
        match &self.filter {
            Some(allowed) if !allowed.contains(value) => Err(CatalogError::FilterRejected {
                value: value.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// How a command's HTTP response becomes the reply text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseKind {
    #[default]
    PlainText,
    Json,
}

/// A dotted path into a JSON response.
#[derive(Debug, Clone, Default)]
pub struct TypeInfo {
    pub path: String,
    pub data_type: DataType,
}

/// Projection settings for one command.
#[derive(Debug, Clone, Default)]
pub struct ResponseSpec {
    pub kind: ResponseKind,
    pub success: TypeInfo,
    pub error: TypeInfo,
}

/// One compiled command: pattern, request shape, and response projection.
///
/// Arg groups are keyed by positional index; ordered maps keep assembly
/// deterministic.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub pattern: Regex,
    pub method: HttpMethod,
    pub endpoint: String,
    pub query_args: BTreeMap<usize, ArgSpec>,
    pub json_args: BTreeMap<usize, ArgSpec>,
    pub endpoint_args: BTreeMap<usize, ArgSpec>,
    pub response: ResponseSpec,
}

impl CommandSpec {
    pub fn compile(config: &CommandConfig) -> Result<Self, CatalogError> {
        let raw_pattern = config.pattern.as_deref().unwrap_or(".*");
        let pattern = Regex::new(raw_pattern).map_err(|e| {
            CatalogError::InvalidSpec(format!("bad pattern \"{raw_pattern}\": {e}"))
        })?;
        let method = HttpMethod::parse(&config.method)?;

        let mut query_args = BTreeMap::new();
        let mut json_args = BTreeMap::new();
        let mut endpoint_args = BTreeMap::new();
        let mut compress_seen = false;

        for arg in &config.args {
            let kind = ArgKind::parse(&arg.kind)?;
            let spec = compile_arg(arg, kind)?;

            if spec.compress_rest {
                if compress_seen {
                    return Err(CatalogError::InvalidSpec(
                        "multiple compress_rest args in one command".to_string(),
                    ));
                }
                compress_seen = true;
            }

            let group = match kind {
                ArgKind::Query => &mut query_args,
                ArgKind::Json => &mut json_args,
                ArgKind::Endpoint => &mut endpoint_args,
            };
            if group.insert(arg.index, spec).is_some() {
                return Err(CatalogError::InvalidSpec(format!(
                    "duplicate arg index {} in one group",
                    arg.index
                )));
            }
        }

        if method == HttpMethod::Get && !json_args.is_empty() {
            return Err(CatalogError::InvalidSpec(
                "JSON args are not allowed on GET commands".to_string(),
            ));
        }

        Ok(Self {
            pattern,
            method,
            endpoint: config.endpoint.clone(),
            query_args,
            json_args,
            endpoint_args,
            response: compile_response(&config.response)?,
        })
    }
}

fn compile_arg(config: &ArgConfig, kind: ArgKind) -> Result<ArgSpec, CatalogError> {
    if kind != ArgKind::Endpoint && config.path.is_empty() {
        return Err(CatalogError::InvalidSpec(format!(
            "arg at index {} is missing a path",
            config.index
        )));
    }

    Ok(ArgSpec {
        path: config.path.clone(),
        data_type: DataType::parse(&config.datatype)?,
        compress_rest: config.compress_rest,
        filter: if config.filter.is_empty() {
            None
        } else {
            Some(config.filter.iter().cloned().collect())
        },
    })
}

fn compile_response(config: &ResponseConfig) -> Result<ResponseSpec, CatalogError> {
    let kind = match config.kind.as_deref() {
        None | Some("plain_text") => ResponseKind::PlainText,
        Some("json") => ResponseKind::Json,
        Some(other) => {
            return Err(CatalogError::InvalidSpec(format!(
                "unsupported response type \"{other}\""
            )))
        }
    };

    Ok(ResponseSpec {
        kind,
        success: compile_type_info(&config.success)?,
        error: compile_type_info(&config.error)?,
    })
}

fn compile_type_info(config: &TypeInfoConfig) -> Result<TypeInfo, CatalogError> {
    Ok(TypeInfo {
        path: config.path.clone(),
        data_type: DataType::parse(&config.datatype)?,
    })
}
