//! A compiled service and its command execution.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use command_core::UserInput;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::error::CatalogError;
use crate::path::{get_path, set_path};
use crate::spec::{ArgSpec, CommandSpec, ResponseKind, TypeInfo};

/// Total budget for one backend HTTP call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One backend microservice with its compiled command table.
///
/// Effectively immutable after compilation; cloning shares the underlying
/// HTTP connection pool.
#[derive(Debug, Clone)]
pub struct Service {
    name: String,
    base_uri: String,
    commands: Vec<CommandSpec>,
    client: reqwest::Client,
}

impl Service {
    /// Compile a service from its configuration.
    ///
    /// Patterns must be unique within the service; the first declared match
    /// wins at execution time.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, CatalogError> {
        let mut seen_patterns = HashSet::new();
        let mut commands = Vec::with_capacity(config.commands.len());

        for command in &config.commands {
            let raw = command.pattern.as_deref().unwrap_or(".*");
            if !seen_patterns.insert(raw.to_string()) {
                return Err(CatalogError::InvalidSpec(format!(
                    "service \"{}\" declares pattern \"{raw}\" twice",
                    config.name
                )));
            }
            commands.push(CommandSpec::compile(command)?);
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(CatalogError::Http)?;

        Ok(Self {
            name: config.name.clone(),
            base_uri: config.base_uri.trim_end_matches('/').to_string(),
            commands,
            client,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run a user input against this service's command table and project the
    /// backend's response into the reply text.
    pub async fn execute(&self, input: &UserInput) -> Result<String, CatalogError> {
        let command = self
            .commands
            .iter()
            .find(|c| c.pattern.is_match(&input.raw))
            .ok_or(CatalogError::NoMatchingCommand)?;

        let query = assemble_query(&command.query_args, &input.args)?;
        let body = assemble_body(&command.json_args, &input.args)?;
        let url = assemble_url(
            &self.base_uri,
            &command.endpoint,
            &command.endpoint_args,
            &input.args,
        )?;

        debug!(service = %self.name, %url, "dispatching command to backend");

        let mut request = self
            .client
            .request(command.method.as_reqwest(), &url)
            .header(
                ACCEPT,
                match command.response.kind {
                    ResponseKind::PlainText => "text/plain",
                    ResponseKind::Json => "application/json",
                },
            );
        if !query.is_empty() {
            request = request.query(&query);
        }
        if let Some(body) = &body {
            request = request.header(CONTENT_TYPE, "application/json").json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CatalogError::Timeout
            } else {
                CatalogError::Http(e)
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(CatalogError::Http)?;

        project_response(command, status, text)
    }
}

/// Build the query-string pairs from the QUERY arg group.
fn assemble_query(
    group: &BTreeMap<usize, ArgSpec>,
    args: &[String],
) -> Result<Vec<(String, String)>, CatalogError> {
    check_arity(group.len(), args.len())?;

    let mut pairs = Vec::new();
    for (&index, spec) in group {
        let value = args.get(index).ok_or(CatalogError::ArgCount {
            expected: index + 1,
            given: args.len(),
        })?;
        spec.check_filter(value)?;
        pairs.push((spec.path.clone(), value.clone()));

        if spec.compress_rest {
            for value in &args[index + 1..] {
                spec.check_filter(value)?;
                pairs.push((spec.path.clone(), value.clone()));
            }
        }
    }

    Ok(pairs)
}

/// Build the JSON body from the JSON arg group, if any.
fn assemble_body(
    group: &BTreeMap<usize, ArgSpec>,
    args: &[String],
) -> Result<Option<Value>, CatalogError> {
    if group.is_empty() {
        return Ok(None);
    }
    check_arity(group.len(), args.len())?;

    let mut doc = Value::Object(serde_json::Map::new());
    for (&index, spec) in group {
        let value = args.get(index).ok_or(CatalogError::ArgCount {
            expected: index + 1,
            given: args.len(),
        })?;

        if spec.compress_rest {
            let rest: Vec<Value> = args[index..]
                .iter()
                .map(|a| Value::String(a.clone()))
                .collect();
            set_path(&mut doc, &spec.path, Value::Array(rest));
            break;
        }

        set_path(&mut doc, &spec.path, spec.data_type.coerce(value)?);
    }

    Ok(Some(doc))
}

/// Build the request URL, appending filter-checked endpoint args to the path.
fn assemble_url(
    base_uri: &str,
    endpoint: &str,
    group: &BTreeMap<usize, ArgSpec>,
    args: &[String],
) -> Result<String, CatalogError> {
    let mut url = format!("{base_uri}{endpoint}");
    if group.is_empty() {
        return Ok(url);
    }
    check_arity(group.len(), args.len())?;

    let mut parts = Vec::with_capacity(group.len());
    for (&index, spec) in group {
        let value = args.get(index).ok_or(CatalogError::ArgCount {
            expected: index + 1,
            given: args.len(),
        })?;
        spec.check_filter(value)?;
        parts.push(value.as_str());
    }
    url.push('/');
    url.push_str(&parts.join("/"));

    Ok(url)
}

fn check_arity(expected: usize, given: usize) -> Result<(), CatalogError> {
    if expected > given {
        Err(CatalogError::ArgCount { expected, given })
    } else {
        Ok(())
    }
}

/// Turn the backend response into the user-visible reply.
///
/// Plain-text commands reply with the body verbatim. JSON commands project
/// the configured success path on 200 (error path otherwise) and serialize
/// the selected subtree, so a projected string scalar keeps its JSON quotes.
fn project_response(
    command: &CommandSpec,
    status: StatusCode,
    text: String,
) -> Result<String, CatalogError> {
    match command.response.kind {
        ResponseKind::PlainText => {
            if status == StatusCode::OK {
                Ok(text)
            } else {
                Err(CatalogError::Backend {
                    status: status.as_u16(),
                    body: text,
                })
            }
        }
        ResponseKind::Json => {
            let doc: Value = serde_json::from_str(&text)?;
            if status == StatusCode::OK {
                let node = select(&doc, &command.response.success)?;
                Ok(node.to_string())
            } else {
                let body = select(&doc, &command.response.error)
                    .map(Value::to_string)
                    .unwrap_or(text);
                Err(CatalogError::Backend {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

fn select<'a>(doc: &'a Value, info: &TypeInfo) -> Result<&'a Value, CatalogError> {
    get_path(doc, &info.path)
        .ok_or_else(|| CatalogError::BadResponse(format!("missing \"{}\" in response", info.path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArgConfig, CommandConfig, ResponseConfig, TypeInfoConfig};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn arg(index: usize, kind: &str, path: &str) -> ArgConfig {
        ArgConfig {
            index,
            kind: kind.to_string(),
            datatype: None,
            path: path.to_string(),
            compress_rest: false,
            filter: Vec::new(),
        }
    }

    fn service_with(command: CommandConfig, base_uri: &str) -> Service {
        Service::from_config(&ServiceConfig {
            name: "test".to_string(),
            base_uri: base_uri.to_string(),
            client_numbers: Vec::new(),
            commands: vec![command],
        })
        .unwrap()
    }

    fn input(text: &str) -> UserInput {
        UserInput::parse(text).unwrap()
    }

    #[tokio::test]
    async fn get_with_query_arg_and_plain_text_reply() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x"))
            .and(query_param("q", "hello"))
            .and(header("Accept", "text/plain"))
            .respond_with(ResponseTemplate::new(200).set_body_string("done"))
            .expect(1)
            .mount(&server)
            .await;

        let command = CommandConfig {
            pattern: None,
            method: "get".to_string(),
            endpoint: "/x".to_string(),
            args: vec![arg(0, "query", "q")],
            response: ResponseConfig::default(),
        };
        let service = service_with(command, &server.uri());

        let reply = service.execute(&input("cmd hello")).await.unwrap();
        assert_eq!(reply, "done");
    }

    #[tokio::test]
    async fn compressed_query_arg_repeats_the_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("k", "a"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let mut compressed = arg(0, "query", "k");
        compressed.compress_rest = true;
        let command = CommandConfig {
            pattern: None,
            method: "get".to_string(),
            endpoint: "/list".to_string(),
            args: vec![compressed],
            response: ResponseConfig::default(),
        };
        let service = service_with(command, &server.uri());

        service.execute(&input("cmd a b c")).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let raw_query = requests[0].url.query().unwrap();
        assert_eq!(raw_query, "k=a&k=b&k=c");
    }

    #[tokio::test]
    async fn json_compress_rest_builds_string_array() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(serde_json::json!({"items": ["a", "b", "c"]})))
            .respond_with(ResponseTemplate::new(200).set_body_string("stored"))
            .expect(1)
            .mount(&server)
            .await;

        let mut compressed = arg(0, "json", "items");
        compressed.compress_rest = true;
        let command = CommandConfig {
            pattern: None,
            method: "post".to_string(),
            endpoint: "/items".to_string(),
            args: vec![compressed],
            response: ResponseConfig::default(),
        };
        let service = service_with(command, &server.uri());

        service.execute(&input("cmd a b c")).await.unwrap();
    }

    #[tokio::test]
    async fn typed_json_args_land_at_dotted_paths() {
        let server = MockServer::start().await;
        Mock::given(method("post"))
            .and(body_json(serde_json::json!({
                "device": {"brightness": 80},
                "on": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let mut brightness = arg(0, "json", "device.brightness");
        brightness.datatype = Some("int".to_string());
        let mut on = arg(1, "json", "on");
        on.datatype = Some("bool".to_string());
        let command = CommandConfig {
            pattern: None,
            method: "post".to_string(),
            endpoint: "/set".to_string(),
            args: vec![brightness, on],
            response: ResponseConfig::default(),
        };
        let service = service_with(command, &server.uri());

        service.execute(&input("cmd 80 true")).await.unwrap();
    }

    #[tokio::test]
    async fn endpoint_args_extend_the_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/devices/kitchen/lamp"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let command = CommandConfig {
            pattern: None,
            method: "get".to_string(),
            endpoint: "/devices".to_string(),
            args: vec![arg(0, "endpoint", ""), arg(1, "endpoint", "")],
            response: ResponseConfig::default(),
        };
        let service = service_with(command, &server.uri());

        service.execute(&input("cmd kitchen lamp")).await.unwrap();
    }

    #[tokio::test]
    async fn filter_rejects_before_any_request() {
        let server = MockServer::start().await;
        let mut filtered = arg(0, "query", "state");
        filtered.filter = vec!["on".to_string(), "off".to_string()];
        let command = CommandConfig {
            pattern: None,
            method: "get".to_string(),
            endpoint: "/switch".to_string(),
            args: vec![filtered],
            response: ResponseConfig::default(),
        };
        let service = service_with(command, &server.uri());

        let err = service.execute(&input("cmd z")).await.unwrap_err();
        assert!(matches!(err, CatalogError::FilterRejected { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_args_fail_arity_check() {
        let server = MockServer::start().await;
        let command = CommandConfig {
            pattern: None,
            method: "get".to_string(),
            endpoint: "/x".to_string(),
            args: vec![arg(0, "query", "a"), arg(1, "query", "b")],
            response: ResponseConfig::default(),
        };
        let service = service_with(command, &server.uri());

        let err = service.execute(&input("cmd only-one")).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::ArgCount {
                expected: 2,
                given: 1
            }
        ));
    }

    #[tokio::test]
    async fn bad_int_arg_is_a_type_error() {
        let server = MockServer::start().await;
        let mut count = arg(0, "json", "count");
        count.datatype = Some("int".to_string());
        let command = CommandConfig {
            pattern: None,
            method: "post".to_string(),
            endpoint: "/x".to_string(),
            args: vec![count],
            response: ResponseConfig::default(),
        };
        let service = service_with(command, &server.uri());

        let err = service.execute(&input("cmd nope")).await.unwrap_err();
        assert!(matches!(err, CatalogError::BadArgType { .. }));
    }

    #[tokio::test]
    async fn json_success_projection_keeps_scalar_quotes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("Accept", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"value":"fixed","extra":1}"#),
            )
            .mount(&server)
            .await;

        let command = CommandConfig {
            pattern: None,
            method: "get".to_string(),
            endpoint: "/test".to_string(),
            args: Vec::new(),
            response: ResponseConfig {
                kind: Some("json".to_string()),
                success: TypeInfoConfig {
                    path: "value".to_string(),
                    datatype: Some("string".to_string()),
                },
                error: TypeInfoConfig::default(),
            },
        };
        let service = service_with(command, &server.uri());

        let reply = service.execute(&input("test")).await.unwrap();
        assert_eq!(reply, r#""fixed""#);
    }

    #[tokio::test]
    async fn json_error_projection_on_non_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_string(r#"{"message":"backend exploded"}"#),
            )
            .mount(&server)
            .await;

        let command = CommandConfig {
            pattern: None,
            method: "get".to_string(),
            endpoint: "/test".to_string(),
            args: Vec::new(),
            response: ResponseConfig {
                kind: Some("json".to_string()),
                success: TypeInfoConfig {
                    path: "value".to_string(),
                    datatype: None,
                },
                error: TypeInfoConfig {
                    path: "message".to_string(),
                    datatype: None,
                },
            },
        };
        let service = service_with(command, &server.uri());

        let err = service.execute(&input("test")).await.unwrap_err();
        assert_eq!(err.to_string(), r#""backend exploded""#);
    }

    #[tokio::test]
    async fn no_matching_pattern_is_reported() {
        let server = MockServer::start().await;
        let command = CommandConfig {
            pattern: Some("^only this$".to_string()),
            method: "get".to_string(),
            endpoint: "/x".to_string(),
            args: Vec::new(),
            response: ResponseConfig::default(),
        };
        let service = service_with(command, &server.uri());

        let err = service.execute(&input("something else")).await.unwrap_err();
        assert!(matches!(err, CatalogError::NoMatchingCommand));
    }

    #[tokio::test]
    async fn first_declared_pattern_wins() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/first"))
            .respond_with(ResponseTemplate::new(200).set_body_string("first"))
            .expect(1)
            .mount(&server)
            .await;

        let commands = vec![
            CommandConfig {
                pattern: Some("^cmd".to_string()),
                method: "get".to_string(),
                endpoint: "/first".to_string(),
                args: Vec::new(),
                response: ResponseConfig::default(),
            },
            CommandConfig {
                pattern: None,
                method: "get".to_string(),
                endpoint: "/fallback".to_string(),
                args: Vec::new(),
                response: ResponseConfig::default(),
            },
        ];
        let service = Service::from_config(&ServiceConfig {
            name: "test".to_string(),
            base_uri: server.uri(),
            client_numbers: Vec::new(),
            commands,
        })
        .unwrap();

        let reply = service.execute(&input("cmd now")).await.unwrap();
        assert_eq!(reply, "first");
    }

    #[test]
    fn duplicate_patterns_rejected_at_build() {
        let command = CommandConfig {
            pattern: Some("^x".to_string()),
            method: "get".to_string(),
            endpoint: "/x".to_string(),
            args: Vec::new(),
            response: ResponseConfig::default(),
        };
        let result = Service::from_config(&ServiceConfig {
            name: "test".to_string(),
            base_uri: "http://localhost".to_string(),
            client_numbers: Vec::new(),
            commands: vec![command.clone(), command],
        });
        assert!(matches!(result, Err(CatalogError::InvalidSpec(_))));
    }
}
