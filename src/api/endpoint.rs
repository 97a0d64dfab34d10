//! Endpoint definitions and the registry that executes them

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use super::client::Transport;
use crate::cache::{FetchFn, FetchResult, Fetched, Fingerprint, QueryError, Tag};

// ─────────────────────────────────────────────────────────────────────────────
// Request description
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queries are cached and provide tags; mutations are not and invalidate them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Query,
    Mutation,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        })
    }
}

/// One HTTP call, relative to the API base URL
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Decoded path segments; the transport percent-encodes them
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Path as it would appear in the URL, for logs and errors
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// Builder for the `{ params, query, body }` argument object
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Args {
    #[serde(skip_serializing_if = "Map::is_empty")]
    params: Map<String, Value>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    query: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), Value::String(value.into()));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// The JSON argument value; no arguments at all is `null`
    pub fn into_value(self) -> Value {
        if self.params.is_empty() && self.query.is_empty() && self.body.is_none() {
            return Value::Null;
        }
        let mut out = Map::new();
        if !self.params.is_empty() {
            out.insert("params".into(), Value::Object(self.params));
        }
        if !self.query.is_empty() {
            out.insert("query".into(), Value::Object(self.query));
        }
        if let Some(body) = self.body {
            out.insert("body".into(), body);
        }
        Value::Object(out)
    }
}

impl From<Args> for Value {
    fn from(args: Args) -> Self {
        args.into_value()
    }
}

/// Read `args.params[name]` as a string
pub fn param<'a>(args: &'a Value, name: &str) -> Option<std::borrow::Cow<'a, str>> {
    match args.get("params")?.get(name)? {
        Value::String(s) if !s.is_empty() => Some(s.as_str().into()),
        Value::Number(n) => Some(n.to_string().into()),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Endpoint trait
// ─────────────────────────────────────────────────────────────────────────────

/// A single REST operation
pub trait Endpoint {
    fn name(&self) -> &str;

    fn kind(&self) -> EndpointKind;

    fn method(&self) -> HttpMethod;

    /// URL template, e.g. `/host/{host_uid}`
    fn path(&self) -> &str;

    fn build_request(&self, args: &Value) -> Result<HttpRequest, QueryError>;

    /// Decode a successful response body; an empty body is `null`
    fn parse_response(&self, body: &str) -> Result<Value, QueryError> {
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(body).map_err(|e| QueryError::Decode(e.to_string()))
    }

    /// Tags stamped on the cache entry when a query fulfills
    fn provides_tags(&self, args: &Value) -> Vec<Tag>;

    /// Tags invalidated when a mutation succeeds
    fn invalidates_tags(&self, args: &Value) -> Vec<Tag>;

    /// Unresolved provided tags, for listings
    fn provides_templates(&self) -> &[TagTemplate] {
        &[]
    }

    /// Unresolved invalidated tags, for listings
    fn invalidates_templates(&self) -> &[TagTemplate] {
        &[]
    }
}

/// A tag whose id may come from the call arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagTemplate {
    /// Every resource of a kind: `SearchArtists`
    General(&'static str),
    /// A fixed id: `Revision:findNextEventToRevise`
    Fixed {
        kind: &'static str,
        id: &'static str,
    },
    /// Id read from a path parameter: `Host:{host_uid}`
    Param {
        kind: &'static str,
        param: &'static str,
    },
}

impl TagTemplate {
    pub fn resolve(&self, args: &Value) -> Tag {
        match self {
            Self::General(kind) => Tag::general(*kind),
            Self::Fixed { kind, id } => Tag::specific(*kind, *id),
            Self::Param { kind, param: name } => match param(args, name) {
                Some(id) => Tag::specific(*kind, id),
                None => {
                    warn!(kind, param = name, "tag parameter missing, widening to general tag");
                    Tag::general(*kind)
                }
            },
        }
    }
}

impl fmt::Display for TagTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General(kind) => f.write_str(kind),
            Self::Fixed { kind, id } => write!(f, "{kind}:{id}"),
            Self::Param { kind, param } => write!(f, "{kind}:{{{param}}}"),
        }
    }
}

/// Declarative endpoint: method, path template and tag templates
#[derive(Debug, Clone)]
pub struct RestEndpoint {
    name: &'static str,
    kind: EndpointKind,
    method: HttpMethod,
    path: &'static str,
    provides: Vec<TagTemplate>,
    invalidates: Vec<TagTemplate>,
}

impl RestEndpoint {
    /// A GET query
    pub fn query(name: &'static str, path: &'static str) -> Self {
        Self {
            name,
            kind: EndpointKind::Query,
            method: HttpMethod::Get,
            path,
            provides: Vec::new(),
            invalidates: Vec::new(),
        }
    }

    pub fn mutation(name: &'static str, method: HttpMethod, path: &'static str) -> Self {
        Self {
            name,
            kind: EndpointKind::Mutation,
            method,
            path,
            provides: Vec::new(),
            invalidates: Vec::new(),
        }
    }

    /// Override the HTTP method (queries proxied over POST)
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn provides(mut self, tag: TagTemplate) -> Self {
        self.provides.push(tag);
        self
    }

    pub fn invalidates(mut self, tag: TagTemplate) -> Self {
        self.invalidates.push(tag);
        self
    }

    fn segments(&self, args: &Value) -> Result<Vec<String>, QueryError> {
        self.path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match placeholder(segment) {
                Some(name) => param(args, name).map(|value| value.into_owned()).ok_or_else(|| {
                    QueryError::Request(format!(
                        "{} requires path parameter '{name}'",
                        self.name
                    ))
                }),
                None => Ok(segment.to_string()),
            })
            .collect()
    }
}

fn placeholder(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}

fn query_pairs(args: &Value) -> Result<Vec<(String, String)>, QueryError> {
    let Some(query) = args.get("query") else {
        return Ok(Vec::new());
    };
    let Value::Object(map) = query else {
        return Err(QueryError::Request("'query' must be an object".into()));
    };

    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::String(s) => pairs.push((key.clone(), s.clone())),
            Value::Number(_) | Value::Bool(_) => pairs.push((key.clone(), value.to_string())),
            Value::Array(items) => {
                for item in items {
                    let item = match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    pairs.push((key.clone(), item));
                }
            }
            Value::Object(_) => {
                return Err(QueryError::Request(format!(
                    "query parameter '{key}' cannot be an object"
                )))
            }
        }
    }
    Ok(pairs)
}

impl Endpoint for RestEndpoint {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> EndpointKind {
        self.kind
    }

    fn method(&self) -> HttpMethod {
        self.method
    }

    fn path(&self) -> &str {
        self.path
    }

    fn build_request(&self, args: &Value) -> Result<HttpRequest, QueryError> {
        Ok(HttpRequest {
            method: self.method,
            segments: self.segments(args)?,
            query: query_pairs(args)?,
            body: args.get("body").filter(|body| !body.is_null()).cloned(),
        })
    }

    fn provides_tags(&self, args: &Value) -> Vec<Tag> {
        self.provides.iter().map(|t| t.resolve(args)).collect()
    }

    fn invalidates_tags(&self, args: &Value) -> Vec<Tag> {
        self.invalidates.iter().map(|t| t.resolve(args)).collect()
    }

    fn provides_templates(&self) -> &[TagTemplate] {
        &self.provides
    }

    fn invalidates_templates(&self) -> &[TagTemplate] {
        &self.invalidates
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Programming mistakes in the endpoint catalog or its callers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Endpoint '{0}' is already registered")]
    DuplicateEndpoint(String),

    #[error("Unknown endpoint '{0}'. Run 'punchline endpoints' to list them.")]
    UnknownEndpoint(String),

    #[error("Endpoint '{name}' is a {actual}, not a {expected}")]
    WrongKind {
        name: String,
        expected: EndpointKind,
        actual: EndpointKind,
    },
}

/// The catalog of endpoints plus the transport that executes them
pub struct EndpointRegistry {
    endpoints: Vec<Rc<dyn Endpoint>>,
    by_name: HashMap<String, usize>,
    transport: Rc<dyn Transport>,
}

impl EndpointRegistry {
    pub fn new(transport: Rc<dyn Transport>) -> Self {
        Self {
            endpoints: Vec::new(),
            by_name: HashMap::new(),
            transport,
        }
    }

    pub fn register<E>(&mut self, endpoint: E) -> Result<(), RegistryError>
    where
        E: Endpoint + 'static,
    {
        let name = endpoint.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateEndpoint(name));
        }
        self.by_name.insert(name, self.endpoints.len());
        self.endpoints.push(Rc::new(endpoint));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Rc<dyn Endpoint>, RegistryError> {
        self.by_name
            .get(name)
            .map(|&i| Rc::clone(&self.endpoints[i]))
            .ok_or_else(|| RegistryError::UnknownEndpoint(name.to_string()))
    }

    /// Like [`get`](Self::get) but also checks the endpoint kind
    pub fn get_as(&self, name: &str, expected: EndpointKind) -> Result<Rc<dyn Endpoint>, RegistryError> {
        let endpoint = self.get(name)?;
        if endpoint.kind() != expected {
            return Err(RegistryError::WrongKind {
                name: name.to_string(),
                expected,
                actual: endpoint.kind(),
            });
        }
        Ok(endpoint)
    }

    pub fn fingerprint(&self, name: &str, args: &Value) -> Result<Fingerprint, RegistryError> {
        self.get(name)?;
        Ok(Fingerprint::new(name, args))
    }

    /// Resolve `name` and return the future for one network call.
    ///
    /// The future never panics and never retries; HTTP and transport failures
    /// come back as [`QueryError`].
    pub fn execute(
        &self,
        name: &str,
        args: Value,
    ) -> Result<LocalBoxFuture<'static, FetchResult>, RegistryError> {
        let endpoint = self.get(name)?;
        Ok(self.call(endpoint, args))
    }

    /// One network call for an already resolved endpoint
    pub fn call(&self, endpoint: Rc<dyn Endpoint>, args: Value) -> LocalBoxFuture<'static, FetchResult> {
        send(endpoint, Rc::clone(&self.transport), args)
    }

    /// A reusable fetch function for the cache
    pub fn fetch_fn(&self, name: &str, args: Value) -> Result<FetchFn, RegistryError> {
        let endpoint = self.get(name)?;
        let transport = Rc::clone(&self.transport);
        Ok(Rc::new(move || {
            send(Rc::clone(&endpoint), Rc::clone(&transport), args.clone())
        }))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<dyn Endpoint>> {
        self.endpoints.iter()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

fn send(
    endpoint: Rc<dyn Endpoint>,
    transport: Rc<dyn Transport>,
    args: Value,
) -> LocalBoxFuture<'static, FetchResult> {
    async move {
        let request = endpoint.build_request(&args)?;
        debug!(
            endpoint = endpoint.name(),
            method = %request.method,
            path = %request.path(),
            "sending request"
        );
        let body = transport.send(request).await?;
        let data = endpoint.parse_response(&body)?;
        let tags = match endpoint.kind() {
            EndpointKind::Query => endpoint.provides_tags(&args),
            EndpointKind::Mutation => Vec::new(),
        };
        Ok(Fetched::new(data, tags))
    }
    .boxed_local()
}
