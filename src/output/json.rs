use serde::Serialize;

use crate::api::{Endpoint, EndpointKind, HttpMethod};
use crate::error::Result;

/// Machine-readable view of one registered endpoint
#[derive(Debug, Serialize)]
pub struct EndpointSummary<'a> {
    pub name: &'a str,
    pub kind: EndpointKind,
    pub method: HttpMethod,
    pub path: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invalidates: Vec<String>,
}

pub fn endpoint_summaries<'a>(endpoints: &[&'a dyn Endpoint]) -> Vec<EndpointSummary<'a>> {
    endpoints
        .iter()
        .map(|&endpoint| EndpointSummary {
            name: endpoint.name(),
            kind: endpoint.kind(),
            method: endpoint.method(),
            path: endpoint.path(),
            provides: endpoint.provides_templates().iter().map(ToString::to_string).collect(),
            invalidates: endpoint
                .invalidates_templates()
                .iter()
                .map(ToString::to_string)
                .collect(),
        })
        .collect()
}

/// Format the endpoint catalog as JSON
pub fn format_endpoints(endpoints: &[&dyn Endpoint]) -> Result<String> {
    format_json(&endpoint_summaries(endpoints))
}

/// Format any serializable value as JSON
pub fn format_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
