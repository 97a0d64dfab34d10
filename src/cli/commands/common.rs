//! Helpers shared by the listing commands

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::Args;
use crate::error::{PunchlineError, Result};
use crate::store::ApiStore;

/// Run a query to completion and decode its payload.
///
/// `kind` and `id` name the resource in a not-found error.
pub async fn load<T: DeserializeOwned>(
    store: &ApiStore,
    endpoint: &str,
    args: Value,
    kind: &'static str,
    id: &str,
) -> Result<T> {
    let value = load_value(store, endpoint, args, kind, id).await?;
    Ok(serde_json::from_value(value)?)
}

/// Like [`load`] but keeps the raw JSON
pub async fn load_value(
    store: &ApiStore,
    endpoint: &str,
    args: Value,
    kind: &'static str,
    id: &str,
) -> Result<Value> {
    let state = store.query(endpoint, args).await?;
    state
        .into_result()
        .map_err(|error| PunchlineError::from_query(error, kind, id))
}

/// Assemble call arguments from `key=value` pairs and an optional JSON body
pub fn build_args(
    params: &[(String, String)],
    query: &[(String, String)],
    body: Option<&str>,
) -> Result<Value> {
    let mut args = Args::new();
    for (key, value) in params {
        args = args.param(key, value);
    }
    for (key, value) in query {
        args = args.query(key, value.as_str());
    }
    if let Some(body) = body {
        let body: Value = serde_json::from_str(body).map_err(|e| {
            PunchlineError::InvalidArgument(format!("--body is not valid JSON: {e}"))
        })?;
        args = args.body(body);
    }
    Ok(args.into_value())
}
