//! Generic endpoint access

use tracing::debug;

use super::common::build_args;
use crate::api::endpoints::catalog;
use crate::api::{Endpoint, EndpointKind};
use crate::cli::args::CallArgs;
use crate::cli::OutputFormat;
use crate::error::{PunchlineError, Result};
use crate::output;
use crate::store::ApiStore;

/// Handle the call command. Queries go through the cache, mutations
/// invalidate what they declare.
pub async fn call(store: &ApiStore, args: &CallArgs, format: OutputFormat) -> Result<String> {
    let endpoint = store.registry().get(&args.endpoint)?;
    let call_args = build_args(&args.params, &args.query, args.body.as_deref())?;
    debug!(endpoint = %args.endpoint, args = %call_args, "calling endpoint");

    let value = match endpoint.kind() {
        EndpointKind::Query => store
            .query(&args.endpoint, call_args)
            .await?
            .into_result()
            .map_err(|error| PunchlineError::from_query(error, "resource", &args.endpoint))?,
        EndpointKind::Mutation => store
            .use_mutation(&args.endpoint)?
            .trigger(call_args)
            .await
            .map_err(|error| PunchlineError::from_query(error, "resource", &args.endpoint))?,
    };

    output::format_value(&value, format)
}

/// Handle the endpoints command. Needs no API connection.
pub fn endpoints(format: OutputFormat) -> Result<String> {
    let catalog = catalog();
    let listing: Vec<&dyn Endpoint> = catalog.iter().map(|e| e as &dyn Endpoint).collect();
    output::format_endpoints(&listing, format)
}
