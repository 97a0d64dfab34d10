use serde_json::json;

use super::common::{load, load_value};
use crate::api::types::{LocationDetails, SearchResponse};
use crate::api::Args;
use crate::cli::args::{LocationArgs, LocationCommands, SearchArgs};
use crate::cli::OutputFormat;
use crate::error::{PunchlineError, Result};
use crate::output;
use crate::store::ApiStore;

/// Handle the search command
pub async fn search(store: &ApiStore, args: &SearchArgs, format: OutputFormat) -> Result<String> {
    if args.query.trim().is_empty() {
        return Err(PunchlineError::InvalidArgument(
            "search text cannot be empty".to_string(),
        ));
    }

    let query = Args::new().query("q", args.query.as_str()).into_value();
    let response: SearchResponse =
        load(store, args.target.endpoint(), query, "search results", &args.query).await?;
    output::format_search(&response, format)
}

/// Handle the location command
pub async fn location(store: &ApiStore, args: &LocationArgs, format: OutputFormat) -> Result<String> {
    match &args.command {
        LocationCommands::Autocomplete { text } => {
            let body = Args::new().body(json!({ "searchText": text })).into_value();
            let suggestions = load_value(store, "autocompletePlace", body, "place", text).await?;
            output::format_value(&suggestions, format)
        }
        LocationCommands::Details { place_id } => {
            let body = Args::new().body(json!({ "place_id": place_id })).into_value();
            let details: LocationDetails =
                load(store, "getLocationDetailsByPlaceId", body, "place", place_id).await?;
            output::format_location(&details, format)
        }
        LocationCommands::Polygon { place_id } => {
            let body = Args::new().body(json!({ "place_id": place_id })).into_value();
            let polygon = load_value(store, "getPolygonForPlace", body, "place", place_id).await?;
            output::format_value(&polygon, format)
        }
    }
}
