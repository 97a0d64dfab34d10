//! Open command - resolve a web app link to the data its page shows

use colored::Colorize;

use super::common::load_value;
use crate::api::types::{Event, Host, Room, Venue};
use crate::api::{parse_route, Route};
use crate::cli::args::OpenArgs;
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::output;
use crate::store::ApiStore;

/// Handle the open command
pub async fn open(store: &ApiStore, args: &OpenArgs, format: OutputFormat) -> Result<String> {
    let route = parse_route(&args.url)?;
    let (endpoint, query) = route.query();
    let id = route_id(&route);

    let value = load_value(store, endpoint, query, route.description(), id).await?;

    let body = match &route {
        Route::Dashboard => output::format_hosts(&serde_json::from_value::<Vec<Host>>(value)?, format)?,
        Route::Host { .. } => output::format_host(&serde_json::from_value::<Host>(value)?, format)?,
        Route::Venue { .. } => output::format_venue(&serde_json::from_value::<Venue>(value)?, format)?,
        Route::Room { .. } => output::format_room(&serde_json::from_value::<Room>(value)?, format)?,
        Route::Event { .. } | Route::ReviseEvents { .. } => {
            if value.is_null() {
                return Ok("Nothing left to revise.".to_string());
            }
            output::format_event(&serde_json::from_value::<Event>(value)?, format)?
        }
    };

    match format {
        OutputFormat::Pretty => Ok(format!(
            "{} {}\n\n{}",
            "->".cyan(),
            route.to_path().dimmed(),
            body
        )),
        OutputFormat::Json => Ok(body),
    }
}

fn route_id(route: &Route) -> &str {
    match route {
        Route::Dashboard => "dashboard",
        Route::Host { host_uid } => host_uid,
        Route::Venue { venue_uid, .. } => venue_uid,
        Route::Room { room_uid, .. } => room_uid,
        Route::Event { event_uid } => event_uid,
        Route::ReviseEvents { event_uid } => event_uid.as_deref().unwrap_or("next"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTransport;
    use crate::cache::CacheConfig;
    use crate::error::PunchlineError;
    use serde_json::json;
    use std::rc::Rc;
    use tokio::task::LocalSet;

    fn open_args(url: &str) -> OpenArgs {
        OpenArgs {
            url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn test_open_venue_link() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(MockTransport::new());
                transport.respond(
                    "GET",
                    "/host/h1/venue/v1",
                    Ok(json!({"venue_uid": "v1", "name": "The Cellar"}).to_string()),
                );
                let store = ApiStore::with_catalog(transport.clone(), CacheConfig::default()).unwrap();

                let out = open(
                    &store,
                    &open_args("https://listings.example.com/host/h1/venue/v1"),
                    OutputFormat::Json,
                )
                .await
                .unwrap();
                assert!(out.contains("The Cellar"));
            })
            .await;
    }

    #[tokio::test]
    async fn test_open_revise_with_nothing_left() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(MockTransport::new());
                transport.respond("GET", "/revision/event", Ok(String::new()));
                let store = ApiStore::with_catalog(transport.clone(), CacheConfig::default()).unwrap();

                let out = open(&store, &open_args("/revise-events"), OutputFormat::Pretty)
                    .await
                    .unwrap();
                assert_eq!(out, "Nothing left to revise.");
            })
            .await;
    }

    #[tokio::test]
    async fn test_open_unknown_link() {
        let transport = Rc::new(MockTransport::new());
        let store = ApiStore::with_catalog(transport, CacheConfig::default()).unwrap();

        let err = open(&store, &open_args("/nowhere/at/all"), OutputFormat::Pretty)
            .await
            .unwrap_err();
        assert!(matches!(err, PunchlineError::InvalidArgument(_)));
    }
}
