//! Web app link parsing
//!
//! Maps page links from the listings web app onto the query that page runs:
//! - `/host/{host_uid}`
//! - `/host/{host_uid}/venue/{venue_uid}`
//! - `/host/{host_uid}/venue/{venue_uid}/room/{room_uid}`
//! - `/event/{event_uid}`
//! - `/revise-events?event_uid={event_uid}`
//! - `/dashboard`
//!
//! Full URLs and bare paths are both accepted.

use serde_json::Value;
use url::Url;

use super::endpoint::Args;
use crate::error::{PunchlineError, Result};

/// A parsed web app page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    Host {
        host_uid: String,
    },
    Venue {
        host_uid: String,
        venue_uid: String,
    },
    Room {
        host_uid: String,
        venue_uid: String,
        room_uid: String,
    },
    Event {
        event_uid: String,
    },
    ReviseEvents {
        event_uid: Option<String>,
    },
}

impl Route {
    /// The endpoint and arguments the page loads
    pub fn query(&self) -> (&'static str, Value) {
        match self {
            Route::Dashboard => ("findAllHosts", Value::Null),
            Route::Host { host_uid } => ("findOneHost", Args::new().param("host_uid", host_uid).into()),
            Route::Venue {
                host_uid,
                venue_uid,
            } => (
                "findOneVenue",
                Args::new()
                    .param("host_uid", host_uid)
                    .param("venue_uid", venue_uid)
                    .into(),
            ),
            Route::Room {
                host_uid,
                venue_uid,
                room_uid,
            } => (
                "findOneRoom",
                Args::new()
                    .param("host_uid", host_uid)
                    .param("venue_uid", venue_uid)
                    .param("room_uid", room_uid)
                    .into(),
            ),
            Route::Event { event_uid } | Route::ReviseEvents { event_uid: Some(event_uid) } => (
                "findOneEvent",
                Args::new().param("event_uid", event_uid).into(),
            ),
            Route::ReviseEvents { event_uid: None } => ("findNextEventToRevise", Value::Null),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Route::Dashboard => "dashboard",
            Route::Host { .. } => "host",
            Route::Venue { .. } => "venue",
            Route::Room { .. } => "room",
            Route::Event { .. } => "event",
            Route::ReviseEvents { .. } => "revise-events",
        }
    }

    /// Path of the page in the web app
    pub fn to_path(&self) -> String {
        match self {
            Route::Dashboard => "/dashboard".to_string(),
            Route::Host { host_uid } => format!("/host/{host_uid}"),
            Route::Venue {
                host_uid,
                venue_uid,
            } => format!("/host/{host_uid}/venue/{venue_uid}"),
            Route::Room {
                host_uid,
                venue_uid,
                room_uid,
            } => format!("/host/{host_uid}/venue/{venue_uid}/room/{room_uid}"),
            Route::Event { event_uid } => format!("/event/{event_uid}"),
            Route::ReviseEvents { event_uid: None } => "/revise-events".to_string(),
            Route::ReviseEvents {
                event_uid: Some(event_uid),
            } => format!("/revise-events?event_uid={event_uid}"),
        }
    }
}

/// Parse a web app link into a [`Route`]
pub fn parse_route(input: &str) -> Result<Route> {
    let input = input.trim();
    let url = match Url::parse(input) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) if input.starts_with('/') => {
            Url::parse("http://localhost")
                .and_then(|base| base.join(input))
                .map_err(|_| PunchlineError::InvalidArgument(format!("Invalid link: {input}")))?
        }
        Err(_) => {
            return Err(PunchlineError::InvalidArgument(format!(
                "Invalid link: {input}"
            )))
        }
    };

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|segment| !segment.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        ["dashboard"] => Ok(Route::Dashboard),
        ["host", host] => Ok(Route::Host {
            host_uid: host.to_string(),
        }),
        ["host", host, "venue", venue] => Ok(Route::Venue {
            host_uid: host.to_string(),
            venue_uid: venue.to_string(),
        }),
        ["host", host, "venue", venue, "room", room] => Ok(Route::Room {
            host_uid: host.to_string(),
            venue_uid: venue.to_string(),
            room_uid: room.to_string(),
        }),
        ["event", event] => Ok(Route::Event {
            event_uid: event.to_string(),
        }),
        ["revise-events"] => Ok(Route::ReviseEvents {
            event_uid: url
                .query_pairs()
                .find(|(key, value)| key == "event_uid" && !value.is_empty())
                .map(|(_, value)| value.into_owned()),
        }),
        _ => Err(PunchlineError::InvalidArgument(format!(
            "Unrecognized link: {input}. Expected /host/{{host}}[/venue/{{venue}}[/room/{{room}}]], /event/{{event}}, /revise-events or /dashboard"
        ))),
    }
}
