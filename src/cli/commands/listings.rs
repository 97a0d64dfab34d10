//! Read-only listing commands: hosts, venues, rooms, events, artists

use serde_json::Value;

use super::common::load;
use crate::api::types::{Artist, Event, Host, Room, Venue};
use crate::api::Args;
use crate::cli::args::EventsArgs;
use crate::cli::OutputFormat;
use crate::duration::parse_event_date;
use crate::error::Result;
use crate::output;
use crate::store::ApiStore;

pub async fn hosts(store: &ApiStore, format: OutputFormat) -> Result<String> {
    let hosts: Vec<Host> = load(store, "findAllHosts", Value::Null, "hosts", "all").await?;
    output::format_hosts(&hosts, format)
}

pub async fn host(store: &ApiStore, host_uid: &str, format: OutputFormat) -> Result<String> {
    let args = Args::new().param("host_uid", host_uid).into_value();
    let host: Host = load(store, "findOneHost", args, "host", host_uid).await?;
    output::format_host(&host, format)
}

pub async fn venue(
    store: &ApiStore,
    host_uid: &str,
    venue_uid: &str,
    format: OutputFormat,
) -> Result<String> {
    let args = Args::new()
        .param("host_uid", host_uid)
        .param("venue_uid", venue_uid)
        .into_value();
    let venue: Venue = load(store, "findOneVenue", args, "venue", venue_uid).await?;
    output::format_venue(&venue, format)
}

pub async fn room(
    store: &ApiStore,
    host_uid: &str,
    venue_uid: &str,
    room_uid: &str,
    format: OutputFormat,
) -> Result<String> {
    let args = Args::new()
        .param("host_uid", host_uid)
        .param("venue_uid", venue_uid)
        .param("room_uid", room_uid)
        .into_value();
    let room: Room = load(store, "findOneRoom", args, "room", room_uid).await?;
    output::format_room(&room, format)
}

/// Filters become query string parameters; the date is sent as `YYYY-MM-DD`
pub fn events_args(args: &EventsArgs) -> Result<Value> {
    let mut query = Args::new();
    if let Some(ref host_uid) = args.host_uid {
        query = query.query("host_uid", host_uid.as_str());
    }
    if let Some(ref venue_uid) = args.venue_uid {
        query = query.query("venue_uid", venue_uid.as_str());
    }
    if let Some(ref room_uid) = args.room_uid {
        query = query.query("room_uid", room_uid.as_str());
    }
    if let Some(ref date) = args.date {
        let date = parse_event_date(date)?;
        query = query.query("date", date.format("%Y-%m-%d").to_string());
    }
    Ok(query.into_value())
}

pub async fn events(store: &ApiStore, args: &EventsArgs, format: OutputFormat) -> Result<String> {
    let query = events_args(args)?;
    let events: Vec<Event> = load(store, "findAllEvents", query, "events", "matching").await?;
    output::format_events(&events, format)
}

pub async fn event(store: &ApiStore, event_uid: &str, format: OutputFormat) -> Result<String> {
    let args = Args::new().param("event_uid", event_uid).into_value();
    let event: Event = load(store, "findOneEvent", args, "event", event_uid).await?;
    output::format_event(&event, format)
}

pub async fn artist(store: &ApiStore, artist_uid: &str, format: OutputFormat) -> Result<String> {
    let args = Args::new().param("artist_uid", artist_uid).into_value();
    let artist: Artist = load(store, "findOneArtist", args, "artist", artist_uid).await?;
    output::format_artist(&artist, format)
}
