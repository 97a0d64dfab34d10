pub mod json;
pub mod pretty;

use serde_json::Value;

use crate::api::types::{Artist, Event, Host, LocationDetails, Room, SearchResponse, Venue};
use crate::api::Endpoint;
use crate::cli::OutputFormat;
use crate::error::Result;

/// Format the host directory
pub fn format_hosts(hosts: &[Host], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_hosts(hosts)),
        OutputFormat::Json => json::format_json(&hosts),
    }
}

/// Format a single host with its venues
pub fn format_host(host: &Host, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_host(host)),
        OutputFormat::Json => json::format_json(host),
    }
}

pub fn format_venue(venue: &Venue, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_venue(venue)),
        OutputFormat::Json => json::format_json(venue),
    }
}

pub fn format_room(room: &Room, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_room(room)),
        OutputFormat::Json => json::format_json(room),
    }
}

/// Format an event listing
pub fn format_events(events: &[Event], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_events(events)),
        OutputFormat::Json => json::format_json(&events),
    }
}

/// Format one event with its lineup
pub fn format_event(event: &Event, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_event(event)),
        OutputFormat::Json => json::format_json(event),
    }
}

pub fn format_artist(artist: &Artist, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_artist(artist)),
        OutputFormat::Json => json::format_json(artist),
    }
}

/// Format search hits for artists or venues
pub fn format_search(response: &SearchResponse, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_search(response)),
        OutputFormat::Json => json::format_json(response),
    }
}

pub fn format_location(details: &LocationDetails, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_location(details)),
        OutputFormat::Json => json::format_json(details),
    }
}

/// Format the endpoint catalog
pub fn format_endpoints(endpoints: &[&dyn Endpoint], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_endpoints(endpoints)),
        OutputFormat::Json => json::format_endpoints(endpoints),
    }
}

/// Format an arbitrary response payload
pub fn format_value(value: &Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_value(value)),
        OutputFormat::Json => json::format_json(value),
    }
}
