use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use serde_json::Value;

use crate::api::types::{Artist, Event, Host, LocationDetails, Room, SearchResponse, Venue};
use crate::api::{Endpoint, EndpointKind};

/// Truncate to `max_chars` characters, appending "..." when cut.
/// Safe for multi-byte UTF-8.
fn truncate_str(s: &str, max_chars: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > max_chars {
        let truncated: String = chars.iter().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

/// Show time in the local zone, e.g. "Fri Oct 16, 8:00 PM"
fn format_show_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%a %b %-d, %-I:%M %p").to_string()
}

fn header(title: &str, width: usize) -> String {
    format!("{}\n{}\n", title.bold(), "─".repeat(width))
}

/// Format the host directory for pretty output
pub fn format_hosts(hosts: &[Host]) -> String {
    if hosts.is_empty() {
        return "No hosts found.".to_string();
    }

    let mut output = header("Hosts", 70);
    for host in hosts {
        output.push_str(&format!("{}\n", host.name.bold()));
        output.push_str(&format!("  {} {}\n", "Id:".cyan(), host.host_uid));
        if let Some(ref host_type) = host.host_type {
            output.push_str(&format!("  {} {}\n", "Type:".cyan(), host_type));
        }
        if !host.venues.is_empty() {
            let names: Vec<&str> = host.venues.iter().map(|v| v.name.as_str()).collect();
            output.push_str(&format!(
                "  {} {}\n",
                "Venues:".cyan(),
                truncate_str(&names.join(", "), 60)
            ));
        }
        output.push('\n');
    }

    output
}

/// Format a single host for pretty output
pub fn format_host(host: &Host) -> String {
    let mut output = header(&host.name, 50);

    output.push_str(&format!("{} {}\n", "Id:".cyan(), host.host_uid));
    if let Some(ref host_type) = host.host_type {
        output.push_str(&format!("{} {}\n", "Type:".cyan(), host_type));
    }
    if let Some(ref website) = host.website_url {
        output.push_str(&format!("{} {}\n", "Website:".cyan(), website));
    }
    if let Some(ref handle) = host.instagram_handle {
        output.push_str(&format!("{} @{}\n", "Instagram:".cyan(), handle.trim_start_matches('@')));
    }
    if let Some(ref description) = host.description {
        output.push_str(&format!("\n{}\n", description));
    }

    if host.venues.is_empty() {
        output.push_str(&format!("\n{}\n", "No venues yet.".dimmed()));
        return output;
    }

    output.push_str(&format!("\n{}\n", "Venues".bold()));
    for venue in &host.venues {
        output.push_str(&format!(
            "  {} {}\n",
            venue.name,
            format!("({})", venue.venue_uid).dimmed()
        ));
        for room in &venue.rooms {
            output.push_str(&format!(
                "    {} {} {}\n",
                "↳".dimmed(),
                room.name,
                format!("({})", room.room_uid).dimmed()
            ));
        }
    }

    output
}

pub fn format_venue(venue: &Venue) -> String {
    let mut output = header(&venue.name, 50);

    output.push_str(&format!("{} {}\n", "Id:".cyan(), venue.venue_uid));
    if let Some(ref host) = venue.host {
        output.push_str(&format!("{} {} ({})\n", "Host:".cyan(), host.name, host.host_uid));
    }
    if let Some(ref place_id) = venue.place_id {
        output.push_str(&format!("{} {}\n", "Place:".cyan(), place_id.dimmed()));
    }
    if let Some(ref description) = venue.description {
        output.push_str(&format!("\n{}\n", description));
    }

    if !venue.rooms.is_empty() {
        output.push_str(&format!("\n{}\n", "Rooms".bold()));
        for room in &venue.rooms {
            output.push_str(&format!(
                "  {} {}\n",
                room.name,
                format!("({})", room.room_uid).dimmed()
            ));
        }
    }

    if !venue.venue_images.is_empty() {
        output.push_str(&format!("\n{}\n", "Images".bold()));
        for image in &venue.venue_images {
            let tag = image.tag.as_deref().unwrap_or("untagged");
            output.push_str(&format!("  [{}] {}\n", tag.yellow(), image.url.dimmed()));
        }
    }

    output
}

pub fn format_room(room: &Room) -> String {
    let mut output = header(&room.name, 50);
    output.push_str(&format!("{} {}\n", "Id:".cyan(), room.room_uid));
    if let Some(ref description) = room.description {
        output.push_str(&format!("\n{}\n", description));
    }
    output
}

/// Format an event listing for pretty output
pub fn format_events(events: &[Event]) -> String {
    if events.is_empty() {
        return "No events found.".to_string();
    }

    let mut output = header("Events", 80);
    output.push_str(&format!(
        "{:<24} {:<32} {}\n",
        "WHEN".dimmed(),
        "NAME".dimmed(),
        "WHERE".dimmed()
    ));

    for event in events {
        let when = event
            .start_time
            .as_ref()
            .map(format_show_time)
            .unwrap_or_else(|| "TBA".to_string());
        let place = match (&event.venue, &event.room) {
            (Some(venue), Some(room)) => format!("{} / {}", venue.name, room.name),
            (Some(venue), None) => venue.name.clone(),
            (None, Some(room)) => room.name.clone(),
            (None, None) => String::new(),
        };

        let mut name = truncate_str(&event.name, 32).normal();
        if event.sold_out == Some(true) {
            name = name.red();
        }
        output.push_str(&format!(
            "{:<24} {:<32} {}\n",
            when,
            name,
            truncate_str(&place, 30).dimmed()
        ));
        output.push_str(&format!("  {}\n", event.event_uid.dimmed()));
    }

    output
}

/// Format one event for pretty output
pub fn format_event(event: &Event) -> String {
    let mut output = String::new();

    let mut badges = Vec::new();
    if event.sold_out == Some(true) {
        badges.push("sold out".red().to_string());
    }
    if event.twenty_one_plus {
        badges.push("21+".yellow().to_string());
    }
    if badges.is_empty() {
        output.push_str(&format!("{}\n", event.name.bold()));
    } else {
        output.push_str(&format!("{} [{}]\n", event.name.bold(), badges.join(", ")));
    }
    output.push_str(&"─".repeat(50));
    output.push('\n');

    output.push_str(&format!("{} {}\n", "Id:".cyan(), event.event_uid));
    if let Some(ref venue) = event.venue {
        output.push_str(&format!("{} {}\n", "Venue:".cyan(), venue.name));
    }
    if let Some(ref room) = event.room {
        output.push_str(&format!("{} {}\n", "Room:".cyan(), room.name));
    }
    if let Some(ref doors) = event.doors_time {
        output.push_str(&format!("{} {}\n", "Doors:".cyan(), format_show_time(doors)));
    }
    if let Some(ref start) = event.start_time {
        output.push_str(&format!("{} {}\n", "Starts:".cyan(), format_show_time(start)));
    }
    if let Some(ref end) = event.end_time {
        output.push_str(&format!("{} {}\n", "Ends:".cyan(), format_show_time(end)));
    }
    if let Some(ref link) = event.ticket_link {
        output.push_str(&format!("{} {}\n", "Tickets:".cyan(), link));
    }
    if let Some(ref link) = event.event_link {
        output.push_str(&format!("{} {}\n", "Link:".cyan(), link.dimmed()));
    }
    if let Some(ref description) = event.description {
        output.push_str(&format!("\n{}\n", description));
    }

    output.push_str(&format!("\n{}\n", "Lineup".bold()));
    if event.artists.is_empty() {
        output.push_str(&format!("  {}\n", "No artists announced.".dimmed()));
    }
    for (i, link) in event.artists.iter().enumerate() {
        output.push_str(&format!(
            "  {:>2}. {} {}\n",
            i + 1,
            link.artist.name,
            format!("({})", link.artist.artist_uid).dimmed()
        ));
    }

    output
}

pub fn format_artist(artist: &Artist) -> String {
    let mut output = header(&artist.name, 50);
    output.push_str(&format!("{} {}\n", "Id:".cyan(), artist.artist_uid));
    if let Some(ref image) = artist.profile_image_url {
        output.push_str(&format!("{} {}\n", "Image:".cyan(), image.dimmed()));
    }
    output
}

/// Format search hits for pretty output
pub fn format_search(response: &SearchResponse) -> String {
    if response.hits.is_empty() {
        return format!("No matches for '{}'.", response.query);
    }

    let total = response
        .estimated_total_hits
        .unwrap_or(response.hits.len() as u64);
    let mut output = header(&format!("Results for '{}' ({})", response.query, total), 60);

    for hit in &response.hits {
        output.push_str(&format!("{:<36} {}\n", truncate_str(&hit.name, 36), hit.uid.dimmed()));
    }

    if let Some(ms) = response.processing_time_ms {
        output.push_str(&format!("\n{}\n", format!("{ms}ms").dimmed()));
    }

    output
}

pub fn format_location(details: &LocationDetails) -> String {
    let mut output = header(&details.name, 50);
    output.push_str(&format!("{} {}\n", "Address:".cyan(), details.formatted_address));
    output.push_str(&format!(
        "{} {:.6}, {:.6}\n",
        "Coordinates:".cyan(),
        details.latitude,
        details.longitude
    ));
    output.push_str(&format!("{} {}\n", "Place id:".cyan(), details.google_place_id.dimmed()));
    output
}

/// Format the endpoint catalog for pretty output
pub fn format_endpoints(endpoints: &[&dyn Endpoint]) -> String {
    let mut output = header("Endpoints", 90);

    for kind in [EndpointKind::Query, EndpointKind::Mutation] {
        output.push_str(&format!("\n{}\n", format!("{kind}s").cyan()));
        for endpoint in endpoints.iter().filter(|e| e.kind() == kind) {
            let tags: Vec<String> = match kind {
                EndpointKind::Query => endpoint.provides_templates(),
                EndpointKind::Mutation => endpoint.invalidates_templates(),
            }
            .iter()
            .map(ToString::to_string)
            .collect();

            output.push_str(&format!(
                "  {:<28} {:<6} {}",
                endpoint.name(),
                endpoint.method().as_str(),
                endpoint.path()
            ));
            if !tags.is_empty() {
                let arrow = match kind {
                    EndpointKind::Query => "provides",
                    EndpointKind::Mutation => "invalidates",
                };
                output.push_str(&format!(" {}", format!("{arrow} {}", tags.join(", ")).dimmed()));
            }
            output.push('\n');
        }
    }

    output
}

/// Format a raw payload; `null` means the backend returned no content
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "(empty response)".dimmed().to_string(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
