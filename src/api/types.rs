//! Typed views of backend responses
//!
//! The cache stores raw JSON; these are decoded on the way to the terminal.
//! Nested relations are only partially populated depending on the endpoint,
//! so most of them default to empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comedy show producer owning venues
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub host_uid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub host_type: Option<String>,
    pub description: Option<String>,
    pub profile_image_url: Option<String>,
    pub website_url: Option<String>,
    pub instagram_handle: Option<String>,
    #[serde(default)]
    pub venues: Vec<Venue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub venue_uid: String,
    pub name: String,
    pub description: Option<String>,
    pub profile_image_url: Option<String>,
    pub place_id: Option<String>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub host: Option<Box<Host>>,
    #[serde(default)]
    pub venue_images: Vec<VenueImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub room_uid: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueImage {
    pub venue_image_uid: String,
    pub url: String,
    pub tag: Option<String>,
}

/// One show in a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_uid: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub room: Option<Room>,
    #[serde(default)]
    pub venue: Option<Venue>,
    pub doors_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sold_out: Option<bool>,
    #[serde(default)]
    pub twenty_one_plus: bool,
    pub ticket_link: Option<String>,
    pub event_link: Option<String>,
    #[serde(default)]
    pub artists: Vec<EventArtistLink>,
}

impl Event {
    /// Names of the artists on the lineup, in billing order
    pub fn lineup(&self) -> Vec<&str> {
        self.artists.iter().map(|link| link.artist.name.as_str()).collect()
    }

    /// Whether `artist_uid` is already on the lineup
    pub fn has_artist(&self, artist_uid: &str) -> bool {
        self.artists
            .iter()
            .any(|link| link.artist.artist_uid == artist_uid)
    }

    /// `(host_uid, venue_uid)` needed by lineup mutations
    pub fn owner_ids(&self) -> Option<(&str, &str)> {
        let venue = self.venue.as_ref()?;
        let host = venue.host.as_ref()?;
        Some((host.host_uid.as_str(), venue.venue_uid.as_str()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventArtistLink {
    pub event_artist_link_uid: String,
    pub artist: Artist,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub artist_uid: String,
    pub name: String,
    pub profile_image_url: Option<String>,
}

/// Search hit for either artists or venues
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(alias = "artist_uid", alias = "venue_uid")]
    pub uid: String,
    pub name: String,
    #[serde(rename = "searchType")]
    pub search_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub query: String,
    #[serde(default)]
    pub estimated_total_hits: Option<u64>,
    #[serde(default)]
    pub processing_time_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationDetails {
    pub google_place_id: String,
    pub name: String,
    pub formatted_address: String,
    pub latitude: f64,
    pub longitude: f64,
}
