//! The listings API catalog

use std::rc::Rc;

use super::client::Transport;
use super::endpoint::{EndpointRegistry, HttpMethod, RegistryError, RestEndpoint, TagTemplate};

const fn host() -> TagTemplate {
    TagTemplate::Param {
        kind: "Host",
        param: "host_uid",
    }
}

const fn venue() -> TagTemplate {
    TagTemplate::Param {
        kind: "Venue",
        param: "venue_uid",
    }
}

const fn room() -> TagTemplate {
    TagTemplate::Param {
        kind: "Room",
        param: "room_uid",
    }
}

const fn event() -> TagTemplate {
    TagTemplate::Param {
        kind: "Event",
        param: "event_uid",
    }
}

const fn artist() -> TagTemplate {
    TagTemplate::Param {
        kind: "Artist",
        param: "artist_uid",
    }
}

const NEXT_REVISION: TagTemplate = TagTemplate::Fixed {
    kind: "Revision",
    id: "findNextEventToRevise",
};

const VENUE_PATH: &str = "/host/{host_uid}/venue/{venue_uid}";
const VENUE_IMAGE_PATH: &str = "/host/{host_uid}/venue/{venue_uid}/venue-image/{venue_image_uid}";
const ROOM_PATH: &str = "/host/{host_uid}/venue/{venue_uid}/room/{room_uid}";
const EVENT_ARTIST_PATH: &str =
    "/host/{host_uid}/venue/{venue_uid}/event/{event_uid}/artist/{artist_uid}";

/// Every endpoint the backend exposes
pub fn catalog() -> Vec<RestEndpoint> {
    use HttpMethod::*;

    vec![
        // Hosts
        RestEndpoint::query("findAllHosts", "/host"),
        RestEndpoint::query("findOneHost", "/host/{host_uid}").provides(host()),
        RestEndpoint::mutation("updateHost", Put, "/host/{host_uid}").invalidates(host()),
        // Venues
        RestEndpoint::mutation("createVenue", Post, "/host/{host_uid}/venue").invalidates(host()),
        RestEndpoint::query("findOneVenue", VENUE_PATH).provides(venue()),
        RestEndpoint::mutation("updateVenue", Put, VENUE_PATH)
            .invalidates(host())
            .invalidates(venue()),
        RestEndpoint::mutation("deleteVenue", Delete, VENUE_PATH).invalidates(host()),
        // Venue images
        RestEndpoint::mutation(
            "createVenueImage",
            Post,
            "/host/{host_uid}/venue/{venue_uid}/venue-image",
        )
        .invalidates(host())
        .invalidates(venue()),
        RestEndpoint::mutation("updateVenueImage", Put, VENUE_IMAGE_PATH)
            .invalidates(host())
            .invalidates(venue()),
        RestEndpoint::mutation("deleteVenueImage", Delete, VENUE_IMAGE_PATH)
            .invalidates(host())
            .invalidates(venue()),
        // Rooms
        RestEndpoint::mutation("createRoom", Post, "/host/{host_uid}/venue/{venue_uid}/room")
            .invalidates(host())
            .invalidates(venue()),
        RestEndpoint::query("findOneRoom", ROOM_PATH).provides(room()),
        RestEndpoint::mutation("updateRoom", Put, ROOM_PATH)
            .invalidates(host())
            .invalidates(venue())
            .invalidates(room()),
        RestEndpoint::mutation("deleteRoom", Delete, ROOM_PATH)
            .invalidates(host())
            .invalidates(venue()),
        // Events
        RestEndpoint::query("findAllEvents", "/event"),
        RestEndpoint::query("findOneEvent", "/event/{event_uid}").provides(event()),
        RestEndpoint::mutation("addArtist", Post, EVENT_ARTIST_PATH).invalidates(event()),
        RestEndpoint::mutation("dropArtist", Delete, EVENT_ARTIST_PATH).invalidates(event()),
        // Artists
        RestEndpoint::query("findOneArtist", "/artist/{artist_uid}").provides(artist()),
        RestEndpoint::mutation("createArtist", Post, "/artist")
            .invalidates(TagTemplate::General("SearchArtists")),
        RestEndpoint::mutation("updateArtist", Put, "/artist/{artist_uid}").invalidates(artist()),
        RestEndpoint::mutation("deleteArtist", Delete, "/artist/{artist_uid}").invalidates(artist()),
        // Revisions
        RestEndpoint::query("findNextEventToRevise", "/revision/event").provides(NEXT_REVISION),
        RestEndpoint::mutation(
            "markEventAsRevised",
            Patch,
            "/revision/event/{event_uid}/mark-as-revised",
        )
        .invalidates(NEXT_REVISION),
        RestEndpoint::mutation(
            "undoLastEventRevision",
            Patch,
            "/revision/event/undo-last-revision",
        )
        .invalidates(NEXT_REVISION),
        // Search
        RestEndpoint::query("searchArtists", "/search/artists")
            .provides(TagTemplate::General("SearchArtists")),
        RestEndpoint::query("searchVenues", "/search/venues")
            .provides(TagTemplate::General("SearchVenues")),
        // Location lookups, proxied over POST
        RestEndpoint::query("autocompletePlace", "/location/autocomplete-place").with_method(Post),
        RestEndpoint::query("getLocationDetailsByPlaceId", "/location/place-details")
            .with_method(Post),
        RestEndpoint::query("getPolygonForPlace", "/location/place-polygon").with_method(Post),
    ]
}

/// A registry holding the whole catalog
pub fn registry(transport: Rc<dyn Transport>) -> Result<EndpointRegistry, RegistryError> {
    let mut registry = EndpointRegistry::new(transport);
    for endpoint in catalog() {
        registry.register(endpoint)?;
    }
    Ok(registry)
}
