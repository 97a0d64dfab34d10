mod client;
pub mod endpoint;
pub mod endpoints;
pub mod routes;
pub mod types;

pub use client::{ApiClient, Transport};
pub use endpoint::{
    Args, Endpoint, EndpointKind, EndpointRegistry, HttpMethod, HttpRequest, RegistryError,
    RestEndpoint, TagTemplate,
};
pub use routes::{parse_route, Route};

#[cfg(test)]
pub(crate) use client::mock;
