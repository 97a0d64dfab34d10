//! Client-side query cache for the comedy listings API, and the `punchline`
//! CLI built on it.
//!
//! Queries are de-duplicated by fingerprint, shared between subscribers,
//! tagged with the resources they return, and refetched when a mutation
//! invalidates one of those tags. Everything runs on one thread; futures and
//! timers are spawned with [`tokio::task::spawn_local`], so drive the store
//! from inside a [`tokio::task::LocalSet`].

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod duration;
pub mod error;
pub mod output;
pub mod store;
pub mod telemetry;

pub use store::{ApiStore, Mutation, QueryHandle, QueryOptions};
