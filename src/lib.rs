//! Offline-tolerant HTTP data access.
//!
//! Reads go through a response cache governed by a [`CachePolicy`]; writes
//! that fail for lack of connectivity are queued durably, reflected in cached
//! collections, and replayed later with [`ApiClient::drain_queue`].

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod platform;
pub mod queue;
pub mod store;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiClientBuilder, Mutation};
pub use cache::{CachePolicy, OnUpdate};
pub use error::{FetchError, Result};
pub use http::{Method, Query, RequestBody};
pub use platform::OnError;
pub use queue::{Identifiable, QueueItem, QueueStatus};
