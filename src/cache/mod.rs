//! Response caching for offline-tolerant reads.
//!
//! This module provides:
//! - A per-type, per-URL store of raw response bodies ([`ResponseCache`])
//! - Policy-driven reads that pick between cache and network ([`CachePolicyEngine`])
//! - Background revalidation by content fingerprint ([`ConditionalRefresher`])
//! - Patching of cached collections after offline mutations ([`CacheReconciler`])

pub mod key;
mod policy;
mod reconcile;
mod refresh;
mod response;

pub use policy::{CachePolicy, CachePolicyEngine, STALE_DATA_WARNING};
pub use reconcile::CacheReconciler;
pub use refresh::{ConditionalRefresher, OnUpdate, RefreshOutcome};
pub use response::ResponseCache;
