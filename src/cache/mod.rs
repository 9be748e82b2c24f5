//! Shared repository cache
//!
//! Remote references are served from shallow clones kept under `~/.cmc`.
//! Every repository has one cache entry and one lock file, keyed by
//! host/owner/repo.
//!
//! # Consistency
//!
//! - Only the exclusive lock holder writes to an entry
//! - Manifest and artifact reads happen under a shared lock
//! - Failed clones are removed before the lock is released
//! - The OS releases the lock of a process that died
//! - Entries are never evicted automatically (`cmc cache clear`)

pub mod coordinator;
pub mod key;
pub mod lock;
pub mod store;

pub use coordinator::{Checkout, RepoCoordinator};
pub use key::CacheKey;
pub use lock::{LockGuard, LockMode, LockPolicy};
pub use store::{CacheEntryInfo, CacheStore};
