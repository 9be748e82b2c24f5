//! Git access for the repository cache
//!
//! `GitBackend` is the seam between cache coordination and the git binary;
//! `CloneExecutor` implements clone, fetch, fallback and cleanup on top of it.

pub mod backend;
pub mod executor;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{GitBackend, GitCli};
pub use executor::{candidate_urls, CloneExecutor};
