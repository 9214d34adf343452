// Cache module.
// Keeps section responses per repository with auth-dependent TTLs.

pub mod paths;
pub mod store;

pub use store::{ANONYMOUS_TTL, AUTHENTICATED_TTL, CachedData, ResponseCache, TtlPolicy};
