//! In-process caches backed by moka.
//!
//! `CacheRegistry` hands out named `TypedCache` handles, so components
//! asking for the same name share entries. `CacheConfig` holds the profile
//! of each cache: resolved policies and admin lookups.

mod config;
mod registry;
mod typed;

pub use config::CacheConfig;
pub use registry::CacheRegistry;
pub use typed::TypedCache;
