//! Storage layer abstraction trait definition

mod local_cache;

pub use local_cache::LocalCache;
