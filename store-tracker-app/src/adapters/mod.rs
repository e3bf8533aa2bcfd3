//! Storage adapters for the local cache.

mod file_local_cache;

pub use file_local_cache::FileLocalCache;
