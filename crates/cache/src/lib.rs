// Content-hash build cache
pub mod digest;
pub mod error;
pub mod manager;
pub mod path;
pub mod snapshot;

pub use digest::{digest_file, try_digest_file};
pub use error::{CacheError, CacheResult};
pub use manager::BuildCache;
pub use path::{DEFAULT_CACHE_DIR, DEFAULT_CACHE_FILE, cache_key_for_file, default_cache_path};
pub use snapshot::CacheSnapshot;
