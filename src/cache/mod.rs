mod file;
mod key;
mod local;
mod store;

pub use file::FileStore;
pub use key::{Bucket, CacheKey};
pub use local::LocalCache;
pub use store::{CacheStore, MemoryStore, SharedCacheStore};
