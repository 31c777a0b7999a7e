// Cache management module
// Author: kelexine (https://github.com/kelexine)

pub mod manager;
pub mod manifest;
pub mod models;
pub mod storage;

pub use manager::AssetCacheManager;
pub use manifest::AssetManifest;
pub use models::{CacheConfig, CacheStats, CachedResponse, Phase, RequestKey, ResourceRequest};
pub use storage::{CacheBucket, CacheStorage};
