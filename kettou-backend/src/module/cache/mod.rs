///! Race result cache
///!
///! ## Architecture (Two-Tier)
///! - Primary: remote table shared between runs (Google Sheets)
///! - Secondary: one local CSV per race id, also the offline fallback
///!
///! Remote failures surface as `CacheError`, distinct from a cache miss.

mod error;
pub use error::CacheError;

mod remote;
pub use remote::RemoteTable;

#[cfg(test)]
mod memory;
#[cfg(test)]
pub use memory::MemoryTable;

mod local;
pub use local::LocalStore;

mod auth;
pub use auth::{ServiceAccountAuth, ServiceAccountKey, SERVICE_JSON_ENV};

mod sheets;
pub use sheets::SheetsTable;

mod store;
pub use store::ResultCache;
