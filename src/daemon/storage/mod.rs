//!  Storage is organized through [kv::KeyValueStore].
//!  The basic idea is:
//!   - There is a single flat document of keys, like the browser's local storage.
//!   - Usage lives in day buckets keyed `YYYY-MM-DD`, mapping domains to accumulated time.
//!   - The tracking session, the whitelist and the settings live under their own keys.

pub mod entities;
pub mod kv;
pub mod usage;
