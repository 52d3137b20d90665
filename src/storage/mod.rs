//!  Records live in a single [store::RecordStore] which is loaded whole, mutated, and written back.
//!  The basic idea is:
//!   - Every collection is a JSON blob under its own key in a [persistence::KeyValueStore].
//!   - The file backed store keeps one `<key>.json` per collection.
//!   - Blobs written by older versions are read as is, missing dates are resolved later by the
//!     aggregation code.

pub mod entities;
pub mod exchange;
pub mod persistence;
pub mod store;
