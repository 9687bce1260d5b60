//! bvfs-streams: chunked, encrypted streaming over an opaque blob store
//!
//! Pipeline (upload): writes → buffer to the chunk boundary → AES-GCM with a
//! fresh IV → `store` → manifest row. Downloads run the pipeline backwards,
//! one chunk at a time in manifest order, with a bounded per-chunk retry.
//!
//! The blob store itself is a collaborator (see [`BlobStore`]): anything that
//! can persist a byte blob and hand back an opaque reference works. Memory is
//! bounded to roughly one chunk per stream in either direction; at most one
//! store/fetch is in flight per stream, which also guarantees chunk ordering.

pub mod download;
pub mod manifest;
pub mod storage;
pub mod upload;

pub use download::DownloadStream;
pub use manifest::{load_manifest, store_manifest, Chunk, Manifest};
pub use storage::{BlobStore, MemoryBlobStore};
pub use upload::{UploadStream, UploadSummary};
