//! bvfs-tree: the virtual filesystem layer of blobvault
//!
//! An in-memory directory tree of named nodes. Files carry metadata plus a
//! reference to their chunk manifest blob; directories own their children
//! (strict ownership hierarchy, no parent back-pointers). Path resolution
//! always starts at the root and walks down.
//!
//! The whole tree, together with an enumerated header block (version, salt,
//! passphrase-verification hash, ...), serializes to one flat text blob and
//! restores from it.

pub mod header;
pub mod node;
pub mod serial;
pub mod tree;

pub use header::{HeaderBlock, HeaderKey, FILESYSTEM_VERSION};
pub use node::{validate_name, DirectoryNode, FileNode, Node, FORBIDDEN_NAME_CHARS};
pub use serial::{export, import, RestoredFs};
pub use tree::FileSystemTree;

/// Milliseconds since the Unix epoch, for `created_at` timestamps.
pub fn epoch_millis_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
