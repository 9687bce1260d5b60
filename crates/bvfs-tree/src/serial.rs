//! Whole-filesystem serialization: header block + one record per file
//!
//! Export format (plain text):
//! ```text
//! <Key: value header lines, enumeration order>
//! <blank line>
//! /path/to/file<TAB>size<TAB>created_at<TAB>manifest_ref
//! ...
//! ```
//! File records appear in `walk` (depth-first, insertion) order with
//! absolute `/`-rooted paths.

use bvfs_core::{BvfsError, BvfsResult};
use bvfs_crypto::{passphrase_hash, EncryptionContext, Passphrase};
use tracing::{debug, info};

use crate::header::{HeaderBlock, HeaderKey};
use crate::node::Node;
use crate::tree::FileSystemTree;

/// A filesystem restored from its serialized form.
pub struct RestoredFs {
    pub tree: FileSystemTree,
    pub header: HeaderBlock,
    /// Present when the header carries an `Encryption-Salt`; rebuilt from
    /// the persisted salt so existing chunks stay decryptable.
    pub context: Option<EncryptionContext>,
}

/// Serialize the tree and header block to one flat text blob.
pub fn export(tree: &FileSystemTree, header: &HeaderBlock) -> String {
    let mut out = header.to_lines();
    out.push('\n');

    let mut files = 0usize;
    tree.walk(|file, path| {
        out.push_str(path);
        out.push('\t');
        out.push_str(&file.size.to_string());
        out.push('\t');
        out.push_str(&file.created_at.to_string());
        out.push('\t');
        out.push_str(&file.manifest_ref);
        out.push('\n');
        files += 1;
    });
    debug!(files, bytes = out.len(), "exported filesystem");
    out
}

/// Restore a filesystem from its serialized form.
///
/// Headers are read until the first blank line. If an `Encryption-Key-Hash`
/// header is present the supplied passphrase is checked against it first and
/// a mismatch fails with `AuthenticationFailure` before any file node is
/// registered; the persisted hash is ground truth and never overwritten.
/// The encryption context is rebuilt from the *persisted* `Encryption-Salt`.
pub fn import(input: &str, passphrase: Passphrase, iterations: u32) -> BvfsResult<RestoredFs> {
    let mut lines = input.lines();

    let mut header = HeaderBlock::new();
    for line in lines.by_ref() {
        if line.is_empty() {
            break;
        }
        header.parse_line(line)?;
    }

    if let Some(expected) = header.get(HeaderKey::EncryptionKeyHash) {
        if passphrase_hash(&passphrase) != expected {
            return Err(BvfsError::AuthenticationFailure(
                "passphrase does not match the filesystem's Encryption-Key-Hash".into(),
            ));
        }
    }

    let context = header
        .encryption_salt()?
        .map(|salt| EncryptionContext::restore(passphrase, salt, iterations));

    let mut tree = FileSystemTree::new();
    let mut files = 0usize;
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (path, file) = parse_record(line)?;
        let (parent, _) = path.rsplit_once('/').ok_or_else(|| {
            BvfsError::Format(format!("file record path {path:?} is not absolute"))
        })?;
        let parent = if parent.is_empty() { "/" } else { parent };
        tree.set_node(parent, file)?;
        files += 1;
    }

    info!(
        files,
        encrypted = context.is_some(),
        "imported filesystem"
    );
    Ok(RestoredFs {
        tree,
        header,
        context,
    })
}

/// Parse one `path\tsize\tcreated_at\tmanifest_ref` record.
fn parse_record(line: &str) -> BvfsResult<(&str, Node)> {
    let mut fields = line.split('\t');
    let path = fields
        .next()
        .filter(|p| p.starts_with('/'))
        .ok_or_else(|| BvfsError::Format(format!("file record {line:?}: missing path")))?;
    let size: u64 = fields
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| BvfsError::Format(format!("file record {line:?}: bad size")))?;
    let created_at: u64 = fields
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| BvfsError::Format(format!("file record {line:?}: bad creation date")))?;
    let manifest_ref = fields
        .next()
        .ok_or_else(|| BvfsError::Format(format!("file record {line:?}: missing manifest ref")))?;
    if fields.next().is_some() {
        return Err(BvfsError::Format(format!(
            "file record {line:?}: too many fields"
        )));
    }

    let base = path.rsplit('/').next().unwrap_or_default();
    Ok((path, Node::file(base, size, created_at, manifest_ref)))
}
