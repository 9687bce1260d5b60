//! Node sum type: file vs. directory with disjoint required fields
//!
//! Tree code matches exhaustively on [`Node`], so a file can never be
//! descended into as if it were a directory.

use bvfs_core::{BvfsError, BvfsResult};
use indexmap::IndexMap;

/// Characters that may not appear in a node name (in addition to ASCII
/// control characters).
pub const FORBIDDEN_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Validate a node name: non-empty, no control characters, none of
/// [`FORBIDDEN_NAME_CHARS`].
pub fn validate_name(name: &str) -> BvfsResult<()> {
    if name.is_empty() {
        return Err(BvfsError::invalid_name(name, "name is empty"));
    }
    if let Some(c) = name
        .chars()
        .find(|c| c.is_ascii_control() || FORBIDDEN_NAME_CHARS.contains(c))
    {
        return Err(BvfsError::invalid_name(
            name,
            format!("contains forbidden character {c:?}"),
        ));
    }
    Ok(())
}

/// A file entry: metadata plus the opaque reference to its chunk manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub name: String,
    /// Decrypted size in bytes
    pub size: u64,
    /// Epoch-millisecond creation timestamp
    pub created_at: u64,
    /// Storage reference of this file's manifest blob
    pub manifest_ref: String,
}

/// A directory entry. Children are keyed by name (unique within a directory);
/// `IndexMap` keeps insertion order for deterministic traversal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectoryNode {
    pub name: String,
    pub children: IndexMap<String, Node>,
}

impl DirectoryNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: IndexMap::new(),
        }
    }

    /// The tree root: the only directory with an empty name.
    pub(crate) fn root() -> Self {
        Self::new("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    File(FileNode),
    Directory(DirectoryNode),
}

impl Node {
    pub fn file(
        name: impl Into<String>,
        size: u64,
        created_at: u64,
        manifest_ref: impl Into<String>,
    ) -> Self {
        Self::File(FileNode {
            name: name.into(),
            size,
            created_at,
            manifest_ref: manifest_ref.into(),
        })
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self::Directory(DirectoryNode::new(name))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::File(f) => &f.name,
            Self::Directory(d) => &d.name,
        }
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        match self {
            Self::File(f) => f.name = name.into(),
            Self::Directory(d) => d.name = name.into(),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            Self::File(f) => Some(f),
            Self::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&DirectoryNode> {
        match self {
            Self::File(_) => None,
            Self::Directory(d) => Some(d),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["a", "file.txt", "with spaces", "ünïcode", "a.b.c"] {
            assert!(validate_name(name).is_ok(), "{name:?} should be valid");
        }
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            validate_name(""),
            Err(BvfsError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_forbidden_characters_rejected() {
        for c in FORBIDDEN_NAME_CHARS {
            let name = format!("bad{c}name");
            assert!(
                matches!(validate_name(&name), Err(BvfsError::InvalidName { .. })),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_control_characters_rejected() {
        assert!(validate_name("a\x00b").is_err());
        assert!(validate_name("a\tb").is_err());
        assert!(validate_name("a\nb").is_err());
    }

    #[test]
    fn test_node_accessors() {
        let file = Node::file("f", 10, 0, "ref-1");
        assert_eq!(file.name(), "f");
        assert!(!file.is_directory());
        assert!(file.as_file().is_some());
        assert!(file.as_directory().is_none());

        let dir = Node::directory("d");
        assert!(dir.is_directory());
        assert!(dir.as_directory().is_some());
    }

    proptest::proptest! {
        #[test]
        fn prop_names_with_forbidden_char_rejected(
            prefix in "[a-z]{0,8}",
            suffix in "[a-z]{0,8}",
            idx in 0usize..9,
        ) {
            let c = FORBIDDEN_NAME_CHARS[idx];
            let name = format!("{prefix}{c}{suffix}");
            proptest::prop_assert!(validate_name(&name).is_err());
        }
    }
}
