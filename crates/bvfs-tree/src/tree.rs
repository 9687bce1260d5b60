//! Path-addressed tree operations: get/set/delete/copy/move/walk
//!
//! All operations are synchronous and touch only the in-memory tree. A single
//! logical writer is assumed; concurrent mutation from multiple callers must
//! be serialized externally.
//!
//! Validation errors are raised before any state change, so a rejected
//! operation never leaves the tree partially modified. The one documented
//! exception is [`FileSystemTree::move_node`]: copy-then-delete, where a
//! failing delete leaves the copy in place and surfaces the error.

use bvfs_core::{BvfsError, BvfsResult};

use crate::node::{validate_name, DirectoryNode, FileNode, Node};

/// Split a `/`-separated path into its non-empty segments.
/// `"/"`, `""` and stray repeated slashes all normalize away.
fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Parent path and base name of `path`; `None` for the root.
fn parent_and_base(path: &str) -> Option<(String, &str)> {
    let segments = split_segments(path);
    let (last, init) = segments.split_last()?;
    Some((format!("/{}", init.join("/")), *last))
}

/// The virtual filesystem: one owned root directory with an empty name.
/// The root is never deleted and is not addressable as a child node.
#[derive(Debug, Clone, Default)]
pub struct FileSystemTree {
    root: DirectoryNode,
}

impl FileSystemTree {
    pub fn new() -> Self {
        Self {
            root: DirectoryNode::root(),
        }
    }

    pub fn root(&self) -> &DirectoryNode {
        &self.root
    }

    /// Resolve `path` to a node. Returns `None` (not an error) if any
    /// segment is missing or an intermediate segment is a file.
    pub fn get_node(&self, path: &str) -> Option<&Node> {
        let segments = split_segments(path);
        let (last, init) = segments.split_last()?;
        let mut dir = &self.root;
        for seg in init {
            dir = dir.children.get(*seg)?.as_directory()?;
        }
        dir.children.get(*last)
    }

    pub fn exists(&self, path: &str) -> bool {
        // The root always exists.
        split_segments(path).is_empty() || self.get_node(path).is_some()
    }

    /// Insert `node` as a child of the directory at `parent_path`, creating
    /// missing intermediate directories ("mkdir -p" semantics). An existing
    /// child with the same name is replaced, not merged.
    ///
    /// Fails with `InvalidName` (bad node or segment name) or
    /// `InvalidOperation` (an intermediate segment is a file), in both cases
    /// before any mutation takes effect.
    pub fn set_node(&mut self, parent_path: &str, node: Node) -> BvfsResult<()> {
        validate_name(node.name())?;
        let segments = split_segments(parent_path);
        for seg in &segments {
            validate_name(seg)?;
        }

        // A file conflict can only be hit among pre-existing children, which
        // are all walked before the first missing directory is created, so a
        // failure here never leaves partially created intermediates.
        let mut dir = &mut self.root;
        for seg in segments {
            let child = dir
                .children
                .entry(seg.to_string())
                .or_insert_with(|| Node::directory(seg));
            match child {
                Node::Directory(d) => dir = d,
                Node::File(_) => {
                    return Err(BvfsError::invalid_operation(format!(
                        "path segment {seg:?} in {parent_path:?} is a file, not a directory"
                    )))
                }
            }
        }
        dir.children.insert(node.name().to_string(), node);
        Ok(())
    }

    /// `set_node(dirname(path), empty directory named basename(path))`.
    pub fn create_directory(&mut self, path: &str) -> BvfsResult<()> {
        let (parent, base) = parent_and_base(path).ok_or_else(|| {
            BvfsError::invalid_operation("the root directory already exists")
        })?;
        self.set_node(&parent, Node::directory(base))
    }

    /// Remove the node at `path` from its parent, returning it.
    /// Fails with `InvalidOperation` if the path or any ancestor is missing.
    pub fn delete(&mut self, path: &str) -> BvfsResult<Node> {
        let segments = split_segments(path);
        let (last, init) = segments
            .split_last()
            .ok_or_else(|| BvfsError::invalid_operation("the root cannot be deleted"))?;

        let mut dir = &mut self.root;
        for seg in init {
            let child = dir.children.get_mut(*seg).ok_or_else(|| {
                BvfsError::invalid_operation(format!("no such directory {seg:?} in {path:?}"))
            })?;
            match child {
                Node::Directory(d) => dir = d,
                Node::File(_) => {
                    return Err(BvfsError::invalid_operation(format!(
                        "path segment {seg:?} in {path:?} is a file, not a directory"
                    )))
                }
            }
        }
        // shift_remove keeps the insertion order of the remaining siblings
        dir.children.shift_remove(*last).ok_or_else(|| {
            BvfsError::invalid_operation(format!("path {path:?} does not exist"))
        })
    }

    /// Deep-copy the node at `source`. If `target` resolves to an existing
    /// directory the copy is nested inside it under `source`'s base name;
    /// otherwise the copy lands exactly at `target`, silently replacing
    /// whatever was there. The copy is structurally independent of the
    /// source.
    pub fn copy(&mut self, source: &str, target: &str) -> BvfsResult<()> {
        let node = self
            .get_node(source)
            .ok_or_else(|| {
                BvfsError::invalid_operation(format!("copy source {source:?} does not exist"))
            })?
            .clone();

        let target_is_dir = split_segments(target).is_empty()
            || matches!(self.get_node(target), Some(Node::Directory(_)));

        if target_is_dir {
            // Nest inside the target directory, keeping the source base name.
            self.set_node(target, node)
        } else {
            let (parent, base) = parent_and_base(target).ok_or_else(|| {
                BvfsError::invalid_operation(format!("invalid copy target {target:?}"))
            })?;
            let mut node = node;
            node.set_name(base);
            self.set_node(&parent, node)
        }
    }

    /// `copy` followed by `delete(source)`. Not atomic: if the delete fails
    /// after a successful copy, the duplicate stays and the delete error is
    /// returned rather than swallowed.
    pub fn move_node(&mut self, source: &str, target: &str) -> BvfsResult<()> {
        self.copy(source, target)?;
        self.delete(source)?;
        Ok(())
    }

    /// Depth-first pre-order traversal from the root. The visitor runs once
    /// per file (not per directory) with the file and its absolute
    /// `/`-rooted path; order is insertion order within each directory.
    pub fn walk(&self, mut visitor: impl FnMut(&FileNode, &str)) {
        Self::walk_dir(&self.root, "", &mut visitor);
    }

    /// Like [`walk`](Self::walk), but starting at the directory `path`.
    /// Visited paths are still absolute.
    pub fn walk_from(&self, path: &str, mut visitor: impl FnMut(&FileNode, &str)) -> BvfsResult<()> {
        let segments = split_segments(path);
        if segments.is_empty() {
            Self::walk_dir(&self.root, "", &mut visitor);
            return Ok(());
        }
        match self.get_node(path) {
            Some(Node::Directory(dir)) => {
                let prefix = format!("/{}", segments.join("/"));
                Self::walk_dir(dir, &prefix, &mut visitor);
                Ok(())
            }
            Some(Node::File(_)) => Err(BvfsError::invalid_operation(format!(
                "walk start {path:?} is a file, not a directory"
            ))),
            None => Err(BvfsError::invalid_operation(format!(
                "walk start {path:?} does not exist"
            ))),
        }
    }

    fn walk_dir(dir: &DirectoryNode, prefix: &str, visitor: &mut impl FnMut(&FileNode, &str)) {
        for (name, child) in &dir.children {
            let full = format!("{prefix}/{name}");
            match child {
                Node::File(f) => visitor(f, &full),
                Node::Directory(d) => Self::walk_dir(d, &full, visitor),
            }
        }
    }
}
