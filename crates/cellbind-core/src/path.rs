#![forbid(unsafe_code)]

//! Dotted-path resolution over the cell arena.
//!
//! A path like `"name.firstName"` splits into a parent chain (`name`) and
//! a leaf key (`firstName`). Resolution walks the parent chain from the
//! root, failing with [`BindError::PathNotFound`] naming the first segment
//! that cannot be looked up on an object, and returns a
//! [`PathRef`](crate::cells::PathRef) — the containing object cell plus
//! the leaf key. The leaf itself is *not* required to exist: reading an
//! absent leaf yields the absence sentinel, and writing one creates it.
//!
//! Resolved references are memoized by the literal path string for the
//! lifetime of the engine and never re-validated. A reference whose
//! container has since stopped holding an object degrades into absent
//! reads and ignored writes at access time.

use ahash::AHashMap;

use crate::cells::{CellTree, PathRef};
use crate::error::{BindError, Result};

pub(crate) struct PathResolver {
    cache: AHashMap<String, PathRef>,
}

impl PathResolver {
    pub(crate) fn new() -> Self {
        Self {
            cache: AHashMap::new(),
        }
    }

    /// Resolve a dotted path to a field location, consulting the memo
    /// cache first.
    pub(crate) fn resolve(&mut self, tree: &CellTree, path: &str) -> Result<PathRef> {
        if let Some(rf) = self.cache.get(path) {
            return Ok(rf.clone());
        }
        let rf = Self::walk(tree, path)?;
        self.cache.insert(path.to_owned(), rf.clone());
        Ok(rf)
    }

    fn walk(tree: &CellTree, path: &str) -> Result<PathRef> {
        let mut segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|seg| seg.is_empty()) {
            return Err(BindError::invalid(path));
        }
        let Some(leaf) = segments.pop() else {
            return Err(BindError::invalid(path));
        };

        let mut container = CellTree::ROOT;
        for seg in segments {
            container = tree
                .object_fields(container)
                .and_then(|fields| fields.get(seg))
                .copied()
                .ok_or_else(|| BindError::not_found(seg))?;
        }
        Ok(PathRef {
            container,
            leaf: leaf.to_owned(),
        })
    }
}
