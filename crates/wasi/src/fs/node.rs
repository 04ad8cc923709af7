use std::collections::BTreeMap;

use crate::types::FileType;

/// A node in the sandboxed file tree.
pub(crate) enum Node {
    Directory(BTreeMap<String, Node>),
    File(Vec<u8>),
    /// Only ever `/dev/null` in this implementation: reads as EOF, writes
    /// discard everything.
    DevNull,
}

impl Node {
    pub(crate) fn new_dir() -> Self {
        Self::Directory(BTreeMap::new())
    }

    pub(crate) fn filetype(&self) -> FileType {
        match self {
            Self::Directory(_) => FileType::Directory,
            Self::File(_) => FileType::RegularFile,
            Self::DevNull => FileType::CharacterDevice,
        }
    }

    pub(crate) fn as_dir(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Self::Directory(children) => Some(children),
            _ => None,
        }
    }

    pub(crate) fn as_dir_mut(&mut self) -> Option<&mut BTreeMap<String, Node>> {
        match self {
            Self::Directory(children) => Some(children),
            _ => None,
        }
    }

    pub(crate) fn as_file(&self) -> Option<&Vec<u8>> {
        match self {
            Self::File(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub(crate) fn as_file_mut(&mut self) -> Option<&mut Vec<u8>> {
        match self {
            Self::File(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Looks up `path` (absolute, normalized) from `root`.
pub(crate) fn lookup<'a>(root: &'a Node, path: &str) -> Option<&'a Node> {
    if path == "/" {
        return Some(root);
    }
    let mut node = root;
    for segment in path.trim_start_matches('/').split('/') {
        node = node.as_dir()?.get(segment)?;
    }
    Some(node)
}

/// Mutable variant of [`lookup`].
pub(crate) fn lookup_mut<'a>(root: &'a mut Node, path: &str) -> Option<&'a mut Node> {
    if path == "/" {
        return Some(root);
    }
    let mut node = root;
    for segment in path.trim_start_matches('/').split('/') {
        node = node.as_dir_mut()?.get_mut(segment)?;
    }
    Some(node)
}

/// Ensures every directory segment of `path` exists, creating them as
/// needed. Fails if a non-terminal segment exists but isn't a directory.
pub(crate) fn ensure_dir_path(root: &mut Node, path: &str) -> Result<(), ()> {
    if path == "/" {
        return Ok(());
    }
    let mut node = root;
    for segment in path.trim_start_matches('/').split('/') {
        let children = node.as_dir_mut().ok_or(())?;
        node = children
            .entry(segment.to_string())
            .or_insert_with(Node::new_dir);
    }
    if node.as_dir().is_none() {
        return Err(());
    }
    Ok(())
}

/// Inserts `node` at `path`, creating parent directories as needed.
/// Overwrites any existing entry at `path`.
pub(crate) fn insert(root: &mut Node, path: &str, node: Node) -> Result<(), ()> {
    let (parent, name) = crate::fs::path::split_parent(path).ok_or(())?;
    ensure_dir_path(root, &parent)?;
    let parent_node = lookup_mut(root, &parent).ok_or(())?;
    parent_node.as_dir_mut().ok_or(())?.insert(name.to_string(), node);
    Ok(())
}

/// Removes and returns the node at `path`, if any.
pub(crate) fn remove(root: &mut Node, path: &str) -> Option<Node> {
    let (parent, name) = crate::fs::path::split_parent(path)?;
    let parent_node = lookup_mut(root, &parent)?;
    parent_node.as_dir_mut()?.remove(name)
}
