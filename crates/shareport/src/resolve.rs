//! Logical paths and the resolver walk.
//!
//! A logical path is the canonical coordinate space of the API and UI:
//! always `/`-rooted, no repeated slashes, decoupled from whatever the
//! backing store uses to address its nodes. Resolution re-walks the tree
//! from the root on every request; the lookup cost buys immediate
//! consistency with concurrent external changes to the store.

use crate::node::{Node, StoreError};

/// Normalize a raw path string into logical form: leading `/`, no
/// repeated or trailing slashes. Empty input normalizes to `/`.
pub fn normalize(raw: &str) -> String {
    let joined = raw
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{joined}")
}

/// Logical parent of a logical path. The root is its own parent.
pub fn parent(path: &str) -> String {
    let normalized = normalize(path);
    if normalized == "/" {
        return normalized;
    }
    match normalized.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => normalized[..idx].to_string(),
    }
}

/// Append one child name to a logical path.
pub fn join(base: &str, name: &str) -> String {
    let base = normalize(base);
    if base == "/" {
        format!("/{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Decode one path segment. Undecodable segments fall back to their raw
/// form so files with unusual names stay reachable.
fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// Percent-encode a single URL component.
pub fn encode_component(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Percent-encode a logical path segment-by-segment, preserving slashes.
pub fn encode_path(path: &str) -> String {
    let normalized = normalize(path);
    if normalized == "/" {
        return normalized;
    }
    let encoded = normalized
        .trim_start_matches('/')
        .split('/')
        .map(encode_component)
        .collect::<Vec<_>>()
        .join("/");
    format!("/{encoded}")
}

/// Walk the tree from `root` along `logical`, one child lookup per
/// segment. `/` (or anything that normalizes to it) returns the root
/// directly. The first segment without a matching child ends the walk
/// with `None`; there are no partial matches and no case folding.
pub async fn resolve(root: &dyn Node, logical: &str) -> Result<Option<Box<dyn Node>>, StoreError> {
    let normalized = normalize(logical);
    if normalized == "/" {
        return Ok(Some(root.clone_node()));
    }

    let mut current = root.clone_node();
    for segment in normalized.trim_start_matches('/').split('/') {
        let decoded = decode_segment(segment);
        let Some(child) = current.find_child(&decoded).await? else {
            return Ok(None);
        };
        current = child;
    }
    Ok(Some(current))
}

/// Whether a raw path addresses the root node.
pub fn is_root(raw: &str) -> bool {
    normalize(raw) == "/"
}
