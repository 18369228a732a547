//! Node identity and naming rules.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::address::Address;

/// Opaque node identifier, unique within a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arena entry for one node of the tree.
#[derive(Debug)]
pub(crate) struct NodeEntry {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub address: Option<Arc<Address>>,
}

impl NodeEntry {
    pub fn new(name: String, parent: Option<NodeId>) -> Self {
        Self { name, parent, children: Vec::new(), address: None }
    }
}

/// Characters allowed in a node name besides ASCII alphanumerics.
const NAME_PUNCTUATION: &[char] = &['_', '~', '(', ')', '.', '-'];

pub fn is_valid_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || NAME_PUNCTUATION.contains(&c)
}

/// Replace every character outside `[A-Za-z0-9_~().-]` with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars().map(|c| if is_valid_name_char(c) { c } else { '_' }).collect()
}

/// Make `name` unique among `siblings` by appending `.1`, `.2`, ...
///
/// A trailing numeric suffix on `name` itself is treated as the starting
/// point, so `osc.3` colliding becomes `osc.4`.
pub fn unique_name<'a>(name: &str, siblings: impl Iterator<Item = &'a str> + Clone) -> String {
    if !siblings.clone().any(|s| s == name) {
        return name.to_owned();
    }
    let (stem, start) = match name.rsplit_once('.') {
        Some((stem, n)) if !stem.is_empty() => match n.parse::<u64>() {
            Ok(n) => (stem, n + 1),
            Err(_) => (name, 1),
        },
        _ => (name, 1),
    };
    (start..)
        .map(|i| format!("{stem}.{i}"))
        .find(|candidate| !siblings.clone().any(|s| s == candidate))
        .unwrap_or_else(|| format!("{stem}.{start}"))
}
