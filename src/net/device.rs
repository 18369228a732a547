//! Device: the node arena, path resolution and adapter fan-out.
//!
//! Nodes live in a single map keyed by [`NodeId`]; parents own their
//! children by id. Tree edits take the arena write lock for the shortest
//! possible time and never while an address pipeline is running, so reads
//! from other threads always see either the old or the new tree.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::address::{Address, CommitSink, UpdateOutcome};
use super::node::{NodeEntry, NodeId, sanitize_name, unique_name};
use crate::model::{Value, ValueType};
use crate::protocol::wire::{self, WireArg};
use crate::protocol::{Commit, Origin, Protocol, ProtocolId};
use crate::{Error, Result};

// ============================================================================
// Device
// ============================================================================

/// Root of a parameter tree. Cheap to clone; clones share the same tree.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

pub(crate) struct DeviceInner {
    name: RwLock<String>,
    root: NodeId,
    nodes: RwLock<HashMap<NodeId, NodeEntry>>,
    next_node_id: AtomicU64,
    protocols: RwLock<Vec<(ProtocolId, Arc<dyn Protocol>)>>,
    next_protocol_id: AtomicU64,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &*self.inner.name.read())
            .field("nodes", &self.inner.nodes.read().len())
            .field("protocols", &self.inner.protocols.read().len())
            .finish()
    }
}

impl Device {
    pub fn new(name: impl Into<String>) -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, NodeEntry::new(String::new(), None));
        let name = name.into();
        info!(device = %name, "device created");
        Self {
            inner: Arc::new(DeviceInner {
                name: RwLock::new(name),
                root,
                nodes: RwLock::new(nodes),
                next_node_id: AtomicU64::new(1),
                protocols: RwLock::new(Vec::new()),
                next_protocol_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn name(&self) -> String {
        self.inner.name.read().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.inner.name.write() = name.into();
    }

    pub fn root(&self) -> NodeId {
        self.inner.root
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.inner.nodes.read().len()
    }

    // ========================================================================
    // Tree structure
    // ========================================================================

    /// Create a child of `parent`. The name is sanitized and made unique
    /// among its siblings.
    pub fn create_child(&self, parent: NodeId, name: &str) -> Result<NodeId> {
        let clean = sanitize_name(name);
        if clean.is_empty() {
            return Err(Error::InvalidName(name.to_owned()));
        }
        let id = NodeId(self.inner.next_node_id.fetch_add(1, Ordering::Relaxed));
        let mut nodes = self.inner.nodes.write();
        let siblings = nodes.get(&parent).ok_or(Error::NodeNotFound(parent))?.children.clone();
        let unique = unique_name(&clean, siblings.iter().filter_map(|c| nodes.get(c)).map(|e| e.name.as_str()));
        nodes.insert(id, NodeEntry::new(unique, Some(parent)));
        if let Some(entry) = nodes.get_mut(&parent) {
            entry.children.push(id);
        }
        Ok(id)
    }

    /// Remove `child` and its whole subtree from `parent`.
    ///
    /// Returns `false` if `child` is not a child of `parent`. Address handles
    /// held elsewhere stay usable but are no longer reachable by path.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<bool> {
        let subtree = {
            let mut nodes = self.inner.nodes.write();
            let entry = nodes.get_mut(&parent).ok_or(Error::NodeNotFound(parent))?;
            let Some(pos) = entry.children.iter().position(|c| *c == child) else {
                return Ok(false);
            };
            entry.children.remove(pos);

            let mut removed = Vec::new();
            let mut queue = VecDeque::from([child]);
            while let Some(id) = queue.pop_front() {
                if let Some(entry) = nodes.remove(&id) {
                    queue.extend(entry.children.iter().copied());
                    removed.push(entry);
                }
            }
            removed
        };
        debug!(parent = %parent, child = %child, removed = subtree.len(), "subtree removed");
        Ok(true)
    }

    /// Rename a node. Returns the name actually assigned after sanitizing
    /// and de-duplication. Address paths in the subtree are refreshed.
    pub fn rename(&self, node: NodeId, name: &str) -> Result<String> {
        let clean = sanitize_name(name);
        if clean.is_empty() || node == self.inner.root {
            return Err(Error::InvalidName(name.to_owned()));
        }
        let assigned = {
            let mut nodes = self.inner.nodes.write();
            let parent = nodes.get(&node).ok_or(Error::NodeNotFound(node))?.parent;
            let siblings: Vec<String> = parent
                .and_then(|p| nodes.get(&p))
                .map(|p| {
                    p.children
                        .iter()
                        .filter(|c| **c != node)
                        .filter_map(|c| nodes.get(c))
                        .map(|e| e.name.clone())
                        .collect()
                })
                .unwrap_or_default();
            let assigned = unique_name(&clean, siblings.iter().map(String::as_str));
            if let Some(entry) = nodes.get_mut(&node) {
                entry.name = assigned.clone();
            }
            assigned
        };
        self.refresh_paths(node);
        Ok(assigned)
    }

    fn refresh_paths(&self, from: NodeId) {
        for id in self.descendants(from) {
            if let Some(address) = self.address(id) {
                if let Some(path) = self.path_of(id) {
                    address.set_path(path);
                }
            }
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.nodes.read().get(&node)?.parent
    }

    pub fn node_name(&self, node: NodeId) -> Option<String> {
        self.inner.nodes.read().get(&node).map(|e| e.name.clone())
    }

    /// Snapshot of the children of `node`, in creation order.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.nodes.read().get(&node).map(|e| e.children.clone()).unwrap_or_default()
    }

    pub fn child_names(&self, node: NodeId) -> Vec<String> {
        let nodes = self.inner.nodes.read();
        nodes
            .get(&node)
            .map(|e| e.children.iter().filter_map(|c| nodes.get(c)).map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    /// `node` and everything below it, breadth first.
    ///
    /// Each child list is snapshotted on its own, so the walk never holds
    /// the arena lock across levels. Nodes removed mid-walk are skipped.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([node]);
        while let Some(next) = queue.pop_front() {
            let Some(children) = self.inner.nodes.read().get(&next).map(|e| e.children.clone()) else {
                continue;
            };
            out.push(next);
            queue.extend(children);
        }
        out
    }

    // ========================================================================
    // Paths
    // ========================================================================

    /// Absolute path of `node`: `/` for the root, `/a/b` otherwise.
    pub fn path_of(&self, node: NodeId) -> Option<String> {
        let nodes = self.inner.nodes.read();
        let mut segments = Vec::new();
        let mut current = nodes.get(&node)?;
        while let Some(parent) = current.parent {
            segments.push(current.name.as_str());
            current = nodes.get(&parent)?;
        }
        if segments.is_empty() {
            return Some("/".into());
        }
        segments.reverse();
        Some(format!("/{}", segments.join("/")))
    }

    /// Split a path into segments, dropping an optional `protocol:` prefix.
    fn segments(path: &str) -> impl Iterator<Item = &str> {
        let path = match path.split_once(':') {
            Some((_, rest)) => rest,
            None => path,
        };
        path.split('/').filter(|s| !s.is_empty())
    }

    /// Look up `path`. Segments are sanitized the same way as on creation.
    pub fn find_node(&self, path: &str) -> Option<NodeId> {
        let nodes = self.inner.nodes.read();
        let mut current = self.inner.root;
        for segment in Self::segments(path) {
            let clean = sanitize_name(segment);
            let entry = nodes.get(&current)?;
            current = *entry
                .children
                .iter()
                .find(|c| nodes.get(*c).is_some_and(|e| e.name == clean))?;
        }
        Some(current)
    }

    /// Resolve `path`, creating any missing nodes. Existing nodes are reused,
    /// so the same path always yields the same node.
    pub fn find_or_create_node(&self, path: &str) -> Result<NodeId> {
        let mut current = self.inner.root;
        for segment in Self::segments(path) {
            let clean = sanitize_name(segment);
            let existing = {
                let nodes = self.inner.nodes.read();
                let entry = nodes.get(&current).ok_or(Error::NodeNotFound(current))?;
                entry.children.iter().copied().find(|c| nodes.get(c).is_some_and(|e| e.name == clean))
            };
            current = match existing {
                Some(id) => id,
                None => self.child_or_create(current, &clean)?,
            };
        }
        Ok(current)
    }

    /// Find the child named `clean` or create it, atomically.
    fn child_or_create(&self, parent: NodeId, clean: &str) -> Result<NodeId> {
        if clean.is_empty() {
            return Err(Error::InvalidName(clean.to_owned()));
        }
        let mut nodes = self.inner.nodes.write();
        let entry = nodes.get(&parent).ok_or(Error::NodeNotFound(parent))?;
        if let Some(id) = entry.children.iter().copied().find(|c| nodes.get(c).is_some_and(|e| e.name == clean)) {
            return Ok(id);
        }
        let id = NodeId(self.inner.next_node_id.fetch_add(1, Ordering::Relaxed));
        nodes.insert(id, NodeEntry::new(clean.to_owned(), Some(parent)));
        if let Some(entry) = nodes.get_mut(&parent) {
            entry.children.push(id);
        }
        Ok(id)
    }

    // ========================================================================
    // Addresses
    // ========================================================================

    /// Attach an address to `node`. An existing address is kept and retyped.
    pub fn create_address(&self, node: NodeId, value_type: ValueType) -> Result<Arc<Address>> {
        if let Some(existing) = self.address(node) {
            existing.set_value_type(value_type);
            return Ok(existing);
        }
        let path = self.path_of(node).ok_or(Error::NodeNotFound(node))?;
        let sink: Weak<DeviceInner> = Arc::downgrade(&self.inner);
        let sink: Weak<dyn CommitSink> = sink;
        let address = Arc::new(Address::with_sink(node, path, value_type, Some(sink)));
        let mut nodes = self.inner.nodes.write();
        let entry = nodes.get_mut(&node).ok_or(Error::NodeNotFound(node))?;
        // a concurrent creator may have won the race
        Ok(Arc::clone(entry.address.get_or_insert(address)))
    }

    /// Create the node at `path` if needed and attach an address to it.
    pub fn create_parameter(&self, path: &str, value_type: ValueType) -> Result<Arc<Address>> {
        let node = self.find_or_create_node(path)?;
        self.create_address(node, value_type)
    }

    /// Detach the address of `node`. Returns `false` if it had none.
    pub fn remove_address(&self, node: NodeId) -> bool {
        self.inner.nodes.write().get_mut(&node).and_then(|e| e.address.take()).is_some()
    }

    pub fn address(&self, node: NodeId) -> Option<Arc<Address>> {
        self.inner.nodes.read().get(&node)?.address.clone()
    }

    /// Address at `path`, if the node exists and carries one.
    pub fn resolve(&self, path: &str) -> Option<Arc<Address>> {
        self.address(self.find_node(path)?)
    }

    /// Every address in the tree, in breadth-first order.
    pub fn addresses(&self) -> Vec<Arc<Address>> {
        self.descendants(self.inner.root).into_iter().filter_map(|id| self.address(id)).collect()
    }

    /// Entry point for inbound adapter traffic.
    pub fn deliver(&self, path: &str, args: &[WireArg], origin: Origin) -> Result<UpdateOutcome> {
        let address = self.resolve(path).ok_or_else(|| Error::PathNotFound(path.to_owned()))?;
        address.deliver(args, origin)
    }

    /// Current value at `path`.
    pub fn fetch(&self, path: &str) -> Result<Value> {
        self.resolve(path)
            .map(|a| a.fetch_value())
            .ok_or_else(|| Error::PathNotFound(path.to_owned()))
    }

    // ========================================================================
    // Protocols
    // ========================================================================

    /// Register an adapter; every subsequent pushed commit is offered to it.
    pub fn expose_to(&self, protocol: Arc<dyn Protocol>) -> ProtocolId {
        let id = ProtocolId(self.inner.next_protocol_id.fetch_add(1, Ordering::Relaxed));
        info!(device = %self.name(), protocol = protocol.name(), id = %id, "protocol exposed");
        self.inner.protocols.write().push((id, protocol));
        id
    }

    pub fn remove_protocol(&self, id: ProtocolId) -> bool {
        let mut protocols = self.inner.protocols.write();
        let before = protocols.len();
        protocols.retain(|(pid, _)| *pid != id);
        protocols.len() != before
    }

    /// Exposed adapters with their names, in registration order.
    pub fn protocols(&self) -> Vec<(ProtocolId, String)> {
        self.inner.protocols.read().iter().map(|(id, p)| (*id, p.name().to_owned())).collect()
    }

    pub fn protocol_count(&self) -> usize {
        self.inner.protocols.read().len()
    }
}

impl CommitSink for DeviceInner {
    fn on_commit(&self, address: &Address, value: &Value, origin: Origin) {
        let targets: Vec<(ProtocolId, Arc<dyn Protocol>)> = self
            .protocols
            .read()
            .iter()
            .filter(|(id, _)| origin != Origin::Remote(*id))
            .map(|(id, p)| (*id, Arc::clone(p)))
            .collect();
        if targets.is_empty() {
            return;
        }

        let path = address.path();
        let arguments = wire::encode(value);
        let domain = address.domain().map(|d| wire::encode_domain(&d)).filter(|d| !d.is_empty());
        let commit = Commit {
            path: &path,
            value,
            arguments: &arguments,
            domain: domain.as_deref(),
            critical: address.critical(),
            origin,
        };
        for (id, protocol) in targets {
            if let Err(e) = protocol.on_commit(&commit) {
                warn!(protocol = protocol.name(), id = %id, path = %path, error = %e, "adapter failed to send commit");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, Vec<WireArg>)>>,
    }

    impl Protocol for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn on_commit(&self, commit: &Commit<'_>) -> Result<()> {
            self.seen.lock().push((commit.path.to_owned(), commit.arguments.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn test_find_or_create_is_idempotent() {
        let dev = Device::new("test");
        let a = dev.find_or_create_node("/a/b/c").unwrap();
        let b = dev.find_or_create_node("a/b/c").unwrap();
        assert_eq!(a, b);
        assert_eq!(dev.path_of(a).unwrap(), "/a/b/c");
        assert_eq!(dev.find_node("test:/a/b/c"), Some(a));
        assert_eq!(dev.node_count(), 4);
    }

    #[test]
    fn test_root_path() {
        let dev = Device::new("test");
        assert_eq!(dev.path_of(dev.root()).unwrap(), "/");
        assert_eq!(dev.find_node("/"), Some(dev.root()));
    }

    #[test]
    fn test_create_child_dedupes_and_sanitizes() {
        let dev = Device::new("test");
        let root = dev.root();
        let a = dev.create_child(root, "osc").unwrap();
        let b = dev.create_child(root, "osc").unwrap();
        let c = dev.create_child(root, "my osc").unwrap();
        assert_eq!(dev.node_name(a).unwrap(), "osc");
        assert_eq!(dev.node_name(b).unwrap(), "osc.1");
        assert_eq!(dev.node_name(c).unwrap(), "my_osc");
        assert!(matches!(dev.create_child(root, ""), Err(Error::InvalidName(_))));
    }

    #[test]
    fn test_lookup_sanitizes_like_creation() {
        let dev = Device::new("test");
        let addr = dev.create_parameter("/my osc/gain!", ValueType::Float).unwrap();
        assert_eq!(addr.path(), "/my_osc/gain_");
        assert!(Arc::ptr_eq(&dev.resolve("/my osc/gain!").unwrap(), &addr));
        assert!(Arc::ptr_eq(&dev.resolve("/my_osc/gain_").unwrap(), &addr));
        assert_eq!(dev.find_node("/my osc"), dev.find_node("/my_osc"));
    }

    #[test]
    fn test_descendants_breadth_first() {
        let dev = Device::new("test");
        let c = dev.find_or_create_node("/a/b/c").unwrap();
        let d = dev.find_or_create_node("/a/d").unwrap();
        let a = dev.find_node("/a").unwrap();
        let b = dev.find_node("/a/b").unwrap();
        assert_eq!(dev.descendants(a), vec![a, b, d, c]);
        assert!(dev.descendants(NodeId(999)).is_empty());
    }

    #[test]
    fn test_remove_child_drops_subtree() {
        let dev = Device::new("test");
        let leaf = dev.find_or_create_node("/x/y/z").unwrap();
        let x = dev.find_node("/x").unwrap();
        assert!(dev.remove_child(dev.root(), x).unwrap());
        assert_eq!(dev.find_node("/x/y/z"), None);
        assert_eq!(dev.path_of(leaf), None);
        assert_eq!(dev.node_count(), 1);
        assert!(!dev.remove_child(dev.root(), x).unwrap());
    }

    #[test]
    fn test_rename_updates_address_paths() {
        let dev = Device::new("test");
        let addr = dev.create_parameter("/synth/gain", ValueType::Float).unwrap();
        let synth = dev.find_node("/synth").unwrap();
        assert_eq!(dev.rename(synth, "voice").unwrap(), "voice");
        assert_eq!(addr.path(), "/voice/gain");
        assert!(dev.resolve("/voice/gain").is_some());
        assert!(dev.resolve("/synth/gain").is_none());
    }

    #[test]
    fn test_create_address_reuses_existing() {
        let dev = Device::new("test");
        let node = dev.find_or_create_node("/p").unwrap();
        let a = dev.create_address(node, ValueType::Int).unwrap();
        let b = dev.create_address(node, ValueType::Float).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.value_type(), ValueType::Float);
        assert!(dev.remove_address(node));
        assert!(dev.address(node).is_none());
    }

    #[test]
    fn test_push_reaches_protocols_but_set_does_not() {
        let dev = Device::new("test");
        let rec = Arc::new(Recorder::default());
        dev.expose_to(rec.clone());
        let addr = dev.create_parameter("/level", ValueType::Int).unwrap();
        addr.set_value(1).unwrap();
        addr.push_value(2).unwrap();
        assert_eq!(*rec.seen.lock(), vec![("/level".to_owned(), vec![WireArg::Int32(2)])]);
    }

    #[test]
    fn test_remote_origin_is_not_echoed() {
        let dev = Device::new("test");
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        let id_a = dev.expose_to(a.clone());
        dev.expose_to(b.clone());
        dev.create_parameter("/x", ValueType::Float).unwrap();
        dev.deliver("/x", &[WireArg::Float32(0.5)], Origin::Remote(id_a)).unwrap();
        assert!(a.seen.lock().is_empty());
        assert_eq!(b.seen.lock().len(), 1);
    }

    #[test]
    fn test_deliver_unknown_path() {
        let dev = Device::new("test");
        let err = dev.deliver("/nope", &[], Origin::Local).unwrap_err();
        assert!(matches!(err, Error::PathNotFound(_)));
    }
}
