//! Address: the value-bearing facet of a node.
//!
//! Every write, local or remote, goes through the same pipeline under the
//! address's state lock:
//!
//! ```text
//! decode ─▶ unit conversion ─▶ shape coercion ─▶ domain ─▶ repetition filter ─▶ commit
//! ```
//!
//! Only a committed value fans out. Callbacks run after the lock is released,
//! in registration order, on the writer's thread; adapters are notified
//! after them. A callback writing back into the same address on the same
//! thread is queued and applied once the current fan-out completes; only
//! that thread applies it.

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::NodeId;
use crate::dataspace::{self, Unit};
use crate::domain::{BoundingMode, Domain, RepetitionFilter};
use crate::model::{DestinationIndex, Value, ValueType, merge};
use crate::protocol::Origin;
use crate::protocol::wire::{self, WireArg};
use crate::{Error, Result};

/// Change callback. Receives the committed value.
pub type ValueCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle returned by [`Address::add_callback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackId(pub u64);

/// Access direction advertised to remote peers. Not enforced locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Get,
    Set,
    #[default]
    Bi,
}

impl AccessMode {
    /// Numeric code used in namespace exports.
    pub fn code(self) -> u8 {
        match self {
            AccessMode::Get => 1,
            AccessMode::Set => 2,
            AccessMode::Bi => 3,
        }
    }
}

/// Result of a write that was not rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// Stored and fanned out.
    Committed(Value),
    /// Equal to the current value with the repetition filter on.
    Suppressed,
    /// Issued from inside this address's own fan-out; applied afterwards.
    Queued,
}

impl UpdateOutcome {
    pub fn committed(&self) -> Option<&Value> {
        match self {
            UpdateOutcome::Committed(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, UpdateOutcome::Committed(_))
    }
}

/// Receiver of committed values; implemented by the owning device.
pub(crate) trait CommitSink: Send + Sync {
    fn on_commit(&self, address: &Address, value: &Value, origin: Origin);
}

// ============================================================================
// Pipeline input
// ============================================================================

#[derive(Debug)]
enum Input {
    Value(Value),
    Indexed(Value, DestinationIndex),
    Wire(Vec<WireArg>),
}

#[derive(Debug, Clone, Copy)]
struct Notify {
    callbacks: bool,
    network: bool,
}

impl Notify {
    const ALL: Notify = Notify { callbacks: true, network: true };
    const LOCAL: Notify = Notify { callbacks: true, network: false };
    const NONE: Notify = Notify { callbacks: false, network: false };
}

#[derive(Debug)]
struct Write {
    input: Input,
    unit: Option<Unit>,
    origin: Origin,
    notify: Notify,
}

#[derive(Debug)]
struct AddressState {
    value: Value,
    previous: Value,
    value_type: ValueType,
    unit: Option<Unit>,
    domain: Option<Domain>,
    bounding: BoundingMode,
    repetition: RepetitionFilter,
    access: AccessMode,
    description: Option<String>,
    critical: bool,
}

impl AddressState {
    fn new(value_type: ValueType) -> Self {
        let value = initial_value(value_type);
        Self {
            previous: value.clone(),
            value,
            value_type,
            unit: None,
            domain: None,
            bounding: BoundingMode::Free,
            repetition: RepetitionFilter::Off,
            access: AccessMode::Bi,
            description: None,
            critical: false,
        }
    }

    /// Coerce into the declared shape. Addresses whose type has no zero
    /// value hold an impulse placeholder until first written.
    fn coerce(&self, value: &Value) -> Option<Value> {
        if self.value.shape() == self.value_type {
            value.coerce_into(&self.value)
        } else {
            value.coerce_to(self.value_type)
        }
    }

    fn retype(&mut self, ty: ValueType) {
        if ty == self.value_type {
            return;
        }
        self.value = self.value.coerce_to(ty).unwrap_or_else(|| initial_value(ty));
        self.previous = self.previous.coerce_to(ty).unwrap_or_else(|| initial_value(ty));
        self.domain = self.domain.take().map(|d| d.convert(ty));
        self.value_type = ty;
    }
}

fn initial_value(ty: ValueType) -> Value {
    ty.default_value().unwrap_or(Value::Impulse)
}

// ============================================================================
// Reentrancy tracking
// ============================================================================

thread_local! {
    static DISPATCHING: RefCell<SmallVec<[usize; 4]>> = RefCell::new(SmallVec::new());
}

/// Marks an address as fanning out on the current thread.
struct DispatchGuard(usize);

impl DispatchGuard {
    fn key(address: &Address) -> usize {
        std::ptr::from_ref(address) as usize
    }

    fn enter(address: &Address) -> Self {
        let key = Self::key(address);
        DISPATCHING.with(|d| d.borrow_mut().push(key));
        Self(key)
    }

    fn is_active(address: &Address) -> bool {
        let key = Self::key(address);
        DISPATCHING.with(|d| d.borrow().contains(&key))
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DISPATCHING.with(|d| {
            let mut d = d.borrow_mut();
            if let Some(pos) = d.iter().rposition(|k| *k == self.0) {
                d.remove(pos);
            }
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

// ============================================================================
// Address
// ============================================================================

pub struct Address {
    node: NodeId,
    path: RwLock<String>,
    state: Mutex<AddressState>,
    callbacks: Mutex<Vec<(CallbackId, ValueCallback)>>,
    next_callback: AtomicU64,
    /// Reentrant writes, tagged with the thread whose fan-out queued them.
    pending: Mutex<VecDeque<(ThreadId, Write)>>,
    sink: Option<Weak<dyn CommitSink>>,
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Address")
            .field("node", &self.node)
            .field("path", &*self.path.read())
            .field("value", &state.value)
            .field("value_type", &state.value_type)
            .field("unit", &state.unit)
            .finish_non_exhaustive()
    }
}

impl Address {
    /// A detached address with no owning device. Commits reach callbacks only.
    pub fn new(node: NodeId, path: impl Into<String>, value_type: ValueType) -> Self {
        Self::with_sink(node, path.into(), value_type, None)
    }

    pub(crate) fn with_sink(
        node: NodeId,
        path: String,
        value_type: ValueType,
        sink: Option<Weak<dyn CommitSink>>,
    ) -> Self {
        Self {
            node,
            path: RwLock::new(path),
            state: Mutex::new(AddressState::new(value_type)),
            callbacks: Mutex::new(Vec::new()),
            next_callback: AtomicU64::new(1),
            pending: Mutex::new(VecDeque::new()),
            sink,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Full path of the owning node, e.g. `/synth/cutoff`.
    pub fn path(&self) -> String {
        self.path.read().clone()
    }

    pub(crate) fn set_path(&self, path: String) {
        *self.path.write() = path;
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Local write. Callbacks fire, adapters are not told.
    pub fn set_value(&self, value: impl Into<Value>) -> Result<UpdateOutcome> {
        self.submit(Write { input: Input::Value(value.into()), unit: None, origin: Origin::Local, notify: Notify::LOCAL })
    }

    /// Local write that also propagates to every exposed adapter.
    pub fn push_value(&self, value: impl Into<Value>) -> Result<UpdateOutcome> {
        self.submit(Write { input: Input::Value(value.into()), unit: None, origin: Origin::Local, notify: Notify::ALL })
    }

    /// Write without notifying anyone.
    pub fn set_value_quiet(&self, value: impl Into<Value>) -> Result<UpdateOutcome> {
        self.submit(Write { input: Input::Value(value.into()), unit: None, origin: Origin::Local, notify: Notify::NONE })
    }

    /// Push a value expressed in `unit`; it is converted to this address's
    /// unit before bounding.
    pub fn push_value_with_unit(&self, value: impl Into<Value>, unit: Unit) -> Result<UpdateOutcome> {
        self.submit(Write { input: Input::Value(value.into()), unit: Some(unit), origin: Origin::Local, notify: Notify::ALL })
    }

    /// Push `value` into one element of the current tuple or vec.
    pub fn push_value_at(&self, value: impl Into<Value>, index: &[usize]) -> Result<UpdateOutcome> {
        let input = Input::Indexed(value.into(), index.iter().copied().collect());
        self.submit(Write { input, unit: None, origin: Origin::Local, notify: Notify::ALL })
    }

    /// Raw wire arguments arriving from an adapter.
    pub fn deliver(&self, args: &[WireArg], origin: Origin) -> Result<UpdateOutcome> {
        self.submit(Write { input: Input::Wire(args.to_vec()), unit: None, origin, notify: Notify::ALL })
    }

    /// Raw wire arguments expressed in the sender's `unit`.
    pub fn deliver_with_unit(&self, args: &[WireArg], unit: Unit, origin: Origin) -> Result<UpdateOutcome> {
        self.submit(Write { input: Input::Wire(args.to_vec()), unit: Some(unit), origin, notify: Notify::ALL })
    }

    fn submit(&self, write: Write) -> Result<UpdateOutcome> {
        if DispatchGuard::is_active(self) {
            trace!(path = %self.path(), "reentrant write queued");
            self.pending.lock().push_back((thread::current().id(), write));
            return Ok(UpdateOutcome::Queued);
        }
        let outcome = self.process(write);
        self.drain_pending();
        outcome
    }

    /// Apply the writes this thread queued. Other threads' entries stay put
    /// until their own fan-out has finished.
    fn drain_pending(&self) {
        let me = thread::current().id();
        loop {
            let next = {
                let mut pending = self.pending.lock();
                pending.iter().position(|(t, _)| *t == me).and_then(|i| pending.remove(i))
            };
            let Some((_, write)) = next else {
                break;
            };
            // rejections are already logged by process
            let _ = self.process(write);
        }
    }

    fn process(&self, write: Write) -> Result<UpdateOutcome> {
        match self.apply(&write) {
            Ok(Some(value)) => {
                self.dispatch(&value, &write);
                Ok(UpdateOutcome::Committed(value))
            }
            Ok(None) => {
                trace!(path = %self.path(), "repeated value suppressed");
                Ok(UpdateOutcome::Suppressed)
            }
            Err(e) => {
                debug!(path = %self.path(), error = %e, "update rejected");
                Err(e)
            }
        }
    }

    /// Run the pipeline. `Ok(None)` means the repetition filter dropped it.
    fn apply(&self, write: &Write) -> Result<Option<Value>> {
        let mut state = self.state.lock();

        let (decoded, from_unit) = match &write.input {
            Input::Value(v) => (v.clone(), write.unit),
            Input::Indexed(v, index) => {
                let merged = merge::write_at(&state.value, v, index).ok_or_else(|| Error::TypeMismatch {
                    expected: format!("{} indexed by {:?}", state.value_type, index.as_slice()),
                    got: v.type_name().into(),
                })?;
                (merged, None)
            }
            Input::Wire(args) if args.is_empty() => (state.value.clone(), None),
            Input::Wire(args) => {
                let template = match write.unit {
                    Some(unit) if Some(unit) != state.unit => {
                        unit.value_type().default_value().unwrap_or_else(|| state.value.clone())
                    }
                    _ => state.value.clone(),
                };
                let decoded = wire::decode(&template, args).ok_or_else(|| Error::TypeMismatch {
                    expected: template.type_name().into(),
                    got: wire::describe(args),
                })?;
                (decoded, write.unit)
            }
        };

        let converted = match (from_unit, state.unit) {
            (Some(from), Some(to)) if from != to => dataspace::convert(&decoded, from, to)?,
            _ => decoded,
        };

        let coerced = state.coerce(&converted).ok_or_else(|| Error::TypeMismatch {
            expected: state.value_type.name().into(),
            got: converted.type_name().into(),
        })?;

        let bounded = match &state.domain {
            Some(domain) => domain.apply(state.bounding, &coerced).ok_or_else(|| Error::DomainRejected {
                path: self.path(),
                value: coerced.to_string(),
            })?,
            None => coerced,
        };

        if state.repetition == RepetitionFilter::On && bounded == state.value {
            return Ok(None);
        }

        state.previous = std::mem::replace(&mut state.value, bounded.clone());
        Ok(Some(bounded))
    }

    fn dispatch(&self, value: &Value, write: &Write) {
        let _guard = DispatchGuard::enter(self);

        if write.notify.callbacks {
            let snapshot: SmallVec<[ValueCallback; 4]> =
                self.callbacks.lock().iter().map(|(_, cb)| Arc::clone(cb)).collect();
            for callback in snapshot {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(value))) {
                    warn!(path = %self.path(), panic = panic_message(payload.as_ref()), "value callback panicked");
                }
            }
        }

        if write.notify.network {
            if let Some(sink) = self.sink.as_ref().and_then(Weak::upgrade) {
                sink.on_commit(self, value, write.origin);
            }
        }
    }

    // ========================================================================
    // Callbacks
    // ========================================================================

    pub fn add_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = CallbackId(self.next_callback.fetch_add(1, Ordering::Relaxed));
        self.callbacks.lock().push((id, Arc::new(callback)));
        id
    }

    /// Returns `false` if the id was not registered.
    pub fn remove_callback(&self, id: CallbackId) -> bool {
        let mut callbacks = self.callbacks.lock();
        let before = callbacks.len();
        callbacks.retain(|(cid, _)| *cid != id);
        callbacks.len() != before
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.lock().len()
    }

    // ========================================================================
    // Reads & attributes
    // ========================================================================

    pub fn fetch_value(&self) -> Value {
        self.state.lock().value.clone()
    }

    /// Value replaced by the most recent commit.
    pub fn previous_value(&self) -> Value {
        self.state.lock().previous.clone()
    }

    pub fn value_type(&self) -> ValueType {
        self.state.lock().value_type
    }

    /// Change the declared shape. The current value and domain are converted;
    /// a unit whose shape no longer fits is dropped.
    pub fn set_value_type(&self, ty: ValueType) {
        let mut state = self.state.lock();
        state.retype(ty);
        if state.unit.is_some_and(|u| u.value_type() != ty) {
            debug!(path = %self.path(), "unit dropped after type change");
            state.unit = None;
        }
    }

    pub fn unit(&self) -> Option<Unit> {
        self.state.lock().unit
    }

    /// Declare the unit. The value type follows the unit's natural shape.
    pub fn set_unit(&self, unit: Option<Unit>) {
        let mut state = self.state.lock();
        if let Some(unit) = unit {
            state.retype(unit.value_type());
        }
        state.unit = unit;
    }

    pub fn domain(&self) -> Option<Domain> {
        self.state.lock().domain.clone()
    }

    /// Install a domain. A typed domain is converted to the address type
    /// when nothing is lost; otherwise it is stored as given, so bounds of
    /// the wrong length reject writes instead of vanishing.
    pub fn set_domain(&self, domain: Option<Domain>) {
        let mut state = self.state.lock();
        let ty = state.value_type;
        state.domain = domain.map(|d| match d.value_type() {
            Some(t) if t != ty => d.convert_exact(ty).unwrap_or(d),
            _ => d,
        });
    }

    pub fn bounding_mode(&self) -> BoundingMode {
        self.state.lock().bounding
    }

    pub fn set_bounding_mode(&self, mode: BoundingMode) {
        self.state.lock().bounding = mode;
    }

    pub fn repetition_filter(&self) -> RepetitionFilter {
        self.state.lock().repetition
    }

    pub fn set_repetition_filter(&self, filter: RepetitionFilter) {
        self.state.lock().repetition = filter;
    }

    pub fn access_mode(&self) -> AccessMode {
        self.state.lock().access
    }

    pub fn set_access_mode(&self, mode: AccessMode) {
        self.state.lock().access = mode;
    }

    pub fn description(&self) -> Option<String> {
        self.state.lock().description.clone()
    }

    pub fn set_description(&self, description: Option<String>) {
        self.state.lock().description = description;
    }

    /// Critical parameters should be sent over a reliable channel.
    pub fn critical(&self) -> bool {
        self.state.lock().critical
    }

    pub fn set_critical(&self, critical: bool) {
        self.state.lock().critical = critical;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataspace::angle;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;

    fn float_address() -> Address {
        Address::new(NodeId(1), "/test", ValueType::Float)
    }

    #[test]
    fn test_set_and_fetch() {
        let a = float_address();
        assert_eq!(a.fetch_value(), Value::Float(0.0));
        let out = a.set_value(Value::Int(3)).unwrap();
        assert_eq!(out, UpdateOutcome::Committed(Value::Float(3.0)));
        assert_eq!(a.fetch_value(), Value::Float(3.0));
        assert_eq!(a.previous_value(), Value::Float(0.0));
    }

    #[test]
    fn test_domain_clip_and_reject() {
        let a = Address::new(NodeId(1), "/mode", ValueType::Int);
        a.set_domain(Some(Domain::from_values(ValueType::Int, &[Value::Int(1), Value::Int(2)])));
        a.set_bounding_mode(BoundingMode::Clip);
        assert!(a.set_value(2).is_ok());
        let err = a.set_value(5).unwrap_err();
        assert!(matches!(err, Error::DomainRejected { .. }));
        assert_eq!(a.fetch_value(), Value::Int(2));
    }

    #[test]
    fn test_repetition_filter_suppresses_callbacks() {
        let a = float_address();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        a.add_callback(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        a.set_repetition_filter(RepetitionFilter::On);
        a.set_value(1.0f32).unwrap();
        assert_eq!(a.set_value(1.0f32).unwrap(), UpdateOutcome::Suppressed);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_quiet_write_skips_callbacks() {
        let a = float_address();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        a.add_callback(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        a.set_value_quiet(2.0f32).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(a.fetch_value(), Value::Float(2.0));
    }

    #[test]
    fn test_remove_callback() {
        let a = float_address();
        let id = a.add_callback(|_| {});
        assert_eq!(a.callback_count(), 1);
        assert!(a.remove_callback(id));
        assert!(!a.remove_callback(id));
        assert_eq!(a.callback_count(), 0);
    }

    #[test]
    fn test_panicking_callback_is_isolated() {
        let a = float_address();
        let hits = Arc::new(AtomicUsize::new(0));
        a.add_callback(|_| panic!("boom"));
        let h = Arc::clone(&hits);
        a.add_callback(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert!(a.set_value(1.0f32).unwrap().is_committed());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unit_conversion_on_push() {
        let a = float_address();
        a.set_unit(Some(angle::RADIAN));
        a.push_value_with_unit(180.0f32, angle::DEGREE).unwrap();
        let rad = a.fetch_value().to_f32().unwrap();
        assert!((rad - std::f32::consts::PI).abs() < 1e-5);
    }

    #[test]
    fn test_set_unit_retypes() {
        let a = float_address();
        a.set_value(2.0f32).unwrap();
        a.set_unit(Some(crate::dataspace::color::RGB));
        assert_eq!(a.value_type(), ValueType::Vec3);
        assert_eq!(a.fetch_value(), Value::Vec3([2.0, 0.0, 0.0]));
    }

    #[test]
    fn test_push_value_at() {
        let a = Address::new(NodeId(1), "/t", ValueType::Tuple);
        a.set_value(Value::from(vec![1, 2, 3])).unwrap();
        a.push_value_at(9, &[1]).unwrap();
        assert_eq!(a.fetch_value(), Value::from(vec![1, 9, 3]));
    }

    #[test]
    fn test_destination_address_accepts_only_destinations() {
        let a = Address::new(NodeId(1), "/d", ValueType::Destination);
        assert!(a.set_value(1.0f32).is_err());
        let dest = Value::Destination(crate::model::Destination::new(NodeId(7)));
        a.set_value(dest.clone()).unwrap();
        assert_eq!(a.fetch_value(), dest);
    }

    #[test]
    fn test_wire_zero_args_recommits_current() {
        let a = float_address();
        a.set_value(4.0f32).unwrap();
        let out = a.deliver(&[], Origin::Local).unwrap();
        assert_eq!(out, UpdateOutcome::Committed(Value::Float(4.0)));
    }

    #[test]
    fn test_reentrant_write_is_queued() {
        let a = Arc::new(float_address());
        let weak = Arc::downgrade(&a);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        a.add_callback(move |v| {
            s.lock().push(v.clone());
            if v == &Value::Float(1.0) {
                if let Some(a) = weak.upgrade() {
                    assert_eq!(a.set_value(2.0f32).unwrap(), UpdateOutcome::Queued);
                }
            }
        });
        a.set_value(1.0f32).unwrap();
        assert_eq!(*seen.lock(), vec![Value::Float(1.0), Value::Float(2.0)]);
        assert_eq!(a.fetch_value(), Value::Float(2.0));
    }
}
