//! # paramnet: typed, network-transparent parameter trees
//!
//! A device is a tree of named nodes; a node may carry an [`Address`], a
//! typed parameter with an optional unit, domain and bounding policy. Every
//! write, local or remote, runs the same pipeline:
//!
//! ```text
//! wire args ─ decode ─▶ unit convert ─▶ coerce ─▶ domain/bound ─▶ repetition ─▶ commit
//!                                                                               │
//!                                         callbacks ◀───────────────────────────┤
//!                                         protocol adapters (push only) ◀───────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **One value type**: [`Value`] crosses every boundary, coerced into the
//!    address's declared shape rather than rejected
//! 2. **Pure math**: unit conversion and domain bounding never lock or block
//! 3. **Adapters are a trait**: [`Protocol`] is the contract between a
//!    device and anything that mirrors it over a network
//!
//! ## Quick Start
//!
//! ```rust
//! use paramnet::{BoundingMode, Device, Domain, Value, ValueType};
//!
//! # fn example() -> paramnet::Result<()> {
//! let device = Device::new("synth");
//! let cutoff = device.create_parameter("/filter/cutoff", ValueType::Float)?;
//! cutoff.set_domain(Some(Domain::float(20.0, 20_000.0)));
//! cutoff.set_bounding_mode(BoundingMode::Clip);
//!
//! cutoff.push_value(50_000.0f32)?;
//! assert_eq!(cutoff.fetch_value(), Value::Float(20_000.0));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Adapters
//!
//! | Adapter | Feature | Description |
//! |---------|---------|-------------|
//! | local | (always) | No adapter: callbacks only |
//! | `TextServer` | `net` (default) | Line-oriented text protocol over UDP or in-process channels |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod dataspace;
pub mod domain;
pub mod net;
pub mod protocol;
pub mod config;
pub mod export;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{Behavior, Curve, Destination, Message, Value, ValueType};

// ============================================================================
// Re-exports: Units and domains
// ============================================================================

pub use dataspace::{Dataspace, Unit};
pub use domain::{BoundingMode, Domain, RepetitionFilter};

// ============================================================================
// Re-exports: Tree
// ============================================================================

pub use net::{AccessMode, Address, CallbackId, Device, NodeId, UpdateOutcome};

// ============================================================================
// Re-exports: Protocols
// ============================================================================

pub use protocol::wire::WireArg;
pub use protocol::{Commit, Origin, Protocol, ProtocolId};
#[cfg(feature = "net")]
pub use protocol::server::TextServer;

pub use config::DeviceConfig;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Value {value} rejected by the domain of {path}")]
    DomainRejected { path: String, value: String },

    #[error("Cannot convert {from} to {to}")]
    UnconvertibleUnit { from: String, to: String },

    #[error("No such address: {0}")]
    PathNotFound(String),

    #[error("Invalid node name: {0:?}")]
    InvalidName(String),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node has no address: {0}")]
    NoAddress(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
