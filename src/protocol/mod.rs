//! # Protocol adapter contract
//!
//! A [`Protocol`] is anything a device exposes its parameters to. The device
//! calls [`Protocol::on_commit`] for every committed value that should leave
//! the process; inbound traffic enters through [`crate::Device::deliver`].
//!
//! ## Implementations
//!
//! | Adapter | Module | Feature | Description |
//! |---------|--------|---------|-------------|
//! | `TextServer` | `server` | `net` | Line-oriented text protocol over any [`transport::Transport`] |
//!
//! Wire-level argument encoding shared by all adapters lives in [`wire`];
//! the text grammar in [`text`].

pub mod text;
pub mod wire;
#[cfg(feature = "net")]
pub mod transport;
#[cfg(feature = "net")]
pub mod server;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::model::Value;
use wire::WireArg;

/// Identifier of a protocol exposed on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtocolId(pub u64);

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "protocol#{}", self.0)
    }
}

/// Where a write came from. Remote writes are not echoed back to the
/// protocol that delivered them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Origin {
    #[default]
    Local,
    Remote(ProtocolId),
}

/// A committed value on its way out to adapters.
#[derive(Debug, Clone, Copy)]
pub struct Commit<'a> {
    pub path: &'a str,
    pub value: &'a Value,
    /// `value` encoded for the wire.
    pub arguments: &'a [WireArg],
    /// Domain bounds encoded for the wire, when the address has a domain.
    pub domain: Option<&'a [WireArg]>,
    pub critical: bool,
    pub origin: Origin,
}

/// Outbound side of a network adapter.
///
/// `on_commit` runs on the thread that committed the value, after local
/// callbacks. Implementations should hand the commit to their own I/O task
/// rather than block.
pub trait Protocol: Send + Sync {
    fn name(&self) -> &str;

    fn on_commit(&self, commit: &Commit<'_>) -> Result<()>;
}
