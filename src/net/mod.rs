//! # Parameter tree
//!
//! A [`Device`] owns a tree of named nodes. Any node may carry an
//! [`Address`], the typed, bounded, observable value that adapters
//! synchronise with remote peers.
//!
//! ```text
//! Device ─ root ─┬─ synth ─┬─ cutoff   (Address: Float, unit Hz, clip 20..20000)
//!                │         └─ wave     (Address: String, values {sine, saw})
//!                └─ mixer ─── gain     (Address: Float, unit dB)
//! ```

pub mod address;
pub mod device;
pub mod node;

pub use address::{AccessMode, Address, CallbackId, UpdateOutcome, ValueCallback};
pub use device::Device;
pub use node::{NodeId, sanitize_name, unique_name};
