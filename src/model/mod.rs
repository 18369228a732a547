//! # Value model
//!
//! The tagged [`Value`] union, coercion between its tags, piecewise tuple
//! merging and [`Message`], a value addressed to a node.
//!
//! Design rule: apart from `Message::launch`, nothing here touches the
//! device tree, locks or I/O.

pub mod convert;
pub mod merge;
pub mod message;
pub mod value;

pub use message::Message;
pub use value::{Behavior, Curve, Destination, DestinationIndex, Value, ValueType};
