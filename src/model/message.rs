//! A value addressed to a node, optionally to one element of it and
//! optionally expressed in a unit.

use serde::{Deserialize, Serialize};

use super::value::{Destination, Value};
use crate::dataspace::Unit;
use crate::net::{Device, UpdateOutcome};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub destination: Destination,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

impl Message {
    pub fn new(destination: Destination, value: impl Into<Value>) -> Self {
        Self { destination, value: value.into(), unit: None }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Push the message's value into its destination on `device`.
    ///
    /// An indexed destination writes into that element of the current value;
    /// the merge happens under the address lock, so concurrent piecewise
    /// writes never interleave.
    pub fn launch(&self, device: &Device) -> Result<UpdateOutcome> {
        let node = self.destination.node;
        let address = device.address(node).ok_or_else(|| match device.path_of(node) {
            Some(path) => Error::NoAddress(path),
            None => Error::NodeNotFound(node),
        })?;
        match (self.destination.index.is_empty(), self.unit) {
            (true, Some(unit)) => address.push_value_with_unit(self.value.clone(), unit),
            (true, None) => address.push_value(self.value.clone()),
            (false, Some(_)) => Err(Error::TypeMismatch {
                expected: "whole value for unit conversion".into(),
                got: format!("element {:?}", self.destination.index.as_slice()),
            }),
            (false, None) => address.push_value_at(self.value.clone(), &self.destination.index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataspace::distance;
    use crate::model::ValueType;
    use crate::net::NodeId;

    #[test]
    fn test_launch_whole_value() {
        let dev = Device::new("msg");
        let addr = dev.create_parameter("/len", ValueType::Float).unwrap();
        addr.set_unit(Some(distance::METER));
        Message::new(Destination::new(addr.node()), 150.0f32)
            .with_unit(distance::CENTIMETER)
            .launch(&dev)
            .unwrap();
        assert!((addr.fetch_value().to_f32().unwrap() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_launch_indexed() {
        let dev = Device::new("msg");
        let addr = dev.create_parameter("/pos", ValueType::Vec3).unwrap();
        let dest = Destination::with_index(addr.node(), [1]);
        Message::new(dest, 4.0f32).launch(&dev).unwrap();
        assert_eq!(addr.fetch_value(), Value::Vec3([0.0, 4.0, 0.0]));
    }

    #[test]
    fn test_launch_without_address() {
        let dev = Device::new("msg");
        let node = dev.find_or_create_node("/empty").unwrap();
        let err = Message::new(Destination::new(node), 1).launch(&dev).unwrap_err();
        assert!(matches!(err, Error::NoAddress(_)));
        let err = Message::new(Destination::new(NodeId(999)), 1).launch(&dev).unwrap_err();
        assert!(matches!(err, Error::NodeNotFound(_)));
    }
}
