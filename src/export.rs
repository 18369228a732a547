//! Namespace export: describe a device tree as a JSON document.
//!
//! The layout follows the usual query-server shape, one object per node:
//!
//! ```text
//! {
//!   "FULL_PATH": "/filter/cutoff",
//!   "TYPE": "f",                       wire tags of the current value
//!   "VALUE": [440.0],
//!   "RANGE": [{ "MIN": 20.0, "MAX": 20000.0 }],
//!   "CLIPMODE": "both",
//!   "UNIT": ["time.hertz"],
//!   "ACCESS": 3,
//!   "DESCRIPTION": "...",
//!   "CRITICAL": false,
//!   "CONTENTS": { "<child>": { ... } }
//! }
//! ```
//!
//! Nodes without an address carry only `FULL_PATH` and `CONTENTS`.

use std::io::Write;

use serde_json::{Map, Value as Json, json};

use crate::Result;
use crate::config::value_to_json;
use crate::domain::Domain;
use crate::model::ValueType;
use crate::net::{Address, Device, NodeId};
use crate::protocol::wire::{self, WireArg};

/// Describe the whole device.
pub fn namespace(device: &Device) -> Json {
    node_json(device, device.root()).unwrap_or(Json::Null)
}

/// Describe the subtree at `path`, if it exists.
pub fn namespace_at(device: &Device, path: &str) -> Option<Json> {
    node_json(device, device.find_node(path)?)
}

/// Write the namespace of `device` as pretty JSON.
pub fn export_namespace(device: &Device, writer: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &namespace(device))?;
    writeln!(writer)?;
    Ok(())
}

fn node_json(device: &Device, node: NodeId) -> Option<Json> {
    let mut object = Map::new();
    object.insert("FULL_PATH".into(), Json::from(device.path_of(node)?));

    if let Some(address) = device.address(node) {
        describe_address(&address, &mut object);
    }

    let children = device.children(node);
    if !children.is_empty() {
        let mut contents = Map::new();
        for child in children {
            // A child removed since the snapshot simply drops out.
            if let (Some(name), Some(described)) = (device.node_name(child), node_json(device, child)) {
                contents.insert(name, described);
            }
        }
        object.insert("CONTENTS".into(), Json::Object(contents));
    }
    Some(Json::Object(object))
}

fn describe_address(address: &Address, object: &mut Map<String, Json>) {
    let value = address.fetch_value();
    let args = wire::encode(&value);
    let tags = match address.value_type() {
        ValueType::Impulse => "I".to_owned(),
        _ => wire::tags(&args),
    };
    object.insert("TYPE".into(), Json::from(tags));
    if !args.is_empty() {
        object.insert("VALUE".into(), Json::Array(args.iter().map(arg_to_json).collect()));
    }
    if let Some(range) = address.domain().as_ref().and_then(range_json) {
        object.insert("RANGE".into(), range);
    }
    object.insert("CLIPMODE".into(), Json::from(address.bounding_mode().name()));
    if let Some(unit) = address.unit() {
        object.insert("UNIT".into(), json!([unit.to_string()]));
    }
    object.insert("ACCESS".into(), Json::from(address.access_mode().code()));
    if let Some(description) = address.description() {
        object.insert("DESCRIPTION".into(), Json::from(description));
    }
    object.insert("CRITICAL".into(), Json::from(address.critical()));
}

fn arg_to_json(arg: &WireArg) -> Json {
    match arg {
        WireArg::Int32(i) => Json::from(*i),
        WireArg::Int64(i) => Json::from(*i),
        WireArg::Float32(f) => Json::from(*f),
        WireArg::Float64(f) => Json::from(*f),
        WireArg::Char(c) => Json::from(c.to_string()),
        WireArg::True => Json::from(true),
        WireArg::False => Json::from(false),
        WireArg::String(s) | WireArg::Symbol(s) => Json::from(s.as_str()),
        WireArg::Nil => Json::Null,
    }
}

/// One range entry per vec component, or a single entry for scalars.
/// A value set is attached to the first entry.
fn range_json(domain: &Domain) -> Option<Json> {
    let split = |bound: Option<crate::model::Value>| -> Vec<Json> {
        match bound {
            Some(v) => match v.as_components() {
                Some(components) => components.iter().map(|c| Json::from(*c)).collect(),
                None => vec![value_to_json(&v)],
            },
            None => Vec::new(),
        }
    };
    let mins = split(domain.min());
    let maxs = split(domain.max());
    let values = domain.values();

    let mut entries: Vec<Map<String, Json>> = Vec::new();
    for i in 0..mins.len().max(maxs.len()) {
        let mut entry = Map::new();
        if let Some(min) = mins.get(i) {
            entry.insert("MIN".into(), min.clone());
        }
        if let Some(max) = maxs.get(i) {
            entry.insert("MAX".into(), max.clone());
        }
        entries.push(entry);
    }
    if !values.is_empty() {
        if entries.is_empty() {
            entries.push(Map::new());
        }
        entries[0].insert("VALS".into(), Json::Array(values.iter().map(value_to_json).collect()));
    }
    (!entries.is_empty()).then(|| Json::Array(entries.into_iter().map(Json::Object).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataspace::gain;
    use crate::domain::BoundingMode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scalar_parameter() {
        let dev = Device::new("x");
        let a = dev.create_parameter("/amp/level", ValueType::Float).unwrap();
        a.set_domain(Some(Domain::float(-96.0, 12.0)));
        a.set_bounding_mode(BoundingMode::Clip);
        a.set_unit(Some(gain::DECIBEL));
        a.set_value_quiet(-6.0f32).unwrap();

        let doc = namespace(&dev);
        let level = &doc["CONTENTS"]["amp"]["CONTENTS"]["level"];
        assert_eq!(level["FULL_PATH"], json!("/amp/level"));
        assert_eq!(level["TYPE"], json!("f"));
        assert_eq!(level["VALUE"], json!([-6.0]));
        assert_eq!(level["RANGE"], json!([{ "MIN": -96.0, "MAX": 12.0 }]));
        assert_eq!(level["CLIPMODE"], json!("both"));
        assert_eq!(level["UNIT"], json!(["gain.decibel"]));
        assert_eq!(level["ACCESS"], json!(3));
        assert!(doc["CONTENTS"]["amp"].get("TYPE").is_none());
    }

    #[test]
    fn test_vec_range_and_value_set() {
        let dev = Device::new("x");
        let pos = dev.create_parameter("/pos", ValueType::Vec2).unwrap();
        pos.set_domain(Some(Domain::make(&[0.0f32, -1.0].into(), &[1.0f32, 1.0].into())));
        let wave = dev.create_parameter("/wave", ValueType::String).unwrap();
        wave.set_domain(Some(Domain::from_values(ValueType::String, &["sine".into(), "saw".into()])));

        let doc = namespace(&dev);
        assert_eq!(
            doc["CONTENTS"]["pos"]["RANGE"],
            json!([{ "MIN": 0.0, "MAX": 1.0 }, { "MIN": -1.0, "MAX": 1.0 }])
        );
        assert_eq!(doc["CONTENTS"]["wave"]["RANGE"], json!([{ "VALS": ["sine", "saw"] }]));
    }

    #[test]
    fn test_export_writes_json() {
        let dev = Device::new("x");
        dev.create_parameter("/go", ValueType::Impulse).unwrap();
        let mut out = Vec::new();
        export_namespace(&dev, &mut out).unwrap();
        let parsed: Json = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["CONTENTS"]["go"]["TYPE"], json!("I"));
        assert_eq!(namespace_at(&dev, "/go").unwrap()["FULL_PATH"], json!("/go"));
        assert!(namespace_at(&dev, "/missing").is_none());
    }
}
