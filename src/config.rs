//! Device configuration.
//!
//! A [`DeviceConfig`] describes a device's parameters and the adapters it is
//! exposed to. It is plain serde data, usually loaded from JSON:
//!
//! ```json
//! {
//!   "name": "synth",
//!   "protocols": [{ "kind": "text", "bind": "127.0.0.1:9000", "peer": "127.0.0.1:9001" }],
//!   "parameters": [
//!     { "path": "/filter/cutoff", "type": "float", "unit": "time.hertz",
//!       "min": 20, "max": 20000, "bounding": "clip", "value": 440 },
//!     { "path": "/osc/wave", "type": "string", "values": ["sine", "saw"], "value": "sine" }
//!   ]
//! }
//! ```
//!
//! Bound and value fields are plain JSON: numbers, booleans, strings, `null`
//! for an impulse and arrays for vecs and tuples. They are checked against
//! the declared type when the device is built.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::dataspace::Unit;
use crate::domain::{BoundingMode, Domain, RepetitionFilter};
use crate::model::{Value, ValueType};
use crate::net::{AccessMode, Address, Device};
use crate::{Error, Result};

// ============================================================================
// Configuration types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<ProtocolConfig>,
    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProtocolConfig {
    /// No network exposure.
    Local,
    /// Text protocol over UDP.
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        bind: std::net::SocketAddr,
        peer: std::net::SocketAddr,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterConfig {
    pub path: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// `"dataspace.unit"` or a unit name or alias.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Json>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Json>,
    #[serde(default)]
    pub bounding: BoundingMode,
    #[serde(default)]
    pub repetition_filter: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub access: AccessMode,
    #[serde(default)]
    pub critical: bool,
}

impl ParameterConfig {
    pub fn new(path: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            path: path.into(),
            value_type,
            unit: None,
            min: None,
            max: None,
            values: Vec::new(),
            bounding: BoundingMode::default(),
            repetition_filter: false,
            value: None,
            description: None,
            access: AccessMode::default(),
            critical: false,
        }
    }
}

// ============================================================================
// Loading and saving
// ============================================================================

impl DeviceConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Snapshot the parameters of a live device. Protocols are not
    /// recoverable from a device and are left empty.
    pub fn from_device(device: &Device) -> Self {
        Self {
            name: device.name(),
            protocols: Vec::new(),
            parameters: device.addresses().iter().map(|a| parameter_of(a)).collect(),
        }
    }

    /// Bind and spawn a server for every `Text` protocol entry.
    #[cfg(feature = "net")]
    pub async fn start_protocols(
        &self,
        device: &Device,
    ) -> Result<Vec<(std::sync::Arc<crate::protocol::server::TextServer>, tokio::task::JoinHandle<Result<()>>)>> {
        let mut started = Vec::new();
        for protocol in &self.protocols {
            if let ProtocolConfig::Text { name, bind, peer } = protocol {
                let name = name.clone().unwrap_or_else(|| "text".into());
                started.push(crate::protocol::server::TextServer::bind(device, name, *bind, *peer).await?);
            }
        }
        Ok(started)
    }
}

fn parameter_of(address: &Address) -> ParameterConfig {
    let domain = address.domain();
    let value = address.fetch_value();
    ParameterConfig {
        path: address.path(),
        value_type: address.value_type(),
        unit: address.unit().map(|u| u.to_string()),
        min: domain.as_ref().and_then(Domain::min).map(|v| value_to_json(&v)),
        max: domain.as_ref().and_then(Domain::max).map(|v| value_to_json(&v)),
        values: domain.as_ref().map(|d| d.values().iter().map(value_to_json).collect()).unwrap_or_default(),
        bounding: address.bounding_mode(),
        repetition_filter: address.repetition_filter() == RepetitionFilter::On,
        value: (!value.is_impulse()).then(|| value_to_json(&value)),
        description: address.description(),
        access: address.access_mode(),
        critical: address.critical(),
    }
}

// ============================================================================
// JSON <-> Value
// ============================================================================

/// Plain JSON rendering of a value. Destinations and behaviors have none.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Impulse | Value::Destination(_) | Value::Behavior(_) => Json::Null,
        Value::Bool(b) => Json::from(*b),
        Value::Int(i) => Json::from(*i),
        Value::Float(f) => Json::from(*f),
        Value::Char(c) => Json::from(c.to_string()),
        Value::String(s) => Json::from(s.as_str()),
        Value::Vec2(v) => Json::from(v.to_vec()),
        Value::Vec3(v) => Json::from(v.to_vec()),
        Value::Vec4(v) => Json::from(v.to_vec()),
        Value::Tuple(t) => Json::Array(t.iter().map(value_to_json).collect()),
    }
}

/// Natural value of a JSON document: integers that fit are `Int`, other
/// numbers `Float`, arrays `Tuple`. Objects have no value.
pub fn json_to_value(json: &Json) -> Option<Value> {
    Some(match json {
        Json::Null => Value::Impulse,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64()? as f32),
        },
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::Tuple(items.iter().map(json_to_value).collect::<Option<_>>()?),
        Json::Object(_) => return None,
    })
}

/// Convert `json` into a value of type `ty`, refusing anything the lenient
/// pipeline coercion would silently replace with a default.
fn typed_value(json: &Json, ty: ValueType) -> Option<Value> {
    let raw = json_to_value(json)?;
    let scalar = !raw.is_impulse() && raw.as_tuple().is_none();
    let fits = match ty {
        ValueType::Impulse => raw.is_impulse(),
        ValueType::Bool => scalar && raw.to_bool().is_some(),
        ValueType::Int => scalar && raw.to_i32().is_some(),
        ValueType::Float => scalar && raw.to_f32().is_some(),
        ValueType::Char => scalar && raw.to_char().is_some(),
        ValueType::String => raw.as_str().is_some(),
        ValueType::Vec2 | ValueType::Vec3 | ValueType::Vec4 => raw.as_tuple().is_some_and(|t| {
            Some(t.len()) == ty.vec_len() && t.iter().all(|e| e.to_f32().is_some())
        }),
        ValueType::Tuple => !raw.is_impulse(),
        ValueType::Destination | ValueType::Behavior => false,
    };
    if fits { raw.coerce_to(ty) } else { None }
}

// ============================================================================
// Building a device
// ============================================================================

impl Device {
    /// Build a device and its parameters from `config`. Protocols are not
    /// started; see [`DeviceConfig::start_protocols`].
    pub fn from_config(config: &DeviceConfig) -> Result<Device> {
        let device = Device::new(config.name.as_str());
        for parameter in &config.parameters {
            device.apply_parameter(parameter)?;
        }
        Ok(device)
    }

    /// Create or reconfigure the address described by `parameter`.
    pub fn apply_parameter(&self, parameter: &ParameterConfig) -> Result<std::sync::Arc<Address>> {
        let path = parameter.path.as_str();
        let invalid = |what: &str, json: &Json| {
            Error::Config(format!("{path}: {what} {json} does not fit type {}", parameter.value_type.name()))
        };

        let unit = match &parameter.unit {
            Some(text) => {
                let unit = text.parse::<Unit>()?;
                if unit.value_type() != parameter.value_type {
                    return Err(Error::Config(format!(
                        "{path}: unit {unit} expects {}, parameter is {}",
                        unit.value_type().name(),
                        parameter.value_type.name()
                    )));
                }
                Some(unit)
            }
            None => None,
        };

        let domain = if parameter.min.is_none() && parameter.max.is_none() && parameter.values.is_empty() {
            None
        } else {
            let mut domain = Domain::for_type(parameter.value_type);
            if let Some(json) = &parameter.min {
                domain.set_min(Some(&json_to_value(json).ok_or_else(|| invalid("min", json))?));
                if domain.min().is_none() {
                    return Err(invalid("min", json));
                }
            }
            if let Some(json) = &parameter.max {
                domain.set_max(Some(&json_to_value(json).ok_or_else(|| invalid("max", json))?));
                if domain.max().is_none() {
                    return Err(invalid("max", json));
                }
            }
            if !parameter.values.is_empty() {
                let values = parameter
                    .values
                    .iter()
                    .map(|json| json_to_value(json).ok_or_else(|| invalid("value set member", json)))
                    .collect::<Result<Vec<_>>>()?;
                domain.set_values(&values);
                if domain.values().len() != values.len() {
                    return Err(Error::Config(format!(
                        "{path}: value set does not fit type {}",
                        parameter.value_type.name()
                    )));
                }
            }
            Some(domain)
        };

        let address = self.create_parameter(path, parameter.value_type)?;
        address.set_unit(unit);
        address.set_domain(domain);
        address.set_bounding_mode(parameter.bounding);
        address.set_access_mode(parameter.access);
        address.set_description(parameter.description.clone());
        address.set_critical(parameter.critical);

        if let Some(json) = &parameter.value {
            let value = typed_value(json, parameter.value_type).ok_or_else(|| invalid("value", json))?;
            address.set_value_quiet(value).map_err(|e| Error::Config(format!("{path}: initial value: {e}")))?;
        }
        address.set_repetition_filter(if parameter.repetition_filter {
            RepetitionFilter::On
        } else {
            RepetitionFilter::Off
        });
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataspace::time;
    use pretty_assertions::assert_eq;

    const SYNTH: &str = r#"{
        "name": "synth",
        "protocols": [{ "kind": "local" }],
        "parameters": [
            { "path": "/filter/cutoff", "type": "float", "unit": "time.hertz",
              "min": 20, "max": 20000, "bounding": "clip", "value": 440 },
            { "path": "/osc/wave", "type": "string", "values": ["sine", "saw"], "value": "saw",
              "description": "oscillator shape", "access": "set" },
            { "path": "/pan", "type": "vec2", "value": [0.5, 0.25], "repetition_filter": true }
        ]
    }"#;

    #[test]
    fn test_from_config_builds_tree() {
        let config = DeviceConfig::from_json(SYNTH).unwrap();
        let dev = Device::from_config(&config).unwrap();

        let cutoff = dev.resolve("/filter/cutoff").unwrap();
        assert_eq!(cutoff.fetch_value(), Value::Float(440.0));
        assert_eq!(cutoff.unit(), Some(time::HERTZ));
        assert_eq!(cutoff.bounding_mode(), BoundingMode::Clip);
        assert_eq!(cutoff.domain().and_then(|d| d.max()), Some(Value::Float(20000.0)));

        let wave = dev.resolve("/osc/wave").unwrap();
        assert_eq!(wave.fetch_value(), Value::from("saw"));
        assert_eq!(wave.access_mode(), AccessMode::Set);
        assert_eq!(wave.description().as_deref(), Some("oscillator shape"));

        let pan = dev.resolve("/pan").unwrap();
        assert_eq!(pan.fetch_value(), Value::Vec2([0.5, 0.25]));
        assert_eq!(pan.repetition_filter(), RepetitionFilter::On);
    }

    #[test]
    fn test_unknown_unit_is_config_error() {
        let mut p = ParameterConfig::new("/x", ValueType::Float);
        p.unit = Some("furlong".into());
        let config = DeviceConfig { name: "d".into(), protocols: vec![], parameters: vec![p] };
        assert!(matches!(Device::from_config(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_unit_shape_must_match_type() {
        let mut p = ParameterConfig::new("/x", ValueType::Float);
        p.unit = Some("orientation.euler".into());
        assert!(matches!(Device::new("d").apply_parameter(&p), Err(Error::Config(_))));
    }

    #[test]
    fn test_value_must_fit_type() {
        let mut p = ParameterConfig::new("/x", ValueType::Int);
        p.value = Some(Json::from("loud"));
        assert!(matches!(Device::new("d").apply_parameter(&p), Err(Error::Config(_))));

        let mut p = ParameterConfig::new("/v", ValueType::Vec3);
        p.value = Some(serde_json::json!([1, 2]));
        assert!(matches!(Device::new("d").apply_parameter(&p), Err(Error::Config(_))));
    }

    #[test]
    fn test_string_bounds_are_rejected() {
        let mut p = ParameterConfig::new("/s", ValueType::String);
        p.min = Some(Json::from("a"));
        assert!(matches!(Device::new("d").apply_parameter(&p), Err(Error::Config(_))));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let config = DeviceConfig::from_json(SYNTH).unwrap();
        let dev = Device::from_config(&config).unwrap();
        let snapshot = DeviceConfig::from_device(&dev);
        let json = snapshot.to_json_pretty().unwrap();
        let rebuilt = Device::from_config(&DeviceConfig::from_json(&json).unwrap()).unwrap();
        assert_eq!(DeviceConfig::from_device(&rebuilt), snapshot);
    }

    #[test]
    fn test_json_to_value() {
        assert_eq!(json_to_value(&serde_json::json!(3)), Some(Value::Int(3)));
        assert_eq!(json_to_value(&serde_json::json!(1.5)), Some(Value::Float(1.5)));
        assert_eq!(json_to_value(&serde_json::json!(null)), Some(Value::Impulse));
        assert_eq!(
            json_to_value(&serde_json::json!([1, "a"])),
            Some(Value::Tuple(vec![Value::Int(1), Value::from("a")]))
        );
        assert_eq!(json_to_value(&serde_json::json!({"a": 1})), None);
    }
}
