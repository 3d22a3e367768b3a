//! Decoded flow records.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::Serialize;

/// A decoded field value.
///
/// Serializes untagged, so a flow turns into a plain JSON object.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    /// Strings, and the textual form of MAC and IP addresses.
    String(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    /// Lowercase hex rendering of an octet array.
    Hex(String),
}

impl Value {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Unsigned(value) => Some(*value),
            Self::Signed(value) => u64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) | Self::Hex(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned(value) => write!(f, "{value}"),
            Self::Signed(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::String(value) | Self::Hex(value) => f.write_str(value),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Timestamp(value) => {
                f.write_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        }
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Unsigned(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Signed(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// One decoded data record: field name to value, in wire order.
///
/// A name that appears twice keeps its first position and its last value.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Flow {
    fields: IndexMap<String, Value>,
}

impl Flow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> IndexMap<String, Value> {
        self.fields
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// One line description of the flow, e.g.
    /// `Ipfix [10.0.0.1]:5353 <> [10.0.0.2]:53 proto:17 pkts:1 bytes:70`.
    ///
    /// IPv6 addresses are used when the IPv4 ones are absent. Fields that are
    /// missing altogether are rendered as `-`, counters as 0.
    pub fn summary(&self) -> String {
        let counter = |name: &str| self.get(name).and_then(Value::as_u64);
        let text = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| self.get(name))
                .map_or_else(|| "-".to_owned(), Value::to_string)
        };

        let packets = counter("packetDeltaCount").unwrap_or(0);
        let octets = counter("octetDeltaCount")
            .filter(|octets| *octets != 0)
            .or_else(|| counter("fwd_flow_delta_bytes"))
            .unwrap_or(0);
        let protocol = counter("protocolIdentifier").unwrap_or(0);

        format!(
            "Ipfix [{}]:{} <> [{}]:{} proto:{protocol} pkts:{packets} bytes:{octets}",
            text(&["sourceIPv4Address", "sourceIPv6Address"]),
            text(&["sourceTransportPort"]),
            text(&["destinationIPv4Address", "destinationIPv6Address"]),
            text(&["destinationTransportPort"]),
        )
    }
}

impl FromIterator<(String, Value)> for Flow {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Flow {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Flow {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
