//! Cache Key Module
//!
//! Deterministic cache keys built from an operation name and its parameters.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::form_urlencoded;

/// Operation name used for preview URL keys.
pub const IMAGE_OPERATION: &str = "preview";

// == Generate Cache Key ==
/// Builds a key of the form `op_"name1"=value1&"name2"=value2`.
///
/// Parameter names are sorted so insertion order never matters. Names and
/// values are JSON encoded, which keeps `"3"` and `3` distinct. The operation
/// is form-encoded, so it never contains a `"` and the first quote always
/// marks where the parameters begin. An empty parameter set yields the bare
/// (encoded) operation name.
pub fn generate_cache_key<'a, I>(operation: &str, params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut pairs: Vec<(&str, &Value)> = params.into_iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let operation = encode_operation(operation);
    if pairs.is_empty() {
        return operation;
    }

    let joined = pairs
        .iter()
        .map(|(name, value)| encode_pair(name, value))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}_{}", operation, joined)
}

/// The `"name"=value` fragment `generate_cache_key` emits for one parameter.
pub fn encode_pair(name: &str, value: &Value) -> String {
    format!("{}={}", encode_json(&Value::from(name)), encode_json(value))
}

fn encode_operation(operation: &str) -> String {
    // Leaves `[A-Za-z0-9_.*-]` untouched, so `payments_list` stays readable
    form_urlencoded::byte_serialize(operation.as_bytes()).collect()
}

fn encode_json(value: &Value) -> String {
    // serde_json maps are ordered by key, so nested objects are stable too
    serde_json::to_string(value).unwrap_or_default()
}

// == Gravity ==
/// Crop anchor passed to the preview generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gravity {
    #[default]
    Center,
    TopLeft,
    Top,
    TopRight,
    Left,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl Gravity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gravity::Center => "center",
            Gravity::TopLeft => "top-left",
            Gravity::Top => "top",
            Gravity::TopRight => "top-right",
            Gravity::Left => "left",
            Gravity::Right => "right",
            Gravity::BottomLeft => "bottom-left",
            Gravity::Bottom => "bottom",
            Gravity::BottomRight => "bottom-right",
        }
    }
}

impl fmt::Display for Gravity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Image Key Params ==
/// Everything that identifies one rendered preview.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCacheKeyParams {
    pub bucket_id: String,
    pub file_id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default)]
    pub gravity: Gravity,
    pub quality: Option<u8>,
}

impl ImageCacheKeyParams {
    pub fn new(bucket_id: impl Into<String>, file_id: impl Into<String>) -> Self {
        Self {
            bucket_id: bucket_id.into(),
            file_id: file_id.into(),
            width: None,
            height: None,
            gravity: Gravity::default(),
            quality: None,
        }
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn gravity(mut self, gravity: Gravity) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    /// True when both identifiers are present. Without them there is
    /// nothing to render or cache.
    pub fn is_addressable(&self) -> bool {
        !self.bucket_id.is_empty() && !self.file_id.is_empty()
    }

    /// Key fragment naming `file_id`. Every preview key of that file
    /// contains it, and no other file's keys do.
    pub fn file_id_fragment(file_id: &str) -> String {
        encode_pair("fileId", &Value::from(file_id))
    }

    pub fn cache_key(&self) -> String {
        let params = [
            ("bucketId", Value::from(self.bucket_id.as_str())),
            ("fileId", Value::from(self.file_id.as_str())),
            ("width", Value::from(self.width)),
            ("height", Value::from(self.height)),
            ("gravity", Value::from(self.gravity.as_str())),
            ("quality", Value::from(self.quality)),
        ];
        generate_cache_key(IMAGE_OPERATION, params.iter().map(|(k, v)| (*k, v)))
    }
}

// == Data Key Params ==
/// An API operation name plus its parameters, e.g. `payments_list` with
/// `{studentId: "y"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataCacheKeyParams {
    pub operation: String,
    pub params: BTreeMap<String, Value>,
}

impl DataCacheKeyParams {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn cache_key(&self) -> String {
        generate_cache_key(
            &self.operation,
            self.params.iter().map(|(k, v)| (k.as_str(), v)),
        )
    }
}
