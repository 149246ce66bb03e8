use log::warn;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use tweak_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::value::Order;

/// Errors that can occur while parsing item metadata
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// Metadata is not valid JSON
    #[error("Metadata is not valid JSON: {reason}")]
    InvalidJson {
        reason: String,
    },

    /// Metadata must be a JSON object
    #[error("Metadata must be a JSON object")]
    NotAnObject,

    /// The `layout` entry is present but unusable
    #[error("Invalid layout in metadata: {reason}")]
    InvalidLayout {
        reason: String,
    },
}

/// Preferred UI control for an item
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ControlType {
    #[default]
    Unspecified,
    Checkbox,
    Spinbox,
    Slider,
    Combobox,
    Button,
}

impl ControlType {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "checkbox" => Some(ControlType::Checkbox),
            "spinbox" => Some(ControlType::Spinbox),
            "slider" => Some(ControlType::Slider),
            "combobox" => Some(ControlType::Combobox),
            "button" => Some(ControlType::Button),
            _ => None,
        }
    }
}

/// Declared buffer shape
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    pub dimensions: Vec<usize>,
    pub order: Option<Order>,
}

#[derive(Deserialize)]
struct LayoutDocument {
    dimensions: Vec<usize>,
    #[serde(default)]
    order: Option<String>,
}

/// One entry of a combobox-style enumeration
#[derive(Clone, Debug, PartialEq)]
pub struct MetadataOption {
    pub text: String,
    pub value: f64,
}

/// Parsed item metadata.
///
/// `layout` is validated strictly since the store enforces it. The UI hints
/// are best-effort: a hint of the wrong JSON type is ignored. The original
/// text is kept so it can be forwarded to peers unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct Metadata {
    raw: String,
    document: Map<String, JsonValue>,
    layout: Option<Layout>,
    control: ControlType,
    min: Option<f64>,
    max: Option<f64>,
    step: Option<f64>,
    decimals: Option<u32>,
    readonly: bool,
    caption: Option<String>,
    options: Vec<MetadataOption>,
}

impl Metadata {
    pub fn parse(json: &str) -> Result<Self, MetadataError> {
        let trimmed = json.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let parsed: JsonValue =
            serde_json::from_str(trimmed).map_err(|err| MetadataError::InvalidJson {
                reason: err.to_string(),
            })?;
        let JsonValue::Object(document) = parsed else {
            return Err(MetadataError::NotAnObject);
        };

        let layout = match document.get("layout") {
            None | Some(JsonValue::Null) => None,
            Some(layout) => Some(parse_layout(layout)?),
        };

        let options = document
            .get("options")
            .map(parse_options)
            .unwrap_or_default();
        let control = match document.get("control").and_then(JsonValue::as_str) {
            Some(name) => ControlType::parse(name).unwrap_or_else(|| {
                warn!("Ignoring unknown control type '{}'", name);
                ControlType::Unspecified
            }),
            None if !options.is_empty() => ControlType::Combobox,
            None => ControlType::Unspecified,
        };

        Ok(Self {
            raw: trimmed.to_string(),
            layout,
            control,
            min: document.get("min").and_then(JsonValue::as_f64),
            max: document.get("max").and_then(JsonValue::as_f64),
            step: document.get("step").and_then(JsonValue::as_f64),
            decimals: document
                .get("decimals")
                .and_then(JsonValue::as_u64)
                .and_then(|decimals| u32::try_from(decimals).ok()),
            readonly: document
                .get("readonly")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false),
            caption: document
                .get("caption")
                .and_then(JsonValue::as_str)
                .map(str::to_string),
            options,
            document,
        })
    }

    /// The JSON text this metadata was parsed from
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Any top-level entry, recognized or not
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.document.get(key)
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn dimensions(&self) -> Option<&[usize]> {
        self.layout.as_ref().map(|layout| layout.dimensions.as_slice())
    }

    pub fn control(&self) -> ControlType {
        self.control
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn step(&self) -> Option<f64> {
        self.step
    }

    pub fn decimals(&self) -> Option<u32> {
        self.decimals
    }

    /// Hint for front ends only, writes are not blocked
    pub fn readonly(&self) -> bool {
        self.readonly
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn options(&self) -> &[MetadataOption] {
        &self.options
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            raw: "{}".to_string(),
            document: Map::new(),
            layout: None,
            control: ControlType::Unspecified,
            min: None,
            max: None,
            step: None,
            decimals: None,
            readonly: false,
            caption: None,
            options: Vec::new(),
        }
    }
}

fn parse_layout(layout: &JsonValue) -> Result<Layout, MetadataError> {
    let document = LayoutDocument::deserialize(layout).map_err(|err| {
        MetadataError::InvalidLayout {
            reason: err.to_string(),
        }
    })?;
    let order = match document.order {
        None => None,
        Some(name) => Some(Order::parse(&name).ok_or_else(|| MetadataError::InvalidLayout {
            reason: format!("unknown order '{}'", name),
        })?),
    };
    Ok(Layout {
        dimensions: document.dimensions,
        order,
    })
}

// Bare strings take the previous value plus one, starting at zero.
fn parse_options(options: &JsonValue) -> Vec<MetadataOption> {
    let Some(entries) = options.as_array() else {
        warn!("Ignoring metadata options: expected an array");
        return Vec::new();
    };
    let mut output = Vec::with_capacity(entries.len());
    let mut next_value = 0.0;
    for entry in entries {
        let option = match entry {
            JsonValue::String(text) => MetadataOption {
                text: text.clone(),
                value: next_value,
            },
            JsonValue::Object(fields) => {
                let text = fields.get("text").and_then(JsonValue::as_str);
                let value = match fields.get("value") {
                    Some(JsonValue::Bool(flag)) => Some(if *flag { 1.0 } else { 0.0 }),
                    Some(other) => other.as_f64(),
                    None => None,
                };
                let (Some(text), Some(value)) = (text, value) else {
                    warn!("Ignoring metadata options: malformed entry {}", entry);
                    return Vec::new();
                };
                MetadataOption {
                    text: text.to_string(),
                    value,
                }
            }
            _ => {
                warn!("Ignoring metadata options: malformed entry {}", entry);
                return Vec::new();
            }
        };
        next_value = option.value + 1.0;
        output.push(option);
    }
    output
}

impl Serde for Metadata {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.raw.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let raw = String::de(reader)?;
        Metadata::parse(&raw).map_err(|err| SerdeErr::Inconsistent {
            type_name: "Metadata",
            reason: err.to_string(),
        })
    }
}
