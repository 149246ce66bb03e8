use std::fmt;

use tweak_serde::{BitReader, BitWrite, Serde, SerdeErr};

use super::{Buffer, ElementType};
use crate::types::KindTag;

/// The declared type of an item. Buffers carry their element type, so an
/// `f32` buffer and an `i8` buffer are different types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    String,
    Buffer(ElementType),
}

impl ValueType {
    fn tag(&self) -> u8 {
        match self {
            ValueType::Bool => 0,
            ValueType::Int => 1,
            ValueType::Float => 2,
            ValueType::String => 3,
            ValueType::Buffer(_) => 4,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => f.write_str("bool"),
            ValueType::Int => f.write_str("int"),
            ValueType::Float => f.write_str("float"),
            ValueType::String => f.write_str("string"),
            ValueType::Buffer(element_type) => write!(f, "buffer<{}>", element_type),
        }
    }
}

impl Serde for ValueType {
    fn ser(&self, writer: &mut dyn BitWrite) {
        KindTag::new(self.tag()).ser(writer);
        if let ValueType::Buffer(element_type) = self {
            element_type.ser(writer);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let tag: u8 = KindTag::de(reader)?.to()?;
        match tag {
            0 => Ok(ValueType::Bool),
            1 => Ok(ValueType::Int),
            2 => Ok(ValueType::Float),
            3 => Ok(ValueType::String),
            4 => Ok(ValueType::Buffer(ElementType::de(reader)?)),
            _ => Err(SerdeErr::InvalidTag {
                type_name: "ValueType",
                tag: tag.into(),
            }),
        }
    }
}

/// The current value of an item
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Buffer(Buffer),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Buffer(buffer) => ValueType::Buffer(buffer.element_type()),
        }
    }

    /// Dimensions of a buffer value, `None` for scalars and strings
    pub fn shape(&self) -> Option<&[usize]> {
        match self {
            Value::Buffer(buffer) => Some(buffer.shape()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&Buffer> {
        match self {
            Value::Buffer(buffer) => Some(buffer),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Buffer> for Value {
    fn from(value: Buffer) -> Self {
        Value::Buffer(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{}", value),
            Value::Int(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", value),
            Value::String(value) => write!(f, "{:?}", value),
            Value::Buffer(buffer) => write!(
                f,
                "buffer<{}>{:?}",
                buffer.element_type(),
                buffer.shape()
            ),
        }
    }
}

impl Serde for Value {
    fn ser(&self, writer: &mut dyn BitWrite) {
        KindTag::new(self.value_type().tag()).ser(writer);
        match self {
            Value::Bool(value) => value.ser(writer),
            Value::Int(value) => value.ser(writer),
            Value::Float(value) => value.ser(writer),
            Value::String(value) => value.ser(writer),
            Value::Buffer(buffer) => buffer.ser(writer),
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let tag: u8 = KindTag::de(reader)?.to()?;
        match tag {
            0 => Ok(Value::Bool(bool::de(reader)?)),
            1 => Ok(Value::Int(i64::de(reader)?)),
            2 => Ok(Value::Float(f64::de(reader)?)),
            3 => Ok(Value::String(String::de(reader)?)),
            4 => Ok(Value::Buffer(Buffer::de(reader)?)),
            _ => Err(SerdeErr::InvalidTag {
                type_name: "Value",
                tag: tag.into(),
            }),
        }
    }
}
