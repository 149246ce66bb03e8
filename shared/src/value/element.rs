use std::fmt;

use tweak_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::types::KindTag;

/// Numeric type of every element of a buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl ElementType {
    pub const ALL: [ElementType; 10] = [
        ElementType::I8,
        ElementType::I16,
        ElementType::I32,
        ElementType::I64,
        ElementType::U8,
        ElementType::U16,
        ElementType::U32,
        ElementType::U64,
        ElementType::F32,
        ElementType::F64,
    ];

    pub fn size_bytes(&self) -> usize {
        match self {
            ElementType::I8 | ElementType::U8 => 1,
            ElementType::I16 | ElementType::U16 => 2,
            ElementType::I32 | ElementType::U32 | ElementType::F32 => 4,
            ElementType::I64 | ElementType::U64 | ElementType::F64 => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementType::I8 => "i8",
            ElementType::I16 => "i16",
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::U8 => "u8",
            ElementType::U16 => "u16",
            ElementType::U32 => "u32",
            ElementType::U64 => "u64",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
        }
    }

    fn index(&self) -> u8 {
        match self {
            ElementType::I8 => 0,
            ElementType::I16 => 1,
            ElementType::I32 => 2,
            ElementType::I64 => 3,
            ElementType::U8 => 4,
            ElementType::U16 => 5,
            ElementType::U32 => 6,
            ElementType::U64 => 7,
            ElementType::F32 => 8,
            ElementType::F64 => 9,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serde for ElementType {
    fn ser(&self, writer: &mut dyn BitWrite) {
        KindTag::new(self.index()).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let index: usize = KindTag::de(reader)?.to()?;
        // SECURITY: 4 bits can name more variants than exist
        ElementType::ALL
            .get(index)
            .copied()
            .ok_or(SerdeErr::InvalidTag {
                type_name: "ElementType",
                tag: index as u64,
            })
    }
}

/// Memory order of a buffer's elements
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Order {
    /// Last index varies fastest
    #[default]
    RowMajor,
    /// First index varies fastest
    ColumnMajor,
}

impl Order {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "row-major" | "C" => Some(Order::RowMajor),
            "column-major" | "F" => Some(Order::ColumnMajor),
            _ => None,
        }
    }
}

impl Serde for Order {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_bit(*self == Order::ColumnMajor);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(Order::ColumnMajor)
        } else {
            Ok(Order::RowMajor)
        }
    }
}
