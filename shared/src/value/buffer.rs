use tweak_serde::{BitReader, BitWrite, LengthPrefix, Serde, SerdeErr};

use super::{BufferError, ElementType, Order};

macro_rules! buffer_types {
    ($($variant:ident($prim:ty)),* $(,)?) => {
        /// Typed element storage of a [`Buffer`]
        #[derive(Clone, Debug, PartialEq)]
        pub enum BufferData {
            $($variant(Vec<$prim>),)*
        }

        /// A single element read out of a [`Buffer`]
        #[derive(Clone, Copy, Debug, PartialEq)]
        pub enum Element {
            $($variant($prim),)*
        }

        impl BufferData {
            pub fn element_type(&self) -> ElementType {
                match self {
                    $(BufferData::$variant(_) => ElementType::$variant,)*
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $(BufferData::$variant(values) => values.len(),)*
                }
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            pub fn get(&self, index: usize) -> Option<Element> {
                match self {
                    $(BufferData::$variant(values) => values.get(index).copied().map(Element::$variant),)*
                }
            }

            /// All-zero storage of the given type
            pub fn zeroed(element_type: ElementType, len: usize) -> Self {
                match element_type {
                    $(ElementType::$variant => BufferData::$variant(vec![<$prim>::default(); len]),)*
                }
            }

            fn write_le(&self, writer: &mut dyn BitWrite) {
                match self {
                    $(BufferData::$variant(values) => {
                        for value in values {
                            writer.write_bytes(&value.to_le_bytes());
                        }
                    })*
                }
            }

            fn read_le(
                element_type: ElementType,
                len: usize,
                reader: &mut BitReader,
            ) -> Result<Self, SerdeErr> {
                match element_type {
                    $(ElementType::$variant => {
                        let mut values = Vec::with_capacity(len);
                        for _ in 0..len {
                            values.push(<$prim as Serde>::de(reader)?);
                        }
                        Ok(BufferData::$variant(values))
                    })*
                }
            }
        }

        impl Element {
            pub fn element_type(&self) -> ElementType {
                match self {
                    $(Element::$variant(_) => ElementType::$variant,)*
                }
            }

            /// Lossy for 64-bit integers beyond 2^53
            #[allow(trivial_numeric_casts)]
            pub fn to_f64(&self) -> f64 {
                match self {
                    $(Element::$variant(value) => *value as f64,)*
                }
            }
        }

        $(
            impl From<Vec<$prim>> for BufferData {
                fn from(values: Vec<$prim>) -> Self {
                    BufferData::$variant(values)
                }
            }
        )*
    };
}

buffer_types!(
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
);

/// An N-dimensional numeric array with an explicit shape and memory order.
///
/// The element count always equals the product of the shape; a rank-0
/// buffer holds exactly one element.
#[derive(Clone, Debug, PartialEq)]
pub struct Buffer {
    data: BufferData,
    shape: Vec<usize>,
    order: Order,
}

impl Buffer {
    pub fn new(
        data: impl Into<BufferData>,
        shape: Vec<usize>,
        order: Order,
    ) -> Result<Self, BufferError> {
        let data = data.into();
        let expected = element_count(&shape).ok_or_else(|| BufferError::ShapeOverflow {
            shape: shape.clone(),
        })?;
        if expected != data.len() {
            return Err(BufferError::ElementCountMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, shape, order })
    }

    /// One-dimensional buffer holding `data` as-is
    pub fn vector(data: impl Into<BufferData>) -> Self {
        let data = data.into();
        let shape = vec![data.len()];
        Self {
            data,
            shape,
            order: Order::RowMajor,
        }
    }

    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn data(&self) -> &BufferData {
        &self.data
    }

    pub fn into_data(self) -> BufferData {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at a multi-dimensional index, honoring the buffer's order
    pub fn get(&self, index: &[usize]) -> Option<Element> {
        self.offset(index).and_then(|offset| self.data.get(offset))
    }

    fn offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        let mut stride = 1;
        let mut visit = |position: usize| -> Option<()> {
            let (i, dim) = (index[position], self.shape[position]);
            if i >= dim {
                return None;
            }
            offset += i * stride;
            stride *= dim;
            Some(())
        };
        match self.order {
            Order::RowMajor => {
                for position in (0..self.shape.len()).rev() {
                    visit(position)?;
                }
            }
            Order::ColumnMajor => {
                for position in 0..self.shape.len() {
                    visit(position)?;
                }
            }
        }
        Some(offset)
    }
}

fn element_count(shape: &[usize]) -> Option<usize> {
    shape
        .iter()
        .try_fold(1usize, |count, dim| count.checked_mul(*dim))
}

impl Serde for Buffer {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.element_type().ser(writer);
        self.order.ser(writer);
        LengthPrefix::new(self.shape.len() as u64).ser(writer);
        for dim in &self.shape {
            LengthPrefix::new(*dim as u64).ser(writer);
        }
        self.data.write_le(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let element_type = ElementType::de(reader)?;
        let order = Order::de(reader)?;
        let rank: usize = LengthPrefix::de(reader)?.to()?;
        if rank > reader.bits_remaining() {
            return Err(SerdeErr::LengthOverflow {
                declared: rank as u64,
                remaining: reader.bytes_remaining(),
            });
        }
        let mut shape = Vec::with_capacity(rank);
        for _ in 0..rank {
            shape.push(LengthPrefix::de(reader)?.to::<usize>()?);
        }

        // SECURITY: check the payload size against the input before allocating
        let too_large = || SerdeErr::Inconsistent {
            type_name: "Buffer",
            reason: format!("shape {:?} overflows", shape),
        };
        let len = element_count(&shape).ok_or_else(too_large)?;
        let bytes = len
            .checked_mul(element_type.size_bytes())
            .ok_or_else(too_large)?;
        if bytes > reader.bytes_remaining() {
            return Err(SerdeErr::LengthOverflow {
                declared: bytes as u64,
                remaining: reader.bytes_remaining(),
            });
        }

        let data = BufferData::read_le(element_type, len, reader)?;
        Ok(Self { data, shape, order })
    }
}
