use crate::{BitReader, BitWrite, ConstBitLength, Serde, SerdeErr};

impl Serde for bool {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_bit(*self);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        reader.read_bit()
    }

    fn bit_length(&self) -> u32 {
        1
    }
}

impl ConstBitLength for bool {
    fn const_bit_length() -> u32 {
        1
    }
}

// Fixed-width numbers travel as little-endian bytes.
macro_rules! impl_serde_le_bytes {
    ($($impl_type:ty),*) => {
        $(
            impl Serde for $impl_type {
                fn ser(&self, writer: &mut dyn BitWrite) {
                    writer.write_bytes(&self.to_le_bytes());
                }

                fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
                    let mut bytes = [0u8; std::mem::size_of::<$impl_type>()];
                    for byte in bytes.iter_mut() {
                        *byte = reader.read_byte()?;
                    }
                    Ok(<$impl_type>::from_le_bytes(bytes))
                }

                fn bit_length(&self) -> u32 {
                    <Self as ConstBitLength>::const_bit_length()
                }
            }

            impl ConstBitLength for $impl_type {
                fn const_bit_length() -> u32 {
                    8 * std::mem::size_of::<$impl_type>() as u32
                }
            }
        )*
    };
}

impl_serde_le_bytes!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);
