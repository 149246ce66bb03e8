use crate::{
    bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr, serde::Serde, ConstBitLength,
};

pub type UnsignedInteger<const BITS: u8> = SerdeInteger<false, false, BITS>;
pub type SignedInteger<const BITS: u8> = SerdeInteger<true, false, BITS>;
pub type UnsignedVariableInteger<const BITS: u8> = SerdeInteger<false, true, BITS>;
pub type SignedVariableInteger<const BITS: u8> = SerdeInteger<true, true, BITS>;

/// An integer encoded with a fixed or variable number of bits.
///
/// Variable integers are written in `BITS`-wide groups, each preceded by a
/// continuation bit, so small values stay small on the wire.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SerdeInteger<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> {
    inner: IntegerInner,
}

// Non-generic core, keeps monomorphized code small.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
struct IntegerInner {
    value: i128,
    signed: bool,
    variable: bool,
    bits: u8,
}

impl IntegerInner {
    fn check(signed: bool, variable: bool, bits: u8, value: i128) -> Result<(), SerdeErr> {
        let out_of_range = || SerdeErr::IntegerOutOfRange {
            value,
            target: "SerdeInteger",
        };
        if bits == 0 || bits > 127 {
            return Err(out_of_range());
        }
        if !signed && value < 0 {
            return Err(out_of_range());
        }
        if !variable {
            let max_value: u128 = 2_u128.pow(bits as u32);
            if value.unsigned_abs() >= max_value {
                return Err(out_of_range());
            }
        }
        Ok(())
    }

    fn ser(&self, writer: &mut dyn BitWrite) {
        let negative = self.value < 0;
        if self.signed {
            writer.write_bit(negative);
        }
        let mut value: u128 = self.value.unsigned_abs();

        if self.variable {
            loop {
                let proceed = value >= 2_u128.pow(self.bits as u32);
                writer.write_bit(proceed);
                for _ in 0..self.bits {
                    writer.write_bit(value & 1 != 0);
                    value >>= 1;
                }
                if !proceed {
                    return;
                }
            }
        } else {
            for _ in 0..self.bits {
                writer.write_bit(value & 1 != 0);
                value >>= 1;
            }
        }
    }

    fn de(reader: &mut BitReader, signed: bool, variable: bool, bits: u8) -> Result<Self, SerdeErr> {
        let negative = if signed { reader.read_bit()? } else { false };

        let mut output: u128 = 0;
        let mut shift: u32 = 0;
        loop {
            let proceed = if variable { reader.read_bit()? } else { false };
            for _ in 0..bits {
                let bit = reader.read_bit()?;
                // SECURITY: an endless chain of continuation bits must not overflow the shift
                if shift >= 127 {
                    if bit {
                        return Err(SerdeErr::IntegerOverflow);
                    }
                } else if bit {
                    output |= 1 << shift;
                }
                shift += 1;
            }
            if !proceed {
                break;
            }
        }

        let magnitude = output as i128;
        let value = if negative { -magnitude } else { magnitude };
        Ok(Self {
            value,
            signed,
            variable,
            bits,
        })
    }

    fn bit_length(&self) -> u32 {
        let mut output: u32 = 0;
        if self.signed {
            output += 1;
        }
        if self.variable {
            let mut value = self.value.unsigned_abs();
            loop {
                let proceed = value >= 2_u128.pow(self.bits as u32);
                output += 1 + self.bits as u32;
                value >>= self.bits;
                if !proceed {
                    break;
                }
            }
        } else {
            output += self.bits as u32;
        }
        output
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> SerdeInteger<SIGNED, VARIABLE, BITS> {
    /// Fails if the value can't be represented with this encoding.
    pub fn try_new<T: Into<i128>>(value: T) -> Result<Self, SerdeErr> {
        let value = value.into();
        IntegerInner::check(SIGNED, VARIABLE, BITS, value)?;
        Ok(Self {
            inner: IntegerInner {
                value,
                signed: SIGNED,
                variable: VARIABLE,
                bits: BITS,
            },
        })
    }

    /// Panics if the value can't be represented with this encoding. Use
    /// [`SerdeInteger::try_new`] for values that come from outside.
    pub fn new<T: Into<i128>>(value: T) -> Self {
        match Self::try_new(value) {
            Ok(integer) => integer,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn get(&self) -> i128 {
        self.inner.value
    }

    /// Converts to a concrete integer type, failing if it doesn't fit.
    pub fn to<T: TryFrom<i128>>(&self) -> Result<T, SerdeErr> {
        T::try_from(self.inner.value).map_err(|_| SerdeErr::IntegerOutOfRange {
            value: self.inner.value,
            target: std::any::type_name::<T>(),
        })
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> Serde
    for SerdeInteger<SIGNED, VARIABLE, BITS>
{
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.inner.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let inner = IntegerInner::de(reader, SIGNED, VARIABLE, BITS)?;
        Ok(Self { inner })
    }

    fn bit_length(&self) -> u32 {
        self.inner.bit_length()
    }
}

impl<const SIGNED: bool, const BITS: u8> ConstBitLength for SerdeInteger<SIGNED, false, BITS> {
    fn const_bit_length() -> u32 {
        let sign = if SIGNED { 1 } else { 0 };
        sign + BITS as u32
    }
}
