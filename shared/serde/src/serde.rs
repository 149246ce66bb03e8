use crate::{bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr};

/// A trait for objects that can be serialized to a bitstream.
pub trait Serde: Sized + Clone + PartialEq {
    /// Serialize Self to a BitWriter
    fn ser(&self, writer: &mut dyn BitWrite);

    /// Parse Self from a BitReader
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr>;

    /// Return length of value in bits
    fn bit_length(&self) -> u32 {
        let mut counter = crate::BitCounter::new();
        self.ser(&mut counter);
        counter.bits_needed()
    }
}

/// Types whose encoded length never depends on their value
pub trait ConstBitLength {
    fn const_bit_length() -> u32;
}
