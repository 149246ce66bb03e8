use crate::{BitReader, BitWrite, LengthPrefix, Serde, SerdeErr};

impl Serde for String {
    fn ser(&self, writer: &mut dyn BitWrite) {
        LengthPrefix::new(self.len() as u64).ser(writer);
        writer.write_bytes(self.as_bytes());
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length: usize = LengthPrefix::de(reader)?.to()?;
        let bytes = reader.read_bytes(length)?;
        String::from_utf8(bytes).map_err(|_| SerdeErr::InvalidUtf8)
    }

    fn bit_length(&self) -> u32 {
        LengthPrefix::new(self.len() as u64).bit_length() + 8 * self.len() as u32
    }
}
