use crate::error::SerdeErr;

pub struct BitReader<'b> {
    buffer: &'b [u8],
    state: usize,
}

impl<'b> BitReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self { buffer, state: 0 }
    }

    fn bits_total(&self) -> usize {
        self.buffer.len() * 8
    }

    fn out_of_bounds(&self) -> SerdeErr {
        SerdeErr::UnexpectedEnd {
            bits_read: self.state,
            bits_total: self.bits_total(),
        }
    }

    pub fn read_bit(&mut self) -> Result<bool, SerdeErr> {
        if self.state >= self.bits_total() {
            return Err(self.out_of_bounds());
        }
        let byte = self.buffer[self.state / 8];
        let bit = (byte >> (self.state % 8)) & 1 != 0;
        self.state += 1;
        Ok(bit)
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        if self.state % 8 == 0 {
            let Some(byte) = self.buffer.get(self.state / 8) else {
                return Err(self.out_of_bounds());
            };
            self.state += 8;
            return Ok(*byte);
        }
        let mut output = 0;
        for i in 0..8 {
            if self.read_bit()? {
                output |= 1 << i;
            }
        }
        Ok(output)
    }

    /// Reads `length` bytes, failing before allocating if the buffer can't hold them.
    pub fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>, SerdeErr> {
        if length > self.bytes_remaining() {
            return Err(SerdeErr::LengthOverflow {
                declared: length as u64,
                remaining: self.bytes_remaining(),
            });
        }
        let mut output = Vec::with_capacity(length);
        for _ in 0..length {
            output.push(self.read_byte()?);
        }
        Ok(output)
    }

    /// Whole bytes left to read
    pub fn bytes_remaining(&self) -> usize {
        (self.bits_total() - self.state) / 8
    }

    pub fn bits_remaining(&self) -> usize {
        self.bits_total() - self.state
    }
}
