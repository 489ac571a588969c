//! Packs variable-width codes into GIF data sub-blocks.

use std::io::{self, Write};



const BLOCK_SIZE: usize = 0xFF;


/// LSB-first code packer. Whole bytes are staged into a 255-byte buffer,
/// which is written as one sub-block whenever it fills up.
pub struct BitWriter<'a, W: Write> {
    writer: &'a mut W,
    accumulator: u32,
    bits: u8,
    block: [u8; BLOCK_SIZE],
    length: usize,
}


impl<'a, W: Write> BitWriter<'a, W> {
    pub fn new(writer: &'a mut W) -> Self {
        BitWriter {
            writer,
            accumulator: 0,
            bits: 0,
            block: [0; BLOCK_SIZE],
            length: 0,
        }
    }

    /// Appends the low `width` bits of `code`.
    pub fn write_code(&mut self, code: u16, width: u8) -> io::Result<()> {
        debug_assert!(width <= 16);
        let mask = (1u32 << width) - 1;
        self.accumulator |= (u32::from(code) & mask) << self.bits;
        self.bits += width;
        while 8 <= self.bits {
            self.push_byte(self.accumulator as u8)?;
            self.accumulator >>= 8;
            self.bits -= 8;
        }
        Ok(())
    }

    /// Writes out the zero-padded partial byte, the partial sub-block and the block terminator.
    pub fn flush(mut self) -> io::Result<()> {
        if 0 < self.bits {
            self.push_byte(self.accumulator as u8)?;
            self.accumulator = 0;
            self.bits = 0;
        }
        if 0 < self.length {
            self.write_block()?;
        }
        self.writer.write_all(&[0])
    }

    fn push_byte(&mut self, byte: u8) -> io::Result<()> {
        self.block[self.length] = byte;
        self.length += 1;
        if self.length == BLOCK_SIZE {
            self.write_block()?;
        }
        Ok(())
    }

    fn write_block(&mut self) -> io::Result<()> {
        self.writer.write_all(&[self.length as u8])?;
        self.writer.write_all(&self.block[.. self.length])?;
        self.length = 0;
        Ok(())
    }
}
