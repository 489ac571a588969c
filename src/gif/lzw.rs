//! Variable-width LZW compression as used by GIF image data.
//!
//! A dictionary entry is keyed by the code of its prefix and the index that
//! extends it. Every code stands for exactly one sequence, so a lookup costs
//! the same no matter how long the current match is.

use std::collections::HashMap;
use std::io::{self, Write};

use log::trace;

use super::bit_writer::BitWriter;



/// Number of codes GIF allows in one clear cycle
const MAX_CODES: u16 = 4096;


/// Receives codes at their current width.
pub trait CodeSink {
    fn put(&mut self, code: u16, width: u8) -> io::Result<()>;
}

pub struct CodeTable {
    codes: HashMap<(u16, u8), u16>,
    min_code_size: u8,
    next_code: u16,
    width: u8,
}


impl CodeTable {
    pub fn new(min_code_size: u8) -> Self {
        debug_assert!(2 <= min_code_size && min_code_size <= 8);
        let mut table = CodeTable {
            codes: HashMap::with_capacity(MAX_CODES as usize),
            min_code_size,
            next_code: 0,
            width: 0,
        };
        table.reset();
        table
    }

    pub fn clear_code(&self) -> u16 {
        1 << self.min_code_size
    }

    pub fn end_code(&self) -> u16 {
        self.clear_code() + 1
    }

    /// Width of the next code to be emitted.
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Number of live codes, including the literal, clear and end codes.
    pub fn len(&self) -> usize {
        self.next_code as usize
    }

    pub fn is_full(&self) -> bool {
        self.next_code == MAX_CODES
    }

    /// Code of the single-index sequence `index`.
    pub fn literal(&self, index: u8) -> Option<u16> {
        let code = u16::from(index);
        if code < self.clear_code() {
            Some(code)
        } else {
            None
        }
    }

    /// Code of the sequence `prefix` followed by `next`.
    pub fn try_get_code(&self, prefix: u16, next: u8) -> Option<u16> {
        self.codes.get(&(prefix, next)).cloned()
    }

    /// Assigns the next code to `prefix` followed by `next`. Returns false when the table is full.
    pub fn try_add_code(&mut self, prefix: u16, next: u8) -> bool {
        if self.is_full() {
            return false;
        }
        let code = self.next_code;
        self.codes.insert((prefix, next), code);
        self.next_code += 1;
        if code == 1 << self.width {
            self.width += 1;
        }
        true
    }

    pub fn reset(&mut self) {
        self.codes.clear();
        self.next_code = self.end_code() + 1;
        self.width = self.min_code_size + 1;
    }
}


impl<'a, W: Write> CodeSink for BitWriter<'a, W> {
    fn put(&mut self, code: u16, width: u8) -> io::Result<()> {
        self.write_code(code, width)
    }
}


/// Writes a complete image data block: minimum code size, sub-blocks and terminator.
pub fn encode<W: Write>(writer: &mut W, min_code_size: u8, indices: &[u8]) -> io::Result<()> {
    writer.write_all(&[min_code_size])?;
    let mut bits = BitWriter::new(writer);
    compress(&mut bits, min_code_size, indices)?;
    bits.flush()
}

/// Indices must be below the clear code of `min_code_size`.
pub fn compress<S: CodeSink>(sink: &mut S, min_code_size: u8, indices: &[u8]) -> io::Result<()> {
    let mut table = CodeTable::new(min_code_size);
    let clear_code = table.clear_code();
    let end_code = table.end_code();

    sink.put(clear_code, table.width())?;

    let (first, rest) = match indices.split_first() {
        Some(split) => split,
        None => return sink.put(end_code, table.width()),
    };

    let mut code = literal(&table, *first)?;
    for &index in rest {
        if let Some(found) = table.try_get_code(code, index) {
            code = found;
            continue;
        }
        debug_assert!(code < 1 << table.width());
        sink.put(code, table.width())?;
        if !table.try_add_code(code, index) {
            trace!("LZW table full at {} codes, clearing", table.len());
            sink.put(clear_code, table.width())?;
            table.reset();
        }
        code = literal(&table, index)?;
    }

    sink.put(code, table.width())?;
    sink.put(end_code, table.width())
}

fn literal(table: &CodeTable, index: u8) -> io::Result<u16> {
    table.literal(index).ok_or_else(|| io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("index {} does not fit code size {}", index, table.min_code_size)))
}
