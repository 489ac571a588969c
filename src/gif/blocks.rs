
use super::DisposalMethod;



pub const SIGNATURE: &[u8; 6] = b"GIF89a";
pub const NETSCAPE: &[u8; 11] = b"NETSCAPE2.0";


#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Block {
    Extension = 0x21,
    Image = 0x2C,
    Trailer = 0x3B,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Extension {
    Control = 0xF9,
    Comment = 0xFE,
    Application = 0xFF,
}


/// Packed field of the logical screen descriptor.
pub fn screen_flags(global_table: Option<u8>) -> u8 {
    match global_table {
        // color resolution mirrors the table size
        Some(size) => 0b1000_0000 | size << 4 | size,
        None => 0,
    }
}

/// Packed field of the graphic control extension.
pub fn control_flags(disposal: DisposalMethod, needs_user_input: bool, transparent: bool) -> u8 {
    (disposal as u8) << 2 | (needs_user_input as u8) << 1 | transparent as u8
}

/// Packed field of the image descriptor.
pub fn image_flags(local_table: Option<u8>, interlaced: bool) -> u8 {
    let mut flags = (interlaced as u8) << 6;
    if let Some(size) = local_table {
        flags |= 0b1000_0000 | size;
    }
    flags
}
