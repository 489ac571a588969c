
use std::default::Default;

use self::errors::{GifError, GifResult};



pub mod animation;
pub mod bit_writer;
pub mod blocks;
pub mod encoder;
pub mod errors;
pub mod image;
pub mod layers;
pub mod lzw;
pub mod pipeline;
pub mod quantizer;
pub mod render;
pub mod validators;


/// Maximum number of palette entries a GIF color table can hold
pub const MAX_COLORS: usize = 256;
/// Delay written in place of a zero delay, in hundredths of a second
pub const DEFAULT_DELAY: u16 = 10;
/// Default alpha threshold: pixels with a lower alpha are transparent
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 128;


pub struct Meta {
    pub width: u32,
    pub height: u32,
    pub global_palette: Option<Palette>,
    /// Number of repeats. `Some(0)` loops forever, `None` plays once.
    pub repeat: Option<u32>,
    pub background_index: u8,
    pub comment: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Palette {
    colors: Vec<Rgba>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Frame {
    pub x: Option<u32>,
    pub y: Option<u32>,
    pub delay: Option<Delay>,
    pub disposal: Option<DisposalMethod>,
}

/// Frame delay as a fraction of a second.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Delay {
    pub numerator: u16,
    pub denominator: u16,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, enum_iterator_derive::IntoEnumIterator)]
pub enum DisposalMethod {
    Unspecified = 0,
    Keep = 1,
    Background = 2,
    Previous = 3,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AnimationMode {
    PlayOnce,
    Repeat,
    /// Plays forward, then backward without repeating the end points
    PingPong,
    Count(u16),
}

/// What to do with frames whose size differs from the canvas
#[derive(Clone, Copy, Debug, Eq, PartialEq, enum_iterator_derive::IntoEnumIterator)]
pub enum SizeHandling {
    ErrorIfDiffers,
    Center,
    Resize,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, enum_iterator_derive::IntoEnumIterator)]
pub enum ZeroDelay {
    ReplaceWithDefault,
    Preserve,
}


impl Meta {
    pub fn new(width: u32, height: u32) -> Self {
        Meta {
            width,
            height,
            global_palette: None,
            repeat: None,
            background_index: 0,
            comment: None,
        }
    }
}


impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba { r: 0, g: 0, b: 0, a: 0 };

    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba { r, g, b, a }
    }

    pub fn opaque(r: u8, g: u8, b: u8) -> Self {
        Rgba { r, g, b, a: 0xff }
    }

    pub fn is_opaque(self, alpha_threshold: u8) -> bool {
        self.a >= alpha_threshold
    }

    /// True if no channel differs by more than `tolerance`.
    pub fn is_close(self, other: Rgba, tolerance: u8) -> bool {
        fn diff(a: u8, b: u8) -> u8 {
            if a > b { a - b } else { b - a }
        }
        diff(self.r, other.r) <= tolerance
            && diff(self.g, other.g) <= tolerance
            && diff(self.b, other.b) <= tolerance
            && diff(self.a, other.a) <= tolerance
    }

    pub fn rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}


impl Palette {
    pub fn new(colors: Vec<Rgba>) -> GifResult<Self> {
        if MAX_COLORS < colors.len() {
            return Err(GifError::TooManyColors(colors.len()));
        }
        Ok(Palette { colors })
    }

    /// Builds an opaque palette from packed RGB triplets.
    pub fn from_rgb(rgb: &[u8]) -> GifResult<Self> {
        Palette::new(rgb.chunks(3).filter(|it| it.len() == 3).map(|it| Rgba::opaque(it[0], it[1], it[2])).collect())
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn get(&self, index: u8) -> Option<Rgba> {
        self.colors.get(index as usize).cloned()
    }

    /// Appends a color. Returns its index, or `None` when the palette is full.
    pub fn push(&mut self, color: Rgba) -> Option<u8> {
        if MAX_COLORS <= self.colors.len() {
            return None;
        }
        self.colors.push(color);
        Some((self.colors.len() - 1) as u8)
    }

    /// Number of entries that are not fully opaque.
    pub fn alpha_entries(&self) -> usize {
        self.colors.iter().filter(|it| it.a != 0xff).count()
    }

    /// The first entry that is not fully opaque.
    pub fn transparent_index(&self) -> Option<u8> {
        self.colors.iter().position(|it| it.a != 0xff).map(|it| it as u8)
    }

    /// Size of the color table as written to the stream: a power of two, at least 2.
    pub fn table_len(&self) -> usize {
        self.colors.len().max(2).next_power_of_two()
    }

    /// Value of the 3-bit color table size field.
    pub fn size_field(&self) -> u8 {
        bits_needed(self.table_len()) - 1
    }

    /// LZW minimum code size for images indexing into this palette.
    pub fn min_code_size(&self) -> u8 {
        bits_needed(self.table_len()).max(2)
    }

    /// Compares the written color tables, ignoring alpha.
    pub fn same_table(&self, other: &Palette) -> bool {
        self.colors.len() == other.colors.len()
            && self.colors.iter().zip(&other.colors).all(|(a, b)| a.rgb() == b.rgb())
    }
}


impl Delay {
    pub fn new(numerator: u16, denominator: u16) -> Self {
        Delay { numerator, denominator }
    }

    pub fn from_centiseconds(centiseconds: u16) -> Self {
        Delay::new(centiseconds, 100)
    }

    pub fn from_millis(millis: u16) -> Self {
        Delay::new(millis, 1000)
    }

    /// Delay in hundredths of a second, rounded up. A zero denominator means 1/100.
    pub fn centiseconds(self) -> u32 {
        let denominator = if self.denominator == 0 { 100 } else { u32::from(self.denominator) };
        (u32::from(self.numerator) * 100 + denominator - 1) / denominator
    }

    /// Delay clamped into the range a graphic control extension can carry.
    pub fn clamped(self, zero: ZeroDelay) -> u16 {
        match self.centiseconds() {
            0 if zero == ZeroDelay::ReplaceWithDefault => DEFAULT_DELAY,
            0 => 0,
            cs => cs.min(u32::from(u16::max_value())) as u16,
        }
    }
}


impl DisposalMethod {
    pub fn from_u8(value: u8) -> GifResult<Self> {
        use enum_iterator::IntoEnumIterator;

        DisposalMethod::into_enum_iter()
            .find(|it| *it as u8 == value)
            .ok_or(GifError::InvalidDisposalMethod(value))
    }
}

impl Default for DisposalMethod {
    fn default() -> Self {
        DisposalMethod::Unspecified
    }
}


impl AnimationMode {
    /// Value of the NETSCAPE2.0 loop count, if the extension is written at all.
    pub fn repeat_count(self) -> Option<u16> {
        match self {
            AnimationMode::PlayOnce => None,
            AnimationMode::Repeat | AnimationMode::PingPong => Some(0),
            AnimationMode::Count(n) => Some(n),
        }
    }

    pub fn is_looping(self) -> bool {
        self != AnimationMode::PlayOnce
    }
}

impl Default for AnimationMode {
    fn default() -> Self {
        AnimationMode::Repeat
    }
}


impl SizeHandling {
    pub fn name(self) -> &'static str {
        match self {
            SizeHandling::ErrorIfDiffers => "error",
            SizeHandling::Center => "center",
            SizeHandling::Resize => "resize",
        }
    }
}

impl Default for SizeHandling {
    fn default() -> Self {
        SizeHandling::ErrorIfDiffers
    }
}


impl ZeroDelay {
    pub fn name(self) -> &'static str {
        match self {
            ZeroDelay::ReplaceWithDefault => "replace",
            ZeroDelay::Preserve => "preserve",
        }
    }
}

impl Default for ZeroDelay {
    fn default() -> Self {
        ZeroDelay::ReplaceWithDefault
    }
}


/// Number of bits needed to address `n` distinct values.
pub(crate) fn bits_needed(n: usize) -> u8 {
    let mut bits = 1;
    while (1 << bits) < n {
        bits += 1;
    }
    bits
}
