use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use log::debug;

use super::blocks::{self, Block, Extension, NETSCAPE, SIGNATURE};
use super::errors::{GifError, GifResult};
use super::image::{IndexedImage, PixelSource};
use super::lzw;
use super::validators::*;
use super::{DisposalMethod, Frame, Meta, Palette};



/// Writes a GIF stream frame by frame.
///
/// The header, the global palette, the comment and the loop extension are written
/// together with the first frame; until then they can still be changed.
pub struct Encoder<'a, F: io::Write> {
    writer: &'a mut F,
    width: u16,
    height: u16,
    global_palette: Option<Palette>,
    repeat: Option<u16>,
    background_index: u8,
    comment: Option<String>,
    header_written: bool,
    frames: usize,
}


impl<'a, F: io::Write> Encoder<'a, F> {
    pub fn create(writer: &'a mut F, meta: Meta) -> GifResult<Self> {
        validate_canvas(meta.width, meta.height)?;
        let mut instance = Encoder {
            writer,
            width: meta.width as u16,
            height: meta.height as u16,
            global_palette: None,
            repeat: None,
            background_index: 0,
            comment: None,
            header_written: false,
            frames: 0,
        };
        instance.set_global_palette(meta.global_palette)?;
        instance.set_repeat(meta.repeat)?;
        instance.set_background_index(meta.background_index)?;
        instance.set_comment(meta.comment)?;
        Ok(instance)
    }

    pub fn set_global_palette(&mut self, palette: Option<Palette>) -> GifResult<()> {
        self.validate_unwritten()?;
        validate_background_index(self.background_index, palette.as_ref())?;
        self.global_palette = palette;
        Ok(())
    }

    pub fn set_repeat(&mut self, repeat: Option<u32>) -> GifResult<()> {
        self.validate_unwritten()?;
        self.repeat = repeat.map(validate_repeat).transpose()?;
        Ok(())
    }

    pub fn set_background_index(&mut self, index: u8) -> GifResult<()> {
        self.validate_unwritten()?;
        validate_background_index(index, self.global_palette.as_ref())?;
        self.background_index = index;
        Ok(())
    }

    pub fn set_comment(&mut self, comment: Option<String>) -> GifResult<()> {
        self.validate_unwritten()?;
        if let Some(comment) = comment.as_ref() {
            validate_comment(comment)?;
        }
        // A comment block needs at least one data sub-block
        self.comment = comment.filter(|it| !it.is_empty());
        Ok(())
    }

    pub fn global_palette(&self) -> Option<&Palette> {
        self.global_palette.as_ref()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (u32::from(self.width), u32::from(self.height))
    }

    pub fn frames_written(&self) -> usize {
        self.frames
    }

    /// Writes one image. The image's palette becomes a local color table
    /// unless it has the same content as the global palette.
    pub fn write_frame(&mut self, image: &IndexedImage, frame: Option<&Frame>) -> GifResult<()> {
        let frame = frame.cloned().unwrap_or_default();
        let (x, y) = (frame.x.unwrap_or(0), frame.y.unwrap_or(0));
        validate_placement(x, y, image, self.dimensions())?;
        let delay = frame.delay.map(validate_delay).transpose()?.unwrap_or(0);
        let disposal = frame.disposal.unwrap_or_default();

        let local = match self.global_palette.as_ref() {
            Some(global) if image.palette().is_empty() || global.same_table(image.palette()) => None,
            None if image.palette().is_empty() => return Err(GifError::MissingPalette),
            _ => Some(image.palette()),
        };
        let palette = local.or_else(|| self.global_palette.as_ref()).ok_or(GifError::MissingPalette)?;
        validate_indices(image, palette)?;
        let min_code_size = palette.min_code_size();
        let local_size = local.map(Palette::size_field);

        if !self.header_written {
            self.write_header()?;
        }

        let transparent = image.transparent();
        if delay != 0 || disposal != DisposalMethod::Unspecified || transparent.is_some() {
            self.write_control_extension(delay, disposal, transparent)?;
        }

        self.writer.write_u8(Block::Image as u8)?;
        self.writer.write_u16::<LittleEndian>(x as u16)?;
        self.writer.write_u16::<LittleEndian>(y as u16)?;
        self.writer.write_u16::<LittleEndian>(image.width() as u16)?;
        self.writer.write_u16::<LittleEndian>(image.height() as u16)?;
        self.writer.write_u8(blocks::image_flags(local_size, false))?;
        if let Some(local) = local {
            write_color_table(&mut *self.writer, local)?;
        }
        lzw::encode(&mut *self.writer, min_code_size, image.pixels())?;

        debug!(
            "frame {}: {}x{} at ({}, {}), delay={}, disposal={:?}, local palette={}",
            self.frames, image.width(), image.height(), x, y, delay, disposal, local.is_some());
        self.frames += 1;
        Ok(())
    }

    /// Writes the trailer. A stream without frames still gets its header.
    pub fn finish(mut self) -> GifResult<()> {
        if !self.header_written {
            self.write_header()?;
        }
        self.writer.write_u8(Block::Trailer as u8)?;
        self.writer.flush()?;
        debug!("trailer written after {} frames", self.frames);
        Ok(())
    }

    fn validate_unwritten(&self) -> GifResult<()> {
        if self.header_written {
            return Err(GifError::HeaderAlreadyWritten);
        }
        Ok(())
    }

    fn write_header(&mut self) -> GifResult<()> {
        self.writer.write_all(SIGNATURE)?;
        self.write_screen_descriptor()?;
        if let Some(palette) = self.global_palette.as_ref() {
            write_color_table(&mut *self.writer, palette)?;
        }
        if let Some(comment) = self.comment.as_ref() {
            write_sub_blocks(&mut *self.writer, Extension::Comment, comment.as_bytes())?;
        }
        if let Some(repeat) = self.repeat {
            self.write_application_extension(repeat)?;
        }
        self.header_written = true;
        debug!(
            "header written: {}x{}, global palette={:?}, repeat={:?}",
            self.width, self.height, self.global_palette.as_ref().map(Palette::len), self.repeat);
        Ok(())
    }

    fn write_screen_descriptor(&mut self) -> io::Result<()> {
        let global_size = self.global_palette.as_ref().map(Palette::size_field);
        self.writer.write_u16::<LittleEndian>(self.width)?;
        self.writer.write_u16::<LittleEndian>(self.height)?;
        self.writer.write_u8(blocks::screen_flags(global_size))?;
        self.writer.write_u8(self.background_index)?;
        // Pixel aspect ratio
        self.writer.write_u8(0)
    }

    fn write_application_extension(&mut self, repeat: u16) -> io::Result<()> {
        self.writer.write_u8(Block::Extension as u8)?;
        self.writer.write_u8(Extension::Application as u8)?;
        self.writer.write_u8(NETSCAPE.len() as u8)?;
        self.writer.write_all(NETSCAPE)?;
        self.writer.write_u8(3)?;
        self.writer.write_u8(1)?;
        self.writer.write_u16::<LittleEndian>(repeat)?;
        self.writer.write_u8(0)
    }

    fn write_control_extension(&mut self, delay: u16, disposal: DisposalMethod, transparent: Option<u8>) -> io::Result<()> {
        self.writer.write_u8(Block::Extension as u8)?;
        self.writer.write_u8(Extension::Control as u8)?;
        self.writer.write_u8(4)?;
        self.writer.write_u8(blocks::control_flags(disposal, false, transparent.is_some()))?;
        self.writer.write_u16::<LittleEndian>(delay)?;
        self.writer.write_u8(transparent.unwrap_or(0))?;
        self.writer.write_u8(0)
    }
}


/// Writes RGB triplets, zero-filled up to the next power of two.
fn write_color_table<W: Write>(writer: &mut W, palette: &Palette) -> io::Result<()> {
    for color in palette.colors() {
        writer.write_all(&color.rgb())?;
    }
    for _ in palette.len() .. palette.table_len() {
        writer.write_all(&[0, 0, 0])?;
    }
    Ok(())
}

fn write_sub_blocks<W: Write>(writer: &mut W, extension: Extension, data: &[u8]) -> io::Result<()> {
    writer.write_u8(Block::Extension as u8)?;
    writer.write_u8(extension as u8)?;
    for chunk in data.chunks(0xFF) {
        writer.write_u8(chunk.len() as u8)?;
        writer.write_all(chunk)?;
    }
    writer.write_u8(0)
}
