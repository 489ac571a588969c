
use super::errors::{GifError, GifResult};
use super::image::{IndexedImage, PixelSource};
use super::{Delay, Palette};



const MAX_DIMENSION: u32 = 0xFFFF;


pub fn validate_canvas(width: u32, height: u32) -> GifResult<()> {
    if width == 0 || height == 0 || MAX_DIMENSION < width || MAX_DIMENSION < height {
        return Err(GifError::InvalidCanvasSize(width, height));
    }
    Ok(())
}

pub fn validate_repeat(repeat: u32) -> GifResult<u16> {
    if MAX_DIMENSION < repeat {
        return Err(GifError::InvalidRepeatCount(repeat));
    }
    Ok(repeat as u16)
}

pub fn validate_delay(delay: Delay) -> GifResult<u16> {
    let centiseconds = delay.centiseconds();
    if u32::from(u16::max_value()) < centiseconds {
        return Err(GifError::InvalidDelay(centiseconds));
    }
    Ok(centiseconds as u16)
}

pub fn validate_comment(comment: &str) -> GifResult<()> {
    if !comment.is_ascii() {
        return Err(GifError::InvalidComment);
    }
    Ok(())
}

pub fn validate_background_index(index: u8, palette: Option<&Palette>) -> GifResult<()> {
    match palette {
        Some(palette) if palette.len() <= index as usize =>
            Err(GifError::InvalidPixelIndex(index, palette.len())),
        _ => Ok(()),
    }
}

/// The frame must lie within the canvas.
pub fn validate_placement(x: u32, y: u32, image: &IndexedImage, canvas: (u32, u32)) -> GifResult<()> {
    let (width, height) = (image.width(), image.height());
    let outside = |offset: u32, size: u32, limit: u32| offset.checked_add(size).map_or(true, |end| limit < end);
    if width == 0 || height == 0 || outside(x, width, canvas.0) || outside(y, height, canvas.1) {
        return Err(GifError::FrameOutOfCanvas { x, y, width, height });
    }
    Ok(())
}

/// Every pixel must address an entry of `palette`.
pub fn validate_indices(image: &IndexedImage, palette: &Palette) -> GifResult<()> {
    if let Some(index) = image.pixels().iter().find(|it| palette.len() <= **it as usize) {
        return Err(GifError::InvalidPixelIndex(*index, palette.len()));
    }
    Ok(())
}
