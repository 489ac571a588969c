
use failure::Fail;
use std::io::Error as IOError;


pub type GifResult<T> = Result<T, GifError>;



#[derive(Fail, Debug)]
pub enum GifError {
    #[fail(display = "Encoding cancelled")]
    Cancelled,
    #[fail(display = "Empty frame: index={}", _0)]
    EmptyFrame(usize),
    #[fail(display = "Frame out of canvas: x={}, y={}, width={}, height={}", x, y, width, height)]
    FrameOutOfCanvas { x: u32, y: u32, width: u32, height: u32 },
    #[fail(display = "Frame size differs from canvas: index={}, frame={}x{}, canvas={}x{}", index, width, height, canvas_width, canvas_height)]
    FrameSizeMismatch { index: usize, width: u32, height: u32, canvas_width: u32, canvas_height: u32 },
    #[fail(display = "Global settings must be set before the first frame")]
    HeaderAlreadyWritten,
    #[fail(display = "Invalid canvas size: {}x{}", _0, _1)]
    InvalidCanvasSize(u32, u32),
    #[fail(display = "Comment must be 7-bit ASCII")]
    InvalidComment,
    #[fail(display = "Invalid delay: {} hundredths of a second", _0)]
    InvalidDelay(u32),
    #[fail(display = "Invalid disposal method: {}", _0)]
    InvalidDisposalMethod(u8),
    #[fail(display = "Invalid image data: expected={}, actual={}", _0, _1)]
    InvalidImageData(usize, usize),
    #[fail(display = "Pixel index {} out of palette of {} colors", _0, _1)]
    InvalidPixelIndex(u8, usize),
    #[fail(display = "Invalid repeat count: {}", _0)]
    InvalidRepeatCount(u32),
    #[fail(display = "Invariant violation: {}", _0)]
    InvariantViolation(&'static str),
    #[fail(display = "IO error: {}", _0)]
    Io(IOError),
    #[fail(display = "Neither a local nor a global palette is available")]
    MissingPalette,
    #[fail(display = "No frames")]
    NoFrames,
    #[fail(display = "Too many colors: {}", _0)]
    TooManyColors(usize),
}

macro_rules! define_error {
    ($source:ty, $kind:tt) => {
        impl From<$source> for GifError {
            fn from(error: $source) -> GifError {
                GifError::$kind(error)
            }
        }
    }
}

define_error!(std::io::Error, Io);
