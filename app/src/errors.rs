
use failure::Fail;



pub type AppResult<T> = Result<T, AppError>;


#[derive(Fail, Debug)]
pub enum AppError {
    #[fail(display = "GIF Error: {}", _0)]
    Gif(gif_encoder::gif::errors::GifError),
    #[fail(display = "Image error: {}", _0)]
    Image(image::ImageError),
    #[fail(display = "Not a integer: {}", _0)]
    Int(std::num::ParseIntError),
    #[fail(display = "Invalid option value: {}", _0)]
    InvalidOptionValue(String),
    #[fail(display = "IO error: {}", _0)]
    Io(std::io::Error),
    #[fail(display = "Not enough argument")]
    NotEnoughArgument,
}

macro_rules! define_error {
    ($source:ty, $kind:ident) => {
        impl From<$source> for AppError {
            fn from(error: $source) -> AppError {
                AppError::$kind(error)
            }
        }
    }
}

define_error!(std::io::Error, Io);
define_error!(std::num::ParseIntError, Int);
define_error!(image::ImageError, Image);
define_error!(gif_encoder::gif::errors::GifError, Gif);
