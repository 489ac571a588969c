
pub mod gif;
