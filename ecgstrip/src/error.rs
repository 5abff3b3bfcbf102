use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigitizeError {
    #[error("image dimensions {width}x{height} must both be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("sample buffer holds {actual} bytes, expected {expected}")]
    BufferLength { expected: usize, actual: usize },

    #[error("segmentation of a {width}x{height} mask produced no non-empty lead panels")]
    EmptyResult { width: u32, height: u32 },

    #[error("invalid configuration: {0}")]
    Config(String),
}
