use thiserror::Error;

/// Library error type for mosaic generation and playback.
#[derive(Debug, Error)]
pub enum MosaicError {
    /// A sample coordinate does not fit the 12-bit record field.
    #[error("coordinate ({x}, {y}) exceeds the 12-bit record range")]
    EncodingRange { x: u32, y: u32 },

    /// A packed buffer is empty or its length is not a whole number of records.
    #[error("packed buffer of {len} bytes is not a non-empty multiple of 6")]
    InvalidBufferLayout { len: usize },

    /// Listing or loading produced no usable image for the theme.
    #[error("no images available for theme {theme:?}")]
    NoImagesAvailable { theme: String },

    /// A caller asked for a session that does not exist.
    #[error("session index {index} out of range (have {count})")]
    SessionIndex { index: usize, count: usize },

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Image decode or encode failure.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, MosaicError>;
