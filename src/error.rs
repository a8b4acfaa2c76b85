/// Errors raised by the segmentation and aggregation core.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image Error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Argument Error: {0}")]
    InvalidArgument(String),

    #[error("Dimension Error: expected {expected_width}x{expected_height}, got {width}x{height}")]
    DimensionMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },

    #[error("Label Error: pixel {index} carries label {label}, expected [0, {num_labels})")]
    LabelOutOfRange {
        index: usize,
        label: i32,
        num_labels: usize,
    },

    #[error("Allocation Error: could not reserve {0} elements")]
    Allocation(usize),

    #[error("Format Error: {0}")]
    Format(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Allocates a per-pixel buffer, reporting failure instead of aborting.
pub(crate) fn alloc_buffer<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| Error::Allocation(len))?;
    buf.resize(len, value);
    Ok(buf)
}

/// Rejects zero-sized images and images whose pixel count does not fit an `i32` label.
pub(crate) fn check_dimensions(width: usize, height: usize) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidArgument(format!(
            "image dimensions must be positive, got {}x{}",
            width, height
        )));
    }
    match width.checked_mul(height) {
        Some(sz) if sz <= i32::MAX as usize => Ok(sz),
        _ => Err(Error::InvalidArgument(format!(
            "image {}x{} is too large for 32-bit labels",
            width, height
        ))),
    }
}
