use thiserror::Error;

/// Library error type for compositor operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The supplied bytes could not be decoded as an image.
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The named template is neither built in nor configured.
    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Resampling or compositing failed.
    #[error("render error: {0}")]
    Render(anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
