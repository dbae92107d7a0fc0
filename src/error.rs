use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// An invalid parameter, detected before anything is drawn.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The window or GPU surface could not be created, or went away while drawing.
    #[error("drawing surface unavailable: {0}")]
    SurfaceUnavailable(String),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn surface(message: impl Into<String>) -> Self {
        Self::SurfaceUnavailable(message.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
