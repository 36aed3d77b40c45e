use thiserror::Error;

/// Common error types for Traffic Carousel
#[derive(Error, Debug)]
pub enum CarouselError {
    #[error("Network statistics unavailable: {message}")]
    StatsUnavailable { message: String },

    #[error("Icon surface error: {message}")]
    IconSurface { message: String },

    #[error("Indicator host error: {message}")]
    IndicatorHost { message: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CarouselError {
    /// Create a StatsUnavailable error from any displayable cause
    pub fn stats_unavailable(cause: impl std::fmt::Display) -> Self {
        CarouselError::StatsUnavailable {
            message: cause.to_string(),
        }
    }

    /// Create an IconSurface error from any displayable cause
    pub fn icon_surface(cause: impl std::fmt::Display) -> Self {
        CarouselError::IconSurface {
            message: cause.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type CarouselResult<T> = Result<T, CarouselError>;
