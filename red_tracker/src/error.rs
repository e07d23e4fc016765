use thiserror::Error;

/// Configuration and frame-shape errors. Per-frame detection and filtering never
/// fail; only construction and mismatched input do.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("particle ensemble must hold at least one particle")]
    EmptyEnsemble,
    #[error("kernel sigma must be positive and finite, got {0}")]
    InvalidSigma(f64),
    #[error("noise standard deviation `{name}` must be non-negative and finite, got {value}")]
    InvalidNoise { name: &'static str, value: f64 },
    #[error("canvas must be at least 1x1 pixels, got {width}x{height}")]
    InvalidCanvas { width: u32, height: u32 },
    #[error("background history must be at least one frame")]
    InvalidHistory,
    #[error("variance threshold must be positive and finite, got {0}")]
    InvalidVarThreshold(f32),
    #[error(
        "frame is {actual_width}x{actual_height} but the background model expects {expected_width}x{expected_height}"
    )]
    FrameSizeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
