// THEORY:
// This file is the main entry point for the `red_tracker` library crate.
//
// The crate answers one question per video frame: where is the red marker the
// player is holding, and where should the ball be drawn? Detection
// (`RedObjectDetector`) produces a noisy, sometimes missing measurement; the
// particle filter smooths it into a stable position. `TrackingPipeline` wires the
// two together and is the interface most consumers need. The building blocks in
// `core_modules` stay public for callers that want a single stage on its own.

pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use core_modules::point::{Canvas, Point2D};
pub use core_modules::shape::{Shape, ShapeKind};
pub use error::{Error, Result};
pub use pipeline::{FrameReport, PipelineConfig, TrackingPipeline};
