//! # florence-viz
//!
//! Turns the heterogeneous structured output of a Florence-2 style
//! vision-language inference call into labeled visual artifacts: annotated
//! images and raw-result text dumps, addressed by task type.
//!
//! Model loading and inference execution are external; the model is an
//! opaque [`InferenceProvider`]. What lives here is the pipeline around it:
//!
//! - **Task classification**: a closed set of prompt tags, each mapping to
//!   one output category (plain text, boxes, polygons, or quad boxes).
//! - **Shape normalization**: loosely-typed raw results become validated
//!   geometric records; unordered box corners are corrected, degenerate
//!   polygons are dropped with a diagnostic instead of failing the call.
//! - **Rendering**: labeled overlays drawn on a copy of the source image,
//!   with a fixed palette and a pluggable color-selection strategy.
//! - **Artifact allocation**: collision-free sequential output paths per
//!   task directory.
//!
//! ## Modules
//!
//! * [`task`] - Task identifiers and output classification
//! * [`geometry`] - Geometric primitives for normalized results
//! * [`normalize`] - Raw result to canonical record conversion
//! * [`render`] - Overlay rendering
//! * [`artifacts`] - Sequential output path allocation
//! * [`analyzer`] - The orchestrator and the inference boundary
//! * [`error`] - Error types

pub mod analyzer;
pub mod artifacts;
pub mod error;
pub mod geometry;
pub mod normalize;
pub mod render;
pub mod task;

pub use analyzer::{ImageAnalyzer, InferenceProvider, load_image};
pub use artifacts::PathAllocator;
pub use error::{AnalyzeError, VizResult};
pub use geometry::{BoundingBox, Point, Polygon, QuadBox};
pub use normalize::{
    LabeledBox, LabeledQuad, NormalizedResult, PolygonGroup, RawResult, TaskOutput, normalize,
    open_vocab_to_boxes,
};
pub use render::{
    ColorPicker, PALETTE, RenderConfig, UniformPalette, render_boxes, render_polygons,
    render_quad_boxes,
};
pub use task::{ALL_TASKS, OutputCategory, TaskType, dir_name_from_tag};

/// Initializes the tracing subscriber for logging.
///
/// Sets up the tracing subscriber with environment filter and formatting
/// layer. Typically called once at the start of an application.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
