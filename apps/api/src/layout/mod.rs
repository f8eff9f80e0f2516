// Layout engine: greedy width-fit wrapping, punctuation rules, pagination and jitter.
// Pure and CPU-bound; handlers call it from tokio::task::spawn_blocking.

pub mod engine;
pub mod font_metrics;
pub mod settings;

// Re-export the public API consumed by the render pipeline and handlers.
pub use engine::{layout, Document, Glyph, Page, PageTemplate};
pub use font_metrics::{FontMetricTable, TextMeasure, HELVETICA};
pub use settings::{HeaderField, LayoutConfig, RenderSettings, ValidationError};
