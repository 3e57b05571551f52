//! PDF engine: visible-text indexing and in-place replacement.

mod encoding;
pub mod font_metrics;
mod fonts;
pub mod geometry;
mod interpreter;
pub mod mutator;
mod resources;
pub mod text_index;

#[cfg(test)]
pub(crate) mod test_support;

pub use fonts::StyleFlags;
pub use font_metrics::{map_font_family, FontFamily};
pub use geometry::Rect;
pub use interpreter::Rgb;
pub use mutator::{DocumentMutator, MutationRecord, MutationReport, BASELINE_SHIFT, COVER_MARGIN};
pub use text_index::{DocumentTextIndex, LinkAnnotation, TextRun};
