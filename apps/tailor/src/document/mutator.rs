//! Format-preserving replacement: each located occurrence is painted over
//! with an opaque white box and the replacement is drawn on top in a base-14
//! font close to the original's, at the original size and colour.
//!
//! This is visual occlusion only. The original glyphs stay in the content
//! stream and remain visible to tools that ignore painting order.

use std::collections::BTreeSet;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::suggestions::validator::ValidatedReplacement;

use super::encoding::encode_win_ansi;
use super::font_metrics::{map_font_family, FontFamily};
use super::geometry::Rect;
use super::interpreter::Rgb;
use super::resources::page_resources;
use super::text_index::DocumentTextIndex;

pub const COVER_MARGIN: f32 = 1.0;
pub const BASELINE_SHIFT: f32 = 2.0;

/// Share of the smaller box two hits must have in common to be one site.
const SAME_SITE_OVERLAP: f32 = 0.5;

const FALLBACK_FONT_NAME: &str = "Helvetica";
const FALLBACK_FONT_SIZE: f32 = 11.0;
const FALLBACK_COLOR: Rgb = [0.0, 0.0, 0.0];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationRecord {
    pub page_index: usize,
    pub original: String,
    pub replacement: String,
    /// Bounding box of the replaced occurrence, before the cover margin.
    pub bbox: Rect,
    pub family: FontFamily,
    /// Advance width of the redrawn replacement in user space. Wider than
    /// `bbox` means the redraw runs past the cover.
    pub redraw_width: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MutationReport {
    pub records: Vec<MutationRecord>,
    /// Originals that were not applied anywhere.
    pub skipped: Vec<String>,
    /// Originals with an occurrence left alone because an earlier edit
    /// already covers the same site.
    pub overlapping: Vec<String>,
    pub original_page_count: usize,
    pub new_page_count: usize,
    pub page_count_unchanged: bool,
}

impl MutationReport {
    fn unchanged(page_count: usize, skipped: Vec<String>) -> Self {
        Self {
            records: Vec::new(),
            skipped,
            overlapping: Vec::new(),
            original_page_count: page_count,
            new_page_count: page_count,
            page_count_unchanged: true,
        }
    }
}

#[derive(Debug, Default)]
struct Plan {
    edits: Vec<Edit>,
    records: Vec<MutationRecord>,
    skipped: Vec<String>,
    overlapping: Vec<String>,
}

/// Hits that share most of their area are one site found twice, e.g. by
/// "Java" and "Java, SQL". Neighbouring lines only graze each other.
fn same_site(a: &Rect, b: &Rect) -> bool {
    a.intersection(b)
        .is_some_and(|i| i.area() >= SAME_SITE_OVERLAP * a.area().min(b.area()))
}

/// One occurrence scheduled for redraw.
#[derive(Debug, Clone)]
struct Edit {
    page_index: usize,
    bbox: Rect,
    text: String,
    font_size: f32,
    color: Rgb,
    family: FontFamily,
}

#[derive(Debug, Clone, Copy)]
pub struct DocumentMutator {
    pub cover_margin: f32,
    pub baseline_shift: f32,
}

impl Default for DocumentMutator {
    fn default() -> Self {
        Self {
            cover_margin: COVER_MARGIN,
            baseline_shift: BASELINE_SHIFT,
        }
    }
}

impl DocumentMutator {
    /// Applies the replacements in order and returns the new document with a
    /// report. Nothing is returned unless the whole document was written.
    pub fn apply(
        &self,
        document: &[u8],
        replacements: &[ValidatedReplacement],
    ) -> Result<(Vec<u8>, MutationReport), AppError> {
        let mut doc = Document::load_mem(document)?;
        let index = DocumentTextIndex::from_document(&doc)?;
        let original_page_count = index.page_count();

        if replacements.is_empty() {
            return Ok((document.to_vec(), MutationReport::unchanged(original_page_count, Vec::new())));
        }

        let Plan {
            edits,
            records,
            skipped,
            overlapping,
        } = self.plan(&index, replacements);
        if edits.is_empty() {
            debug!(skipped = skipped.len(), "no occurrence located, document left untouched");
            let mut report = MutationReport::unchanged(original_page_count, skipped);
            report.overlapping = overlapping;
            return Ok((document.to_vec(), report));
        }

        let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
        for (page_index, page_id) in page_ids.iter().enumerate() {
            let page_edits: Vec<&Edit> = edits.iter().filter(|e| e.page_index == page_index).collect();
            if !page_edits.is_empty() {
                self.redraw_page(&mut doc, *page_id, &page_edits)?;
            }
        }

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| AppError::DocumentParse(format!("failed to write document: {e}")))?;
        let new_page_count = Document::load_mem(&out)?.get_pages().len();

        let page_count_unchanged = new_page_count == original_page_count;
        if !page_count_unchanged {
            warn!(original_page_count, new_page_count, "page count changed during mutation");
        }
        info!(
            applied = records.len(),
            skipped = skipped.len(),
            pages = new_page_count,
            "applied replacements to document"
        );

        Ok((
            out,
            MutationReport {
                records,
                skipped,
                overlapping,
                original_page_count,
                new_page_count,
                page_count_unchanged,
            },
        ))
    }

    /// Locates occurrences against one index of the input. The occurrence
    /// counter of a replacement is shared by all pages.
    fn plan(&self, index: &DocumentTextIndex, replacements: &[ValidatedReplacement]) -> Plan {
        let mut plan = Plan::default();
        let mut covered: Vec<(usize, Rect)> = Vec::new();

        for r in replacements {
            let mut applied = 0;
            for (page_index, bbox) in index.find_literal(r.original()) {
                if applied >= r.max_occurrences() {
                    break;
                }
                if covered.iter().any(|(p, site)| *p == page_index && same_site(site, &bbox)) {
                    warn!(original = r.original(), page_index, "occurrence already covered by an earlier edit");
                    if !plan.overlapping.iter().any(|o| o == r.original()) {
                        plan.overlapping.push(r.original().to_string());
                    }
                    continue;
                }

                // closest baseline wins when lines are tightly spaced
                let run = index
                    .runs_overlapping(page_index, &bbox)
                    .into_iter()
                    .min_by(|a, b| {
                        (a.bbox.y0 - bbox.y0).abs().total_cmp(&(b.bbox.y0 - bbox.y0).abs())
                    });
                let (font_name, font_size, color) = match run {
                    Some(run) => (run.font_name.as_str(), run.font_size, run.color),
                    None => (FALLBACK_FONT_NAME, FALLBACK_FONT_SIZE, FALLBACK_COLOR),
                };
                let family = map_font_family(font_name);
                let redraw_width = family.metrics().measure_str(r.replacement()) * font_size;
                if redraw_width > bbox.width() + 2.0 * self.cover_margin {
                    debug!(
                        replacement = r.replacement(),
                        redraw_width,
                        cover_width = bbox.width(),
                        "replacement is wider than the original"
                    );
                }

                covered.push((page_index, bbox));
                plan.edits.push(Edit {
                    page_index,
                    bbox,
                    text: r.replacement().to_string(),
                    font_size,
                    color,
                    family,
                });
                plan.records.push(MutationRecord {
                    page_index,
                    original: r.original().to_string(),
                    replacement: r.replacement().to_string(),
                    bbox,
                    family,
                    redraw_width,
                });
                applied += 1;
            }
            if applied == 0 {
                plan.skipped.push(r.original().to_string());
            }
        }
        plan
    }

    /// Registers the needed fonts on the page and appends one content stream
    /// with all covers and redraws. The existing content is wrapped in `q … Q`
    /// so its graphics state cannot leak into the appended stream.
    fn redraw_page(&self, doc: &mut Document, page_id: ObjectId, edits: &[&Edit]) -> Result<(), AppError> {
        let mut resources: Dictionary = page_resources(doc, page_id).cloned().unwrap_or_default();
        let mut fonts: Dictionary = doc
            .get_dict_in_dict(&resources, b"Font")
            .cloned()
            .unwrap_or_default();

        let families: BTreeSet<&'static str> = edits.iter().map(|e| e.family.resource_name()).collect();
        for family in [FontFamily::Sans, FontFamily::Serif, FontFamily::Monospace, FontFamily::BoldSans] {
            if families.contains(family.resource_name()) && !fonts.has(family.resource_name().as_bytes()) {
                let font_id = doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => family.base_font(),
                    "Encoding" => "WinAnsiEncoding",
                });
                fonts.set(family.resource_name(), font_id);
            }
        }
        resources.set("Font", Object::Dictionary(fonts));

        let operations: Vec<Operation> = edits.iter().flat_map(|e| self.edit_ops(e)).collect();
        let edit_stream = Content { operations }.encode()?;

        let mut contents: Vec<Object> = Vec::new();
        contents.push(doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec())).into());
        contents.extend(doc.get_page_contents(page_id).into_iter().map(Object::Reference));
        contents.push(doc.add_object(Stream::new(dictionary! {}, b"\nQ\n".to_vec())).into());
        contents.push(doc.add_object(Stream::new(dictionary! {}, edit_stream)).into());

        let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Array(contents));
        Ok(())
    }

    fn edit_ops(&self, edit: &Edit) -> Vec<Operation> {
        let cover = edit.bbox.expand(self.cover_margin);
        let [r, g, b] = edit.color;
        vec![
            Operation::new("q", vec![]),
            Operation::new("rg", vec![1.into(), 1.into(), 1.into()]),
            Operation::new(
                "re",
                vec![cover.x0.into(), cover.y0.into(), cover.width().into(), cover.height().into()],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![edit.family.resource_name().into(), edit.font_size.into()]),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new(
                "Td",
                vec![edit.bbox.x0.into(), (edit.bbox.y0 + self.baseline_shift).into()],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(&edit.text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]
    }
}
