//! Read-only index of the visible text of a PDF.
//!
//! Runs are built from the interpreter's show events: consecutive shows in
//! the same text object, font, size and colour on one baseline are merged,
//! then split wherever a glyph is hidden under an opaque rectangle painted
//! later on the page. Each page keeps its runs in reading order (top to
//! bottom, then left to right).

use std::ops::Range;

use lopdf::content::Content;
use lopdf::{Document, Object};
use serde::Serialize;
use tracing::debug;

use crate::errors::AppError;

use super::fonts::{page_fonts, StyleFlags};
use super::geometry::Rect;
use super::interpreter::{interpret, FilledRect, PageMarks, PlacedGlyph, ResourceScope, Rgb, TextShow};
use super::resources::{page_content, page_resources};

/// Bbox extends this far below the baseline, in font sizes.
const DESCENT: f32 = 0.2;
/// Bbox extends this far above the baseline, in font sizes.
const ASCENT: f32 = 0.8;
/// Height of the point tested for occlusion, in font sizes above the baseline.
const OCCLUSION_HEIGHT: f32 = 0.3;
/// Horizontal gap that reads as a word break, in font sizes.
const SPACE_GAP: f32 = 0.15;
/// Largest gap bridged when merging consecutive shows, in font sizes.
const MERGE_GAP: f32 = 1.0;
/// Baselines closer than this share a line, in font sizes.
const LINE_TOLERANCE: f32 = 0.5;

#[derive(Debug, Clone)]
struct GlyphSpan {
    /// Byte range within `TextRun::text`.
    bytes: Range<usize>,
    x0: f32,
    x1: f32,
}

/// A maximal piece of visible text sharing one style and baseline.
#[derive(Debug, Clone, Serialize)]
pub struct TextRun {
    pub text: String,
    pub page_index: usize,
    pub bbox: Rect,
    pub font_name: String,
    pub font_size: f32,
    pub color: Rgb,
    pub style_flags: StyleFlags,
    #[serde(skip)]
    baseline: f32,
    #[serde(skip)]
    glyphs: Vec<GlyphSpan>,
}

impl TextRun {
    pub fn baseline(&self) -> f32 {
        self.baseline
    }

    /// Box around the glyphs covering `text[range]`.
    pub fn span_rect(&self, range: Range<usize>) -> Option<Rect> {
        let mut hit = self
            .glyphs
            .iter()
            .filter(|g| g.bytes.start < range.end && g.bytes.end > range.start);
        let first = hit.next()?;
        let (x0, x1) = hit.fold((first.x0, first.x1), |(a, b), g| (a.min(g.x0), b.max(g.x1)));
        Some(Rect::new(x0, self.bbox.y0, x1, self.bbox.y1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkAnnotation {
    pub page_index: usize,
    pub rect: Rect,
    pub uri: String,
}

#[derive(Debug, Clone, Default)]
struct PageText {
    runs: Vec<TextRun>,
    lines: Vec<Range<usize>>,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentTextIndex {
    pages: Vec<PageText>,
    links: Vec<LinkAnnotation>,
}

impl DocumentTextIndex {
    pub fn parse(bytes: &[u8]) -> Result<Self, AppError> {
        let doc = Document::load_mem(bytes)?;
        Self::from_document(&doc)
    }

    pub(crate) fn from_document(doc: &Document) -> Result<Self, AppError> {
        let page_ids = doc.get_pages();
        if page_ids.is_empty() {
            return Err(AppError::DocumentParse("document has no pages".to_string()));
        }

        let mut pages = Vec::with_capacity(page_ids.len());
        let mut links = Vec::new();
        for (page_index, page_id) in page_ids.values().enumerate() {
            let fonts = page_fonts(doc, *page_id);
            let content = page_content(doc, *page_id)?;
            let operations = Content::decode(&content)?.operations;
            let scope = page_resources(doc, *page_id).map(|resources| ResourceScope { doc, resources });
            let marks = interpret(&operations, &fonts, scope);
            pages.push(build_page(page_index, marks));
            links.extend(page_links(doc, *page_id, page_index));
        }

        debug!(
            pages = pages.len(),
            runs = pages.iter().map(|p| p.runs.len()).sum::<usize>(),
            "indexed document text"
        );
        Ok(Self { pages, links })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Runs of a page in reading order; empty for an out-of-range page.
    pub fn runs(&self, page: usize) -> &[TextRun] {
        self.pages.get(page).map(|p| p.runs.as_slice()).unwrap_or(&[])
    }

    pub fn page_text(&self, page: usize) -> String {
        let Some(p) = self.pages.get(page) else {
            return String::new();
        };
        p.lines
            .iter()
            .map(|range| join_line(&p.runs[range.clone()]).0)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn full_text(&self) -> String {
        (0..self.page_count())
            .map(|p| self.page_text(p))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every occurrence of `needle`, pages ascending, reading order within a
    /// page. Case-sensitive. Lines are searched as `page_text` renders them,
    /// so an occurrence may span runs; its rect is the union of the glyphs
    /// it covers. Occurrences on one line never overlap.
    pub fn find_literal(&self, needle: &str) -> Vec<(usize, Rect)> {
        if needle.is_empty() {
            return Vec::new();
        }
        let mut found = Vec::new();
        for (page_index, page) in self.pages.iter().enumerate() {
            for range in &page.lines {
                let runs = &page.runs[range.clone()];
                let (text, offsets) = join_line(runs);
                for (start, matched) in text.match_indices(needle) {
                    let end = start + matched.len();
                    let rect = runs
                        .iter()
                        .zip(&offsets)
                        .filter_map(|(run, &offset)| {
                            let lo = start.max(offset);
                            let hi = end.min(offset + run.text.len());
                            (lo < hi).then(|| run.span_rect(lo - offset..hi - offset)).flatten()
                        })
                        .reduce(|a, b| a.union(&b));
                    if let Some(rect) = rect {
                        found.push((page_index, rect));
                    }
                }
            }
        }
        found
    }

    pub fn runs_overlapping(&self, page: usize, rect: &Rect) -> Vec<&TextRun> {
        self.runs(page)
            .iter()
            .filter(|r| r.bbox.intersects(rect))
            .collect()
    }

    /// URI link annotations.
    pub fn links(&self) -> &[LinkAnnotation] {
        &self.links
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Run construction
// ────────────────────────────────────────────────────────────────────────────

fn build_page(page_index: usize, marks: PageMarks) -> PageText {
    let mut runs = Vec::new();
    for group in merge_shows(&marks.shows) {
        split_visible(page_index, &group, &marks.fills, &mut runs);
    }
    order_lines(runs)
}

fn can_merge(prev: &TextShow, next: &TextShow) -> bool {
    let size = prev.font_size.max(0.1);
    let (Some(last), Some(first)) = (prev.glyphs.last(), next.glyphs.first()) else {
        return false;
    };
    let gap = first.x0 - last.x1;
    prev.block == next.block
        && prev.font_name == next.font_name
        && (prev.font_size - next.font_size).abs() < 0.01
        && prev.color == next.color
        && (prev.baseline - next.baseline).abs() < 0.05 * size
        && gap > -0.5 * size
        && gap < MERGE_GAP * size
}

fn merge_shows(shows: &[TextShow]) -> Vec<Vec<&TextShow>> {
    let mut groups: Vec<Vec<&TextShow>> = Vec::new();
    for show in shows {
        match groups.last_mut() {
            Some(group) if group.last().is_some_and(|prev| can_merge(prev, show)) => {
                group.push(show)
            }
            _ => groups.push(vec![show]),
        }
    }
    groups
}

fn occluded(fills: &[FilledRect], show: &TextShow, glyph: &PlacedGlyph) -> bool {
    let cx = (glyph.x0 + glyph.x1) / 2.0;
    let cy = show.baseline + OCCLUSION_HEIGHT * show.font_size;
    fills
        .iter()
        .any(|f| f.seq > show.seq && f.rect.contains_point(cx, cy))
}

struct RunBuilder<'a> {
    page_index: usize,
    style: &'a TextShow,
    text: String,
    glyphs: Vec<GlyphSpan>,
}

impl<'a> RunBuilder<'a> {
    fn new(page_index: usize, style: &'a TextShow) -> Self {
        Self {
            page_index,
            style,
            text: String::new(),
            glyphs: Vec::new(),
        }
    }

    fn push(&mut self, glyph: &PlacedGlyph) {
        let size = self.style.font_size;
        if let Some(last) = self.glyphs.last() {
            let gap = glyph.x0 - last.x1;
            let boundary_space = self.text.ends_with(char::is_whitespace)
                || glyph.text.starts_with(char::is_whitespace);
            if gap > SPACE_GAP * size && !boundary_space {
                let start = self.text.len();
                let x0 = last.x1;
                self.text.push(' ');
                self.glyphs.push(GlyphSpan {
                    bytes: start..start + 1,
                    x0,
                    x1: glyph.x0,
                });
            }
        }
        let start = self.text.len();
        self.text.push_str(&glyph.text);
        self.glyphs.push(GlyphSpan {
            bytes: start..self.text.len(),
            x0: glyph.x0,
            x1: glyph.x1,
        });
    }

    fn finish(&mut self, out: &mut Vec<TextRun>) {
        let text = std::mem::take(&mut self.text);
        let glyphs = std::mem::take(&mut self.glyphs);
        if text.trim().is_empty() {
            return;
        }
        let (Some(first), Some(last)) = (glyphs.first(), glyphs.last()) else {
            return;
        };
        let s = self.style;
        out.push(TextRun {
            bbox: Rect::new(
                first.x0,
                s.baseline - DESCENT * s.font_size,
                last.x1,
                s.baseline + ASCENT * s.font_size,
            ),
            text,
            page_index: self.page_index,
            font_name: s.font_name.clone(),
            font_size: s.font_size,
            color: s.color,
            style_flags: s.style,
            baseline: s.baseline,
            glyphs,
        });
    }
}

fn split_visible(page_index: usize, group: &[&TextShow], fills: &[FilledRect], out: &mut Vec<TextRun>) {
    let Some(style) = group.first() else {
        return;
    };
    let mut builder = RunBuilder::new(page_index, style);
    for show in group {
        for glyph in &show.glyphs {
            if occluded(fills, show, glyph) {
                builder.finish(out);
            } else {
                builder.push(glyph);
            }
        }
    }
    builder.finish(out);
}

fn order_lines(mut runs: Vec<TextRun>) -> PageText {
    runs.sort_by(|a, b| b.baseline.total_cmp(&a.baseline));

    let mut lines: Vec<Vec<TextRun>> = Vec::new();
    for run in runs {
        match lines.last_mut() {
            Some(line)
                if (line[0].baseline - run.baseline).abs()
                    <= LINE_TOLERANCE * line[0].font_size.max(run.font_size) =>
            {
                line.push(run)
            }
            _ => lines.push(vec![run]),
        }
    }

    let mut page = PageText::default();
    for mut line in lines {
        line.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
        let start = page.runs.len();
        page.runs.extend(line);
        page.lines.push(start..page.runs.len());
    }
    page
}

/// Line text plus the byte offset of each run within it.
fn join_line(runs: &[TextRun]) -> (String, Vec<usize>) {
    let mut text = String::new();
    let mut offsets = Vec::with_capacity(runs.len());
    let mut prev: Option<&TextRun> = None;
    for run in runs {
        if let Some(p) = prev {
            let gap = run.bbox.x0 - p.bbox.x1;
            let boundary_space =
                text.ends_with(char::is_whitespace) || run.text.starts_with(char::is_whitespace);
            if gap > SPACE_GAP * p.font_size.min(run.font_size) && !boundary_space {
                text.push(' ');
            }
        }
        offsets.push(text.len());
        text.push_str(&run.text);
        prev = Some(run);
    }
    (text, offsets)
}

// ────────────────────────────────────────────────────────────────────────────
// Link annotations
// ────────────────────────────────────────────────────────────────────────────

fn page_links(doc: &Document, page_id: lopdf::ObjectId, page_index: usize) -> Vec<LinkAnnotation> {
    let Ok(annots) = doc.get_page_annotations(page_id) else {
        return Vec::new();
    };

    annots
        .into_iter()
        .filter_map(|annot| {
            let action = doc.get_dict_in_dict(annot, b"A").ok()?;
            let uri = match action.get_deref(b"URI", doc).ok()? {
                Object::String(bytes, _) => String::from_utf8_lossy(bytes).into_owned(),
                _ => return None,
            };
            let rect: Vec<f32> = match annot.get_deref(b"Rect", doc).ok()? {
                Object::Array(items) => items.iter().filter_map(|o| o.as_float().ok()).collect(),
                _ => return None,
            };
            let [x0, y0, x1, y1] = rect[..] else {
                return None;
            };
            Some(LinkAnnotation {
                page_index,
                rect: Rect::new(x0, y0, x1, y1),
                uri,
            })
        })
        .collect()
}
