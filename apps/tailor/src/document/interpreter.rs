//! Content-stream interpreter: walks the operators of one page and records
//! where text is shown and which rectangles are filled, in painting order.
//!
//! Only what text extraction needs is modelled. Form XObjects are entered
//! with their own matrix and fonts; non-rectangular paths, images and
//! shadings are ignored.

use std::collections::HashMap;
use std::sync::OnceLock;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object};
use tracing::debug;

use super::fonts::{resource_fonts, FontInfo, StyleFlags};
use super::geometry::{Matrix, Rect};
use super::resources::form_xobject;

/// Nesting limit for form XObjects; self-referencing forms stop here.
const MAX_FORM_DEPTH: usize = 8;

pub type Rgb = [f32; 3];

#[derive(Debug, Clone)]
pub(crate) struct PlacedGlyph {
    pub text: String,
    pub x0: f32,
    pub x1: f32,
}

/// One text-showing operator (`Tj`, `TJ`, `'`, `"`).
#[derive(Debug, Clone)]
pub(crate) struct TextShow {
    /// Painting order shared with `FilledRect::seq`.
    pub seq: usize,
    /// `BT … ET` block the show belongs to.
    pub block: usize,
    pub font_name: String,
    pub style: StyleFlags,
    /// Effective size in user space.
    pub font_size: f32,
    pub color: Rgb,
    pub baseline: f32,
    pub glyphs: Vec<PlacedGlyph>,
}

#[derive(Debug, Clone)]
pub(crate) struct FilledRect {
    pub seq: usize,
    pub rect: Rect,
}

#[derive(Debug, Default)]
pub(crate) struct PageMarks {
    pub shows: Vec<TextShow>,
    pub fills: Vec<FilledRect>,
}

#[derive(Debug, Clone)]
struct TextState {
    font: Option<Vec<u8>>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    fill: Rgb,
    text: TextState,
}

/// Where `Do` looks up XObjects: the document and the resource dictionary
/// of the content being interpreted.
#[derive(Clone, Copy)]
pub(crate) struct ResourceScope<'a> {
    pub doc: &'a Document,
    pub resources: &'a Dictionary,
}

struct Interpreter<'a> {
    fonts: &'a HashMap<Vec<u8>, FontInfo>,
    scope: Option<ResourceScope<'a>>,
    depth: usize,
    gs: GraphicsState,
    stack: Vec<GraphicsState>,
    tm: Matrix,
    tlm: Matrix,
    block: usize,
    seq: usize,
    pending_rects: Vec<Rect>,
    marks: PageMarks,
}

/// Interprets one page. Without a scope, `Do` is ignored.
pub(crate) fn interpret(
    operations: &[Operation],
    fonts: &HashMap<Vec<u8>, FontInfo>,
    scope: Option<ResourceScope<'_>>,
) -> PageMarks {
    let mut interp = Interpreter::new(fonts, scope, GraphicsState::default());
    for op in operations {
        interp.step(op);
    }
    interp.marks
}

fn number(obj: &Object) -> Option<f32> {
    obj.as_float().ok()
}

fn name(obj: &Object) -> Option<&[u8]> {
    obj.as_name().ok()
}

fn numbers(operands: &[Object]) -> Vec<f32> {
    operands.iter().filter_map(number).collect()
}

fn cmyk_to_rgb(c: f32, m: f32, y: f32, k: f32) -> Rgb {
    [(1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k)]
}

fn color_from(components: &[f32]) -> Option<Rgb> {
    match *components {
        [g] => Some([g, g, g]),
        [r, g, b] => Some([r, g, b]),
        [c, m, y, k] => Some(cmyk_to_rgb(c, m, y, k)),
        _ => None,
    }
}

fn fallback_font() -> &'static FontInfo {
    static FALLBACK: OnceLock<FontInfo> = OnceLock::new();
    FALLBACK.get_or_init(FontInfo::fallback)
}

impl<'a> Interpreter<'a> {
    fn new(fonts: &'a HashMap<Vec<u8>, FontInfo>, scope: Option<ResourceScope<'a>>, gs: GraphicsState) -> Self {
        Self {
            fonts,
            scope,
            depth: 0,
            gs,
            stack: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            block: 0,
            seq: 0,
            pending_rects: Vec::new(),
            marks: PageMarks::default(),
        }
    }

    fn step(&mut self, op: &Operation) {
        let args = &op.operands;
        match op.operator.as_str() {
            "q" => self.stack.push(self.gs.clone()),
            "Q" => {
                if let Some(saved) = self.stack.pop() {
                    self.gs = saved;
                }
            }
            "cm" => {
                if let [a, b, c, d, e, f] = numbers(args)[..] {
                    self.gs.ctm = Matrix::new(a, b, c, d, e, f).then(&self.gs.ctm);
                }
            }

            // colour
            "g" | "rg" | "k" | "sc" | "scn" => {
                if let Some(rgb) = color_from(&numbers(args)) {
                    self.gs.fill = rgb;
                }
            }

            // paths
            "re" => {
                if let [x, y, w, h] = numbers(args)[..] {
                    self.pending_rects.push(self.gs.ctm.apply_rect(x, y, w, h));
                }
            }
            "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                for rect in std::mem::take(&mut self.pending_rects) {
                    let seq = self.next_seq();
                    self.marks.fills.push(FilledRect { seq, rect });
                }
            }
            "n" | "S" | "s" => self.pending_rects.clear(),

            // external objects
            "Do" => {
                if let Some(key) = args.first().and_then(name) {
                    self.draw_form(key);
                }
            }

            // text objects and state
            "BT" => {
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
                self.block += 1;
            }
            "Tf" => {
                if let Some(key) = args.first().and_then(name) {
                    self.gs.text.font = Some(key.to_vec());
                }
                if let Some(size) = args.get(1).and_then(number) {
                    self.gs.text.size = size;
                }
            }
            "Tc" => self.set_text_param(args, |t, v| t.char_spacing = v),
            "Tw" => self.set_text_param(args, |t, v| t.word_spacing = v),
            "Tz" => self.set_text_param(args, |t, v| t.horizontal_scale = v / 100.0),
            "TL" => self.set_text_param(args, |t, v| t.leading = v),
            "Ts" => self.set_text_param(args, |t, v| t.rise = v),
            "Td" => {
                if let [tx, ty] = numbers(args)[..] {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let [tx, ty] = numbers(args)[..] {
                    self.gs.text.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let [a, b, c, d, e, f] = numbers(args)[..] {
                    self.tlm = Matrix::new(a, b, c, d, e, f);
                    self.tm = self.tlm;
                }
            }
            "T*" => self.next_line(),

            // text showing
            "Tj" => {
                if let Some(bytes) = args.first().and_then(string_bytes) {
                    let mut show = self.begin_show();
                    self.show_string(&mut show, bytes);
                    self.finish_show(show);
                }
            }
            "'" => {
                self.next_line();
                if let Some(bytes) = args.first().and_then(string_bytes) {
                    let mut show = self.begin_show();
                    self.show_string(&mut show, bytes);
                    self.finish_show(show);
                }
            }
            "\"" => {
                if let [aw, ac] = numbers(&args[..args.len().min(2)])[..] {
                    self.gs.text.word_spacing = aw;
                    self.gs.text.char_spacing = ac;
                }
                self.next_line();
                if let Some(bytes) = args.get(2).and_then(string_bytes) {
                    let mut show = self.begin_show();
                    self.show_string(&mut show, bytes);
                    self.finish_show(show);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = args.first() {
                    let mut show = self.begin_show();
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show_string(&mut show, bytes),
                            other => {
                                if let Some(adjust) = number(other) {
                                    let t = &self.gs.text;
                                    let tx = -adjust / 1000.0 * t.size * t.horizontal_scale;
                                    self.tm = Matrix::translate(tx, 0.0).then(&self.tm);
                                }
                            }
                        }
                    }
                    self.finish_show(show);
                }
            }
            _ => {}
        }
    }

    /// Runs a form XObject's content under `/Matrix` × CTM, sharing the
    /// painting order with the enclosing content. Fonts and nested XObjects
    /// come from the form's own `/Resources` when it has them.
    fn draw_form(&mut self, key: &[u8]) {
        let Some(scope) = self.scope else {
            return;
        };
        if self.depth >= MAX_FORM_DEPTH {
            debug!(depth = self.depth, "form XObject nesting too deep, skipped");
            return;
        }
        let Some(form) = form_xobject(scope.doc, scope.resources, key) else {
            return;
        };
        let operations = match form.get_plain_content().map(|c| Content::decode(&c)) {
            Ok(Ok(content)) => content.operations,
            _ => {
                debug!(form = %String::from_utf8_lossy(key), "unreadable form XObject, skipped");
                return;
            }
        };

        let matrix = match form.dict.get(b"Matrix").and_then(Object::as_array).map(|m| numbers(m)) {
            Ok(m) => match m[..] {
                [a, b, c, d, e, f] => Matrix::new(a, b, c, d, e, f),
                _ => Matrix::IDENTITY,
            },
            Err(_) => Matrix::IDENTITY,
        };
        let own_resources = form
            .dict
            .get_deref(b"Resources", scope.doc)
            .and_then(Object::as_dict)
            .ok();
        let own_fonts;
        let (fonts, resources) = match own_resources {
            Some(resources) => {
                own_fonts = resource_fonts(scope.doc, resources);
                let fonts = if own_fonts.is_empty() { self.fonts } else { &own_fonts };
                (fonts, resources)
            }
            None => (self.fonts, scope.resources),
        };

        let mut gs = self.gs.clone();
        gs.ctm = matrix.then(&self.gs.ctm);
        let mut nested = Interpreter::new(
            fonts,
            Some(ResourceScope {
                doc: scope.doc,
                resources,
            }),
            gs,
        );
        nested.depth = self.depth + 1;
        nested.block = self.block;
        nested.seq = self.seq;
        for op in &operations {
            nested.step(op);
        }

        self.block = nested.block;
        self.seq = nested.seq;
        self.marks.shows.extend(nested.marks.shows);
        self.marks.fills.extend(nested.marks.fills);
    }

    fn next_seq(&mut self) -> usize {
        self.seq += 1;
        self.seq
    }

    fn set_text_param(&mut self, args: &[Object], set: impl FnOnce(&mut TextState, f32)) {
        if let Some(v) = args.first().and_then(number) {
            set(&mut self.gs.text, v);
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translate(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        let leading = self.gs.text.leading;
        self.move_line(0.0, -leading);
    }

    fn font(&self) -> &'a FontInfo {
        let fonts = self.fonts;
        self.gs
            .text
            .font
            .as_ref()
            .and_then(|key| fonts.get(key))
            .unwrap_or_else(|| fallback_font())
    }

    fn begin_show(&mut self) -> TextShow {
        let seq = self.next_seq();
        let text_to_user = self.tm.then(&self.gs.ctm);
        let (_, baseline) = text_to_user.apply(0.0, self.gs.text.rise);
        let font = self.font();
        TextShow {
            seq,
            block: self.block,
            font_name: font.base_font.clone(),
            style: font.style,
            font_size: self.gs.text.size * text_to_user.vertical_scale(),
            color: self.gs.fill,
            baseline,
            glyphs: Vec::new(),
        }
    }

    fn show_string(&mut self, show: &mut TextShow, bytes: &[u8]) {
        let t = self.gs.text.clone();
        let font = self.font();
        for code in font.codes(bytes) {
            let text = font.decode(code);
            let w0 = font.width(code, &text);

            let to_user = self.tm.then(&self.gs.ctm);
            let (sx, _) = to_user.apply(0.0, t.rise);
            let (ex, _) = to_user.apply(w0 * t.size * t.horizontal_scale, t.rise);
            show.glyphs.push(PlacedGlyph {
                text,
                x0: sx.min(ex),
                x1: sx.max(ex),
            });

            let word_spacing = if font.code_len == 1 && code == 32 {
                t.word_spacing
            } else {
                0.0
            };
            let tx = (w0 * t.size + t.char_spacing + word_spacing) * t.horizontal_scale;
            self.tm = Matrix::translate(tx, 0.0).then(&self.tm);
        }
    }

    fn finish_show(&mut self, show: TextShow) {
        if !show.glyphs.is_empty() {
            self.marks.shows.push(show);
        }
    }
}

fn string_bytes(obj: &Object) -> Option<&[u8]> {
    match obj {
        Object::String(bytes, _) => Some(bytes.as_slice()),
        _ => None,
    }
}
