//! Content stream interpretation.
//!
//! Walks the operators of a page's content stream, tracking the graphics
//! state (CTM, fill colour) and the text state, and emits one [`TextRun`]
//! per text-showing operator plus one [`PlacedImage`] per image XObject
//! painted with `Do`.

use std::collections::{BTreeMap, HashMap};

use lopdf::content::Content;
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::model::{BoundingBox, Rgb, TextRun, AVG_CHAR_WIDTH_RATIO};
use crate::text::normalize_run_text;

/// TJ adjustments larger than this (in thousandths of an em) read as a word
/// break.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Everything extracted from one page.
#[derive(Debug)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub number: u32,
    pub width: f32,
    pub height: f32,
    /// Text runs in content stream order
    pub runs: Vec<TextRun>,
    /// Images in painting order
    pub images: Vec<PlacedImage>,
}

/// An image XObject and where it was painted.
#[derive(Debug)]
pub struct PlacedImage {
    pub bbox: BoundingBox,
    /// Decoded image, or the reason it could not be read
    pub image: Result<RawImage>,
}

/// How the bytes of a [`RawImage`] are encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageEncoding {
    /// Complete JPEG file (DCTDecode)
    Jpeg,
    /// Complete JPEG 2000 codestream (JPXDecode)
    Jpeg2000,
    /// Decompressed sample data
    Raw,
}

/// Image data as stored in the PDF.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub data: Vec<u8>,
    pub encoding: ImageEncoding,
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    /// Colour components per sample, when the colour space is known
    pub components: Option<u8>,
}

/// Affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translate(tx: f32, ty: f32) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self × other`: apply `self` first, then `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (x * a + y * c + e, x * b + y * d + f)
    }

    fn vertical_scale(&self) -> f32 {
        (self.0[2] * self.0[2] + self.0[3] * self.0[3]).sqrt()
    }
}

#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    /// Tz / 100
    horizontal_scaling: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill: Rgb,
    text: TextState,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            fill: Rgb::BLACK,
            text: TextState::default(),
        }
    }
}

/// Glyph advance widths of a font, in thousandths of an em.
#[derive(Debug, Clone)]
struct FontMetrics {
    first_char: u32,
    widths: Vec<f32>,
    default_width: f32,
    /// Composite (Type0) fonts use two-byte codes
    two_byte: bool,
}

impl FontMetrics {
    fn from_dict(doc: &LopdfDocument, dict: &Dictionary, base_name: &str) -> Self {
        let two_byte = dict
            .get(b"Subtype")
            .and_then(Object::as_name)
            .map(|n| n == b"Type0")
            .unwrap_or(false);

        let fallback = if base_name.to_lowercase().contains("courier") {
            600.0
        } else {
            AVG_CHAR_WIDTH_RATIO * 1000.0
        };
        let default_width = descriptor_missing_width(doc, dict).unwrap_or(fallback);

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0)
            .max(0) as u32;
        let widths = dict
            .get(b"Widths")
            .ok()
            .and_then(|o| resolve_array(doc, o))
            .map(|arr| {
                arr.iter()
                    .map(|w| get_number(resolve(doc, w)).unwrap_or(default_width))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            first_char,
            widths,
            default_width,
            two_byte,
        }
    }

    fn glyph_width(&self, code: u32) -> f32 {
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.default_width)
    }

    /// Character codes of a string operand.
    fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| c.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32))
                .collect()
        } else {
            bytes.iter().map(|b| *b as u32).collect()
        }
    }
}

fn descriptor_missing_width(doc: &LopdfDocument, dict: &Dictionary) -> Option<f32> {
    let descriptor = dict
        .get(b"FontDescriptor")
        .ok()
        .and_then(|o| resolve_dict(doc, o))?;
    descriptor
        .get(b"MissingWidth")
        .ok()
        .and_then(get_number)
        .filter(|w| *w > 0.0)
}

struct FontInfo<'a> {
    dict: &'a Dictionary,
    base_name: String,
    metrics: FontMetrics,
}

/// Interprets the content stream of one page.
pub(crate) struct ContentInterpreter<'a> {
    doc: &'a LopdfDocument,
    page_number: u32,
    fonts: HashMap<Vec<u8>, FontInfo<'a>>,
    xobjects: Option<&'a Dictionary>,
    extract_images: bool,
}

impl<'a> ContentInterpreter<'a> {
    pub(crate) fn new(
        doc: &'a LopdfDocument,
        page_id: ObjectId,
        page_number: u32,
        extract_images: bool,
    ) -> Result<Self> {
        let page_fonts: BTreeMap<Vec<u8>, &'a Dictionary> = doc
            .get_page_fonts(page_id)
            .map_err(|e| Error::PdfParse(format!("page {}: {}", page_number, e)))?;

        let fonts = page_fonts
            .into_iter()
            .map(|(key, dict)| {
                let base_name = dict
                    .get(b"BaseFont")
                    .ok()
                    .and_then(|o| o.as_name().ok())
                    .map(|n| String::from_utf8_lossy(n).to_string())
                    .unwrap_or_else(|| String::from_utf8_lossy(&key).to_string());
                let metrics = FontMetrics::from_dict(doc, dict, &base_name);
                (
                    key,
                    FontInfo {
                        dict,
                        base_name,
                        metrics,
                    },
                )
            })
            .collect();

        let xobjects = page_resources(doc, page_id)
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|o| resolve_dict(doc, o));

        Ok(Self {
            doc,
            page_number,
            fonts,
            xobjects,
            extract_images,
        })
    }

    /// Run the interpreter over the page's content bytes.
    pub(crate) fn run(&self, content: &[u8]) -> Result<(Vec<TextRun>, Vec<PlacedImage>)> {
        let content = Content::decode(content)
            .map_err(|e| Error::PdfParse(format!("page {}: {}", self.page_number, e)))?;

        let mut runs = Vec::new();
        let mut images = Vec::new();
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut gs = GraphicsState::default();
        let mut tm = Matrix::IDENTITY;
        let mut tlm = Matrix::IDENTITY;

        for op in &content.operations {
            let operands = &op.operands;
            let num = |i: usize| operands.get(i).and_then(get_number);

            match op.operator.as_str() {
                "q" => stack.push(gs.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        gs = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_operands(operands) {
                        gs.ctm = m.then(&gs.ctm);
                    }
                }
                "g" => {
                    if let Some(v) = num(0) {
                        gs.fill = Rgb::from_gray(v);
                    }
                }
                "rg" => {
                    if let (Some(r), Some(g), Some(b)) = (num(0), num(1), num(2)) {
                        gs.fill = Rgb::from_components(r, g, b);
                    }
                }
                "k" => {
                    if let (Some(c), Some(m), Some(y), Some(k)) = (num(0), num(1), num(2), num(3)) {
                        gs.fill = Rgb::from_cmyk(c, m, y, k);
                    }
                }
                "sc" | "scn" => {
                    let values: Vec<f32> = operands.iter().filter_map(get_number).collect();
                    match values.as_slice() {
                        [v] => gs.fill = Rgb::from_gray(*v),
                        [r, g, b] => gs.fill = Rgb::from_components(*r, *g, *b),
                        [c, m, y, k] => gs.fill = Rgb::from_cmyk(*c, *m, *y, *k),
                        _ => {}
                    }
                }
                "BT" => {
                    tm = Matrix::IDENTITY;
                    tlm = Matrix::IDENTITY;
                }
                "Tf" => {
                    if let Some(Object::Name(key)) = operands.first() {
                        gs.text.font_key = key.clone();
                    }
                    if let Some(size) = num(1) {
                        gs.text.font_size = size;
                    }
                }
                "Tc" => gs.text.char_spacing = num(0).unwrap_or(0.0),
                "Tw" => gs.text.word_spacing = num(0).unwrap_or(0.0),
                "Tz" => gs.text.horizontal_scaling = num(0).unwrap_or(100.0) / 100.0,
                "TL" => gs.text.leading = num(0).unwrap_or(0.0),
                "Ts" => gs.text.rise = num(0).unwrap_or(0.0),
                "Td" | "TD" => {
                    let (tx, ty) = (num(0).unwrap_or(0.0), num(1).unwrap_or(0.0));
                    if op.operator == "TD" {
                        gs.text.leading = -ty;
                    }
                    tlm = Matrix::translate(tx, ty).then(&tlm);
                    tm = tlm;
                }
                "Tm" => {
                    if let Some(m) = matrix_operands(operands) {
                        tlm = m;
                        tm = m;
                    }
                }
                "T*" => {
                    tlm = Matrix::translate(0.0, -gs.text.leading).then(&tlm);
                    tm = tlm;
                }
                "Tj" | "TJ" | "'" | "\"" => {
                    if op.operator == "\"" {
                        gs.text.word_spacing = num(0).unwrap_or(gs.text.word_spacing);
                        gs.text.char_spacing = num(1).unwrap_or(gs.text.char_spacing);
                    }
                    if op.operator == "'" || op.operator == "\"" {
                        tlm = Matrix::translate(0.0, -gs.text.leading).then(&tlm);
                        tm = tlm;
                    }
                    let shown = match op.operator.as_str() {
                        "\"" => operands.get(2),
                        _ => operands.first(),
                    };
                    if let Some(shown) = shown {
                        if let Some(run) = self.show_text(shown, &gs, &mut tm) {
                            runs.push(run);
                        }
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        if let Some(image) = self.paint_xobject(name, &gs.ctm) {
                            images.push(image);
                        }
                    }
                }
                _ => {}
            }
        }

        Ok((runs, images))
    }

    /// Decode a text-showing operand, advance the text matrix and build the run.
    fn show_text(&self, operand: &Object, gs: &GraphicsState, tm: &mut Matrix) -> Option<TextRun> {
        let ts = &gs.text;
        let font = self.fonts.get(&ts.font_key);
        let start = *tm;
        let mut text = String::new();

        let items: &[Object] = match operand {
            Object::Array(items) => items,
            other => std::slice::from_ref(other),
        };

        for item in items {
            match item {
                Object::String(bytes, _) => {
                    text.push_str(&self.decode(font, bytes));
                    let advance = string_advance(font.map(|f| &f.metrics), bytes, ts);
                    *tm = Matrix::translate(advance, 0.0).then(tm);
                }
                Object::Integer(_) | Object::Real(_) => {
                    let adjustment = get_number(item).unwrap_or(0.0);
                    if -adjustment > TJ_SPACE_THRESHOLD
                        && !text.is_empty()
                        && !text.ends_with([' ', '\u{00A0}'])
                        && !text.chars().last().is_some_and(is_spaceless_script_char)
                    {
                        text.push(' ');
                    }
                    let advance = -adjustment / 1000.0 * ts.font_size * ts.horizontal_scaling;
                    *tm = Matrix::translate(advance, 0.0).then(tm);
                }
                _ => {}
            }
        }

        let text = normalize_run_text(&text);
        if text.trim().is_empty() {
            return None;
        }

        let render_start = start.then(&gs.ctm);
        let render_end = tm.then(&gs.ctm);
        let (x, baseline) = render_start.apply(0.0, ts.rise);
        let (x_end, _) = render_end.apply(0.0, ts.rise);
        let size = ts.font_size * render_start.vertical_scale();
        let font_name = font
            .map(|f| f.base_name.clone())
            .unwrap_or_else(|| String::from_utf8_lossy(&ts.font_key).to_string());

        Some(
            TextRun::new(text, x, baseline, size, font_name)
                .with_width(x_end - x)
                .with_color(gs.fill)
                .with_page(self.page_number),
        )
    }

    fn decode(&self, font: Option<&FontInfo<'a>>, bytes: &[u8]) -> String {
        let encoding = font.and_then(|f| f.dict.get_font_encoding(self.doc).ok());
        match encoding {
            Some(ref enc) => LopdfDocument::decode_text(enc, bytes)
                .unwrap_or_else(|_| decode_text_simple(bytes)),
            None => decode_text_simple(bytes),
        }
    }

    fn paint_xobject(&self, name: &[u8], ctm: &Matrix) -> Option<PlacedImage> {
        if !self.extract_images {
            return None;
        }
        let stream = self
            .xobjects
            .and_then(|x| x.get(name).ok())
            .and_then(|o| match resolve(self.doc, o) {
                Object::Stream(s) => Some(s),
                _ => None,
            })?;

        let subtype = stream.dict.get(b"Subtype").and_then(Object::as_name).ok();
        if subtype != Some(b"Image".as_slice()) {
            log::debug!(
                "page {}: skipping non-image XObject /{}",
                self.page_number,
                String::from_utf8_lossy(name)
            );
            return None;
        }

        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)].map(|(x, y)| ctm.apply(x, y));
        let xs = corners.iter().map(|c| c.0);
        let ys = corners.iter().map(|c| c.1);
        let bbox = BoundingBox {
            x0: xs.clone().fold(f32::INFINITY, f32::min),
            y0: ys.clone().fold(f32::INFINITY, f32::min),
            x1: xs.fold(f32::NEG_INFINITY, f32::max),
            y1: ys.fold(f32::NEG_INFINITY, f32::max),
        };

        Some(PlacedImage {
            bbox,
            image: read_image(self.doc, stream),
        })
    }
}

/// Decode an image XObject stream.
fn read_image(doc: &LopdfDocument, stream: &Stream) -> Result<RawImage> {
    let dict = &stream.dict;
    let int = |key: &[u8]| dict.get(key).ok().and_then(|o| resolve(doc, o).as_i64().ok());

    let width = int(b"Width").filter(|w| *w > 0).ok_or_else(|| {
        Error::ImageExtract("image has no valid /Width".to_string())
    })? as u32;
    let height = int(b"Height").filter(|h| *h > 0).ok_or_else(|| {
        Error::ImageExtract("image has no valid /Height".to_string())
    })? as u32;
    let bits_per_component = int(b"BitsPerComponent").unwrap_or(8).clamp(1, 16) as u8;
    let components = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|cs| color_space_components(doc, cs));

    let filters: Vec<Vec<u8>> = match dict.get(b"Filter").map(|f| resolve(doc, f)) {
        Ok(Object::Name(n)) => vec![n.clone()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| o.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    };

    let (encoding, data) = match filters.last().map(Vec::as_slice) {
        Some(b"DCTDecode") if filters.len() == 1 => (ImageEncoding::Jpeg, stream.content.clone()),
        Some(b"JPXDecode") if filters.len() == 1 => {
            (ImageEncoding::Jpeg2000, stream.content.clone())
        }
        Some(b"DCTDecode") | Some(b"JPXDecode") => {
            return Err(Error::ImageExtract(
                "chained image filters are not supported".to_string(),
            ))
        }
        Some(_) => (
            ImageEncoding::Raw,
            stream
                .decompressed_content()
                .map_err(|e| Error::ImageExtract(e.to_string()))?,
        ),
        None => (ImageEncoding::Raw, stream.content.clone()),
    };

    Ok(RawImage {
        data,
        encoding,
        width,
        height,
        bits_per_component,
        components,
    })
}

fn color_space_components(doc: &LopdfDocument, cs: &Object) -> Option<u8> {
    match resolve(doc, cs) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Some(1),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Some(3),
            b"DeviceCMYK" | b"CMYK" => Some(4),
            _ => None,
        },
        Object::Array(arr) => {
            let family = arr.first()?.as_name().ok()?;
            match family {
                b"ICCBased" => match resolve(doc, arr.get(1)?) {
                    Object::Stream(s) => s
                        .dict
                        .get(b"N")
                        .ok()
                        .and_then(|n| n.as_i64().ok())
                        .map(|n| n as u8),
                    _ => None,
                },
                b"CalGray" => Some(1),
                b"CalRGB" => Some(3),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Horizontal displacement, in text space, of showing `bytes`.
fn string_advance(metrics: Option<&FontMetrics>, bytes: &[u8], ts: &TextState) -> f32 {
    let codes = match metrics {
        Some(m) => m.codes(bytes),
        None => bytes.iter().map(|b| *b as u32).collect(),
    };
    let single_byte = metrics.map_or(true, |m| !m.two_byte);

    codes
        .iter()
        .map(|&code| {
            let w0 = metrics.map_or(AVG_CHAR_WIDTH_RATIO * 1000.0, |m| m.glyph_width(code));
            let word = if single_byte && code == 32 {
                ts.word_spacing
            } else {
                0.0
            };
            (w0 / 1000.0 * ts.font_size + ts.char_spacing + word) * ts.horizontal_scaling
        })
        .sum()
}

/// Concatenated, decompressed content streams of a page.
pub(crate) fn page_content_bytes(doc: &LopdfDocument, page_id: ObjectId) -> Result<Vec<u8>> {
    let page_dict = doc.get_dictionary(page_id)?;
    let contents = match page_dict.get(b"Contents") {
        Ok(contents) => contents,
        // A page without content is blank, not broken.
        Err(_) => return Ok(Vec::new()),
    };

    match resolve(doc, contents) {
        Object::Stream(s) => stream_bytes(s),
        Object::Array(arr) => {
            let mut content = Vec::new();
            for obj in arr {
                if let Object::Stream(s) = resolve(doc, obj) {
                    content.extend_from_slice(&stream_bytes(s)?);
                    content.push(b'\n');
                }
            }
            Ok(content)
        }
        _ => Err(Error::PdfParse("invalid /Contents entry".to_string())),
    }
}

fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_err() {
        return Ok(stream.content.clone());
    }
    stream
        .decompressed_content()
        .map_err(|e| Error::PdfParse(e.to_string()))
}

/// The page's resource dictionary, inherited from ancestors when absent.
fn page_resources(doc: &LopdfDocument, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    // Bounded walk; malformed files can contain /Parent cycles.
    for _ in 0..32 {
        if let Some(res) = node.get(b"Resources").ok().and_then(|o| resolve_dict(doc, o)) {
            return Some(res);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn resolve_dict<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj) {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

fn resolve_array<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Vec<Object>> {
    match resolve(doc, obj) {
        Object::Array(arr) => Some(arr),
        _ => None,
    }
}

fn matrix_operands(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = [0.0f32; 6];
    for (slot, obj) in m.iter_mut().zip(operands) {
        *slot = get_number(obj)?;
    }
    Some(Matrix(m))
}

fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Scripts that are written without spaces between words.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;
    (0x4E00..=0x9FFF).contains(&code)
        || (0x3400..=0x4DBF).contains(&code)
        || (0x20000..=0x2EBEF).contains(&code)
        || (0x3040..=0x30FF).contains(&code)
        || (0x3000..=0x303F).contains(&code)
}

/// Decoding used when a font has no usable encoding.
fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let utf16: Vec<u16> = body
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
