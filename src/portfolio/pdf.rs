//! Minimal PDF 1.4 writer. Points, origin top-left, y grows downwards.

use std::fmt::Write as _;
use std::io::{self, Write};

use super::code::RasterImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: Rgb = Rgb(0x00, 0x00, 0x00);

    pub fn parse_hex(s: &str) -> Option<Rgb> {
        let hex = s.trim().strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Rgb(r, g, b))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    fn operands(self) -> String {
        format!(
            "{} {} {}",
            num(self.0 as f64 / 255.0),
            num(self.1 as f64 / 255.0),
            num(self.2 as f64 / 255.0)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
    },
    Text {
        x: f64,
        y: f64,
        size: f64,
        font: Font,
        color: Rgb,
        text: String,
    },
    Image {
        image: usize,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    },
    /// Text centered on (cx, cy), rotated counter-clockwise by `angle_deg`.
    Watermark {
        cx: f64,
        cy: f64,
        size: f64,
        angle_deg: f64,
        opacity: f64,
        color: Rgb,
        text: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutCursor {
    pub page: usize,
    pub y: f64,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub width: f64,
    pub height: f64,
    top_margin: f64,
    bottom_margin: f64,
    pages: Vec<Page>,
    images: Vec<RasterImage>,
}

const ASCENT: f64 = 0.75;

impl Document {
    pub fn new(width: f64, height: f64, top_margin: f64, bottom_margin: f64) -> Self {
        Self {
            width,
            height,
            top_margin,
            bottom_margin,
            pages: vec![Page::default()],
            images: Vec::new(),
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn images(&self) -> &[RasterImage] {
        &self.images
    }

    pub fn start(&self) -> LayoutCursor {
        LayoutCursor {
            page: self.pages.len() - 1,
            y: 0.0,
        }
    }

    pub fn add_page(&mut self) -> LayoutCursor {
        self.pages.push(Page::default());
        LayoutCursor {
            page: self.pages.len() - 1,
            y: self.top_margin,
        }
    }

    /// `cursor` if a band of height `h` fits, else the top of a new page.
    pub fn reserve(&mut self, cursor: LayoutCursor, h: f64) -> LayoutCursor {
        if cursor.y + h > self.height - self.bottom_margin && cursor.y > self.top_margin {
            self.add_page()
        } else {
            cursor
        }
    }

    pub fn draw_on(&mut self, page: usize, op: DrawOp) {
        if let Some(p) = self.pages.get_mut(page) {
            p.ops.push(op);
        }
    }

    pub fn add_image(&mut self, image: RasterImage) -> usize {
        self.images.push(image);
        self.images.len() - 1
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().flat_map(|p| p.ops.iter()).filter_map(|op| match op {
            DrawOp::Text { text, .. } | DrawOp::Watermark { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn to_pdf_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        let _ = self.write_pdf(&mut buf);
        buf
    }

    pub fn write_pdf<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let opacities = self.opacities();

        let catalog_id = 1;
        let pages_id = 2;
        let font_regular_id = 3;
        let font_bold_id = 4;
        let resources_id = 5;
        let first_gs_id = 6;
        let first_image_id = first_gs_id + opacities.len();
        let first_page_id = first_image_id + self.images.len();
        let page_ids: Vec<usize> = (0..self.pages.len())
            .map(|i| first_page_id + 2 * i)
            .collect();
        let object_count = first_page_id + 2 * self.pages.len() - 1;

        let mut w = PdfWriter::new();
        w.raw(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        w.object(
            catalog_id,
            format!("<< /Type /Catalog /Pages {} 0 R >>", pages_id).as_bytes(),
        );
        let kids = page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        w.object(
            pages_id,
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} /MediaBox [0 0 {} {}] >>",
                kids,
                self.pages.len(),
                num(self.width),
                num(self.height)
            )
            .as_bytes(),
        );
        w.object(
            font_regular_id,
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
        );
        w.object(
            font_bold_id,
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>",
        );

        let mut resources = format!(
            "<< /Font << /F1 {} 0 R /F2 {} 0 R >>",
            font_regular_id, font_bold_id
        );
        if !opacities.is_empty() {
            resources.push_str(" /ExtGState <<");
            for i in 0..opacities.len() {
                let _ = write!(resources, " /GS{} {} 0 R", i, first_gs_id + i);
            }
            resources.push_str(" >>");
        }
        if !self.images.is_empty() {
            resources.push_str(" /XObject <<");
            for i in 0..self.images.len() {
                let _ = write!(resources, " /Im{} {} 0 R", i, first_image_id + i);
            }
            resources.push_str(" >>");
        }
        resources.push_str(" >>");
        w.object(resources_id, resources.as_bytes());

        for (i, opacity) in opacities.iter().enumerate() {
            w.object(
                first_gs_id + i,
                format!(
                    "<< /Type /ExtGState /ca {} /CA {} >>",
                    num(*opacity),
                    num(*opacity)
                )
                .as_bytes(),
            );
        }

        for (i, image) in self.images.iter().enumerate() {
            let dict = format!(
                "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8 /Length {} >>",
                image.width,
                image.height,
                image.rgb.len()
            );
            w.stream_object(first_image_id + i, &dict, &image.rgb);
        }

        for (i, page) in self.pages.iter().enumerate() {
            let page_id = page_ids[i];
            let content_id = page_id + 1;
            w.object(
                page_id,
                format!(
                    "<< /Type /Page /Parent {} 0 R /Resources {} 0 R /Contents {} 0 R >>",
                    pages_id, resources_id, content_id
                )
                .as_bytes(),
            );
            let content = self.content_stream(page, &opacities);
            let dict = format!("<< /Length {} >>", content.len());
            w.stream_object(content_id, &dict, &content);
        }

        w.finish(object_count, catalog_id);
        out.write_all(&w.buf)
    }

    fn opacities(&self) -> Vec<f64> {
        let mut out: Vec<f64> = Vec::new();
        for op in self.pages.iter().flat_map(|p| p.ops.iter()) {
            if let DrawOp::Watermark { opacity, .. } = op {
                if !out.iter().any(|o| (o - opacity).abs() < 1e-9) {
                    out.push(*opacity);
                }
            }
        }
        out
    }

    fn content_stream(&self, page: &Page, opacities: &[f64]) -> Vec<u8> {
        let mut s: Vec<u8> = Vec::new();
        for op in &page.ops {
            match op {
                DrawOp::Rect {
                    x,
                    y,
                    w,
                    h,
                    fill,
                    stroke,
                } => {
                    let paint = match (fill, stroke) {
                        (Some(_), Some(_)) => "B",
                        (Some(_), None) => "f",
                        (None, Some(_)) => "S",
                        (None, None) => continue,
                    };
                    let mut line = String::from("q ");
                    if let Some(c) = fill {
                        let _ = write!(line, "{} rg ", c.operands());
                    }
                    if let Some(c) = stroke {
                        let _ = write!(line, "{} RG 0.75 w ", c.operands());
                    }
                    let _ = writeln!(
                        line,
                        "{} {} {} {} re {} Q",
                        num(*x),
                        num(self.height - y - h),
                        num(*w),
                        num(*h),
                        paint
                    );
                    s.extend_from_slice(line.as_bytes());
                }
                DrawOp::Text {
                    x,
                    y,
                    size,
                    font,
                    color,
                    text,
                } => {
                    let baseline = self.height - y - size * ASCENT;
                    s.extend_from_slice(
                        format!(
                            "BT /{} {} Tf {} rg {} {} Td ",
                            font.resource(),
                            num(*size),
                            color.operands(),
                            num(*x),
                            num(baseline)
                        )
                        .as_bytes(),
                    );
                    s.extend_from_slice(&encode_text(text));
                    s.extend_from_slice(b" Tj ET\n");
                }
                DrawOp::Image { image, x, y, w, h } => {
                    s.extend_from_slice(
                        format!(
                            "q {} 0 0 {} {} {} cm /Im{} Do Q\n",
                            num(*w),
                            num(*h),
                            num(*x),
                            num(self.height - y - h),
                            image
                        )
                        .as_bytes(),
                    );
                }
                DrawOp::Watermark {
                    cx,
                    cy,
                    size,
                    angle_deg,
                    opacity,
                    color,
                    text,
                } => {
                    let gs = opacities
                        .iter()
                        .position(|o| (o - opacity).abs() < 1e-9)
                        .unwrap_or(0);
                    let (sin, cos) = angle_deg.to_radians().sin_cos();
                    let width = text_width(text, *size, Font::Bold);
                    s.extend_from_slice(
                        format!(
                            "q /GS{} gs 1 0 0 1 {} {} cm {} {} {} {} 0 0 cm BT /F2 {} Tf {} rg {} {} Td ",
                            gs,
                            num(*cx),
                            num(self.height - cy),
                            num(cos),
                            num(sin),
                            num(-sin),
                            num(cos),
                            num(*size),
                            color.operands(),
                            num(-width / 2.0),
                            num(-size * 0.35)
                        )
                        .as_bytes(),
                    );
                    s.extend_from_slice(&encode_text(text));
                    s.extend_from_slice(b" Tj ET Q\n");
                }
            }
        }
        s
    }
}

struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<(usize, usize)>,
}

impl PdfWriter {
    fn new() -> Self {
        Self {
            buf: Vec::new(),
            offsets: Vec::new(),
        }
    }

    fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn object(&mut self, id: usize, body: &[u8]) {
        self.offsets.push((id, self.buf.len()));
        self.raw(format!("{} 0 obj\n", id).as_bytes());
        self.raw(body);
        self.raw(b"\nendobj\n");
    }

    fn stream_object(&mut self, id: usize, dict: &str, data: &[u8]) {
        self.offsets.push((id, self.buf.len()));
        self.raw(format!("{} 0 obj\n{}\nstream\n", id, dict).as_bytes());
        self.raw(data);
        self.raw(b"\nendstream\nendobj\n");
    }

    fn finish(&mut self, object_count: usize, root_id: usize) {
        let mut offsets = vec![0_usize; object_count + 1];
        for (id, off) in &self.offsets {
            if *id <= object_count {
                offsets[*id] = *off;
            }
        }
        let xref_at = self.buf.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", object_count + 1);
        for off in offsets.iter().skip(1) {
            let _ = write!(xref, "{:010} 00000 n \n", off);
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            object_count + 1,
            root_id,
            xref_at
        );
        self.raw(xref.as_bytes());
    }
}

pub fn num(v: f64) -> String {
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn win_ansi_byte(c: char) -> u8 {
    match c {
        ' '..='~' => c as u8,
        '\n' | '\r' | '\t' => b' ',
        '€' => 0x80,
        '…' => 0x85,
        '•' => 0x95,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '–' => 0x96,
        '—' => 0x97,
        '\u{A0}'..='\u{FF}' => c as u32 as u8,
        _ => b'?',
    }
}

/// WinAnsi literal string; bytes outside printable ASCII are octal-escaped.
pub fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 2);
    out.push(b'(');
    for c in text.chars() {
        let b = win_ansi_byte(c);
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            0x20..=0x7E => out.push(b),
            _ => out.extend_from_slice(format!("\\{:03o}", b).as_bytes()),
        }
    }
    out.push(b')');
    out
}

// Standard Type1 advance widths (1/1000 em) for printable ASCII 0x20..=0x7E.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722, 722, 667,
    611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667,
    667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500,
    222, 833, 556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, 975, 722, 722, 722, 722, 667,
    611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667,
    667, 611, 333, 278, 333, 584, 556, 333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556,
    278, 889, 611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

pub fn text_width(text: &str, size: f64, font: Font) -> f64 {
    let table = match font {
        Font::Regular => &HELVETICA_WIDTHS,
        Font::Bold => &HELVETICA_BOLD_WIDTHS,
    };
    let units: u32 = text
        .chars()
        .map(|c| match c {
            ' '..='~' => table[(c as usize) - 0x20] as u32,
            _ => 556,
        })
        .sum();
    units as f64 * size / 1000.0
}
