//! Portfolio bands. Each stage takes a cursor and returns where the next starts.

use chrono::{DateTime, Datelike, Utc};

use super::code::{CodeImageError, CodeImageGenerator, CodeImageOptions};
use super::pdf::{Document, DrawOp, Font, LayoutCursor, Rgb};
use super::PortfolioStats;
use crate::achievements::Achievement;
use crate::students::Student;

pub const DOCUMENT_TITLE: &str = "Student Activity Portfolio";
pub const DOCUMENT_SUBTITLE: &str = "Verified record of co-curricular and academic achievements";
pub const EMPTY_STATE_NOTICE: &str = "No verified achievements to display yet.";
pub const WATERMARK_TEXT: &str = "VERIFIED";
pub const TIMELINE_COLUMNS: [&str; 5] = ["Title", "Category", "Date", "Points", "Status"];
pub const CARD_LABELS: [&str; 4] = [
    "Total Activities",
    "Verified Activities",
    "Total Points",
    "Categories",
];

/// Geometry, type sizes and colors for the portfolio. Values are points.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioLayout {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,

    pub title_bar_height: f64,
    pub info_box_height: f64,
    pub section_gap: f64,
    pub section_title_height: f64,
    pub card_width: f64,
    pub card_height: f64,
    pub card_gap: f64,
    pub row_height: f64,
    pub footer_height: f64,
    pub code_display_size: f64,
    pub column_fractions: [f64; 5],

    pub title_size: f64,
    pub subtitle_size: f64,
    pub section_title_size: f64,
    pub body_size: f64,
    pub table_size: f64,
    pub small_size: f64,
    pub card_label_size: f64,
    pub card_value_size: f64,
    pub watermark_size: f64,

    pub primary: Rgb,
    pub text: Rgb,
    pub muted_text: Rgb,
    pub info_fill: Rgb,
    pub border: Rgb,
    pub card_colors: [Rgb; 4],
    pub table_header_fill: Rgb,
    pub shaded_row_fill: Rgb,
    pub verified_text: Rgb,
    pub watermark_color: Rgb,
    pub watermark_opacity: f64,
    pub watermark_angle_deg: f64,

    pub title_max_chars: usize,
}

impl Default for PortfolioLayout {
    fn default() -> Self {
        Self {
            // A4
            page_width: 595.28,
            page_height: 841.89,
            margin: 50.0,

            title_bar_height: 90.0,
            info_box_height: 80.0,
            section_gap: 20.0,
            section_title_height: 24.0,
            card_width: 116.0,
            card_height: 70.0,
            card_gap: 10.0,
            row_height: 22.0,
            footer_height: 120.0,
            code_display_size: 80.0,
            column_fractions: [0.38, 0.2, 0.16, 0.11, 0.15],

            title_size: 24.0,
            subtitle_size: 11.0,
            section_title_size: 14.0,
            body_size: 10.0,
            table_size: 9.0,
            small_size: 8.0,
            card_label_size: 9.0,
            card_value_size: 22.0,
            watermark_size: 90.0,

            primary: Rgb(0x1E, 0x3A, 0x8A),
            text: Rgb(0x1F, 0x29, 0x37),
            muted_text: Rgb(0x6B, 0x72, 0x80),
            info_fill: Rgb(0xF3, 0xF4, 0xF6),
            border: Rgb(0xD1, 0xD5, 0xDB),
            card_colors: [
                Rgb(0x25, 0x63, 0xEB),
                Rgb(0x05, 0x96, 0x69),
                Rgb(0xD9, 0x77, 0x06),
                Rgb(0x7C, 0x3A, 0xED),
            ],
            table_header_fill: Rgb(0x1E, 0x3A, 0x8A),
            shaded_row_fill: Rgb(0xEF, 0xF6, 0xFF),
            verified_text: Rgb(0x04, 0x78, 0x57),
            watermark_color: Rgb(0x9C, 0xA3, 0xAF),
            watermark_opacity: 0.08,
            watermark_angle_deg: 45.0,

            title_max_chars: 25,
        }
    }
}

impl PortfolioLayout {
    pub fn content_width(&self) -> f64 {
        self.page_width - 2.0 * self.margin
    }

    pub fn new_document(&self) -> Document {
        Document::new(self.page_width, self.page_height, self.margin, self.margin)
    }

    fn column_x(&self) -> [f64; 5] {
        let w = self.content_width();
        let mut xs = [self.margin; 5];
        for i in 1..5 {
            xs[i] = xs[i - 1] + w * self.column_fractions[i - 1];
        }
        xs
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineRow {
    pub index: usize,
    pub shaded: bool,
    pub title: String,
    pub category: String,
    pub date: String,
    pub points: String,
    pub status: &'static str,
}

pub fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        return title.to_string();
    }
    let mut out: String = title.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

pub fn short_date(ts: &DateTime<Utc>) -> String {
    format!("{}/{}/{}", ts.month(), ts.day(), ts.year())
}

pub fn generated_stamp(ts: &DateTime<Utc>) -> String {
    format!(
        "Generated on {} at {} UTC",
        short_date(ts),
        ts.format("%-I:%M:%S %p")
    )
}

pub fn timeline_rows(achievements: &[Achievement], layout: &PortfolioLayout) -> Vec<TimelineRow> {
    achievements
        .iter()
        .enumerate()
        .map(|(index, a)| TimelineRow {
            index,
            shaded: index % 2 == 0,
            title: truncate_title(&a.title, layout.title_max_chars),
            category: a.category.map(|c| c.label().to_string()).unwrap_or_default(),
            date: short_date(&a.created_at),
            points: a.points.to_string(),
            status: "Verified",
        })
        .collect()
}

fn text(x: f64, y: f64, size: f64, font: Font, color: Rgb, s: impl Into<String>) -> DrawOp {
    DrawOp::Text {
        x,
        y,
        size,
        font,
        color,
        text: s.into(),
    }
}

fn section_title(
    doc: &mut Document,
    layout: &PortfolioLayout,
    cursor: LayoutCursor,
    title: &str,
) -> LayoutCursor {
    doc.draw_on(
        cursor.page,
        text(
            layout.margin,
            cursor.y,
            layout.section_title_size,
            Font::Bold,
            layout.text,
            title,
        ),
    );
    LayoutCursor {
        y: cursor.y + layout.section_title_height,
        ..cursor
    }
}

pub fn header_stage(
    doc: &mut Document,
    layout: &PortfolioLayout,
    cursor: LayoutCursor,
    student: &Student,
) -> LayoutCursor {
    let page = cursor.page;
    doc.draw_on(
        page,
        DrawOp::Rect {
            x: 0.0,
            y: cursor.y,
            w: layout.page_width,
            h: layout.title_bar_height,
            fill: Some(layout.primary),
            stroke: None,
        },
    );
    doc.draw_on(
        page,
        text(
            layout.margin,
            cursor.y + 24.0,
            layout.title_size,
            Font::Bold,
            Rgb::WHITE,
            DOCUMENT_TITLE,
        ),
    );
    doc.draw_on(
        page,
        text(
            layout.margin,
            cursor.y + 58.0,
            layout.subtitle_size,
            Font::Regular,
            Rgb::WHITE,
            DOCUMENT_SUBTITLE,
        ),
    );

    let box_y = cursor.y + layout.title_bar_height + 15.0;
    doc.draw_on(
        page,
        DrawOp::Rect {
            x: layout.margin,
            y: box_y,
            w: layout.content_width(),
            h: layout.info_box_height,
            fill: Some(layout.info_fill),
            stroke: Some(layout.border),
        },
    );
    let fields = [
        ("Name:", student.name.as_str()),
        ("Student ID:", student.student_code.as_str()),
        ("Department:", student.department.as_deref().unwrap_or("")),
        ("Email:", student.email.as_deref().unwrap_or("")),
    ];
    let line_step = (layout.info_box_height - 16.0) / fields.len() as f64;
    for (i, (label, value)) in fields.iter().enumerate() {
        let y = box_y + 10.0 + i as f64 * line_step;
        doc.draw_on(
            page,
            text(
                layout.margin + 12.0,
                y,
                layout.body_size,
                Font::Bold,
                layout.text,
                *label,
            ),
        );
        doc.draw_on(
            page,
            text(
                layout.margin + 100.0,
                y,
                layout.body_size,
                Font::Regular,
                layout.text,
                *value,
            ),
        );
    }

    LayoutCursor {
        page,
        y: box_y + layout.info_box_height + layout.section_gap,
    }
}

pub fn summary_stage(
    doc: &mut Document,
    layout: &PortfolioLayout,
    cursor: LayoutCursor,
    stats: &PortfolioStats,
) -> LayoutCursor {
    let cursor = doc.reserve(
        cursor,
        layout.section_title_height + layout.card_height,
    );
    let cursor = section_title(doc, layout, cursor, "Summary");
    let values = [
        stats.total_activities,
        stats.verified_activities,
        stats.total_points.max(0) as usize,
        stats.category_counts.len(),
    ];
    for (i, (label, value)) in CARD_LABELS.iter().zip(values).enumerate() {
        let x = layout.margin + i as f64 * (layout.card_width + layout.card_gap);
        doc.draw_on(
            cursor.page,
            DrawOp::Rect {
                x,
                y: cursor.y,
                w: layout.card_width,
                h: layout.card_height,
                fill: Some(layout.card_colors[i]),
                stroke: None,
            },
        );
        doc.draw_on(
            cursor.page,
            text(
                x + 10.0,
                cursor.y + 12.0,
                layout.card_label_size,
                Font::Regular,
                Rgb::WHITE,
                *label,
            ),
        );
        doc.draw_on(
            cursor.page,
            text(
                x + 10.0,
                cursor.y + 32.0,
                layout.card_value_size,
                Font::Bold,
                Rgb::WHITE,
                value.to_string(),
            ),
        );
    }
    LayoutCursor {
        y: cursor.y + layout.card_height + layout.section_gap,
        ..cursor
    }
}

fn table_header(doc: &mut Document, layout: &PortfolioLayout, cursor: LayoutCursor) -> LayoutCursor {
    doc.draw_on(
        cursor.page,
        DrawOp::Rect {
            x: layout.margin,
            y: cursor.y,
            w: layout.content_width(),
            h: layout.row_height,
            fill: Some(layout.table_header_fill),
            stroke: None,
        },
    );
    let pad = (layout.row_height - layout.table_size) / 2.0;
    for (x, label) in layout.column_x().iter().zip(TIMELINE_COLUMNS) {
        doc.draw_on(
            cursor.page,
            text(
                x + 6.0,
                cursor.y + pad,
                layout.table_size,
                Font::Bold,
                Rgb::WHITE,
                label,
            ),
        );
    }
    LayoutCursor {
        y: cursor.y + layout.row_height,
        ..cursor
    }
}

/// Draws the table, repeating the header row on continuation pages.
pub fn timeline_stage(
    doc: &mut Document,
    layout: &PortfolioLayout,
    cursor: LayoutCursor,
    rows: &[TimelineRow],
) -> LayoutCursor {
    let cursor = doc.reserve(
        cursor,
        layout.section_title_height + 2.0 * layout.row_height,
    );
    let cursor = section_title(doc, layout, cursor, "Activity Timeline");
    let mut cursor = table_header(doc, layout, cursor);

    let xs = layout.column_x();
    let pad = (layout.row_height - layout.table_size) / 2.0;
    for row in rows {
        let next = doc.reserve(cursor, layout.row_height);
        cursor = if next.page != cursor.page {
            table_header(doc, layout, next)
        } else {
            next
        };

        doc.draw_on(
            cursor.page,
            DrawOp::Rect {
                x: layout.margin,
                y: cursor.y,
                w: layout.content_width(),
                h: layout.row_height,
                fill: row.shaded.then_some(layout.shaded_row_fill),
                stroke: Some(layout.border),
            },
        );
        let cells: [(&str, Font, Rgb); 5] = [
            (row.title.as_str(), Font::Regular, layout.text),
            (row.category.as_str(), Font::Regular, layout.text),
            (row.date.as_str(), Font::Regular, layout.text),
            (row.points.as_str(), Font::Bold, layout.text),
            (row.status, Font::Bold, layout.verified_text),
        ];
        for (x, (value, font, color)) in xs.iter().zip(cells) {
            if value.is_empty() {
                continue;
            }
            doc.draw_on(
                cursor.page,
                text(x + 6.0, cursor.y + pad, layout.table_size, font, color, value),
            );
        }
        cursor.y += layout.row_height;
    }

    LayoutCursor {
        y: cursor.y + layout.section_gap,
        ..cursor
    }
}

pub fn empty_state_stage(
    doc: &mut Document,
    layout: &PortfolioLayout,
    cursor: LayoutCursor,
) -> LayoutCursor {
    let box_h = 50.0;
    let cursor = doc.reserve(cursor, layout.section_title_height + box_h);
    let cursor = section_title(doc, layout, cursor, "Activity Timeline");
    doc.draw_on(
        cursor.page,
        DrawOp::Rect {
            x: layout.margin,
            y: cursor.y,
            w: layout.content_width(),
            h: box_h,
            fill: Some(layout.info_fill),
            stroke: Some(layout.border),
        },
    );
    doc.draw_on(
        cursor.page,
        text(
            layout.margin + 16.0,
            cursor.y + (box_h - layout.body_size) / 2.0,
            layout.body_size,
            Font::Regular,
            layout.muted_text,
            EMPTY_STATE_NOTICE,
        ),
    );
    LayoutCursor {
        y: cursor.y + box_h + layout.section_gap,
        ..cursor
    }
}

pub struct FooterContent<'a> {
    pub profile_url: &'a str,
    pub code_options: &'a CodeImageOptions,
    pub generated_at: DateTime<Utc>,
}

pub fn footer_stage(
    doc: &mut Document,
    layout: &PortfolioLayout,
    cursor: LayoutCursor,
    content: &FooterContent<'_>,
    generator: &dyn CodeImageGenerator,
) -> Result<LayoutCursor, CodeImageError> {
    let image = generator.generate(content.profile_url, content.code_options)?;

    let cursor = doc.reserve(cursor, layout.footer_height);
    let page = cursor.page;
    doc.draw_on(
        page,
        DrawOp::Rect {
            x: layout.margin,
            y: cursor.y,
            w: layout.content_width(),
            h: 0.75,
            fill: Some(layout.border),
            stroke: None,
        },
    );

    let image_id = doc.add_image(image);
    let code_x = layout.page_width - layout.margin - layout.code_display_size;
    doc.draw_on(
        page,
        DrawOp::Image {
            image: image_id,
            x: code_x,
            y: cursor.y + 12.0,
            w: layout.code_display_size,
            h: layout.code_display_size,
        },
    );

    let lines: [(String, Font, f64, Rgb); 5] = [
        (
            "Student Activity Record System".to_string(),
            Font::Bold,
            layout.body_size,
            layout.text,
        ),
        (
            "Every activity in this portfolio was verified by institution staff.".to_string(),
            Font::Regular,
            layout.small_size,
            layout.muted_text,
        ),
        (
            "Scan the code to view the online profile:".to_string(),
            Font::Regular,
            layout.small_size,
            layout.muted_text,
        ),
        (
            content.profile_url.to_string(),
            Font::Regular,
            layout.small_size,
            layout.primary,
        ),
        (
            generated_stamp(&content.generated_at),
            Font::Regular,
            layout.small_size,
            layout.muted_text,
        ),
    ];
    let mut y = cursor.y + 14.0;
    for (line, font, size, color) in lines {
        doc.draw_on(page, text(layout.margin, y, size, font, color, line));
        y += size + 7.0;
    }

    Ok(LayoutCursor {
        page,
        y: cursor.y + layout.footer_height,
    })
}

pub fn watermark_pages(doc: &mut Document, layout: &PortfolioLayout) {
    for page in 0..doc.page_count() {
        doc.draw_on(
            page,
            DrawOp::Watermark {
                cx: layout.page_width / 2.0,
                cy: layout.page_height / 2.0,
                size: layout.watermark_size,
                angle_deg: layout.watermark_angle_deg,
                opacity: layout.watermark_opacity,
                color: layout.watermark_color,
                text: WATERMARK_TEXT.to_string(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn titles_are_cut_after_the_limit() {
        assert_eq!(truncate_title("Short title", 25), "Short title");
        let exact = "abcdefghijklmnopqrstuvwxy";
        assert_eq!(exact.chars().count(), 25);
        assert_eq!(truncate_title(exact, 25), exact);
        assert_eq!(
            truncate_title("National Level Robotics Championship 2024", 25),
            "National Level Robotics C..."
        );
        assert_eq!(truncate_title("ééééééééééééééééééééééééééé", 25).chars().count(), 28);
    }

    #[test]
    fn dates_use_month_day_year() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(short_date(&ts), "3/5/2024");
        assert_eq!(generated_stamp(&ts), "Generated on 3/5/2024 at 2:07:09 PM UTC");
    }

    #[test]
    fn default_cards_fit_the_content_width() {
        let l = PortfolioLayout::default();
        let cards = 4.0 * l.card_width + 3.0 * l.card_gap;
        assert!(cards <= l.content_width());
        let total: f64 = l.column_fractions.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
