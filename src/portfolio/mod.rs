//! Portfolio document rendering: statistics, layout and output framing.

pub mod code;
pub mod layout;
pub mod pdf;
pub mod sink;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::achievements::{self, Achievement, AchievementCategory};
use crate::error::RecordError;
use crate::students::{self, Student};
use code::{CodeImageError, CodeImageGenerator, CodeImageOptions};
use layout::{FooterContent, PortfolioLayout, TimelineRow};
use pdf::Document;
use sink::{portfolio_file_name, DocumentHeaders, DocumentSink};

const WRITE_CHUNK_BYTES: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("student not found")]
    StudentNotFound,
    #[error("code image generation failed: {0}")]
    CodeGeneration(#[from] CodeImageError),
    #[error("failed to write document: {0}")]
    Output(#[source] std::io::Error),
    #[error(transparent)]
    Store(#[from] RecordError),
}

impl PortfolioError {
    pub fn code(&self) -> &'static str {
        match self {
            PortfolioError::StudentNotFound => "not_found",
            PortfolioError::CodeGeneration(_) => "code_generation_failed",
            PortfolioError::Output(_) => "output_failed",
            PortfolioError::Store(e) => e.code(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: AchievementCategory,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioStats {
    pub total_activities: usize,
    /// Same as `total_activities`: only verified records reach the renderer.
    pub verified_activities: usize,
    pub total_points: i64,
    /// Known categories only, in taxonomy order.
    pub category_counts: Vec<CategoryCount>,
}

pub fn compute_stats(achievements: &[Achievement]) -> PortfolioStats {
    let category_counts = AchievementCategory::ALL
        .into_iter()
        .filter_map(|category| {
            let count = achievements
                .iter()
                .filter(|a| a.category == Some(category))
                .count();
            (count > 0).then_some(CategoryCount { category, count })
        })
        .collect();
    PortfolioStats {
        total_activities: achievements.len(),
        verified_activities: achievements.len(),
        total_points: achievements.iter().map(|a| a.points).sum(),
        category_counts,
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub layout: PortfolioLayout,
    pub profile_base_url: String,
    pub code_options: CodeImageOptions,
    pub generated_at: DateTime<Utc>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            layout: PortfolioLayout::default(),
            profile_base_url: "http://localhost:3000".to_string(),
            code_options: CodeImageOptions::default(),
            generated_at: Utc::now(),
        }
    }
}

pub fn profile_url(base_url: &str, student_id: &str) -> String {
    format!("{}/profile/{}", base_url.trim().trim_end_matches('/'), student_id)
}

/// A fully laid-out portfolio, not yet serialized.
#[derive(Debug, Clone)]
pub struct LaidOutPortfolio {
    pub document: Document,
    pub stats: PortfolioStats,
    pub rows: Vec<TimelineRow>,
}

/// Runs the layout pipeline. `achievements` must already be the verified
/// records, newest first.
pub fn layout_portfolio(
    student: &Student,
    achievements: &[Achievement],
    options: &RenderOptions,
    generator: &dyn CodeImageGenerator,
) -> Result<LaidOutPortfolio, CodeImageError> {
    let layout = &options.layout;
    let stats = compute_stats(achievements);
    let rows = layout::timeline_rows(achievements, layout);
    let url = profile_url(&options.profile_base_url, &student.id);

    let mut doc = layout.new_document();
    let cursor = doc.start();
    let cursor = layout::header_stage(&mut doc, layout, cursor, student);
    let cursor = layout::summary_stage(&mut doc, layout, cursor, &stats);
    let cursor = if rows.is_empty() {
        layout::empty_state_stage(&mut doc, layout, cursor)
    } else {
        layout::timeline_stage(&mut doc, layout, cursor, &rows)
    };
    let footer = FooterContent {
        profile_url: &url,
        code_options: &options.code_options,
        generated_at: options.generated_at,
    };
    layout::footer_stage(&mut doc, layout, cursor, &footer, generator)?;
    layout::watermark_pages(&mut doc, layout);

    Ok(LaidOutPortfolio {
        document: doc,
        stats,
        rows,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderReport {
    pub content_type: String,
    pub content_disposition: String,
    pub file_name: String,
    pub bytes: usize,
    pub sha256: String,
    pub page_count: usize,
    pub row_count: usize,
    pub stats: PortfolioStats,
}

fn deliver(
    sink: &mut dyn DocumentSink,
    headers: &DocumentHeaders,
    bytes: &[u8],
) -> std::io::Result<()> {
    sink.begin(headers)?;
    for chunk in bytes.chunks(WRITE_CHUNK_BYTES) {
        sink.write_body(chunk)?;
    }
    sink.finish()
}

/// Lays out and serializes the whole document before the sink sees any of
/// it, so a generator failure leaves the sink untouched.
pub fn render_portfolio(
    student: &Student,
    achievements: &[Achievement],
    options: &RenderOptions,
    generator: &dyn CodeImageGenerator,
    sink: &mut dyn DocumentSink,
) -> Result<RenderReport, PortfolioError> {
    let laid_out = match layout_portfolio(student, achievements, options, generator) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(student_id = %student.id, error = %e, "portfolio code image failed");
            return Err(PortfolioError::CodeGeneration(e));
        }
    };
    let bytes = laid_out.document.to_pdf_bytes();
    let headers = DocumentHeaders::pdf_attachment(portfolio_file_name(&student.name));

    if let Err(e) = deliver(sink, &headers, &bytes) {
        sink.abort(&e.to_string());
        return Err(PortfolioError::Output(e));
    }

    let report = RenderReport {
        content_type: headers.content_type,
        content_disposition: headers.content_disposition,
        file_name: headers.file_name,
        bytes: bytes.len(),
        sha256: format!("{:x}", Sha256::digest(&bytes)),
        page_count: laid_out.document.page_count(),
        row_count: laid_out.rows.len(),
        stats: laid_out.stats,
    };
    tracing::info!(
        student_id = %student.id,
        pages = report.page_count,
        rows = report.row_count,
        bytes = report.bytes,
        "portfolio rendered"
    );
    Ok(report)
}

/// Resolves the student and their verified achievements, then renders.
pub fn render_student_portfolio(
    conn: &Connection,
    student_id: &str,
    options: &RenderOptions,
    generator: &dyn CodeImageGenerator,
    sink: &mut dyn DocumentSink,
) -> Result<RenderReport, PortfolioError> {
    let Some(student) = students::get_student(conn, student_id)? else {
        return Err(PortfolioError::StudentNotFound);
    };
    let verified = achievements::verified_for_student(conn, student_id)?;
    render_portfolio(&student, &verified, options, generator, sink)
}
