use crate::error::RecordError;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AchievementCategory {
    Academic,
    Technical,
    Sports,
    Cultural,
    Leadership,
    #[serde(rename = "Community Service")]
    CommunityService,
    Internship,
    Project,
    Certification,
    Certificate,
}

impl AchievementCategory {
    pub const ALL: [AchievementCategory; 10] = [
        AchievementCategory::Academic,
        AchievementCategory::Technical,
        AchievementCategory::Sports,
        AchievementCategory::Cultural,
        AchievementCategory::Leadership,
        AchievementCategory::CommunityService,
        AchievementCategory::Internship,
        AchievementCategory::Project,
        AchievementCategory::Certification,
        AchievementCategory::Certificate,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AchievementCategory::Academic => "Academic",
            AchievementCategory::Technical => "Technical",
            AchievementCategory::Sports => "Sports",
            AchievementCategory::Cultural => "Cultural",
            AchievementCategory::Leadership => "Leadership",
            AchievementCategory::CommunityService => "Community Service",
            AchievementCategory::Internship => "Internship",
            AchievementCategory::Project => "Project",
            AchievementCategory::Certification => "Certification",
            AchievementCategory::Certificate => "Certificate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AchievementStatus {
    Pending,
    Verified,
    Rejected,
}

impl AchievementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AchievementStatus::Pending => "Pending",
            AchievementStatus::Verified => "Verified",
            AchievementStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Pending" | "pending" => Some(AchievementStatus::Pending),
            "Verified" | "verified" => Some(AchievementStatus::Verified),
            "Rejected" | "rejected" => Some(AchievementStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub student_id: String,
    pub title: String,
    pub description: Option<String>,
    /// `None` when the stored label is not one of the known categories.
    pub category: Option<AchievementCategory>,
    pub points: i64,
    pub status: AchievementStatus,
    pub review_remarks: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAchievement {
    pub student_id: String,
    pub title: String,
    pub category: AchievementCategory,
    pub points: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub status: AchievementStatus,
    pub points: Option<i64>,
    pub remarks: Option<String>,
}

fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

const SELECT_COLUMNS: &str = "SELECT id, student_id, title, description, category, points, status,
        review_remarks, reviewed_at, created_at
 FROM achievements";

fn map_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Achievement> {
    let category: String = r.get(4)?;
    let status: String = r.get(6)?;
    let reviewed_at: Option<String> = r.get(8)?;
    let created_at: String = r.get(9)?;
    Ok(Achievement {
        id: r.get(0)?,
        student_id: r.get(1)?,
        title: r.get(2)?,
        description: r.get(3)?,
        category: AchievementCategory::parse(&category),
        points: r.get(5)?,
        status: AchievementStatus::parse(&status).unwrap_or(AchievementStatus::Pending),
        review_remarks: r.get(7)?,
        reviewed_at: reviewed_at.as_deref().and_then(parse_ts),
        created_at: parse_ts(&created_at).unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
    })
}

fn validate_points(points: i64) -> Result<(), RecordError> {
    if points < 0 {
        return Err(RecordError::validation_with(
            "points must be >= 0",
            serde_json::json!({ "points": points }),
        ));
    }
    Ok(())
}

pub fn create_achievement(
    conn: &Connection,
    input: &NewAchievement,
    created_at: DateTime<Utc>,
) -> Result<Achievement, RecordError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(RecordError::validation("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(RecordError::validation(format!(
            "title must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }
    if input
        .description
        .as_deref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_CHARS)
    {
        return Err(RecordError::validation(format!(
            "description must be at most {} characters",
            MAX_DESCRIPTION_CHARS
        )));
    }
    validate_points(input.points)?;

    let student: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM students WHERE id = ?",
            [&input.student_id],
            |r| r.get(0),
        )
        .optional()?;
    if student.is_none() {
        return Err(RecordError::NotFound("student"));
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO achievements(id, student_id, title, description, category, points, status, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &input.student_id,
            title,
            &input.description,
            input.category.label(),
            input.points,
            AchievementStatus::Pending.as_str(),
            created_at.to_rfc3339(),
        ),
    )?;
    tracing::info!(achievement_id = %id, student_id = %input.student_id, "achievement submitted");

    Ok(Achievement {
        id,
        student_id: input.student_id.clone(),
        title: title.to_string(),
        description: input.description.clone(),
        category: Some(input.category),
        points: input.points,
        status: AchievementStatus::Pending,
        review_remarks: None,
        reviewed_at: None,
        created_at,
    })
}

pub fn get_achievement(conn: &Connection, id: &str) -> Result<Option<Achievement>, RecordError> {
    let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
    Ok(conn.query_row(&sql, [id], map_row).optional()?)
}

/// Moves a record to Verified or Rejected. A record can be re-reviewed.
pub fn review_achievement(
    conn: &Connection,
    id: &str,
    review: &Review,
) -> Result<Achievement, RecordError> {
    if review.status == AchievementStatus::Pending {
        return Err(RecordError::validation(
            "status must be Verified or Rejected",
        ));
    }
    if let Some(p) = review.points {
        validate_points(p)?;
    }

    let reviewed_at = Utc::now();
    let n = conn.execute(
        "UPDATE achievements
         SET status = ?, points = COALESCE(?, points), review_remarks = ?, reviewed_at = ?
         WHERE id = ?",
        (
            review.status.as_str(),
            review.points,
            &review.remarks,
            reviewed_at.to_rfc3339(),
            id,
        ),
    )?;
    if n == 0 {
        return Err(RecordError::NotFound("achievement"));
    }
    tracing::info!(achievement_id = id, status = review.status.as_str(), "achievement reviewed");

    get_achievement(conn, id)?.ok_or(RecordError::NotFound("achievement"))
}

/// Newest first.
pub fn list_achievements(
    conn: &Connection,
    student_id: &str,
    status: Option<AchievementStatus>,
) -> Result<Vec<Achievement>, RecordError> {
    let sql = format!(
        "{} WHERE student_id = ?1 AND (?2 IS NULL OR status = ?2)
         ORDER BY created_at DESC, id",
        SELECT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((student_id, status.map(|s| s.as_str())), map_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn verified_for_student(
    conn: &Connection,
    student_id: &str,
) -> Result<Vec<Achievement>, RecordError> {
    list_achievements(conn, student_id, Some(AchievementStatus::Verified))
}
