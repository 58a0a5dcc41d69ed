use crate::error::RecordError;
use crate::grading::{self, AcademicFilters, ExamType, MarkEntry};
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

/// Fully validated input for a mark write.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkInput {
    pub student_id: String,
    pub subject_id: String,
    pub marks_obtained: f64,
    pub max_marks: f64,
    pub exam_type: ExamType,
    pub semester: i64,
    pub academic_year: String,
    pub entered_by: Option<String>,
    pub remarks: Option<String>,
}

impl MarkInput {
    pub fn validate(&self) -> Result<(), RecordError> {
        grading::validate_marks(self.marks_obtained, self.max_marks)?;
        grading::validate_semester(self.semester)?;
        grading::validate_academic_year(&self.academic_year)?;
        grading::validate_remarks(self.remarks.as_deref())?;
        Ok(())
    }
}

/// Replacement values for an existing mark; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkPatch {
    pub marks_obtained: Option<f64>,
    pub max_marks: Option<f64>,
    pub remarks: Option<Option<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WriteOutcome {
    Created,
    Updated,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMark {
    pub mark_id: String,
    pub outcome: WriteOutcome,
    pub percentage: f64,
    pub grade: grading::Grade,
    pub grade_point: i64,
}

pub struct MarkQuery<'a> {
    pub student_id: Option<&'a str>,
    pub subject_id: Option<&'a str>,
    pub filters: &'a AcademicFilters,
}

fn ensure_exists(
    conn: &Connection,
    table: &'static str,
    what: &'static str,
    id: &str,
) -> Result<(), RecordError> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", table);
    let found: Option<i64> = conn.query_row(&sql, [id], |r| r.get(0)).optional()?;
    if found.is_none() {
        return Err(RecordError::NotFound(what));
    }
    Ok(())
}

fn find_by_tuple(conn: &Connection, input: &MarkInput) -> Result<Option<String>, RecordError> {
    Ok(conn
        .query_row(
            "SELECT id FROM marks
             WHERE student_id = ? AND subject_id = ? AND exam_type = ?
               AND semester = ? AND academic_year = ?",
            (
                &input.student_id,
                &input.subject_id,
                input.exam_type.as_str(),
                input.semester,
                &input.academic_year,
            ),
            |r| r.get(0),
        )
        .optional()?)
}

fn stored(mark_id: String, outcome: WriteOutcome, marks: f64, max: f64) -> StoredMark {
    let d = grading::derive_grade(marks, max);
    StoredMark {
        mark_id,
        outcome,
        percentage: grading::round_2_decimals(d.percentage),
        grade: d.grade,
        grade_point: d.grade_point,
    }
}

/// Inserts a new mark; an existing record for the same tuple is a validation error.
pub fn create_mark(conn: &Connection, input: &MarkInput) -> Result<StoredMark, RecordError> {
    input.validate()?;
    ensure_exists(conn, "students", "student", &input.student_id)?;
    ensure_exists(conn, "subjects", "subject", &input.subject_id)?;
    if let Some(existing_id) = find_by_tuple(conn, input)? {
        return Err(RecordError::conflict(
            "duplicate_mark",
            "a mark already exists for this student, subject, exam type, semester and academic year",
            existing_id,
        ));
    }

    let mark_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let d = grading::derive_grade(input.marks_obtained, input.max_marks);
    conn.execute(
        "INSERT INTO marks(
            id, student_id, subject_id, marks_obtained, max_marks, exam_type, semester,
            academic_year, percentage, grade, grade_point, entered_by, remarks,
            created_at, updated_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            mark_id,
            input.student_id,
            input.subject_id,
            input.marks_obtained,
            input.max_marks,
            input.exam_type.as_str(),
            input.semester,
            input.academic_year,
            d.percentage,
            d.grade.as_str(),
            d.grade_point,
            input.entered_by,
            input.remarks,
            now,
            now,
        ],
    )?;
    tracing::info!(mark_id = %mark_id, grade = d.grade.as_str(), "mark created");
    Ok(stored(mark_id, WriteOutcome::Created, input.marks_obtained, input.max_marks))
}

/// Create-or-update keyed by (student, subject, exam type, semester, academic year).
pub fn upsert_mark(conn: &Connection, input: &MarkInput) -> Result<StoredMark, RecordError> {
    input.validate()?;
    ensure_exists(conn, "students", "student", &input.student_id)?;
    ensure_exists(conn, "subjects", "subject", &input.subject_id)?;

    let Some(existing_id) = find_by_tuple(conn, input)? else {
        return create_mark(conn, input);
    };

    let d = grading::derive_grade(input.marks_obtained, input.max_marks);
    conn.execute(
        "UPDATE marks
         SET marks_obtained = ?, max_marks = ?, percentage = ?, grade = ?, grade_point = ?,
             entered_by = COALESCE(?, entered_by), remarks = ?, updated_at = ?
         WHERE id = ?",
        rusqlite::params![
            input.marks_obtained,
            input.max_marks,
            d.percentage,
            d.grade.as_str(),
            d.grade_point,
            input.entered_by,
            input.remarks,
            Utc::now().to_rfc3339(),
            existing_id,
        ],
    )?;
    tracing::info!(mark_id = %existing_id, grade = d.grade.as_str(), "mark updated by key");
    Ok(stored(existing_id, WriteOutcome::Updated, input.marks_obtained, input.max_marks))
}

pub fn update_mark(
    conn: &Connection,
    mark_id: &str,
    patch: &MarkPatch,
) -> Result<StoredMark, RecordError> {
    let current: Option<(f64, f64, Option<String>)> = conn
        .query_row(
            "SELECT marks_obtained, max_marks, remarks FROM marks WHERE id = ?",
            [mark_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;
    let Some((cur_marks, cur_max, cur_remarks)) = current else {
        return Err(RecordError::NotFound("mark"));
    };

    let marks_obtained = patch.marks_obtained.unwrap_or(cur_marks);
    let max_marks = patch.max_marks.unwrap_or(cur_max);
    let remarks = patch.remarks.clone().unwrap_or(cur_remarks);
    grading::validate_marks(marks_obtained, max_marks)?;
    grading::validate_remarks(remarks.as_deref())?;

    let d = grading::derive_grade(marks_obtained, max_marks);
    conn.execute(
        "UPDATE marks
         SET marks_obtained = ?, max_marks = ?, percentage = ?, grade = ?, grade_point = ?,
             remarks = ?, updated_at = ?
         WHERE id = ?",
        rusqlite::params![
            marks_obtained,
            max_marks,
            d.percentage,
            d.grade.as_str(),
            d.grade_point,
            remarks,
            Utc::now().to_rfc3339(),
            mark_id,
        ],
    )?;
    Ok(stored(
        mark_id.to_string(),
        WriteOutcome::Updated,
        marks_obtained,
        max_marks,
    ))
}

pub fn delete_mark(conn: &Connection, mark_id: &str) -> Result<(), RecordError> {
    let n = conn.execute("DELETE FROM marks WHERE id = ?", [mark_id])?;
    if n == 0 {
        return Err(RecordError::NotFound("mark"));
    }
    Ok(())
}

/// Loads marks joined with subject metadata. Rows whose subject no longer
/// exists come back with `credits: None`.
pub fn load_marks(conn: &Connection, query: &MarkQuery<'_>) -> Result<Vec<MarkEntry>, RecordError> {
    let mut sql = String::from(
        "SELECT m.id, m.student_id, m.subject_id, s.code, s.name, s.credits,
                m.marks_obtained, m.max_marks, m.exam_type, m.semester, m.academic_year,
                m.entered_by, m.remarks
         FROM marks m
         LEFT JOIN subjects s ON s.id = m.subject_id
         WHERE 1 = 1",
    );
    let mut binds: Vec<Value> = Vec::new();
    if let Some(student_id) = query.student_id {
        sql.push_str(" AND m.student_id = ?");
        binds.push(Value::Text(student_id.to_string()));
    }
    if let Some(subject_id) = query.subject_id {
        sql.push_str(" AND m.subject_id = ?");
        binds.push(Value::Text(subject_id.to_string()));
    }
    if let Some(semester) = query.filters.semester {
        sql.push_str(" AND m.semester = ?");
        binds.push(Value::Integer(semester));
    }
    if let Some(year) = query.filters.academic_year.as_ref() {
        sql.push_str(" AND m.academic_year = ?");
        binds.push(Value::Text(year.clone()));
    }
    if let Some(exam_type) = query.filters.exam_type {
        sql.push_str(" AND m.exam_type = ?");
        binds.push(Value::Text(exam_type.as_str().to_string()));
    }
    sql.push_str(" ORDER BY m.academic_year DESC, m.semester DESC, m.created_at, m.id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(binds), |r| {
            let mark_id: String = r.get(0)?;
            let stored: String = r.get(8)?;
            let Some(exam_type) = ExamType::parse(&stored) else {
                tracing::warn!(
                    mark_id = %mark_id,
                    exam_type = %stored,
                    "skipping mark with unknown exam type"
                );
                return Ok(None);
            };
            Ok(Some(MarkEntry {
                mark_id,
                student_id: r.get(1)?,
                subject_id: r.get(2)?,
                subject_code: r.get(3)?,
                subject_name: r.get(4)?,
                credits: r.get(5)?,
                marks_obtained: r.get(6)?,
                max_marks: r.get(7)?,
                exam_type,
                semester: r.get(9)?,
                academic_year: r.get(10)?,
                entered_by: r.get(11)?,
                remarks: r.get(12)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::grading::Grade;

    fn setup() -> Connection {
        let ws = std::env::temp_dir().join(format!("recordbook-marks-{}", Uuid::new_v4()));
        let conn = db::open_db(&ws).expect("open db");
        conn.execute(
            "INSERT INTO students(id, name, student_code, created_at)
             VALUES('stu-1', 'Ada Lovelace', 'S001', '2024-01-01T00:00:00Z')",
            [],
        )
        .expect("insert student");
        conn.execute(
            "INSERT INTO subjects(id, name, code, credits, semester)
             VALUES('sub-1', 'Algorithms', 'CS201', 4, 3)",
            [],
        )
        .expect("insert subject");
        conn
    }

    fn input(marks: f64) -> MarkInput {
        MarkInput {
            student_id: "stu-1".into(),
            subject_id: "sub-1".into(),
            marks_obtained: marks,
            max_marks: 100.0,
            exam_type: ExamType::Final,
            semester: 3,
            academic_year: "2024-2025".into(),
            entered_by: Some("fac-1".into()),
            remarks: None,
        }
    }

    fn mark_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM marks", [], |r| r.get(0))
            .expect("count")
    }

    #[test]
    fn duplicate_create_is_rejected() {
        let conn = setup();
        let first = create_mark(&conn, &input(80.0)).expect("create");
        assert_eq!(first.grade, Grade::A);
        let dup = create_mark(&conn, &input(50.0)).unwrap_err();
        assert_eq!(dup.code(), "duplicate_mark");
        assert_eq!(mark_count(&conn), 1);
    }

    #[test]
    fn upsert_updates_existing_tuple() {
        let conn = setup();
        let first = upsert_mark(&conn, &input(30.0)).expect("upsert create");
        assert_eq!(first.outcome, WriteOutcome::Created);
        assert_eq!(first.grade, Grade::F);
        let second = upsert_mark(&conn, &input(91.0)).expect("upsert update");
        assert_eq!(second.outcome, WriteOutcome::Updated);
        assert_eq!(second.mark_id, first.mark_id);
        assert_eq!(second.grade, Grade::APlus);
        assert_eq!(mark_count(&conn), 1);

        let grade: String = conn
            .query_row("SELECT grade FROM marks WHERE id = ?", [&first.mark_id], |r| {
                r.get(0)
            })
            .expect("grade");
        assert_eq!(grade, "A+");
    }

    #[test]
    fn update_rederives_grade_and_checks_merged_range() {
        let conn = setup();
        let created = create_mark(&conn, &input(45.0)).expect("create");
        let updated = update_mark(
            &conn,
            &created.mark_id,
            &MarkPatch {
                max_marks: Some(50.0),
                ..Default::default()
            },
        )
        .expect("update");
        assert_eq!(updated.percentage, 90.0);
        assert_eq!(updated.grade, Grade::APlus);

        let err = update_mark(
            &conn,
            &created.mark_id,
            &MarkPatch {
                max_marks: Some(40.0),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.code(), "bad_params");

        let missing = update_mark(&conn, "nope", &MarkPatch::default()).unwrap_err();
        assert_eq!(missing.code(), "not_found");
    }

    #[test]
    fn unknown_references_are_not_found() {
        let conn = setup();
        let mut i = input(50.0);
        i.subject_id = "missing".into();
        assert_eq!(create_mark(&conn, &i).unwrap_err().code(), "not_found");
        let mut i = input(50.0);
        i.student_id = "missing".into();
        assert_eq!(upsert_mark(&conn, &i).unwrap_err().code(), "not_found");
        assert_eq!(delete_mark(&conn, "missing").unwrap_err().code(), "not_found");
    }

    #[test]
    fn load_marks_skips_unknown_exam_types() {
        let conn = setup();
        let kept = create_mark(&conn, &input(70.0)).expect("create");
        let mut midterm = input(40.0);
        midterm.exam_type = ExamType::Midterm;
        let odd = create_mark(&conn, &midterm).expect("create midterm");
        conn.execute(
            "UPDATE marks SET exam_type = 'oral' WHERE id = ?",
            [&odd.mark_id],
        )
        .expect("corrupt exam type");

        let filters = AcademicFilters::default();
        let rows = load_marks(
            &conn,
            &MarkQuery {
                student_id: Some("stu-1"),
                subject_id: None,
                filters: &filters,
            },
        )
        .expect("load");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mark_id, kept.mark_id);
        assert_eq!(rows[0].exam_type, ExamType::Final);
    }

    #[test]
    fn load_marks_tolerates_deleted_subject() {
        let conn = setup();
        create_mark(&conn, &input(70.0)).expect("create");
        conn.execute("DELETE FROM subjects WHERE id = 'sub-1'", [])
            .expect("delete subject");
        let filters = AcademicFilters::default();
        let rows = load_marks(
            &conn,
            &MarkQuery {
                student_id: Some("stu-1"),
                subject_id: None,
                filters: &filters,
            },
        )
        .expect("load");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].credits, None);
        assert_eq!(rows[0].subject_code, None);
    }
}
