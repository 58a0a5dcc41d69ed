use crate::error::RecordError;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    /// Institution-issued identifier shown on documents.
    pub student_code: String,
    pub department: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub name: String,
    pub student_code: String,
    pub department: Option<String>,
    pub email: Option<String>,
}

fn map_student(r: &rusqlite::Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: r.get(0)?,
        name: r.get(1)?,
        student_code: r.get(2)?,
        department: r.get(3)?,
        email: r.get(4)?,
    })
}

pub fn create_student(conn: &Connection, input: &NewStudent) -> Result<Student, RecordError> {
    if input.name.trim().is_empty() {
        return Err(RecordError::validation("name must not be empty"));
    }
    let student_code = input.student_code.trim();
    if student_code.is_empty() {
        return Err(RecordError::validation("studentId must not be empty"));
    }
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM students WHERE student_code = ?",
            [student_code],
            |r| r.get(0),
        )
        .optional()?;
    if let Some(existing_id) = existing {
        return Err(RecordError::conflict(
            "duplicate_student",
            "a student with this studentId already exists",
            existing_id,
        ));
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(id, name, student_code, department, email, created_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &id,
            input.name.trim(),
            student_code,
            &input.department,
            &input.email,
            Utc::now().to_rfc3339(),
        ),
    )?;
    Ok(Student {
        id,
        name: input.name.trim().to_string(),
        student_code: student_code.to_string(),
        department: input.department.clone(),
        email: input.email.clone(),
    })
}

pub fn get_student(conn: &Connection, id: &str) -> Result<Option<Student>, RecordError> {
    Ok(conn
        .query_row(
            "SELECT id, name, student_code, department, email FROM students WHERE id = ?",
            [id],
            map_student,
        )
        .optional()?)
}

pub fn list_students(conn: &Connection) -> Result<Vec<Student>, RecordError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, student_code, department, email FROM students ORDER BY name, student_code",
    )?;
    let rows = stmt
        .query_map([], map_student)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub code: String,
    pub credits: Option<i64>,
    pub semester: i64,
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubject {
    pub name: String,
    pub code: String,
    pub credits: i64,
    pub semester: i64,
    pub department: Option<String>,
}

pub fn create_subject(conn: &Connection, input: &NewSubject) -> Result<Subject, RecordError> {
    if input.name.trim().is_empty() || input.code.trim().is_empty() {
        return Err(RecordError::validation("name/code must not be empty"));
    }
    if !(1..=6).contains(&input.credits) {
        return Err(RecordError::validation_with(
            "credits must be in 1..=6",
            serde_json::json!({ "credits": input.credits }),
        ));
    }
    crate::grading::validate_semester(input.semester)?;

    let code = input.code.trim().to_ascii_uppercase();
    let existing: Option<String> = conn
        .query_row("SELECT id FROM subjects WHERE code = ?", [&code], |r| {
            r.get(0)
        })
        .optional()?;
    if let Some(existing_id) = existing {
        return Err(RecordError::conflict(
            "duplicate_subject",
            "a subject with this code already exists",
            existing_id,
        ));
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO subjects(id, name, code, credits, semester, department)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &id,
            input.name.trim(),
            &code,
            input.credits,
            input.semester,
            &input.department,
        ),
    )?;
    Ok(Subject {
        id,
        name: input.name.trim().to_string(),
        code,
        credits: Some(input.credits),
        semester: input.semester,
        department: input.department.clone(),
    })
}

pub fn list_subjects(conn: &Connection, semester: Option<i64>) -> Result<Vec<Subject>, RecordError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, code, credits, semester, department
         FROM subjects
         WHERE (?1 IS NULL OR semester = ?1)
         ORDER BY semester, code",
    )?;
    let rows = stmt
        .query_map([semester], |r| {
            Ok(Subject {
                id: r.get(0)?,
                name: r.get(1)?,
                code: r.get(2)?,
                credits: r.get(3)?,
                semester: r.get(4)?,
                department: r.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Removes the subject definition only. Marks that reference it stay and are
/// aggregated with the default credit value.
pub fn delete_subject(conn: &Connection, id: &str) -> Result<(), RecordError> {
    let n = conn.execute("DELETE FROM subjects WHERE id = ?", [id])?;
    if n == 0 {
        return Err(RecordError::NotFound("subject"));
    }
    Ok(())
}
