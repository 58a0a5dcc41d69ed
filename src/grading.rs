use crate::error::RecordError;
use crate::marks::{self, MarkQuery};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

pub const DEFAULT_CREDITS: i64 = 3;
pub const MAX_REMARKS_CHARS: usize = 500;
pub const PASS_GRADE_POINT: i64 = 4;

/// Letter grades, declared from the highest band down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "C+")]
    CPlus,
    C,
    D,
    F,
}

const GRADE_BANDS: [(f64, Grade); 7] = [
    (90.0, Grade::APlus),
    (80.0, Grade::A),
    (70.0, Grade::BPlus),
    (60.0, Grade::B),
    (50.0, Grade::CPlus),
    (40.0, Grade::C),
    (35.0, Grade::D),
];

impl Grade {
    pub const ALL: [Grade; 8] = [
        Grade::APlus,
        Grade::A,
        Grade::BPlus,
        Grade::B,
        Grade::CPlus,
        Grade::C,
        Grade::D,
        Grade::F,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    pub fn grade_point(self) -> i64 {
        match self {
            Grade::APlus => 10,
            Grade::A => 9,
            Grade::BPlus => 8,
            Grade::B => 7,
            Grade::CPlus => 6,
            Grade::C => 5,
            Grade::D => 4,
            Grade::F => 0,
        }
    }

    pub fn is_pass(self) -> bool {
        self.grade_point() >= PASS_GRADE_POINT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    Midterm,
    Final,
    Assignment,
    Quiz,
    Project,
}

impl ExamType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "midterm" => Some(ExamType::Midterm),
            "final" => Some(ExamType::Final),
            "assignment" => Some(ExamType::Assignment),
            "quiz" => Some(ExamType::Quiz),
            "project" => Some(ExamType::Project),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExamType::Midterm => "midterm",
            ExamType::Final => "final",
            ExamType::Assignment => "assignment",
            ExamType::Quiz => "quiz",
            ExamType::Project => "project",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedGrade {
    pub percentage: f64,
    pub grade: Grade,
    pub grade_point: i64,
}

pub fn percentage(marks_obtained: f64, max_marks: f64) -> f64 {
    // Multiply before dividing: 90/100 must band as exactly 90.0.
    marks_obtained * 100.0 / max_marks
}

pub fn grade_for_percentage(percentage: f64) -> Grade {
    GRADE_BANDS
        .iter()
        .find(|(min, _)| percentage >= *min)
        .map(|(_, g)| *g)
        .unwrap_or(Grade::F)
}

/// Caller validates `0 <= marks_obtained <= max_marks` and `max_marks >= 1`.
pub fn derive_grade(marks_obtained: f64, max_marks: f64) -> DerivedGrade {
    let percentage = percentage(marks_obtained, max_marks);
    let grade = grade_for_percentage(percentage);
    DerivedGrade {
        percentage,
        grade,
        grade_point: grade.grade_point(),
    }
}

pub fn round_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Credit value used for records whose subject credits are unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditPolicy {
    pub default_credits: i64,
}

impl Default for CreditPolicy {
    fn default() -> Self {
        Self {
            default_credits: DEFAULT_CREDITS,
        }
    }
}

impl CreditPolicy {
    pub fn credits_for(&self, subject_credits: Option<i64>) -> i64 {
        match subject_credits {
            Some(c) if c > 0 => c,
            _ => self.default_credits,
        }
    }
}

pub fn validate_marks(marks_obtained: f64, max_marks: f64) -> Result<(), RecordError> {
    if !max_marks.is_finite() || max_marks < 1.0 {
        return Err(RecordError::validation_with(
            "maxMarks must be >= 1",
            json!({ "maxMarks": max_marks }),
        ));
    }
    if !marks_obtained.is_finite() || marks_obtained < 0.0 || marks_obtained > max_marks {
        return Err(RecordError::validation_with(
            "marksObtained must be between 0 and maxMarks",
            json!({ "marksObtained": marks_obtained, "maxMarks": max_marks }),
        ));
    }
    Ok(())
}

pub fn validate_semester(semester: i64) -> Result<(), RecordError> {
    if !(1..=8).contains(&semester) {
        return Err(RecordError::validation_with(
            "semester must be in 1..=8",
            json!({ "semester": semester }),
        ));
    }
    Ok(())
}

pub fn is_valid_academic_year(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 9
        && b[4] == b'-'
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[5..].iter().all(u8::is_ascii_digit)
}

pub fn validate_academic_year(s: &str) -> Result<(), RecordError> {
    if !is_valid_academic_year(s) {
        return Err(RecordError::validation_with(
            "academicYear must look like YYYY-YYYY",
            json!({ "academicYear": s }),
        ));
    }
    Ok(())
}

pub fn validate_remarks(remarks: Option<&str>) -> Result<(), RecordError> {
    if let Some(r) = remarks {
        let n = r.chars().count();
        if n > MAX_REMARKS_CHARS {
            return Err(RecordError::validation_with(
                format!("remarks length must be <= {}", MAX_REMARKS_CHARS),
                json!({ "length": n }),
            ));
        }
    }
    Ok(())
}

/// One stored mark joined with its subject, as read from the workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkEntry {
    pub mark_id: String,
    pub student_id: String,
    pub subject_id: String,
    pub subject_code: Option<String>,
    pub subject_name: Option<String>,
    pub credits: Option<i64>,
    pub marks_obtained: f64,
    pub max_marks: f64,
    pub exam_type: ExamType,
    pub semester: i64,
    pub academic_year: String,
    pub entered_by: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedMark {
    pub mark_id: String,
    pub student_id: String,
    pub subject_id: String,
    pub subject_code: Option<String>,
    pub subject_name: Option<String>,
    pub credits: i64,
    pub exam_type: ExamType,
    pub semester: i64,
    pub academic_year: String,
    pub marks_obtained: f64,
    pub max_marks: f64,
    pub percentage: f64,
    pub grade: Grade,
    pub grade_point: i64,
    pub entered_by: Option<String>,
    pub remarks: Option<String>,
}

impl MarkEntry {
    pub fn derived(&self) -> DerivedGrade {
        derive_grade(self.marks_obtained, self.max_marks)
    }

    pub fn graded(&self, policy: &CreditPolicy) -> GradedMark {
        let d = self.derived();
        GradedMark {
            mark_id: self.mark_id.clone(),
            student_id: self.student_id.clone(),
            subject_id: self.subject_id.clone(),
            subject_code: self.subject_code.clone(),
            subject_name: self.subject_name.clone(),
            credits: policy.credits_for(self.credits),
            exam_type: self.exam_type,
            semester: self.semester,
            academic_year: self.academic_year.clone(),
            marks_obtained: self.marks_obtained,
            max_marks: self.max_marks,
            percentage: round_2_decimals(d.percentage),
            grade: d.grade,
            grade_point: d.grade_point,
            entered_by: self.entered_by.clone(),
            remarks: self.remarks.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterSubject {
    pub mark_id: String,
    pub subject_id: String,
    pub subject_code: Option<String>,
    pub subject_name: Option<String>,
    pub exam_type: ExamType,
    pub percentage: f64,
    pub grade: Grade,
    pub grade_point: i64,
    pub credits: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterSummary {
    pub academic_year: String,
    pub semester: i64,
    pub subjects: Vec<SemesterSubject>,
    pub total_credits: i64,
    pub total_grade_points: i64,
    pub gpa: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeCount {
    pub grade: Grade,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicSummary {
    pub cgpa: f64,
    pub total_credits: i64,
    pub total_grade_points: i64,
    pub total_subjects: usize,
    pub passed_subjects: usize,
    pub failed_subjects: usize,
    pub average_percentage: f64,
    pub grade_distribution: Vec<GradeCount>,
}

fn weighted_average(total_grade_points: i64, total_credits: i64) -> f64 {
    if total_credits > 0 {
        round_2_decimals(total_grade_points as f64 / total_credits as f64)
    } else {
        0.0
    }
}

fn grade_distribution<I>(grades: I) -> Vec<GradeCount>
where
    I: IntoIterator<Item = Grade>,
{
    let mut counts: BTreeMap<Grade, usize> = BTreeMap::new();
    for g in grades {
        *counts.entry(g).or_insert(0) += 1;
    }
    Grade::ALL
        .iter()
        .map(|g| GradeCount {
            grade: *g,
            count: counts.get(g).copied().unwrap_or(0),
        })
        .collect()
}

/// Most recent term first: academic year descending, then semester descending.
pub fn build_semester_summaries(
    records: &[MarkEntry],
    policy: &CreditPolicy,
) -> Vec<SemesterSummary> {
    let mut groups: BTreeMap<(String, i64), Vec<SemesterSubject>> = BTreeMap::new();
    for r in records {
        let d = r.derived();
        groups
            .entry((r.academic_year.clone(), r.semester))
            .or_default()
            .push(SemesterSubject {
                mark_id: r.mark_id.clone(),
                subject_id: r.subject_id.clone(),
                subject_code: r.subject_code.clone(),
                subject_name: r.subject_name.clone(),
                exam_type: r.exam_type,
                percentage: round_2_decimals(d.percentage),
                grade: d.grade,
                grade_point: d.grade_point,
                credits: policy.credits_for(r.credits),
            });
    }

    groups
        .into_iter()
        .rev()
        .map(|((academic_year, semester), subjects)| {
            let total_credits: i64 = subjects.iter().map(|s| s.credits).sum();
            let total_grade_points: i64 = subjects.iter().map(|s| s.grade_point * s.credits).sum();
            SemesterSummary {
                academic_year,
                semester,
                subjects,
                total_credits,
                total_grade_points,
                gpa: weighted_average(total_grade_points, total_credits),
            }
        })
        .collect()
}

pub fn compute_academic_summary(records: &[MarkEntry], policy: &CreditPolicy) -> AcademicSummary {
    let mut total_credits = 0_i64;
    let mut total_grade_points = 0_i64;
    let mut passed_subjects = 0_usize;
    let mut percentage_sum = 0.0_f64;
    let mut grades: Vec<Grade> = Vec::with_capacity(records.len());

    for r in records {
        let d = r.derived();
        let credits = policy.credits_for(r.credits);
        total_credits += credits;
        total_grade_points += d.grade_point * credits;
        percentage_sum += d.percentage;
        if d.grade.is_pass() {
            passed_subjects += 1;
        }
        grades.push(d.grade);
    }

    let total_subjects = records.len();
    let average_percentage = if total_subjects > 0 {
        round_2_decimals(percentage_sum / total_subjects as f64)
    } else {
        0.0
    };

    AcademicSummary {
        cgpa: weighted_average(total_grade_points, total_credits),
        total_credits,
        total_grade_points,
        total_subjects,
        passed_subjects,
        failed_subjects: total_subjects - passed_subjects,
        average_percentage,
        grade_distribution: grade_distribution(grades),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStats {
    pub record_count: usize,
    pub average_percentage: f64,
    pub highest_percentage: f64,
    pub lowest_percentage: f64,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
    pub grade_distribution: Vec<GradeCount>,
}

pub fn compute_subject_stats(records: &[MarkEntry]) -> SubjectStats {
    let derived: Vec<DerivedGrade> = records.iter().map(MarkEntry::derived).collect();
    let n = derived.len();
    if n == 0 {
        return SubjectStats {
            record_count: 0,
            average_percentage: 0.0,
            highest_percentage: 0.0,
            lowest_percentage: 0.0,
            passed: 0,
            failed: 0,
            pass_rate: 0.0,
            grade_distribution: grade_distribution(std::iter::empty()),
        };
    }

    let sum: f64 = derived.iter().map(|d| d.percentage).sum();
    let highest = derived
        .iter()
        .map(|d| d.percentage)
        .fold(f64::MIN, f64::max);
    let lowest = derived
        .iter()
        .map(|d| d.percentage)
        .fold(f64::MAX, f64::min);
    let passed = derived.iter().filter(|d| d.grade.is_pass()).count();

    SubjectStats {
        record_count: n,
        average_percentage: round_2_decimals(sum / n as f64),
        highest_percentage: round_2_decimals(highest),
        lowest_percentage: round_2_decimals(lowest),
        passed,
        failed: n - passed,
        pass_rate: round_2_decimals(100.0 * passed as f64 / n as f64),
        grade_distribution: grade_distribution(derived.iter().map(|d| d.grade)),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicFilters {
    pub semester: Option<i64>,
    pub academic_year: Option<String>,
    pub exam_type: Option<ExamType>,
}

fn is_all(v: &serde_json::Value) -> bool {
    v.as_str()
        .map(|s| s.trim().is_empty() || s.eq_ignore_ascii_case("ALL"))
        .unwrap_or(false)
}

pub fn parse_academic_filters(
    raw: Option<&serde_json::Value>,
) -> Result<AcademicFilters, RecordError> {
    let Some(raw) = raw else {
        return Ok(AcademicFilters::default());
    };
    if raw.is_null() {
        return Ok(AcademicFilters::default());
    }
    let Some(obj) = raw.as_object() else {
        return Err(RecordError::validation("filters must be an object"));
    };

    let semester = match obj.get("semester") {
        None => None,
        Some(v) if v.is_null() || is_all(v) => None,
        Some(v) => {
            let Some(n) = v.as_i64() else {
                return Err(RecordError::validation(
                    "filters.semester must be integer or 'ALL'",
                ));
            };
            validate_semester(n)?;
            Some(n)
        }
    };

    let academic_year = match obj.get("academicYear") {
        None => None,
        Some(v) if v.is_null() || is_all(v) => None,
        Some(v) => {
            let Some(s) = v.as_str() else {
                return Err(RecordError::validation(
                    "filters.academicYear must be string or 'ALL'",
                ));
            };
            let s = s.trim();
            validate_academic_year(s)?;
            Some(s.to_string())
        }
    };

    let exam_type = match obj.get("examType") {
        None => None,
        Some(v) if v.is_null() || is_all(v) => None,
        Some(v) => {
            let parsed = v.as_str().and_then(ExamType::parse);
            let Some(t) = parsed else {
                return Err(RecordError::validation_with(
                    "filters.examType must be one of: midterm, final, assignment, quiz, project",
                    json!({ "examType": v }),
                ));
            };
            Some(t)
        }
    };

    Ok(AcademicFilters {
        semester,
        academic_year,
        exam_type,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAcademicReport {
    pub student_id: String,
    pub filters: AcademicFilters,
    pub academic_summary: AcademicSummary,
    pub semester_summaries: Vec<SemesterSummary>,
    pub raw_records: Vec<GradedMark>,
}

pub fn compute_student_academic_summary(
    conn: &Connection,
    student_id: &str,
    filters: &AcademicFilters,
    policy: &CreditPolicy,
) -> Result<StudentAcademicReport, RecordError> {
    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM students WHERE id = ?", [student_id], |r| {
            r.get(0)
        })
        .optional()?;
    if exists.is_none() {
        return Err(RecordError::NotFound("student"));
    }

    let records = marks::load_marks(
        conn,
        &MarkQuery {
            student_id: Some(student_id),
            subject_id: None,
            filters,
        },
    )?;
    tracing::debug!(student_id, records = records.len(), "computing academic summary");

    Ok(StudentAcademicReport {
        student_id: student_id.to_string(),
        filters: filters.clone(),
        academic_summary: compute_academic_summary(&records, policy),
        semester_summaries: build_semester_summaries(&records, policy),
        raw_records: records.iter().map(|r| r.graded(policy)).collect(),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStatsReport {
    pub subject_id: String,
    pub subject_code: String,
    pub subject_name: String,
    pub filters: AcademicFilters,
    pub stats: SubjectStats,
}

pub fn compute_subject_stats_for(
    conn: &Connection,
    subject_id: &str,
    filters: &AcademicFilters,
) -> Result<SubjectStatsReport, RecordError> {
    let subject: Option<(String, String)> = conn
        .query_row(
            "SELECT code, name FROM subjects WHERE id = ?",
            [subject_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let Some((subject_code, subject_name)) = subject else {
        return Err(RecordError::NotFound("subject"));
    };

    let records = marks::load_marks(
        conn,
        &MarkQuery {
            student_id: None,
            subject_id: Some(subject_id),
            filters,
        },
    )?;

    Ok(SubjectStatsReport {
        subject_id: subject_id.to_string(),
        subject_code,
        subject_name,
        filters: filters.clone(),
        stats: compute_subject_stats(&records),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(
        id: &str,
        credits: Option<i64>,
        marks_obtained: f64,
        max_marks: f64,
        year: &str,
        semester: i64,
    ) -> MarkEntry {
        MarkEntry {
            mark_id: id.to_string(),
            student_id: "stu-1".to_string(),
            subject_id: format!("sub-{}", id),
            subject_code: Some(format!("CODE-{}", id)),
            subject_name: Some(format!("Subject {}", id)),
            credits,
            marks_obtained,
            max_marks,
            exam_type: ExamType::Final,
            semester,
            academic_year: year.to_string(),
            entered_by: None,
            remarks: None,
        }
    }

    #[test]
    fn grade_bands_are_lower_inclusive() {
        let cases = [
            (100.0, Grade::APlus, 10),
            (90.0, Grade::APlus, 10),
            (89.99, Grade::A, 9),
            (80.0, Grade::A, 9),
            (79.99, Grade::BPlus, 8),
            (70.0, Grade::BPlus, 8),
            (60.0, Grade::B, 7),
            (59.5, Grade::CPlus, 6),
            (50.0, Grade::CPlus, 6),
            (40.0, Grade::C, 5),
            (35.0, Grade::D, 4),
            (34.99, Grade::F, 0),
            (0.0, Grade::F, 0),
        ];
        for (marks, grade, gp) in cases {
            let d = derive_grade(marks, 100.0);
            assert_eq!(d.grade, grade, "marks {}", marks);
            assert_eq!(d.grade_point, gp, "marks {}", marks);
        }
    }

    #[test]
    fn grade_depends_on_percentage_only() {
        let pairs = [(45.0, 50.0, 90.0, 100.0), (7.0, 10.0, 35.0, 50.0), (27.0, 30.0, 18.0, 20.0)];
        for (a, am, b, bm) in pairs {
            assert_eq!(derive_grade(a, am).grade, derive_grade(b, bm).grade);
            assert_eq!(
                derive_grade(a, am).grade_point,
                derive_grade(b, bm).grade_point
            );
        }
        // 7/10 must not slip below the 70 edge.
        assert_eq!(derive_grade(7.0, 10.0).grade, Grade::BPlus);
        assert_eq!(derive_grade(9.0, 10.0).grade, Grade::APlus);
    }

    #[test]
    fn two_subject_example_matches_expected_gpa() {
        let records = vec![
            entry("a", Some(3), 92.0, 100.0, "2024-2025", 1),
            entry("b", Some(4), 65.0, 100.0, "2024-2025", 1),
        ];
        let policy = CreditPolicy::default();
        let sems = build_semester_summaries(&records, &policy);
        assert_eq!(sems.len(), 1);
        assert_eq!(sems[0].subjects[0].grade, Grade::APlus);
        assert_eq!(sems[0].subjects[0].grade_point, 10);
        assert_eq!(sems[0].subjects[1].grade, Grade::B);
        assert_eq!(sems[0].subjects[1].grade_point, 7);
        assert_eq!(sems[0].total_credits, 7);
        assert_eq!(sems[0].total_grade_points, 58);
        assert_eq!(sems[0].gpa, 8.29);

        let summary = compute_academic_summary(&records, &policy);
        assert_eq!(summary.cgpa, 8.29);
        assert_eq!(summary.average_percentage, 78.5);
        assert_eq!(summary.passed_subjects, 2);
        assert_eq!(summary.failed_subjects, 0);
    }

    #[test]
    fn cgpa_is_order_independent() {
        let mut records = vec![
            entry("a", Some(3), 92.0, 100.0, "2023-2024", 1),
            entry("b", Some(4), 65.0, 100.0, "2023-2024", 2),
            entry("c", Some(2), 33.0, 100.0, "2024-2025", 1),
            entry("d", Some(5), 71.5, 80.0, "2024-2025", 2),
            entry("e", Some(1), 18.0, 40.0, "2022-2023", 8),
        ];
        let policy = CreditPolicy::default();
        let forward = compute_academic_summary(&records, &policy);
        records.reverse();
        let reversed = compute_academic_summary(&records, &policy);
        records.swap(0, 3);
        let shuffled = compute_academic_summary(&records, &policy);
        assert_eq!(forward.cgpa, reversed.cgpa);
        assert_eq!(forward.cgpa, shuffled.cgpa);
        assert_eq!(forward.total_grade_points, shuffled.total_grade_points);
        assert_eq!(forward.failed_subjects, 1);
    }

    #[test]
    fn empty_records_yield_zero_without_division() {
        let summary = compute_academic_summary(&[], &CreditPolicy::default());
        assert_eq!(summary.cgpa, 0.0);
        assert_eq!(summary.total_subjects, 0);
        assert_eq!(summary.average_percentage, 0.0);
        assert!(summary.grade_distribution.iter().all(|g| g.count == 0));
        assert!(build_semester_summaries(&[], &CreditPolicy::default()).is_empty());

        let no_credit = CreditPolicy { default_credits: 0 };
        let records = vec![entry("a", None, 50.0, 100.0, "2024-2025", 1)];
        let summary = compute_academic_summary(&records, &no_credit);
        assert_eq!(summary.total_credits, 0);
        assert_eq!(summary.cgpa, 0.0);
        let sems = build_semester_summaries(&records, &no_credit);
        assert_eq!(sems[0].gpa, 0.0);
    }

    #[test]
    fn semesters_ordered_most_recent_first() {
        let records = vec![
            entry("a", Some(3), 92.0, 100.0, "2023-2024", 2),
            entry("b", Some(3), 65.0, 100.0, "2024-2025", 1),
            entry("c", Some(3), 55.0, 100.0, "2023-2024", 1),
            entry("d", Some(3), 85.0, 100.0, "2024-2025", 2),
            entry("e", Some(3), 75.0, 100.0, "2024-2025", 2),
        ];
        let sems = build_semester_summaries(&records, &CreditPolicy::default());
        let keys: Vec<(String, i64)> = sems
            .iter()
            .map(|s| (s.academic_year.clone(), s.semester))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("2024-2025".to_string(), 2),
                ("2024-2025".to_string(), 1),
                ("2023-2024".to_string(), 2),
                ("2023-2024".to_string(), 1),
            ]
        );
        for s in &sems {
            let expected = s.total_grade_points as f64 / s.total_credits as f64;
            assert!((s.gpa - expected).abs() <= 0.005);
        }
        assert_eq!(sems[0].subjects.len(), 2);
    }

    #[test]
    fn missing_credits_use_policy_default() {
        let records = vec![
            entry("a", None, 92.0, 100.0, "2024-2025", 1),
            entry("b", Some(0), 65.0, 100.0, "2024-2025", 1),
        ];
        let default = compute_academic_summary(&records, &CreditPolicy::default());
        assert_eq!(default.total_credits, 6);
        assert_eq!(default.cgpa, 8.5);

        let overridden = CreditPolicy { default_credits: 1 };
        let summary = compute_academic_summary(&records, &overridden);
        assert_eq!(summary.total_credits, 2);
        assert_eq!(summary.total_grade_points, 17);
        assert_eq!(records[0].graded(&overridden).credits, 1);
    }

    #[test]
    fn grade_distribution_follows_band_order() {
        let records = vec![
            entry("a", Some(3), 95.0, 100.0, "2024-2025", 1),
            entry("b", Some(3), 10.0, 100.0, "2024-2025", 1),
            entry("c", Some(3), 91.0, 100.0, "2024-2025", 1),
        ];
        let summary = compute_academic_summary(&records, &CreditPolicy::default());
        assert_eq!(summary.grade_distribution.len(), 8);
        assert_eq!(summary.grade_distribution[0].grade, Grade::APlus);
        assert_eq!(summary.grade_distribution[0].count, 2);
        assert_eq!(summary.grade_distribution[7].grade, Grade::F);
        assert_eq!(summary.grade_distribution[7].count, 1);
    }

    #[test]
    fn subject_stats_report_spread_and_pass_rate() {
        let records = vec![
            entry("a", Some(3), 92.0, 100.0, "2024-2025", 1),
            entry("b", Some(3), 20.0, 100.0, "2024-2025", 1),
            entry("c", Some(3), 35.0, 100.0, "2024-2025", 1),
            entry("d", Some(3), 61.0, 100.0, "2024-2025", 1),
        ];
        let stats = compute_subject_stats(&records);
        assert_eq!(stats.record_count, 4);
        assert_eq!(stats.highest_percentage, 92.0);
        assert_eq!(stats.lowest_percentage, 20.0);
        assert_eq!(stats.average_percentage, 52.0);
        assert_eq!(stats.passed, 3);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pass_rate, 75.0);

        let empty = compute_subject_stats(&[]);
        assert_eq!(empty.record_count, 0);
        assert_eq!(empty.pass_rate, 0.0);
    }

    #[test]
    fn validation_rejects_out_of_range_marks() {
        assert!(validate_marks(0.0, 100.0).is_ok());
        assert!(validate_marks(100.0, 100.0).is_ok());
        assert_eq!(validate_marks(-1.0, 100.0).unwrap_err().code(), "bad_params");
        assert_eq!(validate_marks(101.0, 100.0).unwrap_err().code(), "bad_params");
        assert_eq!(validate_marks(0.0, 0.5).unwrap_err().code(), "bad_params");
        assert!(validate_semester(0).is_err());
        assert!(validate_semester(9).is_err());
        assert!(is_valid_academic_year("2024-2025"));
        assert!(!is_valid_academic_year("2024/2025"));
        assert!(!is_valid_academic_year("24-25"));
        assert!(validate_remarks(Some(&"x".repeat(500))).is_ok());
        assert!(validate_remarks(Some(&"x".repeat(501))).is_err());
    }

    #[test]
    fn parse_filters_accepts_all_markers() {
        let raw = serde_json::json!({
            "semester": "ALL",
            "academicYear": "ALL",
            "examType": null
        });
        let parsed = parse_academic_filters(Some(&raw)).expect("parse filters");
        assert_eq!(parsed, AcademicFilters::default());

        let raw = serde_json::json!({
            "semester": 3,
            "academicYear": "2024-2025",
            "examType": "Midterm"
        });
        let parsed = parse_academic_filters(Some(&raw)).expect("parse filters");
        assert_eq!(parsed.semester, Some(3));
        assert_eq!(parsed.academic_year.as_deref(), Some("2024-2025"));
        assert_eq!(parsed.exam_type, Some(ExamType::Midterm));

        let bad = serde_json::json!({ "semester": 12 });
        assert!(parse_academic_filters(Some(&bad)).is_err());
        let bad = serde_json::json!({ "examType": "oral" });
        assert!(parse_academic_filters(Some(&bad)).is_err());
    }
}
