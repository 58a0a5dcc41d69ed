use crate::achievements::{self, AchievementCategory, AchievementStatus, NewAchievement, Review};
use crate::ipc::error::{err, ok, record_err};
use crate::ipc::helpers::{db_conn, optional_i64, optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use chrono::Utc;
use serde_json::{json, Value};

fn parse_new_achievement(params: &Value) -> Result<NewAchievement, String> {
    let category_raw = required_str(params, "category")?;
    let category = AchievementCategory::parse(&category_raw).ok_or_else(|| {
        let labels: Vec<&str> = AchievementCategory::ALL.iter().map(|c| c.label()).collect();
        format!("category must be one of: {}", labels.join(", "))
    })?;
    Ok(NewAchievement {
        student_id: required_str(params, "studentId")?,
        title: required_str(params, "title")?,
        category,
        points: optional_i64(params, "points")?.unwrap_or(0),
        description: optional_str(params, "description")?,
    })
}

fn parse_review(params: &Value) -> Result<Review, String> {
    let status_raw = required_str(params, "status")?;
    let status = match AchievementStatus::parse(&status_raw) {
        Some(s @ (AchievementStatus::Verified | AchievementStatus::Rejected)) => s,
        _ => return Err("status must be Verified or Rejected".into()),
    };
    Ok(Review {
        status,
        points: optional_i64(params, "points")?,
        remarks: optional_str(params, "remarks")?,
    })
}

fn handle_achievements_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let input = match parse_new_achievement(&req.params) {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match achievements::create_achievement(conn, &input, Utc::now()) {
        Ok(a) => ok(&req.id, json!({ "achievement": a })),
        Err(e) => record_err(&req.id, &e, "db_insert_failed"),
    }
}

fn handle_achievements_review(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let id = match required_str(&req.params, "achievementId") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let review = match parse_review(&req.params) {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match achievements::review_achievement(conn, &id, &review) {
        Ok(a) => ok(&req.id, json!({ "achievement": a })),
        Err(e) => record_err(&req.id, &e, "db_update_failed"),
    }
}

fn handle_achievements_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let student_id = match required_str(&req.params, "studentId") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let status = match optional_str(&req.params, "status") {
        Ok(None) => None,
        Ok(Some(s)) => match AchievementStatus::parse(&s) {
            Some(st) => Some(st),
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "status must be one of: Pending, Verified, Rejected",
                    None,
                )
            }
        },
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match achievements::list_achievements(conn, &student_id, status) {
        Ok(rows) => ok(&req.id, json!({ "achievements": rows })),
        Err(e) => record_err(&req.id, &e, "db_query_failed"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "achievements.create" => Some(handle_achievements_create(state, req)),
        "achievements.review" => Some(handle_achievements_review(state, req)),
        "achievements.list" => Some(handle_achievements_list(state, req)),
        _ => None,
    }
}
