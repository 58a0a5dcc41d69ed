use crate::db;
use crate::grading::CreditPolicy;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::db_conn;
use crate::ipc::types::{AppState, Request};
use crate::portfolio::code::CodeImageOptions;
use crate::portfolio::pdf::Rgb;
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Grading,
    Portfolio,
}

impl SetupSection {
    const ALL: [SetupSection; 2] = [SetupSection::Grading, SetupSection::Portfolio];

    fn parse(s: &str) -> Option<Self> {
        match s {
            "grading" => Some(Self::Grading),
            "portfolio" => Some(Self::Portfolio),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Grading => "grading",
            Self::Portfolio => "portfolio",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Grading => "setup.grading",
            Self::Portfolio => "setup.portfolio",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Grading => json!({
            "defaultCredits": crate::grading::DEFAULT_CREDITS
        }),
        SetupSection::Portfolio => {
            let code = CodeImageOptions::default();
            json!({
                "profileBaseUrl": "http://localhost:3000",
                "codeSize": code.size,
                "codeMargin": code.margin,
                "codeDarkColor": code.dark.to_hex(),
                "codeLightColor": code.light.to_hex()
            })
        }
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.len() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

fn parse_color(v: &Value, key: &str) -> Result<String, String> {
    let s = parse_string_max(v, key, 7)?;
    Rgb::parse_hex(&s)
        .map(Rgb::to_hex)
        .ok_or_else(|| format!("{} must be a #RRGGBB color", key))
}

fn parse_base_url(v: &Value, key: &str) -> Result<String, String> {
    let s = parse_string_max(v, key, 256)?;
    if !(s.starts_with("http://") || s.starts_with("https://")) {
        return Err(format!("{} must start with http:// or https://", key));
    }
    Ok(s.trim_end_matches('/').to_string())
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Grading => match k.as_str() {
                "defaultCredits" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 6)?));
                }
                _ => return Err(format!("unknown grading field: {}", k)),
            },
            SetupSection::Portfolio => match k.as_str() {
                "profileBaseUrl" => {
                    obj.insert(k.clone(), Value::String(parse_base_url(v, k)?));
                }
                "codeSize" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 64, 512)?));
                }
                "codeMargin" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 0, 8)?));
                }
                "codeDarkColor" | "codeLightColor" => {
                    obj.insert(k.clone(), Value::String(parse_color(v, k)?));
                }
                _ => return Err(format!("unknown portfolio field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Malformed saved values fall back to defaults.
            let _ = merge_section_patch(section, &mut current, saved_obj);
        }
    }
    Ok(current)
}

pub fn credit_policy(conn: &rusqlite::Connection) -> anyhow::Result<CreditPolicy> {
    let grading = load_section(conn, SetupSection::Grading)?;
    let default_credits = grading
        .get("defaultCredits")
        .and_then(|v| v.as_i64())
        .unwrap_or(crate::grading::DEFAULT_CREDITS);
    Ok(CreditPolicy { default_credits })
}

/// Profile base URL and code image options for portfolio rendering.
pub fn portfolio_settings(
    conn: &rusqlite::Connection,
) -> anyhow::Result<(String, CodeImageOptions)> {
    let p = load_section(conn, SetupSection::Portfolio)?;
    let defaults = CodeImageOptions::default();
    let color = |key: &str, fallback: Rgb| {
        p.get(key)
            .and_then(|v| v.as_str())
            .and_then(Rgb::parse_hex)
            .unwrap_or(fallback)
    };
    let base_url = p
        .get("profileBaseUrl")
        .and_then(|v| v.as_str())
        .unwrap_or("http://localhost:3000")
        .to_string();
    let options = CodeImageOptions {
        size: p
            .get("codeSize")
            .and_then(|v| v.as_u64())
            .map(|n| n as u32)
            .unwrap_or(defaults.size),
        margin: p
            .get("codeMargin")
            .and_then(|v| v.as_u64())
            .map(|n| n as u32)
            .unwrap_or(defaults.margin),
        dark: color("codeDarkColor", defaults.dark),
        light: color("codeLightColor", defaults.light),
    };
    Ok((base_url, options))
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let mut out = Map::new();
    for section in SetupSection::ALL {
        match load_section(conn, section) {
            Ok(v) => {
                out.insert(section.name().to_string(), v);
            }
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    }
    ok(&req.id, Value::Object(out))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    tracing::info!(section = section.name(), "settings updated");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
