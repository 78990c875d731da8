/// Utility functions
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Extract number from JSON value
pub fn num(v: &Value) -> Option<f64> {
    if let Some(x) = v.as_f64() {
        return Some(x);
    }
    if let Some(s) = v.as_str() {
        return s.trim().trim_end_matches('%').trim().parse::<f64>().ok();
    }
    None
}

/// Pick string value from JSON by trying multiple keys
pub fn s_pick(v: &Value, keys: &[&str]) -> Option<String> {
    for k in keys {
        if let Some(x) = v.get(*k) {
            if let Some(s) = x.as_str() {
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            } else if x.is_number() {
                return Some(x.to_string());
            }
        }
    }
    None
}

/// Span from the first `{` to the last `}` of a free-form text, if any
pub fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Candidate locations for a local image path, in resolution order:
/// as given, relative to the process root, relative to the working directory
pub fn local_candidates(locator: &str, app_root: &Path, cwd: Option<&Path>) -> Vec<PathBuf> {
    let given = PathBuf::from(locator);
    let mut candidates = vec![given.clone(), app_root.join(&given)];
    if let Some(cwd) = cwd {
        candidates.push(cwd.join(&given));
    }
    candidates.dedup();
    candidates
}

/// File name of a timestamped frame copy
pub fn frame_file_name(at: DateTime<Utc>) -> String {
    format!("frame_{}.jpg", at.format("%Y%m%d_%H%M%S_%3f"))
}
