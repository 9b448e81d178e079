//! Host, locale and timezone report.

use chrono::{Local, Utc};
use serde::Serialize;
use std::env;
use std::fs;
use std::path::Path;

use crate::util::TIMESTAMP_FORMAT;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HostInfo {
    pub timezone: String,
    pub utc_offset: String,
    pub local_time: String,
    pub utc_time: String,
    pub system_language: String,
    pub os_name: String,
    pub os_architecture: String,
}

impl HostInfo {
    pub fn collect() -> Self {
        let local = Local::now();
        let utc = Utc::now();
        Self {
            timezone: timezone_name(),
            utc_offset: format_offset(local.offset().local_minus_utc()),
            local_time: local.format(TIMESTAMP_FORMAT).to_string(),
            utc_time: utc.format(TIMESTAMP_FORMAT).to_string(),
            system_language: system_language(),
            os_name: normalize_os(env::consts::OS),
            os_architecture: env::consts::ARCH.to_string(),
        }
    }
}

/// `+HH:MM` / `-HH:MM` from an offset in seconds east of UTC
pub fn format_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let abs = seconds.unsigned_abs();
    format!("{}{:02}:{:02}", sign, abs / 3600, (abs % 3600) / 60)
}

/// IANA zone name: `TZ`, then `/etc/timezone`, then the `/etc/localtime` link, else `UTC`
pub fn timezone_name() -> String {
    if let Ok(tz) = env::var("TZ") {
        let tz = tz.trim_start_matches(':').trim();
        if !tz.is_empty() {
            return tz.to_string();
        }
    }
    if let Ok(content) = fs::read_to_string("/etc/timezone") {
        let tz = content.trim();
        if !tz.is_empty() {
            return tz.to_string();
        }
    }
    if let Some(tz) = zone_from_link(Path::new("/etc/localtime")) {
        return tz;
    }
    "UTC".to_string()
}

fn zone_from_link(link: &Path) -> Option<String> {
    let target = fs::read_link(link).ok()?;
    let target = target.to_string_lossy();
    let (_, zone) = target.split_once("zoneinfo/")?;
    (!zone.is_empty()).then(|| zone.to_string())
}

/// First of `LC_ALL`, `LC_MESSAGES`, `LANG` with the encoding suffix removed
pub fn system_language() -> String {
    for var in ["LC_ALL", "LC_MESSAGES", "LANG"] {
        if let Ok(value) = env::var(var) {
            if let Some(lang) = parse_locale(&value) {
                return lang;
            }
        }
    }
    "unknown".to_string()
}

fn parse_locale(value: &str) -> Option<String> {
    let lang = value.split(['.', '@']).next().unwrap_or("").trim();
    if lang.is_empty() || lang == "C" || lang == "POSIX" {
        None
    } else {
        Some(lang.to_string())
    }
}

pub fn normalize_os(os: &str) -> String {
    match os {
        "macos" => "macOS".to_string(),
        "linux" => "Linux".to_string(),
        "windows" => "Windows".to_string(),
        other => other.to_string(),
    }
}
