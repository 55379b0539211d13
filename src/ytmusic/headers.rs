use std::{collections::BTreeMap, path::Path};

use sha1::{Digest, Sha1};

/// Origin the browser session belongs to; part of the auth hash.
pub const ORIGIN: &str = "https://music.youtube.com";

const REQUIRED: [&str; 2] = ["cookie", "user-agent"];
const MIN_HEADER_LINES: usize = 5;

/// Request headers copied from an authenticated browser session.
///
/// Accepts either the raw `name: value` block from the browser's network
/// inspector or a JSON object of header names to values. Names are stored
/// lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserHeaders {
    headers: BTreeMap<String, String>,
}

impl BrowserHeaders {
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if text.is_empty() {
            return Err("Headers are empty".to_string());
        }

        let headers = if text.starts_with('{') {
            let map: BTreeMap<String, String> =
                serde_json::from_str(text).map_err(|e| format!("Invalid headers JSON: {e}"))?;
            map.into_iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
                .collect()
        } else {
            validate_raw(text)?;
            text.lines()
                .filter_map(|line| line.split_once(':'))
                .filter(|(name, _)| !name.trim().is_empty())
                .map(|(name, value)| (name.trim().to_lowercase(), value.trim().to_string()))
                .collect()
        };

        let parsed = Self { headers };
        let missing: Vec<&str> = REQUIRED
            .iter()
            .copied()
            .filter(|name| parsed.get(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "Missing required header fields: {}",
                missing.join(", ")
            ));
        }
        if parsed.sapisid().is_none() {
            return Err("Cookie has no SAPISID, copy the headers of a logged-in session".to_string());
        }

        Ok(parsed)
    }

    pub async fn from_file(path: &Path) -> Result<Self, String> {
        let text = async_fs::read_to_string(path)
            .await
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        Self::parse(&text)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.get("cookie")?
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| key.trim() == name)
            .map(|(_, value)| value.trim())
    }

    fn sapisid(&self) -> Option<&str> {
        self.cookie("__Secure-3PAPISID")
            .or_else(|| self.cookie("SAPISID"))
    }

    /// `Authorization` value for a request made at `timestamp` (seconds).
    pub fn authorization(&self, timestamp: i64) -> Option<String> {
        let sapisid = self.sapisid()?;
        Some(sapisid_hash(sapisid, timestamp))
    }

    pub fn auth_user(&self) -> &str {
        self.get("x-goog-authuser").unwrap_or("0")
    }
}

/// Checks a raw header block before parsing: the required fields must
/// appear and at least five lines must look like `name: value`.
pub fn validate_raw(text: &str) -> Result<(), String> {
    let lower = text.to_lowercase();
    let missing: Vec<&str> = REQUIRED
        .iter()
        .copied()
        .filter(|field| !lower.contains(field))
        .collect();
    if !missing.is_empty() {
        return Err(format!(
            "Missing required header fields: {}",
            missing.join(", ")
        ));
    }

    let valid_lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.contains(':'))
        .count();
    if valid_lines < MIN_HEADER_LINES {
        return Err("Headers don't appear to be in the correct format".to_string());
    }

    Ok(())
}

pub fn sapisid_hash(sapisid: &str, timestamp: i64) -> String {
    let digest = Sha1::digest(format!("{timestamp} {sapisid} {ORIGIN}").as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("SAPISIDHASH {timestamp}_{hex}")
}
