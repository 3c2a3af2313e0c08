//! Pseudo-file helpers shared by the sysfs backends

use crate::error::{Result, SamplerError};
use std::fs;
use std::path::Path;

/// Read a pseudo-file, dropping a single trailing newline
pub fn read_line<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut content = fs::read_to_string(path)?;
    if content.ends_with('\n') {
        content.pop();
    }
    Ok(content)
}

/// Read file contents as string, trimming whitespace
pub fn read_file_string<P: AsRef<Path>>(path: P) -> Result<String> {
    Ok(fs::read_to_string(path)?.trim().to_string())
}

/// Read file and parse as f64
pub fn read_file_f64<P: AsRef<Path>>(path: P) -> Result<f64> {
    let content = read_file_string(path)?;
    content
        .parse()
        .map_err(|e| SamplerError::Parse(format!("Failed to parse f64: {}", e)))
}

/// Read file and parse the leading decimal integer.
///
/// Kernel drivers occasionally append units or garbage after the number, so
/// only the leading `[+-]digits` run is considered. An empty run is a parse
/// error.
pub fn read_file_i64<P: AsRef<Path>>(path: P) -> Result<i64> {
    let content = read_file_string(path)?;
    parse_leading_i64(&content)
        .ok_or_else(|| SamplerError::Parse(format!("Failed to parse i64 from '{}'", content)))
}

pub(crate) fn parse_leading_i64(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let sign_len = usize::from(text.starts_with(['+', '-']));
    let digits = text[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    text[..sign_len + digits].parse().ok()
}

/// Check if file/directory exists
pub fn path_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists()
}
