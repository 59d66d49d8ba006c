//! # Path Helpers
//!
//! Filename sanitization and templated destination path generation for
//! uploaded files.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use chrono::Local;
use regex::Regex;
use uuid::Uuid;

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[/\\?%*:|"<>\x00-\x1f]"#).expect("pattern compiles"))
}

/// Strip characters that are unsafe in a file name.
///
/// Removes path separators and shell/filesystem metacharacters, then trims
/// leading and trailing dots and whitespace.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = unsafe_chars().replace_all(name.trim(), "");
    cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace()).to_string()
}

/// Interpolate tokens in a destination template for an uploaded file.
///
/// Built-in tokens:
/// - `{random}` - 8 random hex digits
/// - `{uuid}` - random UUID
/// - `{date}` - current date in ISO format
/// - `{datetime}` - current datetime in ISO format
/// - `{time}` - current time in ISO format
/// - `{timestamp}` - current unix timestamp
/// - `{file_name}` - sanitized file name
/// - `{name}` - file name without extension
/// - `{extension}` - file extension without the dot
///
/// Caller-supplied `extra_tokens` are interpolated the same way.
pub fn generate_file_path(
    filename: &str,
    destination: &str,
    extra_tokens: &HashMap<String, String>,
) -> String {
    let now = Local::now();
    let name = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = Path::new(filename)
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let random = Uuid::new_v4().simple().to_string();

    let mut out = destination
        .replace("{random}", &random[..8])
        .replace("{uuid}", &Uuid::new_v4().to_string())
        .replace("{date}", &now.format("%Y-%m-%d").to_string())
        .replace("{datetime}", &now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string())
        .replace("{time}", &now.format("%H:%M:%S%.6f").to_string())
        .replace("{timestamp}", &now.timestamp().to_string())
        .replace("{file_name}", &sanitize_filename(filename))
        .replace("{name}", &name)
        .replace("{extension}", &extension);

    for (token, value) in extra_tokens {
        out = out.replace(&format!("{{{token}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_separators() {
        assert_eq!(sanitize_filename("a/b\\c.txt"), "abc.txt");
        assert_eq!(sanitize_filename("re:port|v2?.pdf"), "reportv2.pdf");
    }

    #[test]
    fn test_sanitize_trims_dots_and_whitespace() {
        assert_eq!(sanitize_filename("  .hidden. "), "hidden");
        assert_eq!(sanitize_filename("..\\..\\evil.sh"), "evil.sh");
    }

    #[test]
    fn test_name_and_extension_tokens() {
        let path = generate_file_path("report.pdf", "docs/{name}.{extension}", &HashMap::new());
        assert_eq!(path, "docs/report.pdf");
    }

    #[test]
    fn test_double_extension_splits_on_last_dot() {
        let path = generate_file_path("archive.tar.gz", "{name}|{extension}", &HashMap::new());
        assert_eq!(path, "archive.tar|gz");
    }

    #[test]
    fn test_file_name_token_is_sanitized() {
        let path = generate_file_path("a/b.txt", "up/{file_name}", &HashMap::new());
        assert_eq!(path, "up/ab.txt");
    }

    #[test]
    fn test_random_and_uuid_tokens() {
        let path = generate_file_path("f.txt", "{random}-{uuid}-{name}", &HashMap::new());
        let parts: Vec<&str> = path.splitn(2, '-').collect();
        assert_eq!(parts[0].len(), 8);
        assert!(path.ends_with("-f"));
        assert!(!path.contains('{'));
    }

    #[test]
    fn test_date_tokens_have_no_placeholders_left() {
        let path = generate_file_path("f.txt", "{date}/{datetime}/{time}/{timestamp}", &HashMap::new());
        assert!(!path.contains('{'));
    }

    #[test]
    fn test_extra_tokens() {
        let extra = HashMap::from([("user".to_string(), "42".to_string())]);
        let path = generate_file_path("f.txt", "users/{user}/{file_name}", &extra);
        assert_eq!(path, "users/42/f.txt");
    }
}
