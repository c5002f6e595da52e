//! Utility functions for URL handling and output naming

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Characters that cannot appear in a filename on common filesystems
const ILLEGAL_FILENAME_CHARS: [char; 10] = ['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'];

#[allow(clippy::expect_used)]
static SHEET_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/sheet/(\d+)/").expect("sheet id pattern is valid"));

/// Make a title or name safe to use as part of a filename
///
/// Path-illegal characters become `-`, the ends are trimmed, and every run of
/// whitespace collapses to a single `_`. Applying it twice changes nothing.
///
/// ```
/// use sprite_harvest::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("A/B: C"), "A-B-_C");
/// assert_eq!(sanitize_filename("  Agumon   (Battle) "), "Agumon_(Battle)");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if ILLEGAL_FILENAME_CHARS.contains(&c) {
                '-'
            } else {
                c
            }
        })
        .collect();

    replaced.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Make a catalog section name safe to use as a single directory component
///
/// Like [`sanitize_filename`], but names that would resolve to the current or
/// parent directory (`.`, `..`, or nothing at all) become `fallback`.
///
/// ```
/// use sprite_harvest::utils::sanitize_dir_name;
///
/// assert_eq!(sanitize_dir_name("Rookie Level", "Uncategorized"), "Rookie_Level");
/// assert_eq!(sanitize_dir_name("..", "Uncategorized"), "Uncategorized");
/// ```
pub fn sanitize_dir_name(name: &str, fallback: &str) -> String {
    let sanitized = sanitize_filename(name);
    if sanitized.chars().all(|c| c == '.') {
        fallback.to_string()
    } else {
        sanitized
    }
}

/// Build the output file stem for an entry: `[<id>_]<title>_by_<submitter>`
pub fn build_file_stem(
    title: &str,
    submitter: &str,
    sheet_id: Option<&str>,
    include_id: bool,
) -> String {
    let mut stem = String::new();
    if include_id
        && let Some(id) = sheet_id
    {
        stem.push_str(id);
        stem.push('_');
    }
    stem.push_str(&sanitize_filename(title));
    stem.push_str("_by_");
    stem.push_str(&sanitize_filename(submitter));
    stem
}

/// Extract the numeric id from a `/sheet/<digits>/` path segment
pub fn extract_sheet_id(url: &str) -> Option<String> {
    SHEET_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Rewrite a possibly-relative link to an absolute http(s) URL against `origin`
///
/// Returns `None` for empty links and for schemes that cannot be downloaded
/// (`javascript:`, `data:`, `mailto:` ...).
pub fn absolutize_url(href: &str, origin: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let url = origin.join(href).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url.into()),
        _ => None,
    }
}

/// Digits immediately following `prefix` in the link's path
///
/// `href` may be relative or absolute; the prefix is matched against the path.
pub fn id_after_prefix(href: &str, prefix: &str, origin: &Url) -> Option<String> {
    let url = origin.join(href.trim()).ok()?;
    let rest = url.path().strip_prefix(prefix)?;
    let id: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if id.is_empty() { None } else { Some(id) }
}

/// Whether a link's path begins with `prefix`
pub fn path_has_prefix(href: &str, prefix: &str, origin: &Url) -> bool {
    origin
        .join(href.trim())
        .map(|url| url.path().starts_with(prefix))
        .unwrap_or(false)
}

/// Canonical download URL for a sheet id: `<origin><download_prefix><id>/`
pub fn canonical_download_url(origin: &Url, download_prefix: &str, sheet_id: &str) -> Option<String> {
    let prefix = download_prefix.trim_matches('/');
    origin
        .join(&format!("/{prefix}/{sheet_id}/"))
        .ok()
        .map(String::from)
}
