//! arXiv identifier handling

use regex::Regex;
use std::sync::OnceLock;

fn version_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d)v\d+$").expect("valid version regex"))
}

fn new_style_id() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4}\.\d{4,5})(?:v\d+)?").expect("valid id regex"))
}

fn old_style_id() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([a-z][a-z\-]*(?:\.[A-Z]{2})?/\d{7})(?:v\d+)?").expect("valid id regex")
    })
}

/// Reduce any identifier form to the bare, unversioned arXiv id.
///
/// Accepts abs/pdf URLs, an `arXiv:` prefix, a `.pdf` suffix and a version
/// suffix: `https://arxiv.org/abs/2401.01234v2` becomes `2401.01234`.
pub fn normalize_arxiv_id(raw: &str) -> String {
    let mut id = raw.trim();

    for marker in ["/abs/", "/pdf/"] {
        if let Some(pos) = id.rfind(marker) {
            id = &id[pos + marker.len()..];
        }
    }
    if id.get(..6).is_some_and(|p| p.eq_ignore_ascii_case("arxiv:")) {
        id = &id[6..];
    }
    let id = id.trim_end_matches(".pdf").trim();

    version_suffix().replace(id, "$1").into_owned()
}

/// Find an arXiv id inside free text (a pasted URL, a citation line).
pub fn parse_arxiv_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    new_style_id()
        .captures(input)
        .or_else(|| old_style_id().captures(input))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
