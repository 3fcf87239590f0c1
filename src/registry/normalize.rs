//! Repository URL normalization for registry metadata

use regex::Regex;
use std::sync::OnceLock;

fn scp_shorthand() -> &'static Regex {
    static SCP: OnceLock<Regex> = OnceLock::new();
    SCP.get_or_init(|| Regex::new(r"^git@([^:/]+):").expect("static regex"))
}

/// Normalize a repository URL as found in package metadata.
///
/// Applied in order: strip a leading `git+`, rewrite `git://` and `ssh://`
/// to `https://`, rewrite `git@host:` to `https://host/`, strip a trailing
/// `.git`.
pub fn normalize_repository_url(raw: &str) -> String {
    let url = raw.trim();
    let url = url.strip_prefix("git+").unwrap_or(url);

    let url = if let Some(rest) = url.strip_prefix("git://") {
        format!("https://{}", rest)
    } else if let Some(rest) = url.strip_prefix("ssh://") {
        format!("https://{}", rest)
    } else {
        url.to_string()
    };

    let url = scp_shorthand().replace(&url, "https://$1/").into_owned();

    match url.strip_suffix(".git") {
        Some(stripped) => stripped.to_string(),
        None => url,
    }
}
