//! Input normalization and validation for subdomains, icons, and custom domains.

use std::sync::LazyLock;

use regex::Regex;

/// Longest icon accepted, in UTF-16 code units (what browsers count).
pub const MAX_ICON_LEN: usize = 10;

/// Host-label grammar: one or more `label.` then an alphabetic TLD of 2+ chars.
static DOMAIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}$")
        .expect("domain pattern is valid")
});

/// `None` when the regex engine was built without Unicode property tables;
/// icon validation then degrades to a length check.
static PICTOGRAPHIC: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\p{Extended_Pictographic}").ok());

/// Lowercase and drop everything outside `[a-z0-9-]`.
pub fn sanitize_subdomain(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Accept `raw` only if sanitizing would not change it.
pub fn validate_subdomain(raw: &str) -> Result<String, &'static str> {
    let sanitized = sanitize_subdomain(raw);
    if sanitized.is_empty() || sanitized != raw {
        return Err(
            "Subdomain can only have lowercase letters, numbers, and hyphens. Please try again.",
        );
    }
    Ok(sanitized)
}

/// An icon is at most [`MAX_ICON_LEN`] long and contains a pictograph.
pub fn is_valid_icon(icon: &str) -> bool {
    let len = icon.encode_utf16().count();
    if len == 0 || len > MAX_ICON_LEN {
        return false;
    }
    match PICTOGRAPHIC.as_ref() {
        Some(pattern) => pattern.is_match(icon),
        None => true,
    }
}

/// Trim, lowercase, drop an `http://`/`https://` scheme and one trailing slash.
pub fn normalize_domain(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    without_scheme
        .strip_suffix('/')
        .unwrap_or(without_scheme)
        .to_string()
}

/// Syntax check for an already-normalized domain.
pub fn is_valid_domain(domain: &str) -> bool {
    DOMAIN_PATTERN.is_match(domain)
}

/// Strip a `:port` suffix and trailing dot, lowercase.
pub fn bare_host(host: &str) -> String {
    let host = host.trim();
    let host = host.rsplit_once(':').map_or(host, |(name, port)| {
        if port.chars().all(|c| c.is_ascii_digit()) { name } else { host }
    });
    host.trim_end_matches('.').to_lowercase()
}

/// True if `domain` is the root itself or any name beneath it.
pub fn is_within_root(domain: &str, root_domain: &str) -> bool {
    let root = bare_host(root_domain);
    let domain = bare_host(domain);
    domain == root || domain.ends_with(&format!(".{root}"))
}
