//! `%` wildcard matching used by the free-text search fields.

use regex::{Regex, RegexBuilder};

/// Compiled form of a user supplied search pattern.
#[derive(Debug, Clone)]
pub enum WildcardFilter {
    /// A lone `%` matches everything.
    Any,
    /// No wildcard: case-sensitive equality.
    Exact(String),
    /// Trailing `%`: case-insensitive prefix, stored lowercased.
    StartsWith(String),
    /// Leading `%`: case-insensitive suffix, stored lowercased.
    EndsWith(String),
    /// Anything else, anchored at the start only.
    Pattern(Regex),
}

impl WildcardFilter {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => value == expected,
            Self::StartsWith(prefix) => value.to_lowercase().starts_with(prefix.as_str()),
            Self::EndsWith(suffix) => value.to_lowercase().ends_with(suffix.as_str()),
            Self::Pattern(regex) => regex.is_match(value),
        }
    }

    /// Missing values only match `Any`.
    pub fn matches_optional(&self, value: Option<&str>) -> bool {
        match value {
            Some(value) => self.matches(value),
            None => matches!(self, Self::Any),
        }
    }
}

pub fn get_wildcard_filter(search_pattern: &str) -> Result<WildcardFilter, regex::Error> {
    if search_pattern.trim() == "%" {
        return Ok(WildcardFilter::Any);
    }

    let wildcards = search_pattern.matches('%').count();

    if wildcards == 0 {
        return Ok(WildcardFilter::Exact(search_pattern.to_string()));
    }

    if wildcards == 1 {
        if let Some(suffix) = search_pattern.strip_prefix('%') {
            return Ok(WildcardFilter::EndsWith(suffix.to_lowercase()));
        }
        if let Some(prefix) = search_pattern.strip_suffix('%') {
            return Ok(WildcardFilter::StartsWith(prefix.to_lowercase()));
        }
    }

    let body = search_pattern
        .split('%')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    let regex = RegexBuilder::new(&format!("^{body}"))
        .case_insensitive(true)
        .build()?;
    Ok(WildcardFilter::Pattern(regex))
}
