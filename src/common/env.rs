//! `${NAME}` / `${NAME:default}` substitution for configuration values

use regex::{Captures, Regex};
use std::sync::LazyLock;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::([^}]*))?\}").expect("valid placeholder regex")
});

/// Substitute placeholders using an arbitrary variable lookup
///
/// Resolution order per placeholder: the looked-up value, then the inline
/// default, then the empty string. Text outside placeholders is untouched.
pub fn substitute_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    PLACEHOLDER_RE
        .replace_all(input, |caps: &Captures<'_>| {
            lookup(&caps[1])
                .or_else(|| caps.get(2).map(|m| m.as_str().to_string()))
                .unwrap_or_default()
        })
        .into_owned()
}

/// Apply substitution to every string inside a TOML value, recursively
pub fn substitute_toml<F>(value: &mut toml::Value, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        toml::Value::String(s) => *s = substitute_with(s, lookup),
        toml::Value::Array(items) => {
            for item in items {
                substitute_toml(item, lookup);
            }
        }
        toml::Value::Table(table) => {
            for (_, item) in table.iter_mut() {
                substitute_toml(item, lookup);
            }
        }
        _ => {}
    }
}
