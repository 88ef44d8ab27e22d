use once_cell::sync::Lazy;
use regex::Regex;

static NON_TOKEN_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^A-Za-z0-9_]+").expect("goal name pattern is a valid regex")
});

/// Turn a human-readable name into a lowercase, underscore-delimited token.
pub fn normalize(name: &str) -> String {
    NON_TOKEN_RUN
        .replace_all(&name.to_lowercase(), "_")
        .into_owned()
}

/// Goal name for a page view of `name`.
pub fn page_goal_name(name: &str) -> String {
    format!("{}_pageview", normalize(name))
}

/// Goal name for an app screen view of `name`.
pub fn screen_goal_name(name: &str) -> String {
    format!("{}_screenview", normalize(name))
}
