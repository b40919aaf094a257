//! Tag substitution for templated step fields
//!
//! Pure function over an immutable context snapshot. Applied to a step's
//! templated text (e.g. its system prompt) right before that step executes.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::Context;

/// Pattern for {{key}} references
static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{([\w-]+)\}\}").unwrap());

/// Replace every `{{key}}` with the string form of `context[key]`.
///
/// Keys not present in the context are left as literal `{{key}}` text.
pub fn substitute_tags(template: &str, ctx: &Context) -> String {
    let mut result = template.to_string();
    for cap in TAG_PATTERN.captures_iter(template) {
        let full_match = cap.get(0).unwrap().as_str();
        let key = cap.get(1).unwrap().as_str();
        if let Some(value) = ctx.get_str(key) {
            result = result.replace(full_match, &value);
        }
    }
    result
}
