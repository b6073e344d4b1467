//! Index name matching.

use std::sync::Arc;

/// Decides whether a name expression (an index name, alias or wildcard
/// pattern) refers to a given index.
pub type IndexNameMatcher = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// The default matcher: `expression` as a `*` wildcard pattern against the
/// index's own name.
pub fn default_matcher(index: &str) -> IndexNameMatcher {
    let index = index.to_string();
    Arc::new(move |expression: &str| simple_match(expression, &index))
}

/// Match `value` against a pattern whose only special character is `*`,
/// which matches any run of characters (including none).
pub fn simple_match(pattern: &str, value: &str) -> bool {
    let Some(first) = pattern.find('*') else {
        return pattern == value;
    };
    let (prefix, rest) = pattern.split_at(first);
    if !value.starts_with(prefix) {
        return false;
    }
    let mut remaining = &value[prefix.len()..];
    let segments: Vec<&str> = rest.split('*').filter(|s| !s.is_empty()).collect();
    let ends_with_star = rest.ends_with('*');

    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        if last && !ends_with_star {
            return remaining.ends_with(segment);
        }
        match remaining.find(segment) {
            Some(pos) => remaining = &remaining[pos + segment.len()..],
            None => return false,
        }
    }
    true
}
