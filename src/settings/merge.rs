//! Layer merging for settings maps.
//!
//! Higher layers override lower layers key by key. Keys present on only one
//! side pass through unchanged, including keys nobody recognizes.

use super::Settings;

/// Overlay `index` settings on top of `node` settings, index keys winning.
///
/// # Example
/// ```
/// use index_settings::settings::{Settings, merge};
///
/// let node = Settings::builder()
///     .put("index.refresh_interval", "10s")
///     .put("name", "node-1")
///     .build();
/// let index = Settings::builder().put("index.refresh_interval", "2s").build();
///
/// let effective = merge(&node, &index);
/// assert_eq!(effective.get("index.refresh_interval"), Some("2s"));
/// assert_eq!(effective.get("name"), Some("node-1"));
/// ```
pub fn merge(node: &Settings, index: &Settings) -> Settings {
    Settings::builder()
        .put_settings(node)
        .put_settings(index)
        .build()
}

/// Merge several layers in order, later layers taking precedence.
///
/// Equivalent to folding [`merge`] over the list.
pub fn merge_all<'a>(layers: impl IntoIterator<Item = &'a Settings>) -> Settings {
    layers
        .into_iter()
        .fold(Settings::empty(), |acc, layer| merge(&acc, layer))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_index_overrides_node() {
        let node = settings(&[("index.refresh_interval", "10s"), ("index.gc_deletes", "30s")]);
        let index = settings(&[("index.refresh_interval", "2s")]);
        let merged = merge(&node, &index);
        assert_eq!(merged.get("index.refresh_interval"), Some("2s"));
        assert_eq!(merged.get("index.gc_deletes"), Some("30s"));
    }

    #[test]
    fn test_one_sided_keys_pass_through() {
        let node = settings(&[("name", "node-1")]);
        let index = settings(&[("index.uuid", "abc"), ("index.some.future.knob", "x")]);
        let merged = merge(&node, &index);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get("index.some.future.knob"), Some("x"));
    }

    #[test]
    fn test_merge_with_empty_sides() {
        let index = settings(&[("index.uuid", "abc")]);
        assert_eq!(merge(&Settings::empty(), &index), index);
        assert_eq!(merge(&index, &Settings::empty()), index);
    }

    #[test]
    fn test_merge_all() {
        let layers = vec![
            settings(&[("a", "1")]),
            settings(&[("b", "2")]),
            settings(&[("a", "3"), ("c", "4")]),
        ];
        let merged = merge_all(&layers);
        assert_eq!(merged, settings(&[("a", "3"), ("b", "2"), ("c", "4")]));
    }

    #[test]
    fn test_merge_all_empty() {
        assert!(merge_all(&Vec::<Settings>::new()).is_empty());
    }
}
