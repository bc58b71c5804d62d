//! Glob matching for cache invalidation patterns.

/// Whether `key` matches `pattern`, where `*` stands for any run of
/// characters (possibly empty) and everything else matches literally.
///
/// ```
/// use dealflow_core::cache::pattern_matches;
///
/// assert!(pattern_matches("fund:*", "fund:42:allocations"));
/// assert!(!pattern_matches("fund:42:*", "fund:42"));
/// ```
pub fn pattern_matches(pattern: &str, key: &str) -> bool {
    let Some((head, rest)) = pattern.split_once('*') else {
        return pattern == key;
    };
    let Some(mut remaining) = key.strip_prefix(head) else {
        return false;
    };

    let mut pieces: Vec<&str> = rest.split('*').collect();
    let tail = pieces.pop().unwrap_or_default();
    for piece in pieces.into_iter().filter(|p| !p.is_empty()) {
        match remaining.find(piece) {
            Some(pos) => remaining = &remaining[pos + piece.len()..],
            None => return false,
        }
    }
    remaining.ends_with(tail)
}
