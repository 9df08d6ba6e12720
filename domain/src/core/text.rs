//! Text helpers.

/// Shortens `s` to at most `max_bytes`, cutting on a char boundary and
/// appending `…` when anything was dropped.
///
/// Used to keep agent output and error messages bounded inside persisted
/// task records and council votes.
pub fn excerpt(s: &str, max_bytes: usize) -> String {
    let trimmed = s.trim();
    if trimmed.len() <= max_bytes {
        return trimmed.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_returned_trimmed() {
        assert_eq!(excerpt("  done \n", 10), "done");
    }

    #[test]
    fn long_text_is_cut_with_ellipsis() {
        assert_eq!(excerpt("abcdefgh", 3), "abc…");
    }

    #[test]
    fn multibyte_boundary_is_respected() {
        // 'é' is two bytes; cutting at 1 must back off to 0
        assert_eq!(excerpt("éa", 1), "…");
    }
}
