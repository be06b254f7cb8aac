//! Alias derivation.
//!
//! Any contiguous run of a ref's dash-segments names the ref, and so does
//! any contiguous run of dot-pieces inside one dash-segment. For
//! `user-randy.x-100`:
//!
//! ```text
//! user, randy.x, 100, user-randy.x, randy.x-100, user-randy.x-100,
//! randy, x
//! ```

/// Reserved alias for the client's own avatar.
pub const ME: &str = "ME";
/// Reserved alias for the first two dash-segments of `ME`'s ref.
pub const USER: &str = "USER";
/// Reserved alias for the client's ghost object.
pub const GHOST: &str = "GHOST";

/// Every alias derivable from `reference`, the full ref included.
///
/// Duplicates are removed; order is unspecified but stable.
pub fn aliases(reference: &str) -> Vec<String> {
    let mut out = Vec::new();
    let dashes: Vec<&str> = reference.split('-').collect();
    push_runs(&dashes, '-', &mut out);
    for segment in &dashes {
        let dots: Vec<&str> = segment.split('.').collect();
        if dots.len() > 1 {
            push_runs(&dots, '.', &mut out);
        }
    }
    out
}

/// The `USER` alias value for an avatar ref: its first two dash-segments.
pub fn user_of(reference: &str) -> String {
    reference.splitn(3, '-').take(2).collect::<Vec<_>>().join("-")
}

fn push_runs(parts: &[&str], sep: char, out: &mut Vec<String>) {
    let sep = sep.to_string();
    for start in 0..parts.len() {
        for end in start + 1..=parts.len() {
            let alias = parts[start..end].join(&sep);
            if !alias.is_empty() && !out.contains(&alias) {
                out.push(alias);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[test]
    fn test_three_segment_ref() {
        assert_eq!(
            sorted(aliases("a-b-c")),
            vec!["a", "a-b", "a-b-c", "b", "b-c", "c"]
        );
    }

    #[test]
    fn test_dot_pieces_within_a_segment() {
        let all = aliases("context-Downtown.5f");
        for expected in ["context", "Downtown.5f", "context-Downtown.5f", "Downtown", "5f"] {
            assert!(all.contains(&expected.to_string()), "missing {expected}");
        }
        assert!(!all.contains(&"context-Downtown".to_string()));
    }

    #[test]
    fn test_single_segment() {
        assert_eq!(aliases("session"), vec!["session"]);
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        assert!(!aliases("a--b").contains(&String::new()));
    }

    #[test]
    fn test_user_of() {
        assert_eq!(user_of("user-randy-100"), "user-randy");
        assert_eq!(user_of("user-randy"), "user-randy");
        assert_eq!(user_of("user"), "user");
    }
}
