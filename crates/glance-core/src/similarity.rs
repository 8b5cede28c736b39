//! Text cleanup and the similarity ratio used for change detection.

use unicode_normalization::UnicodeNormalization;

/// Normalize recognized text before comparison: NFKC plus edge trimming,
/// so full-width/half-width and composed/decomposed variants of the same
/// screen content compare as equal.
pub fn clean_text(text: &str) -> String {
    text.nfkc().collect::<String>().trim().to_string()
}

/// Symmetric similarity ratio in `[0, 1]`; `1.0` means identical.
///
/// Counts characters covered by common contiguous blocks (longest block
/// first, then recursing into the unmatched remainders) and scales by the
/// combined length. Two empty strings are identical.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let matches = matching_chars(&a, &b);
    2.0 * matches as f64 / (a.len() + b.len()) as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (start_a, start_b, len) = longest_common_block(a, b);
    if len == 0 {
        return 0;
    }
    len + matching_chars(&a[..start_a], &b[..start_b])
        + matching_chars(&a[start_a + len..], &b[start_b + len..])
}

/// Longest common contiguous block, by single-row dynamic programming.
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut lengths = vec![0usize; b.len() + 1];
    let mut best = (0, 0, 0);
    for (i, ch) in a.iter().enumerate() {
        for j in (0..b.len()).rev() {
            if *ch == b[j] {
                let len = lengths[j] + 1;
                lengths[j + 1] = len;
                if len > best.2 {
                    best = (i + 1 - len, j + 1 - len, len);
                }
            } else {
                lengths[j + 1] = 0;
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(ratio("status: ready", "status: ready"), 1.0);
        assert_eq!(ratio("", ""), 1.0);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(ratio("abc", "xyz"), 0.0);
        assert_eq!(ratio("", "something"), 0.0);
    }

    #[test]
    fn partial_overlap_scores_between() {
        // Common blocks cover "bcd": 2 * 3 / 8.
        assert_eq!(ratio("abcd", "bcde"), 0.75);
    }

    #[test]
    fn ratio_is_symmetric() {
        let pairs = [
            ("loading 45%", "loading 46%"),
            ("Play", "Pause"),
            ("line one\nline two", "line one\nline three"),
        ];
        for (a, b) in pairs {
            assert_eq!(ratio(a, b), ratio(b, a));
        }
    }

    #[test]
    fn clean_text_folds_compatibility_forms() {
        // Full-width digits normalize to ASCII under NFKC.
        assert_eq!(clean_text("  ５０％  "), "50%");
        assert_eq!(clean_text("\n\t"), "");
    }
}
