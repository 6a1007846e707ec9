//! Fuzzy name matching for catalog search results
//!
//! A cheap token heuristic rather than edit distance. Near-ties are
//! expected; callers apply their own acceptance threshold.

/// Score for an exact match after normalization
pub const EXACT_SCORE: f64 = 1.0;

/// Score when one normalized name contains the other
pub const CONTAINMENT_SCORE: f64 = 0.8;

/// Weight applied to the token overlap ratio
pub const OVERLAP_WEIGHT: f64 = 0.6;

/// Lowercase, drop punctuation, collapse whitespace
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Similarity of two free-text names in `[0, 1]`
pub fn similarity(a: &str, b: &str) -> f64 {
    let norm_a = normalize(a);
    let norm_b = normalize(b);

    if norm_a == norm_b {
        return EXACT_SCORE;
    }
    if norm_a.contains(&norm_b) || norm_b.contains(&norm_a) {
        return CONTAINMENT_SCORE;
    }

    let words_a: Vec<&str> = norm_a.split(' ').collect();
    let words_b: Vec<&str> = norm_b.split(' ').collect();
    let common = words_a.iter().filter(|w| words_b.contains(w)).count();

    common as f64 / words_a.len().max(words_b.len()) as f64 * OVERLAP_WEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Jesus,   Etc. "), "jesus etc");
        assert_eq!(normalize("AC/DC"), "acdc");
        assert_eq!(normalize("Sigur Rós"), "sigur rós");
    }

    #[test]
    fn test_reflexive_ignoring_case_and_punctuation() {
        for name in ["Wilco", "Yankee Hotel Foxtrot", "Jesus, Etc.", "", "!!!"] {
            assert_eq!(similarity(name, name), 1.0);
        }
        assert_eq!(similarity("The Beatles!", "the beatles"), 1.0);
    }

    #[test]
    fn test_containment() {
        assert!(similarity("The Beatles", "Beatles") >= 0.8);
        assert_eq!(similarity("Beatles", "The Beatles"), CONTAINMENT_SCORE);
    }

    #[test]
    fn test_token_overlap() {
        // one of three tokens shared
        let score = similarity("Sky Blue Sky", "Blue Moon Rising");
        assert!((score - 0.2).abs() < 1e-9, "got {}", score);

        // two of four tokens shared, denominator is the longer name
        let score = similarity("summer teeth", "summer of teeth again");
        assert!((score - 0.3).abs() < 1e-9, "got {}", score);
    }

    #[test]
    fn test_disjoint_names_score_zero() {
        assert_eq!(similarity("Wilco", "Radiohead"), 0.0);
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        let pairs = [
            ("a a a", "a b c d"),
            ("x", "y z"),
            ("Being There", "Being There (Deluxe Edition)"),
        ];
        for (a, b) in pairs {
            let score = similarity(a, b);
            assert!((0.0..=1.0).contains(&score), "{} vs {} = {}", a, b, score);
        }
    }
}
