use bigdecimal::{BigDecimal, Zero};

use crate::models::{ClassifiedLineItem, MatchCriteria, MatchingAlgorithm};
use crate::money;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "to", "for", "with", "w", "on", "in", "at", "as", "by",
    "per", "is",
];

/// Weights of the hybrid score.
const EXACT_WEIGHT: f64 = 0.4;
const FUZZY_WEIGHT: f64 = 0.3;
const CATEGORY_WEIGHT: f64 = 0.2;
const PRICE_WEIGHT: f64 = 0.1;

/// Relative price gap at which price similarity reaches zero.
const PRICE_DECAY_RATIO: f64 = 0.5;

/// Lowercase, strip punctuation, drop stop words, collapse whitespace.
pub fn normalize_description(description: &str) -> String {
    let cleaned: String = description
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect::<String>()
        .to_lowercase();

    cleaned
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Character-level Levenshtein distance.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// `1 - distance / longer length` over already-normalized descriptions.
pub fn fuzzy_similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    let distance = edit_distance(a, b) as f64;
    money::round_score(1.0 - distance / longest as f64)
}

/// Linear decay from 1 at equal prices to 0 once the gap reaches half the
/// pair's average price.
pub fn price_similarity(a: &BigDecimal, b: &BigDecimal) -> f64 {
    let a = a.abs();
    let b = b.abs();
    if a.is_zero() && b.is_zero() {
        return 1.0;
    }

    let average = (&a + &b) / BigDecimal::from(2);
    let gap_ratio = money::to_ratio(&((&a - &b).abs() / average));
    money::round_score((1.0 - gap_ratio / PRICE_DECAY_RATIO).max(0.0))
}

/// 1 for equal hints, 0.5 when either is missing, 0 when they disagree.
pub fn category_match(a: Option<&str>, b: Option<&str>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) if a == b => 1.0,
        (Some(_), Some(_)) => 0.0,
        _ => 0.5,
    }
}

pub fn categories_compatible(a: Option<&str>, b: Option<&str>) -> bool {
    category_match(a, b) > 0.0
}

/// Score of pairing `revised` with `original` under `algorithm`, in [0, 1].
pub fn score_pair(
    original: &ClassifiedLineItem,
    revised: &ClassifiedLineItem,
    algorithm: MatchingAlgorithm,
) -> (f64, MatchCriteria) {
    let original_category = original.item.category_key();
    let revised_category = revised.item.category_key();
    let compatible = categories_compatible(original_category.as_deref(), revised_category.as_deref());

    let same_description =
        original.item.normalized_description == revised.item.normalized_description;
    let criteria = MatchCriteria {
        exact_description: same_description && compatible,
        fuzzy_similarity: fuzzy_similarity(
            &original.item.normalized_description,
            &revised.item.normalized_description,
        ),
        category_match: category_match(original_category.as_deref(), revised_category.as_deref()),
        price_similarity: price_similarity(&original.item.unit_price, &revised.item.unit_price),
    };

    let score = match algorithm {
        MatchingAlgorithm::Exact => {
            if criteria.exact_description {
                1.0
            } else {
                0.0
            }
        }
        MatchingAlgorithm::Fuzzy => {
            if compatible {
                criteria.fuzzy_similarity
            } else {
                0.0
            }
        }
        MatchingAlgorithm::Hybrid => {
            let exact = if criteria.exact_description { 1.0 } else { 0.0 };
            let weighted = EXACT_WEIGHT * exact
                + FUZZY_WEIGHT * criteria.fuzzy_similarity
                + CATEGORY_WEIGHT * criteria.category_match
                + PRICE_WEIGHT * criteria.price_similarity;
            if criteria.exact_description {
                1.0
            } else {
                weighted
            }
        }
    };

    (money::round_score(score.clamp(0.0, 1.0)), criteria)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn normalizes_descriptions() {
        assert_eq!(normalize_description("  Front Bumper-Cover, (R&I) "), "front bumper cover r i");
        assert_eq!(normalize_description("Replace the Hood"), "replace hood");
        assert_eq!(normalize_description("!!!"), "");
    }

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }

    #[test]
    fn fuzzy_similarity_bounds() {
        assert_eq!(fuzzy_similarity("front bumper", "front bumper"), 1.0);
        assert_eq!(fuzzy_similarity("", ""), 1.0);
        let s = fuzzy_similarity("front bumper", "frnt bumper");
        assert!(s > 0.9 && s < 1.0);
        assert_eq!(fuzzy_similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn price_similarity_decays_linearly() {
        assert_eq!(price_similarity(&d("100"), &d("100")), 1.0);
        // gap 20 over average 100 -> ratio 0.2 -> 1 - 0.4
        assert_eq!(price_similarity(&d("90"), &d("110")), 0.6);
        // gap beyond half the average
        assert_eq!(price_similarity(&d("100"), &d("300")), 0.0);
        assert_eq!(price_similarity(&d("0"), &d("0")), 1.0);
        assert_eq!(price_similarity(&d("0"), &d("10")), 0.0);
    }

    #[test]
    fn category_match_levels() {
        assert_eq!(category_match(Some("oem"), Some("oem")), 1.0);
        assert_eq!(category_match(Some("oem"), None), 0.5);
        assert_eq!(category_match(None, None), 0.5);
        assert_eq!(category_match(Some("oem"), Some("labor")), 0.0);
        assert!(!categories_compatible(Some("oem"), Some("labor")));
    }
}
