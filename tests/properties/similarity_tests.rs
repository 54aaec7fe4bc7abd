use std::collections::HashSet;
use std::path::Path;

use proptest::prelude::*;

use dojo_import::config::SimilarityConfig;
use dojo_import::dedup::{Profile, SimilarityChecker, jaccard, text_similarity};

proptest! {
    #[test]
    fn jaccard_is_bounded_and_symmetric(
        a in prop::collection::hash_set("[a-e]{1,3}", 0..12),
        b in prop::collection::hash_set("[a-e]{1,3}", 0..12),
    ) {
        let ab = jaccard(&a, &b);
        let ba = jaccard(&b, &a);
        prop_assert!((0.0..=1.0).contains(&ab));
        prop_assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn non_empty_set_is_identical_to_itself(a in prop::collection::hash_set("[a-z]{2,6}", 1..10)) {
        prop_assert!((jaccard(&a, &a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn composite_score_is_bounded(
        doc_a in "[a-z #:\\-\n]{0,200}",
        doc_b in "[a-z #:\\-\n]{0,200}",
    ) {
        let config = SimilarityConfig::default();
        let a = Profile::from_document("alpha", Path::new("a"), &doc_a, &config);
        let b = Profile::from_document("beta", Path::new("b"), &doc_b, &config);
        let (score, _) = SimilarityChecker::new(config).compare(&a, &b);
        prop_assert!((0.0..=1.0).contains(&score));
    }
}

#[test]
fn empty_sets_score_zero() {
    let empty: HashSet<String> = HashSet::new();
    assert!(jaccard(&empty, &empty).abs() < f64::EPSILON);
    assert!(text_similarity("", "anything").abs() < f64::EPSILON);
}
