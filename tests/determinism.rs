//! Repeated and concurrent runs over identical inputs must produce identical
//! results, cached or not. Multi-attribute disambiguation walks attributes in
//! a defined order, so there is no iteration-order lottery to lose.

use std::sync::Arc;
use std::thread;

use attrmatch::{
    AttrValue, Attribute, AttributeContainer, AttributeMatcher, AttributesSchema, CachedMatcher,
    CompatibilityRuleChain, DisambiguationRuleChain, EngineConfig, EqualityCompatibilityRule,
    MatchingStrategy, PreferenceDisambiguationRule,
};

fn producer_schema() -> AttributesSchema {
    let mut schema = AttributesSchema::new();
    schema.attribute(Attribute::str("flavor"));
    for (name, preferred) in [("abi", "arm"), ("libc", "glibc"), ("opt", "full")] {
        schema.register(
            Attribute::str(name),
            MatchingStrategy::new(
                CompatibilityRuleChain::new().with_rule(EqualityCompatibilityRule),
                DisambiguationRuleChain::new()
                    .with_rule(PreferenceDisambiguationRule::new(vec![AttrValue::from(preferred)])),
            ),
        );
    }
    schema
}

fn consumer_schema() -> AttributesSchema {
    let mut schema = AttributesSchema::new();
    schema.attribute(Attribute::str("flavor"));
    schema
}

fn candidate(abi: &str, libc: &str, opt: &str) -> AttributeContainer {
    AttributeContainer::new()
        .set(Attribute::str("flavor"), "release")
        .and_then(|c| c.set(Attribute::str("abi"), abi))
        .and_then(|c| c.set(Attribute::str("libc"), libc))
        .and_then(|c| c.set(Attribute::str("opt"), opt))
        .expect("kinds match")
}

fn candidates() -> Vec<AttributeContainer> {
    vec![
        candidate("arm", "glibc", "full"),
        candidate("arm", "glibc", "size"),
        candidate("arm", "musl", "full"),
        candidate("x86", "glibc", "full"),
    ]
}

fn request() -> AttributeContainer {
    AttributeContainer::new()
        .set(Attribute::str("flavor"), "release")
        .expect("kinds match")
}

#[test]
fn repeated_multi_attribute_disambiguation_is_stable() {
    let consumer = consumer_schema();
    let producer = producer_schema();
    let candidates = candidates();
    let request = request();
    let matcher = AttributeMatcher::new();

    let first = matcher
        .matches(&consumer, &producer, &candidates, &request, None)
        .expect("match succeeds");
    assert_eq!(first, vec![&candidates[0]]);
    for _ in 0..50 {
        let again = matcher
            .matches(&consumer, &producer, &candidates, &request, None)
            .expect("match succeeds");
        assert_eq!(again, first);
    }
}

#[test]
fn parallel_callers_share_one_cache_and_one_answer() {
    let cached = Arc::new(CachedMatcher::new(EngineConfig::default()).expect("valid config"));
    let candidates = Arc::new(candidates());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cached = cached.clone();
        let candidates = candidates.clone();
        handles.push(thread::spawn(move || {
            let consumer = consumer_schema();
            let producer = producer_schema();
            let request = request();
            let mut selections = Vec::new();
            for _ in 0..25 {
                let matches = cached
                    .matches(&consumer, &producer, &candidates, &request, None)
                    .expect("match succeeds");
                selections.push(
                    matches
                        .into_iter()
                        .cloned()
                        .collect::<Vec<AttributeContainer>>(),
                );
            }
            selections
        }));
    }

    let expected = vec![candidates[0].clone()];
    for handle in handles {
        let selections = handle.join().expect("worker thread");
        for selection in selections {
            assert_eq!(selection, expected);
        }
    }

    // Every thread issued the same logical request: one entry, not eight.
    assert_eq!(cached.cache_len(), 1);
}
