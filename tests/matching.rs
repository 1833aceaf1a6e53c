//! End-to-end variant selection through the public API: a consumer asking for
//! a release artifact among debug/release × packaging variants, with the
//! selection result broadcast over the events boundary.

use std::sync::{Arc, Mutex};

use attrmatch::{
    AttrValue, Attribute, AttributeContainer, AttributeMatcher, AttributesSchema, CachedMatcher,
    CompatibilityRuleChain, CustomEventListener, DisambiguationRuleChain, EngineConfig,
    EqualityCompatibilityRule, EventBroadcaster, MatchingStrategy, PreferenceDisambiguationRule,
    serialize_payload,
};

fn build_type() -> Attribute {
    Attribute::str("build-type")
}

fn packaging() -> Attribute {
    Attribute::str("packaging")
}

fn variant(build: &str, pack: &str) -> AttributeContainer {
    AttributeContainer::new()
        .set(build_type(), build)
        .and_then(|c| c.set(packaging(), pack))
        .expect("kinds match")
}

/// Consumer side: knows build-type only. Producer side: also knows packaging
/// and prefers jars when several packagings are compatible.
fn schemas() -> (AttributesSchema, AttributesSchema) {
    let mut consumer = AttributesSchema::new();
    consumer.attribute(build_type());

    let mut producer = AttributesSchema::new();
    producer.attribute(build_type());
    producer.register(
        packaging(),
        MatchingStrategy::new(
            CompatibilityRuleChain::new().with_rule(EqualityCompatibilityRule),
            DisambiguationRuleChain::new()
                .with_rule(PreferenceDisambiguationRule::new(vec![AttrValue::from("jar")])),
        ),
    );
    (consumer, producer)
}

#[test]
fn release_request_selects_the_release_jar() {
    let (consumer, producer) = schemas();
    let candidates = vec![
        variant("debug", "jar"),
        variant("release", "jar"),
        variant("release", "classes"),
    ];
    let request = AttributeContainer::new()
        .set(build_type(), "release")
        .expect("kinds match");

    let matches = AttributeMatcher::new()
        .matches(&consumer, &producer, &candidates, &request, None)
        .expect("match succeeds");
    assert_eq!(matches, vec![&candidates[1]]);
}

#[test]
fn packaging_filter_leaves_the_request_ambiguous() {
    let (consumer, producer) = schemas();
    let candidates = vec![variant("release", "jar"), variant("release", "classes")];
    let request = AttributeContainer::new()
        .set(build_type(), "release")
        .expect("kinds match");
    // Compare build-type only: packaging can no longer break the tie.
    let filter = AttributeContainer::new()
        .set(build_type(), "release")
        .expect("kinds match");

    let matches = AttributeMatcher::new()
        .matches(&consumer, &producer, &candidates, &request, Some(&filter))
        .expect("match succeeds");
    assert_eq!(matches.len(), 2);
}

#[test]
fn cached_selection_agrees_with_uncached() {
    let (consumer, producer) = schemas();
    let candidates = vec![
        variant("debug", "jar"),
        variant("release", "jar"),
        variant("release", "classes"),
    ];
    let request = AttributeContainer::new()
        .set(build_type(), "release")
        .expect("kinds match");

    let uncached = AttributeMatcher::new()
        .matches(&consumer, &producer, &candidates, &request, None)
        .expect("match succeeds");
    let cached = CachedMatcher::new(EngineConfig::default()).expect("valid config");
    for _ in 0..3 {
        let result = cached
            .matches(&consumer, &producer, &candidates, &request, None)
            .expect("match succeeds");
        assert_eq!(result, uncached);
    }
}

#[derive(Default)]
struct RecordingListener {
    payloads: Mutex<Vec<Vec<u8>>>,
}

impl CustomEventListener for RecordingListener {
    fn new_result(&self, _result_type: &str, payload: &[u8]) {
        self.payloads
            .lock()
            .expect("listener lock")
            .push(payload.to_vec());
    }
}

#[test]
fn selection_results_fan_out_to_typed_listeners() {
    let (consumer, producer) = schemas();
    let candidates = vec![variant("release", "jar"), variant("release", "classes")];
    let request = AttributeContainer::new()
        .set(build_type(), "release")
        .expect("kinds match");

    let matches = AttributeMatcher::new()
        .matches(&consumer, &producer, &candidates, &request, None)
        .expect("match succeeds");

    let broadcaster = EventBroadcaster::new();
    let listener = Arc::new(RecordingListener::default());
    let uninterested = Arc::new(RecordingListener::default());
    broadcaster.add_listener("variant.selected", listener.clone());
    broadcaster.add_listener("variant.rejected", uninterested.clone());

    let payload = serialize_payload(&matches).expect("containers serialize");
    broadcaster.new_result("variant.selected", &payload);

    let received = listener.payloads.lock().expect("listener lock");
    assert_eq!(received.len(), 1);
    let decoded: Vec<AttributeContainer> =
        serde_json::from_slice(&received[0]).expect("payload round-trips");
    assert_eq!(decoded, vec![candidates[0].clone()]);
    assert!(uninterested.payloads.lock().expect("listener lock").is_empty());
}
