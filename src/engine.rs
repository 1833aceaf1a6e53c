use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use once_cell::sync::Lazy;
use tracing::{Level, debug, trace};

use crate::container::AttributeContainer;
use crate::error::MatchError;
use crate::metrics::metrics_recorder;
use crate::schema::{
    AttributesSchema, CompatibilityCheck, MatchingStrategy, MultipleCandidatesCheck,
};
use crate::types::{AttrValue, Attribute, AttributeValue, HasAttributes};


/// Strategy applied when the governing schema does not recognize an
/// attribute: compatible when missing, so an attribute unknown to both sides
/// never blocks a match.
static FALLBACK_STRATEGY: Lazy<MatchingStrategy> = Lazy::new(MatchingStrategy::default);

/// Resolve one attribute against one schema and one container.
///
/// Total over its inputs: `Unknown` when the schema does not recognize the
/// attribute (regardless of container contents), otherwise `Present` or
/// `Missing` depending on the container.
pub fn attribute_value(
    attribute: &Attribute,
    schema: &AttributesSchema,
    container: &AttributeContainer,
) -> AttributeValue {
    if !schema.has_attribute(attribute) {
        return AttributeValue::Unknown;
    }
    match container.get(attribute) {
        Some(value) => AttributeValue::Present(value.clone()),
        None => AttributeValue::Missing,
    }
}

/// Per-candidate running verdict for one match run.
///
/// `compatible` starts true and only ever flips to false; `matched` collects
/// the producer values judged compatible, which is what disambiguation later
/// groups on. Owned by a single run and discarded afterwards.
#[derive(Debug)]
struct MatchDetails {
    compatible: bool,
    matched: BTreeMap<Attribute, AttrValue>,
}

impl MatchDetails {
    fn new() -> Self {
        Self {
            compatible: true,
            matched: BTreeMap::new(),
        }
    }

    fn update(
        &mut self,
        attribute: &Attribute,
        consumer_schema: &AttributesSchema,
        producer_schema: &AttributesSchema,
        consumer_value: AttributeValue,
        producer_value: AttributeValue,
    ) -> Result<(), MatchError> {
        // The producer schema governs whenever the consumer side has no
        // usable value; the consumer schema governs otherwise, including when
        // only the producer side is missing or unknown.
        let schema_to_use = if consumer_value.is_present() {
            consumer_schema
        } else {
            producer_schema
        };
        let strategy = schema_to_use
            .matching_strategy(attribute)
            .unwrap_or(&FALLBACK_STRATEGY);
        let chain = strategy.compatibility();

        match (consumer_value, producer_value) {
            (AttributeValue::Present(consumer), AttributeValue::Present(producer)) => {
                let mut check = CompatibilityCheck::new(&consumer, &producer);
                chain
                    .execute(&mut check)
                    .map_err(|source| MatchError::RuleFailure {
                        attribute: attribute.name().to_string(),
                        strategy: chain.describe(),
                        source,
                    })?;
                if check.is_compatible() {
                    trace!(attribute = %attribute, value = %producer, "attribute_compatible");
                    self.matched.insert(attribute.clone(), producer);
                } else {
                    trace!(attribute = %attribute, "attribute_incompatible");
                    self.compatible = false;
                }
            }
            (_, producer_value) => {
                if chain.is_compatible_when_missing() {
                    if let AttributeValue::Present(value) = producer_value {
                        self.matched.insert(attribute.clone(), value);
                    }
                } else {
                    trace!(attribute = %attribute, "attribute_missing_incompatible");
                    self.compatible = false;
                }
            }
        }
        Ok(())
    }
}

/// The variant matching orchestrator.
///
/// Stateless and reentrant: each call owns its own per-candidate details and
/// performs no blocking I/O, so independent calls may run in parallel. Wrap
/// in [`CachedMatcher`](crate::cache::CachedMatcher) to memoize results.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeMatcher;

impl AttributeMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Select the candidates compatible with `consumer_attributes`, narrowed
    /// to the closest-matching subset when several are compatible.
    ///
    /// `filter`, when given, restricts the compared attributes to exactly its
    /// key set; otherwise the union of the consumer's and each candidate's
    /// keys is compared. An empty result means no compatible variant; a
    /// multi-element result means the candidates are still ambiguous after
    /// disambiguation. Neither is an error.
    pub fn matches<'a, T: HasAttributes>(
        &self,
        consumer_schema: &AttributesSchema,
        producer_schema: &AttributesSchema,
        candidates: &'a [T],
        consumer_attributes: &AttributeContainer,
        filter: Option<&AttributeContainer>,
    ) -> Result<Vec<&'a T>, MatchError> {
        let indices = self.match_indices(
            consumer_schema,
            producer_schema,
            candidates,
            consumer_attributes,
            filter,
        )?;
        Ok(indices.into_iter().map(|i| &candidates[i]).collect())
    }

    /// Positional form of [`matches`](Self::matches); the cache layer stores
    /// these indices as a bitmap over the candidate list.
    pub(crate) fn match_indices<T: HasAttributes>(
        &self,
        consumer_schema: &AttributesSchema,
        producer_schema: &AttributesSchema,
        candidates: &[T],
        consumer_attributes: &AttributeContainer,
        filter: Option<&AttributeContainer>,
    ) -> Result<Vec<usize>, MatchError> {
        let start = Instant::now();
        let span = tracing::span!(
            Level::DEBUG,
            "attrmatch.matches",
            candidates = candidates.len()
        );
        let _guard = span.enter();

        let mut details: BTreeMap<usize, MatchDetails> = BTreeMap::new();
        for (index, candidate) in candidates.iter().enumerate() {
            let attributes = candidate.attributes();
            // A candidate without attributes has nothing to match against; it
            // never enters the per-candidate details and is never returned.
            if attributes.is_empty() {
                continue;
            }
            let universe: BTreeSet<&Attribute> = match filter {
                Some(filter) => filter.keys().collect(),
                None => consumer_attributes.keys().chain(attributes.keys()).collect(),
            };
            let mut candidate_details = MatchDetails::new();
            for attribute in universe {
                let consumer_value =
                    attribute_value(attribute, consumer_schema, consumer_attributes);
                let producer_value = attribute_value(attribute, producer_schema, attributes);
                // Keep evaluating after an incompatible attribute: the
                // verdict is a running AND, not a short-circuit.
                candidate_details.update(
                    attribute,
                    consumer_schema,
                    producer_schema,
                    consumer_value,
                    producer_value,
                )?;
            }
            details.insert(index, candidate_details);
        }

        let compatible: Vec<(usize, &MatchDetails)> = details
            .iter()
            .filter(|(_, details)| details.compatible)
            .map(|(index, details)| (*index, details))
            .collect();

        let result = if compatible.len() > 1 {
            select_closest_matches(&compatible, consumer_schema, producer_schema)?
        } else {
            compatible.iter().map(|(index, _)| *index).collect()
        };

        let elapsed_micros = start.elapsed().as_micros();
        debug!(
            candidates = candidates.len(),
            compatible = compatible.len(),
            matched = result.len(),
            elapsed_micros,
            "match_complete"
        );
        if let Some(recorder) = metrics_recorder() {
            recorder.record_match(start.elapsed(), candidates.len(), result.len(), false);
        }
        Ok(result)
    }
}

/// Narrow several compatible candidates to the closest-matching subset.
///
/// Walks every attribute recorded by any compatible candidate, in attribute
/// order, letting that attribute's disambiguation chain mark the best value
/// groups and intersecting the running remainder with them. A chain that
/// expresses no opinion skips its attribute; an intersection that comes up
/// empty means the rules' preferences cannot be reconciled, so the full
/// compatible set is returned rather than wrongly picking none.
fn select_closest_matches(
    compatible: &[(usize, &MatchDetails)],
    consumer_schema: &AttributesSchema,
    producer_schema: &AttributesSchema,
) -> Result<Vec<usize>, MatchError> {
    let mut remaining: Vec<usize> = compatible.iter().map(|(index, _)| *index).collect();

    let mut all_attributes: BTreeSet<&Attribute> = BTreeSet::new();
    for (_, details) in compatible {
        all_attributes.extend(details.matched.keys());
    }

    for attribute in all_attributes {
        // Candidates that recorded nothing for this attribute group under
        // None, so a rule can still choose to retain them.
        let mut candidates_by_value: BTreeMap<Option<AttrValue>, Vec<usize>> = BTreeMap::new();
        for (index, details) in compatible {
            let value = details.matched.get(attribute).cloned();
            candidates_by_value.entry(value).or_default().push(*index);
        }

        let schema_to_use = if consumer_schema.has_attribute(attribute) {
            consumer_schema
        } else {
            producer_schema
        };
        let strategy = schema_to_use
            .matching_strategy(attribute)
            .unwrap_or(&FALLBACK_STRATEGY);
        let chain = strategy.disambiguation();

        let mut check = MultipleCandidatesCheck::new(candidates_by_value.keys().cloned().collect());
        chain
            .execute(&mut check)
            .map_err(|source| MatchError::RuleFailure {
                attribute: attribute.name().to_string(),
                strategy: chain.describe(),
                source,
            })?;
        if !check.has_opinion() {
            trace!(attribute = %attribute, "disambiguation_skipped");
            continue;
        }

        let best: BTreeSet<usize> = check
            .best()
            .filter_map(|value| candidates_by_value.get(value))
            .flatten()
            .copied()
            .collect();
        remaining.retain(|index| best.contains(index));
        if remaining.is_empty() {
            // the intersection is empty, so we cannot choose
            trace!(attribute = %attribute, "disambiguation_aborted");
            return Ok(compatible.iter().map(|(index, _)| *index).collect());
        }
    }

    if remaining.is_empty() {
        return Ok(compatible.iter().map(|(index, _)| *index).collect());
    }
    Ok(remaining)
}
