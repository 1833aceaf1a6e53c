use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::RuleError;
use crate::types::{AttrValue, Attribute};

/// View handed to a [`CompatibilityRule`] for one consumer/producer value
/// pair.
///
/// A rule inspects the two values and calls [`compatible`] or
/// [`incompatible`]; the last call wins across a chain. If no rule in the
/// chain calls either, the engine treats the pair as incompatible — a chain
/// must positively assert compatibility for it to count.
///
/// [`compatible`]: CompatibilityCheck::compatible
/// [`incompatible`]: CompatibilityCheck::incompatible
pub struct CompatibilityCheck<'a> {
    consumer: &'a AttrValue,
    producer: &'a AttrValue,
    verdict: Option<bool>,
}

impl<'a> CompatibilityCheck<'a> {
    pub(crate) fn new(consumer: &'a AttrValue, producer: &'a AttrValue) -> Self {
        Self {
            consumer,
            producer,
            verdict: None,
        }
    }

    /// The value the consumer requested.
    pub fn consumer_value(&self) -> &AttrValue {
        self.consumer
    }

    /// The value the candidate variant carries.
    pub fn producer_value(&self) -> &AttrValue {
        self.producer
    }

    pub fn compatible(&mut self) {
        self.verdict = Some(true);
    }

    pub fn incompatible(&mut self) {
        self.verdict = Some(false);
    }

    pub(crate) fn is_compatible(&self) -> bool {
        self.verdict == Some(true)
    }
}

/// View handed to a [`DisambiguationRule`]: the distinct values the
/// compatible candidates recorded for one attribute.
///
/// Candidates that recorded no value for the attribute form their own group,
/// keyed by `None`; a rule may mark it like any other group to retain such
/// candidates. A rule calls [`closest_match`] zero or more times to mark
/// value groups as "best"; the engine keeps only candidates in marked groups.
/// Marking a value that no candidate recorded is a no-op.
///
/// [`closest_match`]: MultipleCandidatesCheck::closest_match
pub struct MultipleCandidatesCheck {
    values: BTreeSet<Option<AttrValue>>,
    best: BTreeSet<Option<AttrValue>>,
}

impl MultipleCandidatesCheck {
    pub(crate) fn new(values: BTreeSet<Option<AttrValue>>) -> Self {
        Self {
            values,
            best: BTreeSet::new(),
        }
    }

    /// Distinct recorded values, in value order; `None` stands for the
    /// candidates that recorded no value.
    pub fn candidate_values(&self) -> impl Iterator<Item = Option<&AttrValue>> {
        self.values.iter().map(Option::as_ref)
    }

    /// Mark a value group as best; `None` marks the no-value group.
    pub fn closest_match(&mut self, value: Option<AttrValue>) {
        if self.values.contains(&value) {
            self.best.insert(value);
        }
    }

    pub(crate) fn best(&self) -> impl Iterator<Item = &Option<AttrValue>> {
        self.best.iter()
    }

    pub(crate) fn has_opinion(&self) -> bool {
        !self.best.is_empty()
    }
}

/// One link in a compatibility rule chain.
///
/// `id` must be stable for a given rule configuration: it participates in the
/// structural schema fingerprint the result cache keys on, so two rules with
/// equal ids are treated as interchangeable.
pub trait CompatibilityRule: Send + Sync {
    fn id(&self) -> String;

    fn execute(&self, check: &mut CompatibilityCheck<'_>) -> Result<(), RuleError>;
}

/// One link in a disambiguation rule chain. Same `id` contract as
/// [`CompatibilityRule`].
pub trait DisambiguationRule: Send + Sync {
    fn id(&self) -> String;

    fn execute(&self, check: &mut MultipleCandidatesCheck) -> Result<(), RuleError>;
}

/// Compatible iff the consumer and producer values are equal.
pub struct EqualityCompatibilityRule;

impl CompatibilityRule for EqualityCompatibilityRule {
    fn id(&self) -> String {
        "equality".to_string()
    }

    fn execute(&self, check: &mut CompatibilityCheck<'_>) -> Result<(), RuleError> {
        if check.consumer_value() == check.producer_value() {
            check.compatible();
        } else {
            check.incompatible();
        }
        Ok(())
    }
}

/// Marks the first value of `preference` that any candidate recorded.
pub struct PreferenceDisambiguationRule {
    preference: Vec<AttrValue>,
}

impl PreferenceDisambiguationRule {
    pub fn new(preference: Vec<AttrValue>) -> Self {
        Self { preference }
    }
}

impl DisambiguationRule for PreferenceDisambiguationRule {
    fn id(&self) -> String {
        let order: Vec<String> = self.preference.iter().map(|v| v.to_string()).collect();
        format!("prefer:{}", order.join(","))
    }

    fn execute(&self, check: &mut MultipleCandidatesCheck) -> Result<(), RuleError> {
        for value in &self.preference {
            let recorded = check.candidate_values().any(|v| v == Some(value));
            if recorded {
                check.closest_match(Some(value.clone()));
                return Ok(());
            }
        }
        Ok(())
    }
}

struct FnCompatibilityRule<F> {
    id: String,
    rule: F,
}

impl<F> CompatibilityRule for FnCompatibilityRule<F>
where
    F: Fn(&mut CompatibilityCheck<'_>) -> Result<(), RuleError> + Send + Sync,
{
    fn id(&self) -> String {
        self.id.clone()
    }

    fn execute(&self, check: &mut CompatibilityCheck<'_>) -> Result<(), RuleError> {
        (self.rule)(check)
    }
}

/// Wrap a closure as a [`CompatibilityRule`] under a stable `id`.
pub fn compatibility_rule<F>(id: impl Into<String>, rule: F) -> impl CompatibilityRule + 'static
where
    F: Fn(&mut CompatibilityCheck<'_>) -> Result<(), RuleError> + Send + Sync + 'static,
{
    FnCompatibilityRule {
        id: id.into(),
        rule,
    }
}

struct FnDisambiguationRule<F> {
    id: String,
    rule: F,
}

impl<F> DisambiguationRule for FnDisambiguationRule<F>
where
    F: Fn(&mut MultipleCandidatesCheck) -> Result<(), RuleError> + Send + Sync,
{
    fn id(&self) -> String {
        self.id.clone()
    }

    fn execute(&self, check: &mut MultipleCandidatesCheck) -> Result<(), RuleError> {
        (self.rule)(check)
    }
}

/// Wrap a closure as a [`DisambiguationRule`] under a stable `id`.
pub fn disambiguation_rule<F>(id: impl Into<String>, rule: F) -> impl DisambiguationRule + 'static
where
    F: Fn(&mut MultipleCandidatesCheck) -> Result<(), RuleError> + Send + Sync + 'static,
{
    FnDisambiguationRule {
        id: id.into(),
        rule,
    }
}

/// Ordered compatibility rules plus the missing-value policy for one
/// attribute.
#[derive(Clone)]
pub struct CompatibilityRuleChain {
    compatible_when_missing: bool,
    rules: Vec<Arc<dyn CompatibilityRule>>,
}

impl Default for CompatibilityRuleChain {
    fn default() -> Self {
        Self {
            compatible_when_missing: true,
            rules: Vec::new(),
        }
    }
}

impl CompatibilityRuleChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: impl CompatibilityRule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn add_rule(&mut self, rule: impl CompatibilityRule + 'static) {
        self.rules.push(Arc::new(rule));
    }

    /// Whether a value missing on (or unknown to) one side counts as
    /// compatible. Defaults to true.
    pub fn compatible_when_missing(mut self, on: bool) -> Self {
        self.compatible_when_missing = on;
        self
    }

    pub fn set_compatible_when_missing(&mut self, on: bool) {
        self.compatible_when_missing = on;
    }

    pub fn is_compatible_when_missing(&self) -> bool {
        self.compatible_when_missing
    }

    pub(crate) fn execute(&self, check: &mut CompatibilityCheck<'_>) -> Result<(), RuleError> {
        for rule in &self.rules {
            rule.execute(check)?;
        }
        Ok(())
    }

    pub(crate) fn describe(&self) -> String {
        let ids: Vec<String> = self.rules.iter().map(|r| r.id()).collect();
        format!("compatibility[{}]", ids.join(","))
    }

    fn rule_ids(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.id()).collect()
    }
}

/// Ordered disambiguation rules for one attribute.
#[derive(Clone, Default)]
pub struct DisambiguationRuleChain {
    rules: Vec<Arc<dyn DisambiguationRule>>,
}

impl DisambiguationRuleChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: impl DisambiguationRule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn add_rule(&mut self, rule: impl DisambiguationRule + 'static) {
        self.rules.push(Arc::new(rule));
    }

    pub(crate) fn execute(&self, check: &mut MultipleCandidatesCheck) -> Result<(), RuleError> {
        for rule in &self.rules {
            rule.execute(check)?;
        }
        Ok(())
    }

    pub(crate) fn describe(&self) -> String {
        let ids: Vec<String> = self.rules.iter().map(|r| r.id()).collect();
        format!("disambiguation[{}]", ids.join(","))
    }

    fn rule_ids(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.id()).collect()
    }
}

/// Per-attribute pairing of a compatibility chain and a disambiguation chain.
#[derive(Clone)]
pub struct MatchingStrategy {
    compatibility: CompatibilityRuleChain,
    disambiguation: DisambiguationRuleChain,
}

impl Default for MatchingStrategy {
    /// Equality compatibility, no disambiguation rules, compatible when
    /// missing. This is what [`AttributesSchema::attribute`] registers.
    fn default() -> Self {
        Self {
            compatibility: CompatibilityRuleChain::new().with_rule(EqualityCompatibilityRule),
            disambiguation: DisambiguationRuleChain::new(),
        }
    }
}

impl MatchingStrategy {
    pub fn new(
        compatibility: CompatibilityRuleChain,
        disambiguation: DisambiguationRuleChain,
    ) -> Self {
        Self {
            compatibility,
            disambiguation,
        }
    }

    pub fn compatibility(&self) -> &CompatibilityRuleChain {
        &self.compatibility
    }

    pub fn compatibility_mut(&mut self) -> &mut CompatibilityRuleChain {
        &mut self.compatibility
    }

    pub fn disambiguation(&self) -> &DisambiguationRuleChain {
        &self.disambiguation
    }

    pub fn disambiguation_mut(&mut self) -> &mut DisambiguationRuleChain {
        &mut self.disambiguation
    }

    fn fingerprint(&self) -> StrategyFingerprint {
        StrategyFingerprint {
            compatible_when_missing: self.compatibility.is_compatible_when_missing(),
            compatibility: self.compatibility.rule_ids(),
            disambiguation: self.disambiguation.rule_ids(),
        }
    }
}

/// Registry of the attributes one side of the negotiation knows about and the
/// matching strategy for each.
///
/// The consumer and producer sides each own a schema; they may disagree on
/// which attributes they know, which is what drives the tri-state resolution
/// in the engine.
#[derive(Clone, Default)]
pub struct AttributesSchema {
    strategies: BTreeMap<Attribute, MatchingStrategy>,
}

impl AttributesSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `attribute` with the default strategy (equality
    /// compatibility) if absent, and return its strategy for configuration.
    pub fn attribute(&mut self, attribute: Attribute) -> &mut MatchingStrategy {
        self.strategies.entry(attribute).or_default()
    }

    /// Register `attribute` with an explicit strategy, replacing any previous
    /// registration.
    pub fn register(&mut self, attribute: Attribute, strategy: MatchingStrategy) {
        self.strategies.insert(attribute, strategy);
    }

    pub fn has_attribute(&self, attribute: &Attribute) -> bool {
        self.strategies.contains_key(attribute)
    }

    pub fn matching_strategy(&self, attribute: &Attribute) -> Option<&MatchingStrategy> {
        self.strategies.get(attribute)
    }

    /// Structural identity of this schema for cache keying: the registered
    /// attributes plus each strategy's missing-value policy and rule ids.
    pub(crate) fn fingerprint(&self) -> SchemaFingerprint {
        SchemaFingerprint(
            self.strategies
                .iter()
                .map(|(attribute, strategy)| (attribute.clone(), strategy.fingerprint()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct StrategyFingerprint {
    compatible_when_missing: bool,
    compatibility: Vec<String>,
    disambiguation: Vec<String>,
}

/// Value-comparable identity of an [`AttributesSchema`]; see
/// [`AttributesSchema::fingerprint`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SchemaFingerprint(Vec<(Attribute, StrategyFingerprint)>);
