//! # attrmatch
//!
//! ## Purpose
//!
//! `attrmatch` is an attribute-based variant matching engine: given a
//! consumer's requested set of typed attributes and a collection of candidate
//! variants (each carrying its own attribute set), it determines which
//! candidates are *compatible* and, when several remain, *disambiguates* to
//! the closest-matching subset using per-attribute, schema-supplied rules.
//! This is the decision procedure a build or dependency system uses to pick
//! the right artifact variant (debug vs release, jar vs classes) among many
//! published alternatives, without hard-coding any attribute's semantics into
//! the engine.
//!
//! No attribute is special: each side of the negotiation registers the
//! attributes it knows in an [`AttributesSchema`], pairing each with a
//! [`MatchingStrategy`] — a compatibility rule chain (is this consumer value
//! satisfied by that producer value?) and a disambiguation rule chain (which
//! of several compatible values is closest?). Attributes a schema does not
//! recognize resolve as unknown and are governed by the missing-value policy,
//! so extra dimensions on either side never block a match by default.
//!
//! ## Core Types
//!
//! - [`Attribute`] / [`AttrValue`]: typed, named dimensions and their values.
//! - [`AttributeContainer`]: an immutable attribute → value mapping; each
//!   candidate and the consumer request own one.
//! - [`AttributesSchema`]: the attributes one side knows, each with its
//!   [`MatchingStrategy`].
//! - [`AttributeMatcher`]: the stateless matching orchestrator.
//! - [`CachedMatcher`]: the same, memoized behind a bounded LRU keyed by the
//!   structural identity of all inputs.
//!
//! ## Example Usage
//!
//! ```
//! use attrmatch::{
//!     Attribute, AttributeContainer, AttributeMatcher, AttributesSchema,
//! };
//!
//! let flavor = Attribute::str("flavor");
//!
//! let mut schema = AttributesSchema::new();
//! schema.attribute(flavor.clone()); // equality compatibility by default
//!
//! let request = AttributeContainer::new()
//!     .set(flavor.clone(), "release")
//!     .unwrap();
//! let candidates = vec![
//!     AttributeContainer::new().set(flavor.clone(), "release").unwrap(),
//!     AttributeContainer::new().set(flavor.clone(), "debug").unwrap(),
//! ];
//!
//! let matcher = AttributeMatcher::new();
//! let matches = matcher
//!     .matches(&schema, &schema, &candidates, &request, None)
//!     .unwrap();
//! assert_eq!(matches, vec![&candidates[0]]);
//! ```
//!
//! An empty result means no compatible variant; a multi-element result means
//! the candidates are still ambiguous after disambiguation. Both are
//! ordinary, non-error outcomes — how to report them belongs to the caller.
//!
//! ## Observability
//!
//! Install a [`MatchMetrics`] implementation via [`set_match_metrics`] to
//! record per-run latency, candidate counts, and cache hits. The crate logs
//! through `tracing` and installs no subscriber of its own.

pub mod cache;
pub mod config;
pub mod container;
pub mod engine;
pub mod error;
pub mod events;
pub mod metrics;
pub mod schema;
pub mod types;

pub use crate::cache::{CacheStats, CachedMatcher, MatchCache};
pub use crate::config::EngineConfig;
pub use crate::container::AttributeContainer;
pub use crate::engine::{AttributeMatcher, attribute_value};
pub use crate::error::{MatchError, RuleError};
pub use crate::events::{CustomEventListener, EventBroadcaster, serialize_payload};
pub use crate::metrics::{MatchMetrics, set_match_metrics};
pub use crate::schema::{
    AttributesSchema, CompatibilityCheck, CompatibilityRule, CompatibilityRuleChain,
    DisambiguationRule, DisambiguationRuleChain, EqualityCompatibilityRule, MatchingStrategy,
    MultipleCandidatesCheck, PreferenceDisambiguationRule, compatibility_rule,
    disambiguation_rule,
};
pub use crate::types::{AttrValue, Attribute, AttributeValue, HasAttributes, ValueKind};
