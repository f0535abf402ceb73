//! Core type definitions for driftguard.
//!
//! This crate holds the pure, I/O-free building blocks of the reconciliation
//! engine:
//! - Entity identifiers and the `:`-delimited composite identifier codec
//! - Tag sets and the precedence rules that merge default, declared and
//!   remote tags into the views the engine sends upstream and reports back
//!
//! Remote clients, configuration stores and the reconciler itself live in
//! `driftguard-engine`.

mod ident;
mod tags;

pub use ident::{
    CompositeId, DELIMITER, EntityIdentifier, IdentifierError, ListenerPolicyId, NaturalKey,
    decode_components, encode_components,
};
pub use tags::{
    DefaultTagRemoval, IgnoreTagsConfig, TagDelta, TagPolicy, TagSet, TagViews, effective_tags,
    exposed_tags,
};
