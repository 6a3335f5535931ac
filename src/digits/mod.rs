//! Digit sample management and digit recognition.
//!
//! This module provides:
//! - A corpus store with a sidecar index (and import from the legacy
//!   file-name convention)
//! - Template-based classification with confidence and ambiguity signals
//! - Provisional sample capture under a per-run quota, and automatic
//!   retirement of provisional samples the corpus already covers
//! - Corpus statistics used to derive the matching thresholds

pub mod analysis;
pub mod classifier;
pub mod collect;
pub mod store;

pub use analysis::{analyze_corpus, CorpusStats, ScoreRange, TagStats};
pub use classifier::{Classification, CleanupReport, DigitClassifier, LabeledGlyph};
pub use collect::{
    collect_from_screenshots, collect_provisional, glyph_candidates, CollectStats, GlyphCandidate,
    StoreQuota,
};
pub use store::{DirSampleStore, IndexEntry, SampleStore, UNTAGGED};
