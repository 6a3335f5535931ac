//! Corpus statistics behind the matching thresholds.
//!
//! Every tagged sample is matched against every other one. The lowest score
//! between two samples of the same tag bounds how strict recognition may be;
//! the highest score between different tags bounds how lax it may be.

use std::collections::BTreeMap;
use std::fmt;

use super::classifier::LabeledGlyph;
use crate::vision::TemplateMatcher;

/// Scores at or above this are pixel-identical pairs; floating point keeps a
/// perfect match from always landing on exactly 1.0.
const SELF_MATCH: f64 = 1.0 - 1e-9;

/// Running min/max of a set of scores.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

impl ScoreRange {
    fn extend(range: &mut Option<Self>, score: f64) {
        match range {
            Some(r) => {
                r.min = r.min.min(score);
                r.max = r.max.max(score);
            }
            None => *range = Some(Self { min: score, max: score }),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TagStats {
    pub samples: usize,
    pub in_tag: Option<ScoreRange>,
    pub cross_tag: Option<ScoreRange>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CorpusStats {
    pub tags: BTreeMap<String, TagStats>,
}

impl CorpusStats {
    /// Lowest score between two samples of the same tag.
    pub fn min_in_tag(&self) -> Option<f64> {
        self.tags
            .values()
            .filter_map(|t| t.in_tag.map(|r| r.min))
            .min_by(f64::total_cmp)
    }

    /// Highest score between samples of different tags.
    pub fn max_cross_tag(&self) -> Option<f64> {
        self.tags
            .values()
            .filter_map(|t| t.cross_tag.map(|r| r.max))
            .max_by(f64::total_cmp)
    }
}

impl fmt::Display for CorpusStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let range = |r: Option<ScoreRange>| match r {
            Some(r) => format!("{:.4}..{:.4}", r.min, r.max),
            None => "-".to_string(),
        };
        for (tag, stats) in &self.tags {
            writeln!(
                f,
                "{:>8}  samples {:>3}  in-tag {:<14}  cross-tag {}",
                tag,
                stats.samples,
                range(stats.in_tag),
                range(stats.cross_tag)
            )?;
        }
        let value = |v: Option<f64>| v.map_or("-".to_string(), |v| format!("{:.4}", v));
        writeln!(f, "min in-tag: {}", value(self.min_in_tag()))?;
        write!(f, "max cross-tag: {}", value(self.max_cross_tag()))
    }
}

/// Matches every glyph against every other one. Identical pairs (scores of
/// [`SELF_MATCH`] or more) and pairs that cannot be matched are left out.
pub fn analyze_corpus(glyphs: &[LabeledGlyph], matcher: &TemplateMatcher) -> CorpusStats {
    let mut stats = CorpusStats::default();

    for (i, target) in glyphs.iter().enumerate() {
        let entry = stats.tags.entry(target.tag.clone()).or_default();
        entry.samples += 1;

        for (j, template) in glyphs.iter().enumerate() {
            if i == j {
                continue;
            }
            let Some(score) = matcher.score(&target.image, &template.image) else {
                continue;
            };
            if score >= SELF_MATCH {
                continue;
            }
            let range = if target.tag == template.tag {
                &mut entry.in_tag
            } else {
                &mut entry.cross_tag
            };
            ScoreRange::extend(range, score);
        }
    }

    crate::log(&format!(
        "Analyzed {} sample(s) over {} tag(s)",
        glyphs.len(),
        stats.tags.len()
    ));
    stats
}
