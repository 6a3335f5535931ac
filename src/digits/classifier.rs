//! Digit classification against the tagged corpus.

use anyhow::{anyhow, Result};
use image::GrayImage;
use std::collections::BTreeMap;

use super::store::{validate_tag, SampleStore, UNTAGGED};
use crate::config::Config;
use crate::error::FatalError;
use crate::vision::TemplateMatcher;

/// A tagged reference glyph.
#[derive(Clone, Debug)]
pub struct LabeledGlyph {
    pub id: String,
    pub tag: String,
    pub image: GrayImage,
}

/// Best tag for a glyph.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub tag: String,
    pub score: f64,
    /// Gap to the best score of a different tag that also cleared the
    /// threshold. `Some` means the answer is ambiguous.
    pub competing: Option<f64>,
}

impl Classification {
    pub fn is_confident(&self) -> bool {
        self.competing.is_none()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub examined: usize,
    pub retired: usize,
    pub kept: usize,
    pub unreadable: usize,
}

/// Classifies digit masks with the tagged part of a [`SampleStore`].
///
/// Samples accepted during a run are matched against immediately but only
/// reach the store on [`DigitClassifier::flush`].
pub struct DigitClassifier<S: SampleStore> {
    store: S,
    corpus: Vec<LabeledGlyph>,
    pending: Vec<LabeledGlyph>,
    matcher: TemplateMatcher,
    recognition_threshold: f64,
    sampling_threshold: f64,
}

impl<S: SampleStore> DigitClassifier<S> {
    /// Loads every tagged sample. Unreadable samples are logged and skipped.
    pub fn load(store: S, config: &Config) -> Self {
        let mut corpus = Vec::new();
        let mut provisional = 0;

        for entry in store.entries() {
            if entry.is_provisional() {
                provisional += 1;
                continue;
            }
            match store.load_image(entry) {
                Ok(image) => corpus.push(LabeledGlyph {
                    id: entry.id.clone(),
                    tag: entry.tag.clone(),
                    image,
                }),
                Err(e) => crate::log(&format!("Skipping sample {}: {:#}", entry.id, e)),
            }
        }

        crate::log(&format!(
            "Loaded {} tagged sample(s), {} provisional",
            corpus.len(),
            provisional
        ));

        Self {
            store,
            corpus,
            pending: Vec::new(),
            matcher: TemplateMatcher::new(config.match_padding),
            recognition_threshold: config.recognition_threshold,
            sampling_threshold: config.sampling_threshold,
        }
    }

    pub fn glyphs(&self) -> &[LabeledGlyph] {
        &self.corpus
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn matcher(&self) -> &TemplateMatcher {
        &self.matcher
    }

    /// Classifies with the recognition threshold.
    pub fn classify(&self, glyph: &GrayImage) -> Result<Option<Classification>> {
        self.classify_with(glyph, self.recognition_threshold)
    }

    pub fn classify_with(&self, glyph: &GrayImage, threshold: f64) -> Result<Option<Classification>> {
        self.evaluate(glyph, threshold, threshold)
    }

    /// Whether the corpus already covers `glyph` well enough that a new
    /// sample of it adds nothing: the best tag clears the sampling threshold
    /// and no other tag clears the recognition threshold.
    pub fn covers(&self, glyph: &GrayImage) -> Result<bool> {
        let compete = self.sampling_threshold.min(self.recognition_threshold);
        Ok(self
            .evaluate(glyph, self.sampling_threshold, compete)?
            .is_some_and(|c| c.is_confident()))
    }

    /// Highest-scoring tag with no threshold applied, used to annotate
    /// provisional samples.
    pub fn best_guess(&self, glyph: &GrayImage) -> Option<(String, f64)> {
        self.corpus
            .iter()
            .filter_map(|sample| {
                self.matcher
                    .score(glyph, &sample.image)
                    .map(|score| (sample, score))
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(sample, score)| (sample.tag.clone(), score))
    }

    fn evaluate(&self, glyph: &GrayImage, accept: f64, compete: f64) -> Result<Option<Classification>> {
        let scores = self.corpus.iter().filter_map(|sample| {
            self.matcher
                .score(glyph, &sample.image)
                .map(|score| (sample.tag.as_str(), score))
        });
        decide(scores, accept, compete)
    }

    /// Adds a tagged sample to the in-memory corpus; returns its id.
    pub fn accept_sample(&mut self, glyph: GrayImage, tag: &str) -> Result<String> {
        validate_tag(tag)?;
        let sample = LabeledGlyph {
            id: uuid::Uuid::new_v4().to_string(),
            tag: tag.to_string(),
            image: glyph,
        };
        let id = sample.id.clone();
        self.corpus.push(sample.clone());
        self.pending.push(sample);
        Ok(id)
    }

    /// Writes accepted samples to the store. On failure the unwritten
    /// samples stay pending.
    pub fn flush(&mut self) -> Result<usize> {
        let pending = std::mem::take(&mut self.pending);
        for (i, sample) in pending.iter().enumerate() {
            if let Err(e) = self.store.insert(&sample.id, &sample.tag, None, &sample.image) {
                self.pending = pending[i..].to_vec();
                return Err(e);
            }
        }
        if !pending.is_empty() {
            crate::log(&format!("Flushed {} sample(s) to the corpus", pending.len()));
        }
        Ok(pending.len())
    }

    /// Stores a glyph for later manual tagging; returns its id.
    pub fn save_provisional(&mut self, glyph: &GrayImage, guess: Option<&str>) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let entry = self.store.insert(&id, UNTAGGED, guess, glyph)?;
        crate::log(&format!(
            "Saved provisional sample {}x{} as {}",
            glyph.width(),
            glyph.height(),
            entry.file
        ));
        Ok(id)
    }

    /// Tags a provisional sample, making it part of the corpus.
    pub fn promote(&mut self, id: &str, tag: &str) -> Result<()> {
        validate_tag(tag)?;
        let entry = self
            .store
            .entries()
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("No sample with id {}", id))?;
        let image = self.store.load_image(&entry)?;
        self.store.retag(id, tag)?;

        self.corpus.retain(|s| s.id != id);
        self.corpus.push(LabeledGlyph {
            id: id.to_string(),
            tag: tag.to_string(),
            image,
        });
        crate::log(&format!("Tagged sample {} as {}", id, tag));
        Ok(())
    }

    pub fn discard(&mut self, id: &str) -> Result<()> {
        self.store.remove(id)?;
        self.corpus.retain(|s| s.id != id);
        crate::log(&format!("Discarded sample {}", id));
        Ok(())
    }

    /// Deletes provisional samples the tagged corpus already covers.
    ///
    /// A sample is retired only when [`Self::covers`] holds for it, so a
    /// sample that still separates two close tags is never deleted.
    pub fn cleanup_provisional(&mut self) -> Result<CleanupReport> {
        let provisional: Vec<_> = self
            .store
            .entries()
            .iter()
            .filter(|e| e.is_provisional())
            .cloned()
            .collect();

        let mut report = CleanupReport::default();
        for entry in provisional {
            report.examined += 1;
            let image = match self.store.load_image(&entry) {
                Ok(image) => image,
                Err(e) => {
                    crate::log(&format!("Skipping sample {}: {:#}", entry.id, e));
                    report.unreadable += 1;
                    continue;
                }
            };

            if self.covers(&image)? {
                self.store.remove(&entry.id)?;
                crate::log(&format!("Retired {}", entry.file));
                report.retired += 1;
            } else {
                report.kept += 1;
            }
        }

        crate::log(&format!(
            "Cleanup: {} examined, {} retired, {} kept, {} unreadable",
            report.examined, report.retired, report.kept, report.unreadable
        ));
        Ok(report)
    }
}

/// Picks the best tag from `(tag, score)` pairs.
///
/// Only scores at or above `compete` take part. The winner must reach
/// `accept`. Any other tag that took part yields a competing factor equal to
/// the gap between the two best per-tag scores, which must be positive.
fn decide<'a>(
    scores: impl IntoIterator<Item = (&'a str, f64)>,
    accept: f64,
    compete: f64,
) -> Result<Option<Classification>> {
    let mut best_per_tag: BTreeMap<&str, f64> = BTreeMap::new();
    for (tag, score) in scores {
        if score < compete {
            continue;
        }
        let best = best_per_tag.entry(tag).or_insert(score);
        if score > *best {
            *best = score;
        }
    }

    let mut ranked: Vec<(&str, f64)> = best_per_tag.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let Some(&(tag, score)) = ranked.first() else {
        return Ok(None);
    };
    if score < accept {
        return Ok(None);
    }

    let competing = match ranked.get(1) {
        Some(&(_, competitor)) => {
            let gap = score - competitor;
            if gap <= 0.0 {
                return Err(FatalError::NonPositiveCompetingFactor {
                    tag: tag.to_string(),
                    best: score,
                    competitor,
                }
                .into());
            }
            Some(gap)
        }
        None => None,
    };

    Ok(Some(Classification {
        tag: tag.to_string(),
        score,
        competing,
    }))
}
