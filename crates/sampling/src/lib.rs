//! Excerpt-set sampling strategies over an [`ExcerptBank`].
//!
//! All strategies share one primitive, [`sample_one`], and one rule: within
//! a set, each excerpt comes from a different source text when
//! `avoid_same_source` is on. A label whose bucket is exhausted is skipped,
//! not backfilled; a sample that collects nothing is dropped.

use std::collections::{BTreeMap, BTreeSet};

use bank::ExcerptBank;
use capability::ExcerptSet;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::warn;

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Draw one excerpt set for a label combination.
///
/// Labels are visited in the caller-supplied order; for each, one eligible
/// reference is drawn uniformly at random. Returns `None` when no label
/// yielded an excerpt.
pub fn sample_one(
    bank: &ExcerptBank,
    labels: &[String],
    max_excerpts: usize,
    avoid_same_source: bool,
    rng: &mut impl Rng,
) -> Option<ExcerptSet> {
    let mut excerpts = Vec::new();
    let mut source_labels = Vec::new();
    let mut source_text_ids = Vec::new();
    let mut used_sources: BTreeSet<&str> = BTreeSet::new();

    for label in labels {
        let eligible: Vec<_> = bank
            .bucket(label)
            .iter()
            .filter(|r| !avoid_same_source || !used_sources.contains(r.source_text_id.as_str()))
            .collect();

        let Some(reference) = eligible.choose(rng) else {
            continue; // exhausted bucket, skip the label
        };

        excerpts.push(reference.excerpt.clone());
        source_labels.push(label.clone());
        source_text_ids.push(reference.source_text_id.clone());
        used_sources.insert(reference.source_text_id.as_str());

        if excerpts.len() >= max_excerpts {
            break;
        }
    }

    if excerpts.is_empty() {
        return None;
    }

    Some(ExcerptSet {
        excerpts,
        source_labels,
        source_text_ids,
        target_labels: labels.to_vec(),
    })
}

/// Draw `n_samples` sets over uniformly random label combinations. Samples
/// that collect nothing are dropped, not retried.
pub fn sample_random_combinations(
    bank: &ExcerptBank,
    n_samples: usize,
    min_labels: usize,
    max_labels: usize,
    max_excerpts: usize,
    avoid_same_source: bool,
    seed: Option<u64>,
) -> Vec<ExcerptSet> {
    let available = bank.available_labels();
    if available.is_empty() {
        return Vec::new();
    }

    let mut rng = rng_from_seed(seed);
    let lo = min_labels.clamp(1, available.len());
    let hi = max_labels.clamp(lo, available.len());

    let mut sets = Vec::new();
    for _ in 0..n_samples {
        let k = rng.gen_range(lo..=hi);
        let labels: Vec<String> = available.choose_multiple(&mut rng, k).cloned().collect();

        if let Some(set) = sample_one(bank, &labels, max_excerpts, avoid_same_source, &mut rng) {
            sets.push(set);
        }
    }
    sets
}

/// Draw `n_per_combination` sets for each explicit label combination. A
/// combination naming a label absent from the bank is skipped with a
/// warning.
pub fn sample_targeted_combinations(
    bank: &ExcerptBank,
    combinations: &[Vec<String>],
    n_per_combination: usize,
    max_excerpts: usize,
    avoid_same_source: bool,
    seed: Option<u64>,
) -> Vec<ExcerptSet> {
    let mut rng = rng_from_seed(seed);
    let mut sets = Vec::new();

    for labels in combinations {
        let missing: Vec<&String> = labels.iter().filter(|l| !bank.has_label(l)).collect();
        if !missing.is_empty() {
            warn!(?missing, combination = ?labels, "labels not in bank, skipping combination");
            continue;
        }

        for _ in 0..n_per_combination {
            if let Some(set) = sample_one(bank, labels, max_excerpts, avoid_same_source, &mut rng) {
                sets.push(set);
            }
        }
    }
    sets
}

/// Draw sets biased toward underrepresented labels.
///
/// `label_counts` are corpus-wide frequencies; labels at or below the value
/// at `threshold_percentile` that also exist in the bank are "rare". Each
/// sample takes 1-2 rare labels, plus one non-rare label half the time.
/// Degrades to random sampling when nothing qualifies.
pub fn sample_underrepresented(
    bank: &ExcerptBank,
    label_counts: &BTreeMap<String, usize>,
    n_samples: usize,
    threshold_percentile: f64,
    max_excerpts: usize,
    avoid_same_source: bool,
    seed: Option<u64>,
) -> Vec<ExcerptSet> {
    if label_counts.is_empty() {
        return sample_random_combinations(bank, n_samples, 1, 3, max_excerpts, avoid_same_source, seed);
    }

    let mut counts: Vec<usize> = label_counts.values().copied().collect();
    counts.sort_unstable();
    let idx = ((counts.len() as f64) * threshold_percentile / 100.0) as usize;
    let threshold = counts[idx.min(counts.len() - 1)];

    let available: BTreeSet<String> = bank.available_labels().into_iter().collect();
    let rare: Vec<String> = label_counts
        .iter()
        .filter(|(label, count)| **count <= threshold && available.contains(*label))
        .map(|(label, _)| label.clone())
        .collect();

    if rare.is_empty() {
        warn!("no underrepresented labels present in bank, falling back to random sampling");
        return sample_random_combinations(bank, n_samples, 1, 3, max_excerpts, avoid_same_source, seed);
    }

    let mut rng = rng_from_seed(seed);
    let mut sets = Vec::new();

    for _ in 0..n_samples {
        let n_rare = rng.gen_range(1..=rare.len().min(2));
        let mut labels: Vec<String> = rare.choose_multiple(&mut rng, n_rare).cloned().collect();

        let others: Vec<&String> = available.iter().filter(|l| !labels.contains(l)).collect();
        if !others.is_empty() && rng.gen_bool(0.5) {
            if let Some(extra) = others.choose(&mut rng) {
                labels.push((*extra).clone());
            }
        }

        if let Some(set) = sample_one(bank, &labels, max_excerpts, avoid_same_source, &mut rng) {
            sets.push(set);
        }
    }
    sets
}
