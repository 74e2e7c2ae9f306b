//! Cosine distance and nearest-neighbour ranking.
//!
//! Used by repository implementations that compute similarity in-process
//! and by the retrieval engine when merging per-kind results.

use std::cmp::Ordering;

use uuid::Uuid;

use medconsult_types::condition::Condition;
use medconsult_types::consultation::Consultation;

/// A record carrying an optional similarity vector.
pub trait Embedded {
    fn record_id(&self) -> Uuid;
    fn vector(&self) -> Option<&[f32]>;
}

impl Embedded for Condition {
    fn record_id(&self) -> Uuid {
        self.id
    }

    fn vector(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }
}

impl Embedded for Consultation {
    fn record_id(&self) -> Uuid {
        self.id
    }

    fn vector(&self) -> Option<&[f32]> {
        self.summary_embedding.as_deref()
    }
}

/// `1 - cosine_similarity(a, b)`.
///
/// Returns `None` when the dimensions differ or either vector has zero
/// norm; such pairs are incomparable, not distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    let similarity = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
    Some((1.0 - similarity) as f32)
}

/// Order by distance ascending, then id ascending.
pub fn by_distance_then_id(a: (f32, Uuid), b: (f32, Uuid)) -> Ordering {
    a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1))
}

/// Rank candidates by cosine distance to `query`.
///
/// Keeps only candidates strictly closer than `max_distance`, skips
/// candidates without a vector or with a different dimension, and returns at
/// most `k` `(candidate, distance)` pairs ordered by distance then id.
pub fn rank_by_distance<T: Embedded>(
    query: &[f32],
    candidates: Vec<T>,
    k: usize,
    max_distance: f32,
) -> Vec<(T, f32)> {
    let mut scored: Vec<(T, f32)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let distance = candidate
                .vector()
                .and_then(|v| cosine_distance(query, v))?;
            (distance < max_distance).then_some((candidate, distance))
        })
        .collect();
    scored.sort_by(|(a, da), (b, db)| {
        by_distance_then_id((*da, a.record_id()), (*db, b.record_id()))
    });
    scored.truncate(k);
    scored
}
