//! Weighted score fusion for hybrid search

use super::outcome::ResultItem;
use ahash::AHashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FusionError {
    #[error("Combined weights must be greater than 0")]
    InvalidWeights,
}

/// Engine weights scaled to sum to 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub keyword: f64,
    pub semantic: f64,
}

impl FusionWeights {
    /// Normalize raw weights by their sum
    pub fn normalize(keyword: f64, semantic: f64) -> Result<Self, FusionError> {
        let total = keyword + semantic;
        if !total.is_finite() || total <= 0.0 {
            return Err(FusionError::InvalidWeights);
        }

        Ok(Self {
            keyword: keyword / total,
            semantic: semantic / total,
        })
    }
}

/// Divisor that scales the highest score in a list to 1.0
///
/// Falls back to 1.0 when the maximum is not positive.
pub fn normalizer<I>(scores: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let max = scores.into_iter().fold(f64::NEG_INFINITY, f64::max);
    if max > 0.0 {
        max
    } else {
        1.0
    }
}

/// Merge keyword and semantic results into one list ranked by fused score
///
/// Keyword results seed the merged set with a zero semantic score; semantic
/// results are then folded in by chunk id. An engine's missing score counts
/// as 0.0 and the present engine keeps only its own weight share. Ties keep
/// insertion order, so keyword-origin items precede semantic-only items.
pub fn fuse(
    keyword: Vec<ResultItem>,
    semantic: Vec<ResultItem>,
    weights: FusionWeights,
    normalize: bool,
) -> Vec<ResultItem> {
    let keyword_norm = if normalize {
        normalizer(keyword.iter().map(|i| i.keyword_score.unwrap_or(0.0)))
    } else {
        1.0
    };
    let semantic_norm = if normalize {
        normalizer(semantic.iter().map(|i| i.semantic_score.unwrap_or(0.0)))
    } else {
        1.0
    };

    let mut merged: Vec<ResultItem> = Vec::with_capacity(keyword.len() + semantic.len());
    let mut index: AHashMap<String, usize> = AHashMap::new();

    for mut item in keyword {
        if index.contains_key(&item.chunk_id) {
            continue;
        }
        let score = item.keyword_score.unwrap_or(0.0) / keyword_norm;
        item.keyword_score = Some(score);
        item.semantic_score = Some(0.0);
        item.fused_score = Some(score * weights.keyword);
        index.insert(item.chunk_id.clone(), merged.len());
        merged.push(item);
    }

    for mut item in semantic {
        let score = item.semantic_score.unwrap_or(0.0) / semantic_norm;
        match index.get(&item.chunk_id) {
            Some(&pos) => {
                let existing = &mut merged[pos];
                let keyword_score = existing.keyword_score.unwrap_or(0.0);
                existing.semantic_score = Some(score);
                existing.distance = item.distance;
                existing.fused_score =
                    Some(keyword_score * weights.keyword + score * weights.semantic);
            }
            None => {
                item.keyword_score = Some(0.0);
                item.semantic_score = Some(score);
                item.fused_score = Some(score * weights.semantic);
                index.insert(item.chunk_id.clone(), merged.len());
                merged.push(item);
            }
        }
    }

    // Stable, so equal fused scores keep insertion order
    merged.sort_by(|a, b| {
        b.fused_score
            .unwrap_or(0.0)
            .total_cmp(&a.fused_score.unwrap_or(0.0))
    });

    merged
}
