//! Host-side token selection over a logits row
//!
//! Greedy argmax and nucleus (top-p) sampling over a plain `f32` slice.
//! All arithmetic happens on the host; same seed + same row → same token.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Index of the largest logit.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn argmax(row: &[f32]) -> u32 {
    let mut max_idx = 0u32;
    let mut max_val = f32::NEG_INFINITY;
    for (i, &v) in row.iter().enumerate() {
        if v > max_val {
            max_val = v;
            max_idx = i as u32;
        }
    }
    max_idx
}

/// Sample a token via temperature-scaled top-p nucleus sampling.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn sample_top_p(row: &[f32], temperature: f32, top_p: f32, rng_seed: u64) -> u32 {
    let mut logits = row.to_vec();

    // Temperature
    #[allow(clippy::float_cmp)]
    if temperature != 1.0 {
        for l in &mut logits {
            *l /= temperature;
        }
    }

    // Softmax
    let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut probs: Vec<f32> = logits.iter().map(|l| (l - max_logit).exp()).collect();
    let sum: f32 = probs.iter().sum();
    for p in &mut probs {
        *p /= sum;
    }

    // Sort by probability descending
    let mut indexed: Vec<(usize, f32)> = probs.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    // Top-p nucleus
    let mut cumulative = 0.0f32;
    let mut cutoff = indexed.len();
    for (i, &(_, p)) in indexed.iter().enumerate() {
        cumulative += p;
        if cumulative >= top_p {
            cutoff = i + 1;
            break;
        }
    }
    let nucleus = &indexed[..cutoff];

    // Renormalize and draw
    let nucleus_sum: f32 = nucleus.iter().map(|(_, p)| p).sum();
    let mut rng = StdRng::seed_from_u64(rng_seed);
    let r: f32 = rng.gen();
    let mut cumul = 0.0;
    for &(idx, p) in nucleus {
        cumul += p / nucleus_sum;
        if cumul >= r {
            return idx as u32;
        }
    }

    // Fallback: most probable
    nucleus[0].0 as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_picks_the_peak() {
        assert_eq!(argmax(&[0.1, 5.0, -2.0, 3.0]), 1);
        assert_eq!(argmax(&[-1.0, -0.5]), 1);
    }

    #[test]
    fn tight_nucleus_degenerates_to_argmax() {
        // One dominant logit and a tiny top_p leave a single-token nucleus.
        let row = [0.0, 0.0, 50.0, 0.0];
        for seed in 0..20 {
            assert_eq!(sample_top_p(&row, 0.8, 0.01, seed), 2);
        }
    }

    #[test]
    fn same_seed_same_token() {
        let row = [1.0, 1.1, 0.9, 1.05];
        let a = sample_top_p(&row, 1.0, 0.95, 7);
        let b = sample_top_p(&row, 1.0, 0.95, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn sampled_token_is_in_vocab() {
        let row = [0.2, 0.4, 0.1, 0.9, 0.3];
        for seed in 0..50 {
            let tok = sample_top_p(&row, 1.3, 0.9, seed);
            assert!((tok as usize) < row.len());
        }
    }
}
