//! Vector similarity.

/// Cosine similarity of two vectors, clamped to `[-1, 1]`.
///
/// Returns 0 when the dimensions differ, either vector is empty or has zero
/// magnitude, or any component is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 || !dot.is_finite() || !norm_a.is_finite() || !norm_b.is_finite() {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32
}

/// True when `v` can take part in ranking: non-empty, finite, non-zero.
pub fn is_rankable(v: &[f32]) -> bool {
    !v.is_empty() && v.iter().all(|x| x.is_finite()) && v.iter().any(|x| *x != 0.0)
}
