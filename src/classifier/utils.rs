use ndarray::{Array2, ArrayView1, Axis};

/// Row-wise softmax. Each row of the result is non-negative and sums to one.
pub(crate) fn softmax_rows(logits: &Array2<f32>) -> Array2<f32> {
    let mut out = logits.clone();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        if sum > 0.0 && sum.is_finite() {
            row.mapv_inplace(|v| v / sum);
        } else {
            let uniform = 1.0 / row.len() as f32;
            row.fill(uniform);
        }
    }
    out
}

/// Index of the largest value; ties go to the lowest index.
pub(crate) fn argmax(values: ArrayView1<f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &value) in values.iter().enumerate() {
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// One-hot rows for integer class targets.
pub(crate) fn one_hot(targets: &[usize], classes: usize) -> Array2<f32> {
    let mut out = Array2::zeros((targets.len(), classes));
    for (row, &target) in targets.iter().enumerate() {
        if target < classes {
            out[[row, target]] = 1.0;
        }
    }
    out
}

/// Mean categorical cross-entropy of `probs` against one-hot `targets`.
pub(crate) fn cross_entropy(probs: &Array2<f32>, targets: &Array2<f32>) -> f32 {
    let rows = probs.nrows().max(1) as f32;
    let mut total = 0.0f32;
    for (&p, &t) in probs.iter().zip(targets.iter()) {
        if t > 0.0 {
            total -= t * p.max(1e-7).ln();
        }
    }
    total / rows
}
