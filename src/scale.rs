// Numeric-to-color scales

/// A scale mapping numbers onto a discrete color range.
///
/// Quantize, quantile and threshold scales all reduce to the same shape:
/// a sorted list of break points and a range with one more color than
/// there are breaks.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScaleFn {
    thresholds: Vec<f64>,
    range: Vec<String>,
}

impl ColorScaleFn {
    /// Equal-width buckets over the extent of `domain`.
    pub fn quantize(domain: &[f64], range: Vec<String>) -> Self {
        let thresholds = match extent(domain) {
            Some((x0, x1)) => {
                let k = range.len() as f64;
                (1..range.len())
                    .map(|i| x0 + (x1 - x0) * i as f64 / k)
                    .collect()
            }
            None => Vec::new(),
        };
        ColorScaleFn { thresholds, range }
    }

    /// Equal-population buckets over the sorted domain.
    pub fn quantile(domain: &[f64], range: Vec<String>) -> Self {
        let mut sorted: Vec<f64> = domain.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = range.len();
        let thresholds = if sorted.is_empty() {
            Vec::new()
        } else {
            (1..n)
                .map(|i| quantile_sorted(&sorted, i as f64 / n as f64))
                .collect()
        };
        ColorScaleFn { thresholds, range }
    }

    /// Explicit break points. Breaks beyond `range.len() - 1` are unused.
    pub fn threshold(domain: &[f64], range: Vec<String>) -> Self {
        let usable = domain.len().min(range.len().saturating_sub(1));
        ColorScaleFn {
            thresholds: domain[..usable].to_vec(),
            range,
        }
    }

    /// Color for a value. Anything that is not a number gets the first color.
    pub fn map(&self, value: Option<f64>) -> &str {
        let index = match value {
            Some(v) if !v.is_nan() => bisect_right(&self.thresholds, v),
            _ => 0,
        };
        self.range
            .get(index)
            .or_else(|| self.range.last())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }
}

/// Min and max of the finite values in `values`.
pub fn extent(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Linear-interpolated quantile of an ascending, non-empty slice.
fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if p <= 0.0 || n < 2 {
        return sorted[0];
    }
    if p >= 1.0 {
        return sorted[n - 1];
    }
    let i = (n - 1) as f64 * p;
    let i0 = i.floor() as usize;
    let v0 = sorted[i0];
    let v1 = sorted[i0 + 1];
    v0 + (v1 - v0) * (i - i0 as f64)
}

/// Number of break points less than or equal to `x`.
fn bisect_right(sorted: &[f64], x: f64) -> usize {
    sorted.partition_point(|t| *t <= x)
}
