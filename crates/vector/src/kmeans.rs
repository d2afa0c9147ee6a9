use docsum_common::{DocsumError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use tracing::debug;

/// Result of a single k-means run
#[derive(Debug, Clone)]
pub struct KMeansResult {
    pub k: usize,

    /// `k × D` centroid matrix
    pub centroids: Array2<f64>,

    /// Centroid index per row
    pub assignments: Vec<usize>,

    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,

    pub iterations: usize,
}

/// Deterministic k-means over the rows of `data`.
///
/// Seeding is farthest-point k-means++: the first centroid is row 0, every
/// further centroid is the row farthest from the centroids chosen so far.
/// Ties always resolve to the lowest index, so identical input gives
/// identical output.
pub fn kmeans(data: &Array2<f64>, k: usize, max_iterations: usize) -> Result<KMeansResult> {
    let n = data.nrows();
    if n == 0 || data.ncols() == 0 {
        return Err(DocsumError::clustering_failed("empty embedding matrix"));
    }
    if k == 0 || k > n {
        return Err(DocsumError::clustering_failed(format!(
            "k={} outside 1..={}",
            k, n
        )));
    }

    let mut centroids = seed_centroids(data, k);
    let mut assignments = assign(data, &centroids);
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;
        update_centroids(data, &assignments, &mut centroids);

        let next = assign(data, &centroids);
        if next == assignments {
            break;
        }
        assignments = next;
    }

    let inertia = data
        .outer_iter()
        .zip(&assignments)
        .map(|(row, &c)| squared_distance(row, centroids.row(c)))
        .sum();

    debug!("k-means k={} converged after {} iterations", k, iterations);

    Ok(KMeansResult {
        k,
        centroids,
        assignments,
        inertia,
        iterations,
    })
}

pub(crate) fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn seed_centroids(data: &Array2<f64>, k: usize) -> Array2<f64> {
    let n = data.nrows();
    let mut centroids = Array2::zeros((k, data.ncols()));
    centroids.row_mut(0).assign(&data.row(0));

    // Squared distance of every row to its nearest chosen centroid
    let mut nearest: Vec<f64> = data
        .outer_iter()
        .map(|row| squared_distance(row, data.row(0)))
        .collect();

    for c in 1..k {
        let mut best = 0;
        for i in 1..n {
            if nearest[i] > nearest[best] {
                best = i;
            }
        }

        centroids.row_mut(c).assign(&data.row(best));
        for (i, row) in data.outer_iter().enumerate() {
            let d = squared_distance(row, data.row(best));
            if d < nearest[i] {
                nearest[i] = d;
            }
        }
    }

    centroids
}

fn assign(data: &Array2<f64>, centroids: &Array2<f64>) -> Vec<usize> {
    data.outer_iter()
        .map(|row| {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (c, centroid) in centroids.outer_iter().enumerate() {
                let d = squared_distance(row, centroid);
                if d < best_distance {
                    best = c;
                    best_distance = d;
                }
            }
            best
        })
        .collect()
}

/// Move each centroid to the mean of its members; empty clusters keep theirs
fn update_centroids(data: &Array2<f64>, assignments: &[usize], centroids: &mut Array2<f64>) {
    let k = centroids.nrows();
    let mut sums = Array2::<f64>::zeros(centroids.raw_dim());
    let mut counts = vec![0usize; k];

    for (row, &c) in data.outer_iter().zip(assignments) {
        let mut sum = sums.row_mut(c);
        sum += &row;
        counts[c] += 1;
    }

    for (c, count) in counts.into_iter().enumerate() {
        if count > 0 {
            let mean: Array1<f64> = sums.index_axis(Axis(0), c).mapv(|v| v / count as f64);
            centroids.row_mut(c).assign(&mean);
        }
    }
}
