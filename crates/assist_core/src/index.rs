use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("cannot build a similarity index over zero vectors")]
    Empty,
}

/// Nearest neighbor of a query: the position of the matched vector and the
/// squared Euclidean distance to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// Flat nearest-neighbor index over a fixed set of embeddings, built once at
/// startup and read-only afterwards. A linear scan is exact and more than
/// fast enough for a knowledge base of tens of entries.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    dim: usize,
    // row-major, rows.len() * dim
    rows: Vec<f32>,
    len: usize,
}

impl SimilarityIndex {
    pub fn build<'a, I>(vectors: I) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = &'a [f32]>,
    {
        let mut iter = vectors.into_iter();
        let first = iter.next().ok_or(IndexError::Empty)?;
        let dim = first.len();

        let mut rows = Vec::from(first);
        let mut len = 1;
        for v in iter {
            if v.len() != dim {
                return Err(IndexError::DimensionMismatch {
                    expected: dim,
                    actual: v.len(),
                });
            }
            rows.extend_from_slice(v);
            len += 1;
        }

        Ok(Self { dim, rows, len })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Exact nearest neighbor by squared Euclidean distance.
    pub fn nearest(&self, query: &[f32]) -> Result<Neighbor, IndexError> {
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }

        let mut best = Neighbor {
            position: 0,
            distance: f32::INFINITY,
        };
        for (position, row) in self.rows.chunks_exact(self.dim).enumerate() {
            let distance = squared_l2(query, row);
            if distance < best.distance {
                best = Neighbor { position, distance };
            }
        }

        Ok(best)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .fold(0.0f32, |acc, (x, y)| acc + (x - y) * (x - y))
}

/// Maps a squared distance to a similarity score in (0, 1]: distance 0 is
/// similarity 1, and the score decays toward 0 as distance grows.
pub fn similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_finds_the_closest_row() {
        let rows: Vec<Vec<f32>> = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]];
        let index = SimilarityIndex::build(rows.iter().map(|r| r.as_slice())).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.dim(), 2);

        let hit = index.nearest(&[0.9, 0.1]).unwrap();
        assert_eq!(hit.position, 0);

        let exact = index.nearest(&[0.0, 1.0]).unwrap();
        assert_eq!(exact.position, 1);
        assert_eq!(exact.distance, 0.0);
    }

    #[test]
    fn build_rejects_empty_and_ragged_input() {
        assert!(matches!(
            SimilarityIndex::build(std::iter::empty()),
            Err(IndexError::Empty)
        ));

        let rows: Vec<Vec<f32>> = vec![vec![1.0, 0.0], vec![1.0]];
        assert!(matches!(
            SimilarityIndex::build(rows.iter().map(|r| r.as_slice())),
            Err(IndexError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn nearest_rejects_wrong_query_dimension() {
        let rows: Vec<Vec<f32>> = vec![vec![1.0, 0.0]];
        let index = SimilarityIndex::build(rows.iter().map(|r| r.as_slice())).unwrap();
        assert!(index.nearest(&[1.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn similarity_maps_distance_monotonically() {
        assert_eq!(similarity(0.0), 1.0);
        assert!((similarity(1.0) - 0.5).abs() < 1e-6);
        assert!(similarity(0.5) > similarity(2.0));
        // two disjoint unit vectors sit at squared distance 2
        assert!(similarity(2.0) < 0.4);
    }
}
