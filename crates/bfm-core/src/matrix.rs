//! Symmetric sparse bus-by-bus matrices (resistance, reactance).

use sprs::{CsMat, TriMat};

/// Square symmetric matrix indexed by dense bus position.
///
/// Each branch populates `(i, j)` and `(j, i)`; absent entries read as 0.
#[derive(Debug, Clone)]
pub struct SymmetricMatrix {
    inner: CsMat<f64>,
}

impl SymmetricMatrix {
    /// Build from upper-or-lower triplets `(i, j, value)`; both halves are filled.
    pub fn from_pairs(dim: usize, pairs: &[(usize, usize, f64)]) -> Self {
        let mut tri = TriMat::new((dim, dim));
        for &(i, j, value) in pairs {
            if value == 0.0 {
                continue;
            }
            tri.add_triplet(i, j, value);
            if i != j {
                tri.add_triplet(j, i, value);
            }
        }
        let inner: CsMat<f64> = tri.to_csr();
        Self { inner }
    }

    pub fn dim(&self) -> usize {
        self.inner.rows()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        if i >= self.dim() || j >= self.dim() {
            return 0.0;
        }
        self.inner.get(i, j).copied().unwrap_or(0.0)
    }

    /// Stored entries (counting both halves).
    pub fn nnz(&self) -> usize {
        self.inner.nnz()
    }

    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let n = self.dim();
        let mut dense = vec![vec![0.0; n]; n];
        for (&value, (i, j)) in self.inner.iter() {
            dense[i][j] = value;
        }
        dense
    }
}
