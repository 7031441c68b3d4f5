// =============================================================================
// ndarray <-> nalgebra Conversion and Shared Linear Algebra
// =============================================================================
//
// ndarray holds the data (datasets, fitted values, residuals); nalgebra does
// the linear algebra (factorizations, inversion). This module centralizes
// the conversions plus the two solve/invert helpers shared by the OLS solver
// and the Mahalanobis detector.
//
// Singularity is decided BEFORE factorizing: rounding can make an exactly
// rank-deficient symmetric matrix look barely positive definite, in which
// case Cholesky "succeeds" and returns garbage. The guard compares the
// determinant against the product of the diagonal magnitudes (a Hadamard
// bound for SPD matrices), which makes the test scale-free.
//
// =============================================================================

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

/// Relative determinant tolerance below which a symmetric matrix is
/// treated as singular.
const DET_RTOL: f64 = 1e-12;

// =============================================================================
// ndarray -> nalgebra
// =============================================================================

/// Convert an ndarray Array2 to a nalgebra DMatrix.
///
/// Handles non-contiguous arrays by making a contiguous copy first.
#[inline]
pub fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    let (nrows, ncols) = (a.nrows(), a.ncols());
    let contig = if a.is_standard_layout() {
        a.clone()
    } else {
        a.as_standard_layout().to_owned()
    };
    DMatrix::from_row_slice(nrows, ncols, contig.as_slice().unwrap())
}

/// Convert an ndarray Array1 to a nalgebra DVector.
#[inline]
pub fn to_dvector(v: &Array1<f64>) -> DVector<f64> {
    DVector::from_row_slice(v.as_slice().unwrap_or(&v.to_vec()))
}

// =============================================================================
// nalgebra -> ndarray
// =============================================================================

/// Convert a nalgebra DMatrix to an ndarray Array2.
#[inline]
pub fn to_array2(m: &DMatrix<f64>) -> Array2<f64> {
    let (nrows, ncols) = m.shape();
    let mut result = Array2::zeros((nrows, ncols));
    for i in 0..nrows {
        for j in 0..ncols {
            result[[i, j]] = m[(i, j)];
        }
    }
    result
}

/// Convert a nalgebra DVector to an ndarray Array1.
#[inline]
pub fn to_array1(v: &DVector<f64>) -> Array1<f64> {
    Array1::from_vec(v.as_slice().to_vec())
}

// =============================================================================
// Singularity guard
// =============================================================================

/// Scale-relative singularity test for a square symmetric matrix.
///
/// Compares |det(A)| against DET_RTOL times the product of the diagonal
/// magnitudes. For an SPD matrix the diagonal product bounds the
/// determinant from above, so the ratio is a unit-free conditioning
/// measure.
pub fn is_numerically_singular(a: &DMatrix<f64>) -> bool {
    let det = a.determinant();
    if !det.is_finite() {
        return true;
    }
    let scale: f64 = (0..a.nrows())
        .map(|i| a[(i, i)].abs().max(f64::MIN_POSITIVE))
        .product();
    if !scale.is_finite() {
        return true;
    }
    det.abs() <= DET_RTOL * scale
}

// =============================================================================
// Solve and invert helpers
// =============================================================================

/// Solve the symmetric system Ax = b and also return A⁻¹.
///
/// This is the normal-equations pattern: the solution gives the
/// coefficients and the inverse gives the leverage/covariance structure.
/// Tries Cholesky first, then LU. Returns None when A is singular to
/// working precision.
pub fn solve_and_invert(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<(Array1<f64>, Array2<f64>)> {
    if is_numerically_singular(a) {
        return None;
    }
    let p = a.nrows();

    if let Some(chol) = a.clone().cholesky() {
        let solution = chol.solve(b);
        let inverse = chol.solve(&DMatrix::identity(p, p));
        return Some((to_array1(&solution), to_array2(&inverse)));
    }

    // Not positive definite to working precision; fall back to LU.
    let solution = a.clone().lu().solve(b)?;
    let inverse = a.clone().try_inverse()?;
    Some((to_array1(&solution), to_array2(&inverse)))
}

/// Invert a symmetric matrix, or None if it is singular to working
/// precision.
pub fn invert_symmetric(a: &DMatrix<f64>) -> Option<Array2<f64>> {
    if is_numerically_singular(a) {
        return None;
    }
    let p = a.nrows();
    if let Some(chol) = a.clone().cholesky() {
        return Some(to_array2(&chol.solve(&DMatrix::identity(p, p))));
    }
    a.clone().try_inverse().map(|inv| to_array2(&inv))
}

// =============================================================================
// Tests
// =============================================================================
