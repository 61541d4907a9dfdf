//! Mathematical Routines - Basic Operations (Chapter MB)
//!
//! This module contains the complex upper Hessenberg linear-system routines
//! from the SLICOT library. TB05AD uses them to solve the shifted system
//! `(freq*I - A) * X = B` once `A` is in upper Hessenberg form.
//!
//! A Hessenberg matrix only needs row interchanges between adjacent rows
//! during Gaussian elimination, so the factorization costs O(n²) instead of
//! O(n³) and the factors are stored in place.

use ndarray::{Array1, Array2, ArrayViewMut1};
use num_complex::Complex64;

const ZERO: f64 = 0.0;
const ONE: f64 = 1.0;
const CZERO: Complex64 = Complex64::new(ZERO, ZERO);
const CONE: Complex64 = Complex64::new(ONE, ZERO);

/// Form of the system solved by [`mb02rz`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trans {
    /// `H * X = B`
    NoTranspose,
    /// `H' * X = B`
    Transpose,
    /// `H^H * X = B`
    ConjugateTranspose,
}

/// LU factorization of a complex upper Hessenberg matrix with partial pivoting.
///
/// Computes `H = P * L * U` where `P` is a product of interchanges of
/// adjacent rows, `L` is unit lower bidiagonal and `U` is upper triangular.
/// On exit `h` holds `U` in its upper triangle and the multipliers of `L` on
/// the first subdiagonal. Entries below the first subdiagonal are not read.
///
/// # Returns
///
/// A tuple `(ipiv, info)` where:
/// - `ipiv[k]` is the row interchanged with row `k` at step `k` (`k` or `k + 1`)
/// - `info` is 0 on success, or `k > 0` if `U(k, k)` (1-based) is exactly
///   zero. The factorization is completed, but `U` is singular and must not
///   be used to solve a system.
///
/// # Examples
///
/// ```
/// use ndarray::arr2;
/// use num_complex::Complex64;
/// use slicot_freqresp::mb::mb02sz;
///
/// let c = |re: f64, im: f64| Complex64::new(re, im);
/// let mut h = arr2(&[[c(1.0, 0.0), c(2.0, 0.0)], [c(4.0, 0.0), c(3.0, 0.0)]]);
/// let (ipiv, info) = mb02sz(&mut h);
/// assert_eq!(info, 0);
/// assert_eq!(ipiv, vec![1, 1]); // rows 0 and 1 were swapped at step 0
/// ```
///
/// # SLICOT Reference
///
/// This is a Rust translation of SLICOT routine MB02SZ.
///
/// **Differences from Fortran**:
/// - Pivot indices are 0-based
/// - Rows are compared with `|re| + |im|`, as the Fortran code does
pub fn mb02sz(h: &mut Array2<Complex64>) -> (Vec<usize>, usize) {
    let n = h.nrows();
    let mut ipiv: Vec<usize> = (0..n).collect();
    let mut info = 0;

    for k in 0..n.saturating_sub(1) {
        if cabs1(h[(k + 1, k)]) > cabs1(h[(k, k)]) {
            ipiv[k] = k + 1;
            for j in k..n {
                h.swap((k, j), (k + 1, j));
            }
        }

        if h[(k, k)] != CZERO {
            let mult = h[(k + 1, k)] / h[(k, k)];
            h[(k + 1, k)] = mult;
            for j in k + 1..n {
                let ukj = h[(k, j)];
                h[(k + 1, j)] -= mult * ukj;
            }
        } else if info == 0 {
            info = k + 1;
        }
    }

    if n > 0 && h[(n - 1, n - 1)] == CZERO && info == 0 {
        info = n;
    }

    (ipiv, info)
}

/// Solves a complex upper Hessenberg system using the factorization from [`mb02sz`].
///
/// Solves `H * X = B`, `H' * X = B` or `H^H * X = B` for all columns of `b`,
/// which is overwritten by the solution `X`.
///
/// # Errors
///
/// Returns an error message if the dimensions of `lu`, `ipiv` and `b` do not
/// agree.
///
/// # SLICOT Reference
///
/// This is a Rust translation of SLICOT routine MB02RZ.
pub fn mb02rz(
    trans: Trans,
    lu: &Array2<Complex64>,
    ipiv: &[usize],
    b: &mut Array2<Complex64>,
) -> Result<(), String> {
    let n = lu.nrows();
    if lu.ncols() != n {
        return Err(format!("LU factor must be square, got {}×{}", n, lu.ncols()));
    }
    if ipiv.len() != n {
        return Err(format!("IPIV must have {} entries, got {}", n, ipiv.len()));
    }
    if b.nrows() != n {
        return Err(format!("Matrix B must have {} rows, got {}", n, b.nrows()));
    }

    solve_factored(trans, lu, ipiv, b);
    Ok(())
}

/// [`mb02rz`] without the dimension checks, for callers that built `lu`,
/// `ipiv` and `b` together.
pub(crate) fn solve_factored(
    trans: Trans,
    lu: &Array2<Complex64>,
    ipiv: &[usize],
    b: &mut Array2<Complex64>,
) {
    for col in b.columns_mut() {
        solve_column(trans, lu, ipiv, col);
    }
}

/// Estimates the reciprocal 1-norm condition number of a complex Hessenberg matrix.
///
/// `lu` and `ipiv` are the outputs of [`mb02sz`] and `hnorm` is the 1-norm
/// of the original matrix. `norm(inv(H))` is estimated with Higham's
/// modification of Hager's method (LAPACK ZLACON), so only a few solves are
/// needed. The result lies in `[0, 1]`; 0 is returned when `hnorm` is zero.
///
/// # SLICOT Reference
///
/// This is a Rust translation of SLICOT routine MB02TZ (1-norm only).
///
/// **Reference**: Higham, N.J. "FORTRAN codes for estimating the one-norm of
/// a real or complex matrix, with applications to condition estimation",
/// ACM Trans. Math. Softw. 14 (1988).
pub fn mb02tz(lu: &Array2<Complex64>, ipiv: &[usize], hnorm: f64) -> f64 {
    let n = lu.nrows();
    if n == 0 {
        return ONE;
    }
    if hnorm == ZERO {
        return ZERO;
    }

    let ainvnm = estimate_norm1(n, |trans, x| solve_column(trans, lu, ipiv, x));
    if ainvnm == ZERO || !ainvnm.is_finite() {
        return ZERO;
    }
    ((ONE / ainvnm) / hnorm).min(ONE)
}

/// 1-norm of the upper Hessenberg part of `h` (ZLANHS with NORM = '1').
pub fn hessenberg_norm1(h: &Array2<Complex64>) -> f64 {
    let n = h.nrows();
    (0..n)
        .map(|j| (0..n.min(j + 2)).map(|i| h[(i, j)].norm()).sum::<f64>())
        .fold(ZERO, f64::max)
}

fn solve_column(trans: Trans, lu: &Array2<Complex64>, ipiv: &[usize], mut x: ArrayViewMut1<Complex64>) {
    let n = lu.nrows();
    let conj = |z: Complex64| {
        if trans == Trans::ConjugateTranspose {
            z.conj()
        } else {
            z
        }
    };

    match trans {
        Trans::NoTranspose => {
            // Solve L * y = P' * b.
            for k in 0..n.saturating_sub(1) {
                if ipiv[k] != k {
                    x.swap(k, k + 1);
                }
                let xk = x[k];
                x[k + 1] -= lu[(k + 1, k)] * xk;
            }
            // Solve U * x = y.
            for i in (0..n).rev() {
                let mut s = x[i];
                for j in i + 1..n {
                    s -= lu[(i, j)] * x[j];
                }
                x[i] = s / lu[(i, i)];
            }
        }
        Trans::Transpose | Trans::ConjugateTranspose => {
            // Solve U' * y = b.
            for i in 0..n {
                let mut s = x[i];
                for j in 0..i {
                    s -= conj(lu[(j, i)]) * x[j];
                }
                x[i] = s / conj(lu[(i, i)]);
            }
            // Solve L' * P * x = y, last step first.
            for k in (0..n.saturating_sub(1)).rev() {
                let xk1 = x[k + 1];
                x[k] -= conj(lu[(k + 1, k)]) * xk1;
                if ipiv[k] != k {
                    x.swap(k, k + 1);
                }
            }
        }
    }
}

/// Lower bound for `norm(inv(H), 1)` by reverse communication with `solve`.
fn estimate_norm1<F>(n: usize, mut solve: F) -> f64
where
    F: FnMut(Trans, ArrayViewMut1<Complex64>),
{
    const ITMAX: usize = 5;
    let safmin = f64::MIN_POSITIVE;

    let mut x = Array1::from_elem(n, Complex64::new(ONE / n as f64, ZERO));
    solve(Trans::NoTranspose, x.view_mut());
    if n == 1 {
        return x[0].norm();
    }
    let mut est = sum_abs(&x);

    unit_signs(&mut x, safmin);
    solve(Trans::ConjugateTranspose, x.view_mut());
    let mut j = index_of_max(&x);
    let mut iter = 2;

    loop {
        x.fill(CZERO);
        x[j] = CONE;
        solve(Trans::NoTranspose, x.view_mut());

        let estold = est;
        est = sum_abs(&x);
        if est <= estold {
            est = estold;
            break;
        }

        unit_signs(&mut x, safmin);
        solve(Trans::ConjugateTranspose, x.view_mut());
        let jlast = j;
        j = index_of_max(&x);
        if x[jlast].norm() == x[j].norm() || iter >= ITMAX {
            break;
        }
        iter += 1;
    }

    // Alternating-sign vector guards against the estimate being far too low.
    let mut altsgn = ONE;
    for (i, xi) in x.iter_mut().enumerate() {
        *xi = Complex64::new(altsgn * (ONE + i as f64 / (n - 1) as f64), ZERO);
        altsgn = -altsgn;
    }
    solve(Trans::NoTranspose, x.view_mut());
    let temp = 2.0 * (sum_abs(&x) / (3 * n) as f64);

    est.max(temp)
}

fn sum_abs(x: &Array1<Complex64>) -> f64 {
    x.iter().map(|z| z.norm()).sum()
}

fn unit_signs(x: &mut Array1<Complex64>, safmin: f64) {
    x.mapv_inplace(|z| {
        let absz = z.norm();
        if absz > safmin {
            z / absz
        } else {
            CONE
        }
    });
}

fn index_of_max(x: &Array1<Complex64>) -> usize {
    let mut imax = 0;
    let mut vmax = ZERO;
    for (i, z) in x.iter().enumerate() {
        let v = z.norm();
        if v > vmax {
            vmax = v;
            imax = i;
        }
    }
    imax
}

#[inline]
fn cabs1(z: Complex64) -> f64 {
    z.re.abs() + z.im.abs()
}
