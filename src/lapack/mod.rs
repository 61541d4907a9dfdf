//! Native LAPACK kernels (DGEBAL, DGEHRD, DORMHR)
//!
//! The balancing and Hessenberg reduction TB05AD performs are written here
//! in plain Rust on top of `ndarray`, so the transformations and the
//! permutation/scaling they carry can be replayed on `B` and `C`.
//!
//! Indices are 0-based throughout; `ilo`/`ihi` are inclusive bounds of the
//! active block, as returned by [`dgebal`].

use ndarray::{s, Array1, Array2, ArrayView1, ArrayViewMut2};

const ZERO: f64 = 0.0;
const ONE: f64 = 1.0;

/// Permutation and scaling computed by [`dgebal`].
#[derive(Clone, Debug, PartialEq)]
pub struct Balance {
    /// First row/column of the active (non-isolated) block.
    pub ilo: usize,
    /// Last row/column of the active block.
    pub ihi: usize,
    /// For `j` outside `ilo..=ihi`, the index interchanged with `j`.
    /// Equal to `j` inside the active block.
    pub permutation: Vec<usize>,
    /// Diagonal scaling factors `D` for the active block, 1.0 elsewhere.
    pub scale: Array1<f64>,
}

impl Balance {
    fn identity(n: usize) -> Self {
        Balance {
            ilo: 0,
            ihi: n.saturating_sub(1),
            permutation: (0..n).collect(),
            scale: Array1::ones(n),
        }
    }

    /// Applies the balancing to the rows of `b`: `B := inv(D) * P * B`.
    ///
    /// Interchanges are replayed in the order [`dgebal`] made them: first the
    /// trailing positions from the bottom up, then the leading positions from
    /// the top down.
    pub fn apply_to_rows(&self, b: &mut Array2<f64>) {
        for j in self.trailing_then_leading() {
            let k = self.permutation[j];
            if k != j {
                swap_rows(b, j, k);
            }
        }
        for j in self.active() {
            let f = self.scale[j];
            if f != ONE {
                b.row_mut(j).mapv_inplace(|v| v / f);
            }
        }
    }

    /// Applies the balancing to the columns of `c`: `C := C * P' * D`.
    pub fn apply_to_columns(&self, c: &mut Array2<f64>) {
        for j in self.trailing_then_leading() {
            let k = self.permutation[j];
            if k != j {
                swap_columns(c, j, k);
            }
        }
        for j in self.active() {
            let f = self.scale[j];
            if f != ONE {
                c.column_mut(j).mapv_inplace(|v| v * f);
            }
        }
    }

    fn active(&self) -> std::ops::Range<usize> {
        self.ilo..(self.ihi + 1).min(self.scale.len())
    }

    fn trailing_then_leading(&self) -> impl Iterator<Item = usize> {
        let n = self.permutation.len();
        ((self.ihi + 1)..n).rev().chain(0..self.ilo)
    }
}

/// Balances a general real matrix (DGEBAL with JOB = 'B').
///
/// First permutes `a` to isolate eigenvalues: rows whose off-diagonal part is
/// zero are moved to the bottom, then columns whose off-diagonal part (within
/// the remaining block) is zero are moved to the left. The remaining block
/// `ilo..=ihi` is then scaled by powers of two, `inv(D) * A * D`, so that its
/// rows and columns have comparable 2-norms.
///
/// Rows or columns with a zero norm are left unscaled.
///
/// # Errors
///
/// Returns an error message if a NaN is met while scaling; `a` is left
/// partially balanced.
///
/// # Examples
///
/// ```
/// use ndarray::arr2;
/// use slicot_freqresp::lapack::dgebal;
///
/// let mut a = arr2(&[[1.0, 100.0], [0.01, 1.0]]);
/// let bal = dgebal(&mut a).unwrap();
/// assert_eq!((bal.ilo, bal.ihi), (0, 1));
/// assert!(a[(0, 1)] < 10.0);
/// // The product of the off-diagonal entries is similarity invariant.
/// assert!((a[(0, 1)] * a[(1, 0)] - 1.0).abs() < 1e-12);
/// ```
///
/// **Reference**: Anderson et al., LAPACK Users' Guide, routine DGEBAL.
pub fn dgebal(a: &mut Array2<f64>) -> Result<Balance, String> {
    const SCLFAC: f64 = 2.0;
    const FACTOR: f64 = 0.95;

    let n = a.nrows();
    let mut bal = Balance::identity(n);
    if n == 0 {
        return Ok(bal);
    }

    let mut k = 0;
    let mut l = n - 1;

    // Search for rows isolating an eigenvalue and push them down.
    loop {
        let isolated = (0..=l)
            .rev()
            .find(|&j| (0..=l).all(|i| i == j || a[(j, i)] == ZERO));
        let Some(j) = isolated else {
            break;
        };
        bal.permutation[l] = j;
        if j != l {
            swap_rows(a, j, l);
            swap_columns(a, j, l);
        }
        if l == 0 {
            bal.ilo = 0;
            bal.ihi = 0;
            return Ok(bal);
        }
        l -= 1;
    }

    // Search for columns isolating an eigenvalue and push them left.
    loop {
        let isolated = (k..=l).find(|&j| (k..=l).all(|i| i == j || a[(i, j)] == ZERO));
        let Some(j) = isolated else {
            break;
        };
        bal.permutation[k] = j;
        if j != k {
            swap_rows(a, j, k);
            swap_columns(a, j, k);
        }
        k += 1;
        if k > l {
            break;
        }
    }

    bal.ilo = k;
    bal.ihi = l;
    if k > l {
        return Ok(bal);
    }

    let sfmin1 = f64::MIN_POSITIVE / f64::EPSILON;
    let sfmax1 = ONE / sfmin1;
    let sfmin2 = sfmin1 * SCLFAC;
    let sfmax2 = ONE / sfmin2;

    // Iterative loop for norm reduction.
    loop {
        let mut noconv = false;

        for i in k..=l {
            let mut c = nrm2(a.slice(s![k..=l, i]));
            let mut r = nrm2(a.slice(s![i, k..=l]));
            let mut ca = amax(a.slice(s![..=l, i]));
            let mut ra = amax(a.slice(s![i, k..]));

            if (c + ca + r + ra).is_nan() {
                return Err(format!("NaN found in row/column {} of matrix A", i));
            }

            if c == ZERO || r == ZERO {
                continue;
            }

            let mut g = r / SCLFAC;
            let mut f = ONE;
            let s = c + r;

            while c < g && f.max(c).max(ca) < sfmax2 && r.min(g).min(ra) > sfmin2 {
                f *= SCLFAC;
                c *= SCLFAC;
                ca *= SCLFAC;
                r /= SCLFAC;
                g /= SCLFAC;
                ra /= SCLFAC;
            }

            g = c / SCLFAC;
            while g >= r && r.max(ra) < sfmax2 && f.min(c).min(g).min(ca) > sfmin2 {
                f /= SCLFAC;
                c /= SCLFAC;
                g /= SCLFAC;
                ca /= SCLFAC;
                r *= SCLFAC;
                ra *= SCLFAC;
            }

            if c + r >= FACTOR * s {
                continue;
            }
            if f < ONE && bal.scale[i] < ONE && f * bal.scale[i] <= sfmin1 {
                continue;
            }
            if f > ONE && bal.scale[i] > ONE && bal.scale[i] >= sfmax1 / f {
                continue;
            }

            let g = ONE / f;
            bal.scale[i] *= f;
            noconv = true;

            a.slice_mut(s![i, k..]).mapv_inplace(|v| v * g);
            a.slice_mut(s![..=l, i]).mapv_inplace(|v| v * f);
        }

        if !noconv {
            break;
        }
    }

    Ok(bal)
}

/// Reduces `a` to upper Hessenberg form by orthogonal similarity (DGEHRD).
///
/// Only the active block `ilo..=ihi` is reduced; `a` is assumed to be
/// upper triangular outside it, as left by [`dgebal`]. On return the
/// Householder vectors are stored below the first subdiagonal (LAPACK
/// layout) and the returned array holds their scalar factors `tau`.
/// Use [`dormhr`] to apply `Q` and [`zero_below_subdiagonal`] to clear the
/// reflector storage.
///
/// Each reflector is `H(i) = I - tau * v * v'` with `v[0] = 1`; when the
/// part of column `i` to be annihilated is already zero, `tau = 0` and
/// `H(i) = I`.
pub fn dgehrd(a: &mut Array2<f64>, ilo: usize, ihi: usize) -> Array1<f64> {
    let n = a.nrows();
    let mut tau = Array1::zeros(n);

    for i in ilo..ihi {
        let mut v = a.slice(s![i + 1..=ihi, i]).to_owned();
        let (tau_i, beta) = householder_vector(&mut v);
        tau[i] = tau_i;
        if tau_i == ZERO {
            continue;
        }

        // A := A * H(i), columns i+1..=ihi
        apply_householder_right(a.slice_mut(s![..=ihi, i + 1..=ihi]), v.view(), tau_i);
        // A := H(i) * A, rows i+1..=ihi
        apply_householder_left(a.slice_mut(s![i + 1..=ihi, i + 1..]), v.view(), tau_i);

        a[(i + 1, i)] = beta;
        a.slice_mut(s![i + 2..=ihi, i]).assign(&v.slice(s![1..]));
    }

    tau
}

/// Which side the orthogonal factor is applied from in [`dormhr`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// `C := Q' * C`
    LeftTranspose,
    /// `C := C * Q`
    Right,
}

/// Applies the orthogonal matrix `Q` from [`dgehrd`] to `c` (DORMHR).
///
/// `a` and `tau` must be the outputs of [`dgehrd`] for the same `ilo`/`ihi`.
pub fn dormhr(
    side: Side,
    ilo: usize,
    ihi: usize,
    a: &Array2<f64>,
    tau: &Array1<f64>,
    c: &mut Array2<f64>,
) {
    for i in ilo..ihi {
        if tau[i] == ZERO {
            continue;
        }
        let mut v = Array1::zeros(ihi - i);
        v[0] = ONE;
        v.slice_mut(s![1..]).assign(&a.slice(s![i + 2..=ihi, i]));

        match side {
            Side::LeftTranspose => {
                apply_householder_left(c.slice_mut(s![i + 1..=ihi, ..]), v.view(), tau[i])
            }
            Side::Right => {
                apply_householder_right(c.slice_mut(s![.., i + 1..=ihi]), v.view(), tau[i])
            }
        }
    }
}

/// Sets every entry below the first subdiagonal to zero.
pub fn zero_below_subdiagonal(a: &mut Array2<f64>) {
    let n = a.nrows();
    for i in 2..n {
        a.slice_mut(s![i, ..i - 1]).fill(ZERO);
    }
}

/// Elementary reflector annihilating `x[1..]` (DLARFG).
///
/// Overwrites `x` with `v` (`v[0] = 1`) and returns `(tau, beta)` such that
/// `(I - tau*v*v') * x = beta * e1`. `tau = 0` when `x[1..]` is already zero.
fn householder_vector(x: &mut Array1<f64>) -> (f64, f64) {
    let n = x.len();
    if n == 0 {
        return (ZERO, ZERO);
    }

    let alpha = x[0];
    let sigma = if n > 1 { nrm2(x.slice(s![1..])) } else { ZERO };

    if sigma == ZERO {
        return (ZERO, alpha);
    }

    let beta = -alpha.hypot(sigma).copysign(alpha);
    let tau = (beta - alpha) / beta;

    let denom = alpha - beta;
    x.slice_mut(s![1..]).mapv_inplace(|v| v / denom);
    x[0] = ONE;

    (tau, beta)
}

/// M := H * M with H = I - tau*v*v'
fn apply_householder_left(mut m: ArrayViewMut2<f64>, v: ArrayView1<f64>, tau: f64) {
    let w = v.dot(&m);
    for (mut row, &vi) in m.rows_mut().into_iter().zip(v.iter()) {
        row.scaled_add(-tau * vi, &w);
    }
}

/// M := M * H with H = I - tau*v*v'
fn apply_householder_right(mut m: ArrayViewMut2<f64>, v: ArrayView1<f64>, tau: f64) {
    let w = m.dot(&v);
    for (mut col, &vi) in m.columns_mut().into_iter().zip(v.iter()) {
        col.scaled_add(-tau * vi, &w);
    }
}

/// Euclidean norm with scaling against overflow (DNRM2).
fn nrm2(x: ArrayView1<f64>) -> f64 {
    let mut scale = ZERO;
    let mut ssq = ONE;
    for &v in x.iter() {
        if v != ZERO {
            let absxi = v.abs();
            if scale < absxi {
                ssq = ONE + ssq * (scale / absxi).powi(2);
                scale = absxi;
            } else {
                ssq += (absxi / scale).powi(2);
            }
        }
    }
    scale * ssq.sqrt()
}

/// Largest absolute value (|x(IDAMAX)|).
fn amax(x: ArrayView1<f64>) -> f64 {
    x.iter().fold(ZERO, |acc, v| acc.max(v.abs()))
}

fn swap_rows(a: &mut Array2<f64>, i: usize, j: usize) {
    for col in 0..a.ncols() {
        a.swap((i, col), (j, col));
    }
}

fn swap_columns(a: &mut Array2<f64>, i: usize, j: usize) {
    for row in 0..a.nrows() {
        a.swap((row, i), (row, j));
    }
}
