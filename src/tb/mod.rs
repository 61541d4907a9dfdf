//! Transformation Routines (Chapter TB)
//!
//! This module contains transformation routines from the SLICOT library.
//! These routines perform various transformations on state-space systems,
//! including balancing and reduction to upper Hessenberg form, and use them
//! to evaluate the frequency response of the system.
//!
//! SLICOT Chapter TB focuses on transformations that improve numerical
//! conditioning and standardize system representations.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use ndarray_linalg::EigVals;
use num_complex::Complex64;

use crate::error::{Result, SlicotError};
use crate::lapack::{self, Balance, Side};
use crate::mb::{self, Trans};

const ZERO: f64 = 0.0;

/// A state-space system `x' = A x + B u`, `y = C x`.
#[derive(Clone, Debug, PartialEq)]
pub struct StateSpace {
    /// State matrix (N×N)
    pub a: Array2<f64>,
    /// Input matrix (N×M)
    pub b: Array2<f64>,
    /// Output matrix (P×N)
    pub c: Array2<f64>,
}

impl StateSpace {
    /// Copies the given matrices into a new system. Dimensions are not checked.
    pub fn new(a: &Array2<f64>, b: &Array2<f64>, c: &Array2<f64>) -> Self {
        StateSpace {
            a: a.to_owned(),
            b: b.to_owned(),
            c: c.to_owned(),
        }
    }

    /// Number of states N.
    pub fn order(&self) -> usize {
        self.a.nrows()
    }
}

/// Computation requested from [`tb05ad`].
///
/// The first letter selects balancing (`A`) or not (`N`); the second tells
/// whether `A` is a general matrix to be reduced (`G`) or is already upper
/// Hessenberg (`H`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Job {
    /// Balance, reduce to Hessenberg form, evaluate.
    AG,
    /// Reduce to Hessenberg form, evaluate.
    NG,
    /// Evaluate only; `A` is already upper Hessenberg.
    NH,
    /// Balance only; no reduction and no evaluation.
    AH,
}

impl Job {
    pub fn as_str(self) -> &'static str {
        match self {
            Job::AG => "AG",
            Job::NG => "NG",
            Job::NH => "NH",
            Job::AH => "AH",
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Job {
    type Err = SlicotError;

    /// Parses a job code. Codes are case-sensitive; anything else is
    /// reported as an invalid first argument (info = -1).
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AG" => Ok(Job::AG),
            "NG" => Ok(Job::NG),
            "NH" => Ok(Job::NH),
            "AH" => Ok(Job::AH),
            _ => Err(SlicotError::parameter(
                -1,
                format!("Invalid JOB parameter: '{}', must be AG, NG, NH, or AH", s),
            )),
        }
    }
}

/// Frequency response at a single frequency.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyResponse {
    /// `G = C * inv(freq*I - A) * B` (P×M)
    pub g: Array2<Complex64>,
    /// `inv(freq*I - A) * B` for the transformed system (N×M)
    pub hinvb: Array2<Complex64>,
    /// Reciprocal 1-norm condition estimate of `freq*I - A`
    pub rcond: f64,
    /// Eigenvalues of `A`
    pub eigenvalues: Array1<Complex64>,
}

/// Result of [`tb05ad`].
#[derive(Clone, Debug, PartialEq)]
pub struct Tb05adResult {
    /// The system after the stages selected by the job. With `AG`/`NG`, `A`
    /// is upper Hessenberg and can be passed back with job `NH`.
    pub system: StateSpace,
    /// Balancing information (`AG` and `AH` only).
    pub balance: Option<Balance>,
    /// Frequency response (all jobs except `AH`).
    pub response: Option<FrequencyResponse>,
}

/// Evaluates the frequency response of a state-space system.
///
/// Computes the complex matrix
/// ```text
///     G(freq) = C * inv(freq*I - A) * B
/// ```
/// for the system `(A, B, C)` of order N with M inputs and P outputs. For
/// the general jobs the system is first transformed by an orthogonal
/// similarity to upper Hessenberg form (optionally after balancing), which
/// leaves `G` unchanged and lets `freq*I - A` be factored in O(N²).
///
/// # Arguments
///
/// * `n`, `m`, `p` - Declared order, number of inputs and number of outputs
/// * `freq` - The frequency (complex) at which to evaluate `G`
/// * `a`, `b`, `c` - System matrices, N×N, N×M and P×N. They are copied.
/// * `job` - One of:
///   - `"AG"`: balance `A`, reduce to Hessenberg form, evaluate
///   - `"NG"`: reduce to Hessenberg form, evaluate
///   - `"NH"`: evaluate, `A` is already upper Hessenberg (only its
///     Hessenberg part is read)
///   - `"AH"`: balance only
///
/// # Returns
///
/// A [`Tb05adResult`] holding the transformed system and, except for `"AH"`,
/// the response `G`, `inv(freq*I - A) * B`, the reciprocal condition number
/// and the eigenvalues of `A`.
///
/// # Errors
///
/// * [`SlicotError::Parameter`] with `info` = -1 (job), -3/-4/-5 (zero N, M
///   or P), -7 (`A` is not N×N), -9 (`B` is not N×M) or -11 (`C` is not
///   P×N). The codes are the argument positions of the Fortran routine.
///   Balancing also reports -7 when `A` contains NaN.
/// * [`SlicotError::Arithmetic`] with `info` = 1 if the eigenvalues of `A`
///   could not be computed, or `info` = 2 if `freq` is too near to an eigenvalue
///   of `A` or the condition estimate is below machine precision. The
///   transformed system is attached to the error.
///
/// # Examples
///
/// ```
/// use ndarray::arr2;
/// use num_complex::Complex64;
/// use slicot_freqresp::tb::tb05ad;
///
/// // G(s) = 1 / (s + 1)
/// let a = arr2(&[[-1.0]]);
/// let b = arr2(&[[1.0]]);
/// let c = arr2(&[[1.0]]);
/// let freq = Complex64::new(0.0, 1.0);
///
/// let result = tb05ad(1, 1, 1, freq, &a, &b, &c, "NG").unwrap();
/// let g = result.response.unwrap().g[(0, 0)];
/// assert!((g - Complex64::new(0.5, -0.5)).norm() < 1e-15);
/// ```
///
/// # SLICOT Reference
///
/// This is a Rust translation of SLICOT routine TB05AD.
///
/// **Method**: `A` is balanced with DGEBAL (job `AG`), reduced with DGEHRD
/// and the transformations are applied to `B` and `C` with DORMHR. The
/// Hessenberg matrix `freq*I - A` is factored with MB02SZ, its condition is
/// estimated with MB02TZ, and MB02RZ solves for `inv(freq*I - A) * B`.
/// The eigenvalues come from LAPACK (DGEEV) through `ndarray-linalg`.
///
/// **Differences from Fortran**:
/// - BALEIG/INITA are folded into a single [`Job`]; the condition estimate
///   and the eigenvalues are always computed when evaluating
/// - Inputs are never overwritten; the transformed system is returned
/// - Errors are returned as [`SlicotError`] instead of INFO
///
/// **Reference**: Laub, A.J. "Efficient Multivariable Frequency Response
/// Computations", IEEE TAC 26 (1981).
#[allow(clippy::too_many_arguments)]
pub fn tb05ad(
    n: usize,
    m: usize,
    p: usize,
    freq: Complex64,
    a: &Array2<f64>,
    b: &Array2<f64>,
    c: &Array2<f64>,
    job: &str,
) -> Result<Tb05adResult> {
    let job: Job = job.parse()?;
    check_dimensions(n, m, p, a, b, c)?;

    log::debug!("tb05ad: job {}, n = {}, m = {}, p = {}, freq = {}", job, n, m, p, freq);

    let system = StateSpace::new(a, b, c);
    let full = (0, n - 1);

    let (system, balance) = match job {
        Job::AG | Job::AH => {
            let (system, balance) = balance_system(system)?;
            (system, Some(balance))
        }
        Job::NG | Job::NH => (system, None),
    };
    let (ilo, ihi) = balance.as_ref().map_or(full, |bal| (bal.ilo, bal.ihi));

    let system = match job {
        Job::AG | Job::NG => reduce_system(system, ilo, ihi),
        Job::NH | Job::AH => system,
    };

    if job == Job::AH {
        return Ok(Tb05adResult {
            system,
            balance,
            response: None,
        });
    }

    let response = evaluate(&system, freq).map_err(|err| attach_system(err, &system))?;

    Ok(Tb05adResult {
        system,
        balance,
        response: Some(response),
    })
}

/// Evaluates the frequency response at several frequencies.
///
/// The system is reduced to upper Hessenberg form once (as with job `"NG"`)
/// and each frequency is then evaluated as with job `"NH"`, which is how
/// TB05AD is meant to be used for frequency sweeps. Eigenvalues are not
/// computed.
///
/// # Errors
///
/// Dimension errors as for [`tb05ad`], with the dimensions taken from `a`,
/// `b` and `c` (B must have as many rows as A, C as many columns). The
/// first frequency that is too near to an eigenvalue stops the sweep with
/// `info` = 2.
///
/// # Examples
///
/// ```
/// use ndarray::arr2;
/// use num_complex::Complex64;
/// use slicot_freqresp::tb::tb05ad_sweep;
///
/// let a = arr2(&[[0.0, 1.0], [-2.0, -3.0]]);
/// let b = arr2(&[[0.0], [1.0]]);
/// let c = arr2(&[[1.0, 0.0]]);
/// let freqs: Vec<Complex64> = [0.1, 1.0, 10.0]
///     .iter()
///     .map(|&w| Complex64::new(0.0, w))
///     .collect();
///
/// let responses = tb05ad_sweep(&a, &b, &c, &freqs).unwrap();
/// assert_eq!(responses.len(), 3);
/// // Low-frequency gain approaches G(0) = 1/2.
/// assert!((responses[0][(0, 0)].norm() - 0.5).abs() < 0.01);
/// ```
pub fn tb05ad_sweep(
    a: &Array2<f64>,
    b: &Array2<f64>,
    c: &Array2<f64>,
    freqs: &[Complex64],
) -> Result<Vec<Array2<Complex64>>> {
    let n = a.nrows();
    let m = b.ncols();
    let p = c.nrows();
    check_dimensions(n, m, p, a, b, c)?;

    let system = reduce_system(StateSpace::new(a, b, c), 0, n - 1);
    log::debug!("tb05ad_sweep: {} frequencies, n = {}", freqs.len(), n);

    freqs
        .iter()
        .map(|&freq| {
            solve_shifted(&system, freq)
                .map(|(g, _, _)| g)
                .map_err(|err| attach_system(err, &system))
        })
        .collect()
}

fn check_dimensions(
    n: usize,
    m: usize,
    p: usize,
    a: &Array2<f64>,
    b: &Array2<f64>,
    c: &Array2<f64>,
) -> Result<()> {
    if n == 0 {
        return Err(SlicotError::parameter(-3, "N must be at least 1"));
    }
    if m == 0 {
        return Err(SlicotError::parameter(-4, "M must be at least 1"));
    }
    if p == 0 {
        return Err(SlicotError::parameter(-5, "P must be at least 1"));
    }
    if a.dim() != (n, n) {
        return Err(SlicotError::parameter(
            -7,
            format!("Matrix A must be {}×{}, got {}×{}", n, n, a.nrows(), a.ncols()),
        ));
    }
    if b.dim() != (n, m) {
        return Err(SlicotError::parameter(
            -9,
            format!("Matrix B must be {}×{}, got {}×{}", n, m, b.nrows(), b.ncols()),
        ));
    }
    if c.dim() != (p, n) {
        return Err(SlicotError::parameter(
            -11,
            format!("Matrix C must be {}×{}, got {}×{}", p, n, c.nrows(), c.ncols()),
        ));
    }
    Ok(())
}

/// Balances `A` and carries the same permutation and scaling over to `B` and `C`.
fn balance_system(mut system: StateSpace) -> Result<(StateSpace, Balance)> {
    let balance = lapack::dgebal(&mut system.a).map_err(|msg| {
        log::warn!("tb05ad: balancing failed: {}", msg);
        SlicotError::parameter(-7, msg)
    })?;
    balance.apply_to_rows(&mut system.b);
    balance.apply_to_columns(&mut system.c);

    log::debug!(
        "balanced: ilo = {}, ihi = {}, scale = {}",
        balance.ilo,
        balance.ihi,
        balance.scale
    );
    Ok((system, balance))
}

/// Reduces `A` to upper Hessenberg form, `B := Q' * B` and `C := C * Q`.
fn reduce_system(mut system: StateSpace, ilo: usize, ihi: usize) -> StateSpace {
    let tau = lapack::dgehrd(&mut system.a, ilo, ihi);
    lapack::dormhr(Side::LeftTranspose, ilo, ihi, &system.a, &tau, &mut system.b);
    lapack::dormhr(Side::Right, ilo, ihi, &system.a, &tau, &mut system.c);
    lapack::zero_below_subdiagonal(&mut system.a);
    system
}

fn evaluate(system: &StateSpace, freq: Complex64) -> Result<FrequencyResponse> {
    // Only the Hessenberg part of A is significant here.
    let mut hess = system.a.clone();
    lapack::zero_below_subdiagonal(&mut hess);
    let eigenvalues = hess.eigvals().map_err(|err| {
        log::warn!("tb05ad: eigenvalue computation failed: {}", err);
        SlicotError::Arithmetic {
            info: 1,
            message: format!("The eigenvalues of A could not be computed: {}", err),
            system: None,
        }
    })?;

    let (g, hinvb, rcond) = solve_shifted(system, freq)?;

    Ok(FrequencyResponse {
        g,
        hinvb,
        rcond,
        eigenvalues,
    })
}

/// Solves `(freq*I - A) * X = B` for Hessenberg `A` and returns `(C*X, X, rcond)`.
fn solve_shifted(
    system: &StateSpace,
    freq: Complex64,
) -> Result<(Array2<Complex64>, Array2<Complex64>, f64)> {
    let n = system.order();

    let mut h = Array2::<Complex64>::zeros((n, n));
    for i in 0..n {
        for j in i.saturating_sub(1)..n {
            h[(i, j)] = Complex64::new(-system.a[(i, j)], ZERO);
        }
        h[(i, i)] += freq;
    }
    let hnorm = mb::hessenberg_norm1(&h);

    let (ipiv, info) = mb::mb02sz(&mut h);
    if info > 0 {
        log::warn!("tb05ad: freq*I - A is singular at {} (pivot {})", freq, info);
        return Err(resonance(freq));
    }

    let rcond = mb::mb02tz(&h, &ipiv, hnorm);
    log::debug!("tb05ad: rcond = {:e} at freq = {}", rcond, freq);
    if rcond < f64::EPSILON {
        log::warn!("tb05ad: rcond = {:e} below machine precision at {}", rcond, freq);
        return Err(resonance(freq));
    }

    let mut hinvb = system.b.mapv(|v| Complex64::new(v, ZERO));
    mb::solve_factored(Trans::NoTranspose, &h, &ipiv, &mut hinvb);

    let g = system.c.mapv(|v| Complex64::new(v, ZERO)).dot(&hinvb);
    Ok((g, hinvb, rcond))
}

fn resonance(freq: Complex64) -> SlicotError {
    SlicotError::Arithmetic {
        info: 2,
        message: format!(
            "Either `freq`={} is too near to an eigenvalue of A,\n\
             or `rcond` is less than the machine precision EPS.",
            freq
        ),
        system: None,
    }
}

fn attach_system(err: SlicotError, system: &StateSpace) -> SlicotError {
    match err {
        SlicotError::Arithmetic { info, message, .. } => SlicotError::Arithmetic {
            info,
            message,
            system: Some(Box::new(system.clone())),
        },
        other => other,
    }
}
