//! Integration tests for TB05AD (frequency response of a state-space system)
//! Covers jobs AG/NG/NH/AH, argument checking, resonance and balancing.

use ndarray::{arr2, Array2};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use slicot_freqresp::tb::{tb05ad, tb05ad_sweep, StateSpace};
use slicot_freqresp::SlicotError;

const TOL: f64 = 1e-8;

fn jw(w: f64) -> Complex64 {
    Complex64::new(0.0, w)
}

fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |_| StandardNormal.sample(rng))
}

/// A random 20-state system with 14 inputs and 10 outputs.
fn pass1() -> StateSpace {
    let mut rng = StdRng::seed_from_u64(40);
    let a = random_matrix(&mut rng, 20, 20);
    let b = random_matrix(&mut rng, 20, 14);
    let c = random_matrix(&mut rng, 10, 20);
    StateSpace { a, b, c }
}

/// Lower triangular A with repeated eigenvalues; used to break balancing.
fn fail1() -> StateSpace {
    StateSpace {
        a: arr2(&[
            [-0.5, 0.0, 0.0, 0.0],
            [0.0, -1.0, 0.0, 0.0],
            [1.0, 0.0, -0.5, 0.0],
            [0.0, 1.0, 0.0, -1.0],
        ]),
        b: arr2(&[[1.0, 0.0], [0.0, 1.0], [0.0, 0.0], [0.0, 0.0]]),
        c: arr2(&[
            [0.0, 1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0, 1.0],
            [0.0, 1.0, 1.0, 1.0],
        ]),
    }
}

fn cases() -> Vec<(&'static str, StateSpace)> {
    vec![("fail1", fail1()), ("pass1", pass1())]
}

/// On the imaginary axis and off it.
fn frequencies() -> [Complex64; 2] {
    [jw(10.0), Complex64::new(1.3, -0.7)]
}

/// Reference `C * inv(freq*I - A) * B` by dense Gaussian elimination.
fn reference_response(sys: &StateSpace, freq: Complex64) -> Array2<Complex64> {
    let n = sys.a.nrows();
    let mut h = sys.a.mapv(|v| Complex64::new(-v, 0.0));
    for i in 0..n {
        h[(i, i)] += freq;
    }
    let mut x = sys.b.mapv(|v| Complex64::new(v, 0.0));

    for k in 0..n {
        let piv = (k..n)
            .max_by(|&i, &j| h[(i, k)].norm().total_cmp(&h[(j, k)].norm()))
            .unwrap();
        for j in 0..n {
            h.swap((k, j), (piv, j));
        }
        for j in 0..x.ncols() {
            x.swap((k, j), (piv, j));
        }
        for i in (k + 1)..n {
            let l = h[(i, k)] / h[(k, k)];
            for j in k..n {
                let hkj = h[(k, j)];
                h[(i, j)] -= l * hkj;
            }
            for j in 0..x.ncols() {
                let xkj = x[(k, j)];
                x[(i, j)] -= l * xkj;
            }
        }
    }
    for k in (0..n).rev() {
        for j in 0..x.ncols() {
            let mut s = x[(k, j)];
            for i in (k + 1)..n {
                s -= h[(k, i)] * x[(i, j)];
            }
            x[(k, j)] = s / h[(k, k)];
        }
    }

    sys.c.mapv(|v| Complex64::new(v, 0.0)).dot(&x)
}

fn assert_response_close(actual: &Array2<Complex64>, expected: &Array2<Complex64>, what: &str) {
    assert_eq!(actual.dim(), expected.dim(), "{what}: shape");
    let scale = 1.0 + expected.iter().map(|y| y.norm()).fold(0.0, f64::max);
    for ((idx, x), y) in actual.indexed_iter().zip(expected.iter()) {
        assert!(
            (x - y).norm() < TOL * scale,
            "{what}: G{idx:?} = {x}, expected {y}"
        );
    }
}

fn run_general(sys: &StateSpace, freq: Complex64, job: &str) -> StateSpace {
    let (n, m) = sys.b.dim();
    let p = sys.c.nrows();
    let result = tb05ad(n, m, p, freq, &sys.a, &sys.b, &sys.c, job)
        .unwrap_or_else(|e| panic!("tb05ad {job} at {freq} failed: {e}"));
    let response = result.response.expect("evaluating job returns a response");
    assert_response_close(&response.g, &reference_response(sys, freq), job);
    assert!(response.rcond > 0.0 && response.rcond <= 1.0);
    assert_eq!(response.eigenvalues.len(), n);
    assert_eq!(response.hinvb.dim(), (n, m));
    result.system
}

// ===== Jobs AG / NG / NH =====

#[test]
fn test_tb05ad_ng() {
    for (name, sys) in cases() {
        for freq in frequencies() {
            let transformed = run_general(&sys, freq, "NG");
            for i in 2..transformed.a.nrows() {
                for j in 0..i - 1 {
                    assert_eq!(transformed.a[(i, j)], 0.0, "{name}: A not Hessenberg");
                }
            }
        }
    }
}

#[test]
fn test_tb05ad_ag() {
    for (_, sys) in cases() {
        for freq in frequencies() {
            run_general(&sys, freq, "AG");
        }
    }
}

#[test]
fn test_tb05ad_ag_permuted_balancing() {
    // Balancing isolates every eigenvalue here; B and C must follow the
    // permutation in the order it was applied to A.
    let sys = fail1();
    let transformed = run_general(&sys, jw(10.0), "AG");
    let mut eig: Vec<f64> = (0..4).map(|i| transformed.a[(i, i)]).collect();
    eig.sort_by(f64::total_cmp);
    assert_eq!(eig, vec![-1.0, -1.0, -0.5, -0.5]);
}

#[test]
fn test_tb05ad_nh() {
    for (name, sys) in cases() {
        for freq in frequencies() {
            let transformed = run_general(&sys, freq, "NG");
            let (n, m) = transformed.b.dim();
            let p = transformed.c.nrows();
            let result = tb05ad(
                n,
                m,
                p,
                freq,
                &transformed.a,
                &transformed.b,
                &transformed.c,
                "NH",
            )
            .unwrap();
            assert_eq!(result.system, transformed, "{name}: NH must not transform");
            let g = result.response.unwrap().g;
            assert_response_close(&g, &reference_response(&sys, freq), name);
        }
    }
}

#[test]
fn test_tb05ad_eigenvalues_match_trace() {
    let sys = pass1();
    let result = tb05ad(20, 14, 10, jw(10.0), &sys.a, &sys.b, &sys.c, "AG").unwrap();
    let ev = result.response.unwrap().eigenvalues;
    let sum: Complex64 = ev.iter().sum();
    let trace: f64 = sys.a.diag().sum();
    assert!((sum.re - trace).abs() < 1e-10 * (1.0 + trace.abs()));
    assert!(sum.im.abs() < 1e-10);
}

// ===== Argument checking =====

#[test]
fn test_tb05ad_errors() {
    let sys = pass1();
    let (n, m) = sys.b.dim();
    let p = sys.c.nrows();
    let freq = jw(10.0);

    let info = |res: Result<_, SlicotError>| match res {
        Err(err @ SlicotError::Parameter { .. }) => err.info(),
        Err(other) => panic!("expected a parameter error, got {other:?}"),
        Ok(_) => panic!("expected a parameter error"),
    };

    assert_eq!(info(tb05ad(n + 1, m, p, freq, &sys.a, &sys.b, &sys.c, "NH")), -7);
    assert_eq!(info(tb05ad(n, m + 1, p, freq, &sys.a, &sys.b, &sys.c, "NH")), -9);
    assert_eq!(info(tb05ad(n, m, p + 1, freq, &sys.a, &sys.b, &sys.c, "NH")), -11);
    assert_eq!(info(tb05ad(n, m, p, freq, &sys.a, &sys.b, &sys.c, "a")), -1);
}

// ===== Resonance =====

#[test]
fn test_tb05ad_resonance() {
    let a = arr2(&[[0.0, -1.0], [1.0, 0.0]]);
    let b = arr2(&[[1.0], [0.0]]);
    let c = arr2(&[[0.0, 1.0]]);

    let err = tb05ad(2, 1, 1, jw(1.0), &a, &b, &c, "NH").unwrap_err();
    assert!(matches!(err, SlicotError::Arithmetic { info: 2, .. }));

    let msg = err.to_string();
    let (head, tail) = msg.split_once('\n').unwrap();
    assert!(head.starts_with("Either `freq`"));
    assert!(head.ends_with(" is too near to an eigenvalue of A,"));
    assert_eq!(tail, "or `rcond` is less than the machine precision EPS.");
}

#[test]
fn test_tb05ad_resonance_returns_transformed_system() {
    let a = arr2(&[[0.0, -1.0], [1.0, 0.0]]);
    let b = arr2(&[[1.0], [0.0]]);
    let c = arr2(&[[0.0, 1.0]]);

    let err = tb05ad(2, 1, 1, jw(1.0), &a, &b, &c, "NH").unwrap_err();
    let sys = err.system().expect("system attached to arithmetic error");
    assert_eq!(sys.a, a);
}

// ===== Balancing =====

#[test]
fn test_tb05ad_balance() {
    let a = arr2(&[
        [-1.0, -1.0, 0.0, 0.0],
        [0.0, 0.0, 10.0, 10.0],
        [0.0, 0.0, 10.0, 0.0],
        [0.0, 10.0, 0.0, 0.0],
    ]);
    let eye = Array2::<f64>::eye(4);
    let ar = arr2(&[
        [-1.0, -1.0, 0.0, 0.0],
        [0.0, 0.0, 10.0, 10.0],
        [0.0, 10.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 10.0],
    ]);
    let freq = Complex64::new(1.0, 0.0);

    let first = tb05ad(4, 4, 4, freq, &a, &eye, &eye, "AG").unwrap();
    for (x, y) in first.system.a.iter().zip(ar.iter()) {
        assert!((x - y).abs() < 1e-12);
    }
    let balance = first.balance.as_ref().unwrap();
    assert_eq!((balance.ilo, balance.ihi), (1, 2));

    // Repeating the call on the untouched inputs gives the same answer.
    let second = tb05ad(4, 4, 4, freq, &a, &eye, &eye, "AG").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_tb05ad_balance_only_keeps_response() {
    let sys = pass1();
    let balanced = tb05ad(20, 14, 10, jw(10.0), &sys.a, &sys.b, &sys.c, "AH").unwrap();
    assert!(balanced.response.is_none());
    assert!(balanced.balance.is_some());

    // Balancing is a similarity, so G is unchanged.
    let g = reference_response(&balanced.system, jw(10.0));
    assert_response_close(&g, &reference_response(&sys, jw(10.0)), "AH");
}

#[test]
fn test_tb05ad_nan_does_not_hang_balancing() {
    let a = arr2(&[[1.0, f64::NAN], [1.0, 2.0]]);
    let b = arr2(&[[1.0], [1.0]]);
    let c = arr2(&[[1.0, 0.0]]);
    let err = tb05ad(2, 1, 1, jw(1.0), &a, &b, &c, "AG").unwrap_err();
    assert_eq!(err.info(), -7);
}

// ===== Sweep =====

#[test]
fn test_tb05ad_sweep_random_system() {
    let sys = pass1();
    let freqs: Vec<Complex64> = [10.0, 15.0, 25.0, 100.0].iter().map(|&w| jw(w)).collect();
    let responses = tb05ad_sweep(&sys.a, &sys.b, &sys.c, &freqs).unwrap();
    assert_eq!(responses.len(), freqs.len());
    for (freq, g) in freqs.iter().zip(responses.iter()) {
        assert_response_close(g, &reference_response(&sys, *freq), "sweep");
    }
}
