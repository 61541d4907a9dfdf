//! slicot-freqresp: Rust translation of SLICOT TB05AD
//!
//! SLICOT (Subroutine Library In COntrol Theory) is a comprehensive library
//! for control theoretical computations. This crate provides an idiomatic Rust
//! implementation of TB05AD, which evaluates the frequency response
//! `G(freq) = C * inv(freq*I - A) * B` of a state-space system, together with
//! the routines it is built from. Modules follow the original library's
//! chapter structure.
//!
//! # Organization
//!
//! - `tb`: Transformation routines (TB05AD - frequency response, sweeps)
//! - `mb`: Mathematical routines - complex Hessenberg LU, solve and condition
//!   estimate (MB02SZ, MB02RZ, MB02TZ)
//! - `lapack`: Native versions of the LAPACK kernels TB05AD uses to
//!   transform the system (DGEBAL, DGEHRD, DORMHR)
//! - `error`: [`SlicotError`] and the crate [`Result`] alias
//!
//! # Example
//!
//! ```
//! use ndarray::arr2;
//! use num_complex::Complex64;
//! use slicot_freqresp::tb::tb05ad;
//!
//! let a = arr2(&[[0.0, 1.0], [-2.0, -3.0]]);
//! let b = arr2(&[[0.0], [1.0]]);
//! let c = arr2(&[[1.0, 0.0]]);
//!
//! // G(s) = 1 / (s^2 + 3s + 2), at s = 0 the gain is 1/2.
//! let result = tb05ad(2, 1, 1, Complex64::new(0.0, 0.0), &a, &b, &c, "AG").unwrap();
//! let response = result.response.unwrap();
//! assert!((response.g[(0, 0)].re - 0.5).abs() < 1e-14);
//! assert_eq!(response.eigenvalues.len(), 2);
//! ```

pub mod error;
pub mod lapack;
pub mod mb;
pub mod tb;

pub use error::{Result, SlicotError};
