//! Error types for the SLICOT routines in this crate.
//!
//! Codes follow the SLICOT `INFO` convention: a negative value `-k` means the
//! `k`-th argument of the Fortran routine was invalid, a positive value is a
//! numerical failure reported by the routine itself.

use thiserror::Error;

use crate::tb::StateSpace;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SlicotError {
    /// An argument was rejected before any computation took place.
    #[error("illegal value in argument (info = {info}): {message}")]
    Parameter { info: i32, message: String },

    /// The computation ran but the problem is ill-posed at this point.
    ///
    /// `system` holds the transformed system when the balance/reduce stages
    /// completed before the failure, so it can be reused.
    #[error("{message}")]
    Arithmetic {
        info: i32,
        message: String,
        system: Option<Box<StateSpace>>,
    },
}

impl SlicotError {
    pub(crate) fn parameter(info: i32, message: impl Into<String>) -> Self {
        SlicotError::Parameter {
            info,
            message: message.into(),
        }
    }

    /// SLICOT `INFO` code carried by the error.
    pub fn info(&self) -> i32 {
        match self {
            SlicotError::Parameter { info, .. } | SlicotError::Arithmetic { info, .. } => *info,
        }
    }

    /// Transformed system attached to an arithmetic failure, if any.
    pub fn system(&self) -> Option<&StateSpace> {
        match self {
            SlicotError::Arithmetic { system, .. } => system.as_deref(),
            SlicotError::Parameter { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SlicotError>;
