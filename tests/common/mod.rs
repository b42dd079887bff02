//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod selectors;

use eventsel::AnalysisError;

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// The innermost error below any context wrappers
pub fn root_cause(err: &AnalysisError) -> &AnalysisError {
    let mut current = err;
    while let AnalysisError::WithContext { source, .. } = current {
        current = source.as_ref();
    }
    current
}
