//! Tolerance-aware comparison of subgraph outputs.
use anyhow::{Result, bail, ensure};
use stagediff_core::prelude::*;

use crate::config::Tolerances;

/// `actual` is close to `expected`: `|a - e| <= tol + tol * |e|`. NaN is
/// close to NaN, infinities to infinities of the same sign.
pub fn close(actual: f64, expected: f64, tol: f64) -> bool {
    if actual.is_nan() || expected.is_nan() {
        actual.is_nan() && expected.is_nan()
    } else if actual.is_infinite() || expected.is_infinite() {
        actual == expected
    } else {
        (actual - expected).abs() <= tol + tol * expected.abs()
    }
}

/// Compare two output values.
///
/// Numeric arrays must agree on datum type and shape; floats are compared
/// within the datum type tolerance, everything else exactly. Lists are
/// compared position by position and must have the same length.
pub fn assert_all_close(actual: &Value, expected: &Value, tolerances: &Tolerances) -> Result<()> {
    compare_values("output", actual, expected, tolerances)
}

/// Compare the top level output lists of two runs, stopping at the first
/// failing pair.
pub fn assert_outputs_close(
    actual: &[Value],
    expected: &[Value],
    tolerances: &Tolerances,
) -> Result<()> {
    ensure!(
        actual.len() == expected.len(),
        "Got {} outputs, expected {}",
        actual.len(),
        expected.len()
    );
    for (ix, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        compare_values(&format!("output #{ix}"), a, e, tolerances)?;
    }
    Ok(())
}

fn compare_values(path: &str, actual: &Value, expected: &Value, tol: &Tolerances) -> Result<()> {
    match (actual.as_numeric(), expected.as_numeric()) {
        (Some(a), Some(e)) => compare_arrays(path, a, e, tol),
        (None, None) => match (actual.as_list(), expected.as_list()) {
            (Some(a), Some(e)) => {
                ensure!(
                    a.len() == e.len(),
                    "{path}: got a list of {} values, expected {}",
                    a.len(),
                    e.len()
                );
                for (ix, (a, e)) in a.iter().zip(e.iter()).enumerate() {
                    compare_values(&format!("{path}[{ix}]"), a, e, tol)?;
                }
                Ok(())
            }
            _ => {
                ensure!(actual == expected, "{path}: got {actual}, expected {expected}");
                Ok(())
            }
        },
        (Some(_), None) => bail!("{path}: got an array {actual}, expected {expected}"),
        (None, Some(_)) => bail!("{path}: got {actual}, expected an array {expected}"),
    }
}

fn compare_arrays(
    path: &str,
    actual: &dyn NumericArrayView,
    expected: &dyn NumericArrayView,
    tol: &Tolerances,
) -> Result<()> {
    ensure!(
        actual.dtype() == expected.dtype(),
        "{path}: datum types differ, got {:?}, expected {:?}",
        actual.dtype(),
        expected.dtype()
    );
    let (actual, expected) = (actual.to_array(), expected.to_array());
    ensure!(
        actual.shape() == expected.shape(),
        "{path}: shapes differ, got {:?}, expected {:?}",
        actual.shape(),
        expected.shape()
    );
    let dt = expected.datum_type();
    // logical order, whatever the memory layout
    let a: Vec<f64> = actual.to_f64_array().iter().copied().collect();
    let e: Vec<f64> = expected.to_f64_array().iter().copied().collect();
    let t = if dt.is_float() { tol.for_datum_type(dt) } else { 0.0 };
    let mismatches: Vec<usize> = if dt.is_float() {
        (0..e.len()).filter(|&ix| !close(a[ix], e[ix], t)).collect()
    } else {
        dispatch_datum!(exact_mismatches(dt)(&actual, &expected))?
    };
    if let Some(&first) = mismatches.first() {
        let max_diff = mismatches.iter().map(|&ix| (a[ix] - e[ix]).abs()).fold(0f64, f64::max);
        bail!(
            "{path}: {} of {} values differ ({:?}, tolerance {}), first at {:?}: got {}, expected {}, max abs diff {}",
            mismatches.len(),
            e.len(),
            dt,
            t,
            unravel(first, expected.shape()),
            a[first],
            e[first],
            max_diff
        );
    }
    Ok(())
}

fn exact_mismatches<T: Datum>(actual: &Tensor, expected: &Tensor) -> Result<Vec<usize>> {
    let (a, e) = (actual.to_array_view::<T>()?, expected.to_array_view::<T>()?);
    Ok(a.iter().zip(e.iter()).enumerate().filter(|(_, (a, e))| a != e).map(|p| p.0).collect())
}

fn unravel(mut ix: usize, shape: &[usize]) -> Vec<usize> {
    let mut coords = vec![0; shape.len()];
    for (axis, dim) in shape.iter().enumerate().rev() {
        if *dim > 0 {
            coords[axis] = ix % dim;
            ix /= dim;
        }
    }
    coords
}
