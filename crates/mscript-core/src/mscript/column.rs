//! Column projection of a result set

use super::{DecodeError, ResultSet, Value};

/// Values at `column` of every package, curve by curve
///
/// Fails on the first package narrower than `column + 1`.
pub fn column<'a>(
    result_set: &'a ResultSet,
    column: usize,
) -> Result<Vec<&'a Value>, DecodeError> {
    let mut out = Vec::with_capacity(result_set.package_count());
    for (curve_index, curve) in result_set.curves().iter().enumerate() {
        for (package_index, package) in curve.packages().iter().enumerate() {
            let value = package
                .get(column)
                .ok_or(DecodeError::ColumnIndexOutOfRange {
                    column,
                    curve: curve_index,
                    package: package_index,
                    width: package.len(),
                })?;
            out.push(value);
        }
    }
    Ok(out)
}

/// Numeric values at `column`, concatenated over all curves in order
pub fn column_values(result_set: &ResultSet, column_index: usize) -> Result<Vec<f64>, DecodeError> {
    Ok(column(result_set, column_index)?
        .into_iter()
        .map(|v| v.numeric_value)
        .collect())
}

/// Numeric values at `column`, one vector per curve
pub fn column_values_by_curve(
    result_set: &ResultSet,
    column_index: usize,
) -> Result<Vec<Vec<f64>>, DecodeError> {
    result_set
        .curves()
        .iter()
        .enumerate()
        .map(|(curve_index, curve)| {
            curve
                .packages()
                .iter()
                .enumerate()
                .map(|(package_index, package)| {
                    package
                        .get(column_index)
                        .map(|v| v.numeric_value)
                        .ok_or(DecodeError::ColumnIndexOutOfRange {
                            column: column_index,
                            curve: curve_index,
                            package: package_index,
                            width: package.len(),
                        })
                })
                .collect::<Result<Vec<f64>, DecodeError>>()
        })
        .collect()
}

impl ResultSet {
    /// See [`column_values`]
    pub fn column_values(&self, column_index: usize) -> Result<Vec<f64>, DecodeError> {
        column_values(self, column_index)
    }
}
