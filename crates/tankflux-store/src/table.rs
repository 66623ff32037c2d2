use polars::prelude::{Column, DataFrame, DataType, NamedFrom, Series};

use crate::errors::StoreError;

/// Splits a frame into named float columns, keeping column order. Nulls become NaN.
pub fn dataframe_to_columns(df: &DataFrame) -> Result<Vec<(String, Vec<f64>)>, StoreError> {
    let mut columns = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let as_float = column.cast(&DataType::Float64)?;
        let values: Vec<f64> = as_float
            .f64()?
            .into_iter()
            .map(|value| value.unwrap_or(f64::NAN))
            .collect();
        columns.push((column.name().as_str().to_string(), values));
    }
    Ok(columns)
}

pub fn columns_to_dataframe(columns: Vec<(String, Vec<f64>)>) -> Result<DataFrame, StoreError> {
    let columns: Vec<Column> = columns
        .into_iter()
        .map(|(name, values)| Series::new(name.as_str().into(), values).into())
        .collect();
    Ok(DataFrame::new(columns)?)
}
