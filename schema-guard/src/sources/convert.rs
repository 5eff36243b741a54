//! Arrow record batches to [`Record`]s.

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;

use crate::core::{Record, Value};
use crate::error::Result;

/// Converts a record batch into one [`Record`] per row.
///
/// Integer columns become [`Value::Integer`] (unsigned values above `i64::MAX`
/// become doubles), floating point columns [`Value::Double`], string columns
/// [`Value::String`] and boolean columns [`Value::Boolean`]. Nulls are
/// [`Value::Null`]. Any other Arrow type is rendered to its display string.
pub fn batch_to_records(batch: &RecordBatch) -> Result<Vec<Record>> {
    let schema = batch.schema();
    let mut columns = Vec::with_capacity(batch.num_columns());
    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        columns.push((field.name().as_str(), column_values(array)?));
    }

    let records = (0..batch.num_rows())
        .map(|row| {
            columns
                .iter()
                .map(|(name, values)| (name.to_string(), values[row].clone()))
                .collect::<Record>()
        })
        .collect();
    Ok(records)
}

fn column_values(array: &ArrayRef) -> Result<Vec<Value>> {
    let rows = 0..array.len();
    let values = match array.data_type() {
        DataType::Null => rows.map(|_| Value::Null).collect(),
        DataType::Boolean => {
            let array = array.as_boolean();
            rows.map(|i| non_null(array, i, || Value::Boolean(array.value(i))))
                .collect()
        }
        DataType::Int8 => integers(array.as_primitive::<Int8Type>(), |v| v as i64),
        DataType::Int16 => integers(array.as_primitive::<Int16Type>(), |v| v as i64),
        DataType::Int32 => integers(array.as_primitive::<Int32Type>(), |v| v as i64),
        DataType::Int64 => integers(array.as_primitive::<Int64Type>(), |v| v),
        DataType::UInt8 => integers(array.as_primitive::<UInt8Type>(), |v| v as i64),
        DataType::UInt16 => integers(array.as_primitive::<UInt16Type>(), |v| v as i64),
        DataType::UInt32 => integers(array.as_primitive::<UInt32Type>(), |v| v as i64),
        DataType::UInt64 => {
            let array = array.as_primitive::<UInt64Type>();
            rows.map(|i| {
                non_null(array, i, || {
                    let v = array.value(i);
                    i64::try_from(v).map_or(Value::Double(v as f64), Value::Integer)
                })
            })
            .collect()
        }
        DataType::Float32 => {
            let array = array.as_primitive::<Float32Type>();
            rows.map(|i| non_null(array, i, || Value::Double(array.value(i) as f64)))
                .collect()
        }
        DataType::Float64 => {
            let array = array.as_primitive::<Float64Type>();
            rows.map(|i| non_null(array, i, || Value::Double(array.value(i))))
                .collect()
        }
        DataType::Utf8 => {
            let array = array.as_string::<i32>();
            rows.map(|i| non_null(array, i, || Value::String(array.value(i).to_string())))
                .collect()
        }
        DataType::LargeUtf8 => {
            let array = array.as_string::<i64>();
            rows.map(|i| non_null(array, i, || Value::String(array.value(i).to_string())))
                .collect()
        }
        DataType::Utf8View => {
            let array = array.as_string_view();
            rows.map(|i| non_null(array, i, || Value::String(array.value(i).to_string())))
                .collect()
        }
        _ => {
            let mut values = Vec::with_capacity(array.len());
            for i in rows {
                values.push(if array.is_null(i) {
                    Value::Null
                } else {
                    Value::String(array_value_to_string(array.as_ref(), i)?)
                });
            }
            values
        }
    };
    Ok(values)
}

fn non_null(array: &dyn Array, row: usize, value: impl FnOnce() -> Value) -> Value {
    if array.is_null(row) {
        Value::Null
    } else {
        value()
    }
}

fn integers<T>(
    array: &arrow::array::PrimitiveArray<T>,
    convert: impl Fn(T::Native) -> i64,
) -> Vec<Value>
where
    T: arrow::datatypes::ArrowPrimitiveType,
{
    array
        .iter()
        .map(|v| v.map_or(Value::Null, |v| Value::Integer(convert(v))))
        .collect()
}
