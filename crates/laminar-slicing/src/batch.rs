//! Columnar slice assignment.
//!
//! Assigns every row of an Arrow `RecordBatch` to its slice in one pass.
//! The rowtime column may be a plain `Int64` of epoch milliseconds or an
//! Arrow `Timestamp` of any unit; sub-millisecond units are floored.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use arrow_array::{Int64Array, RecordBatch};
//! use arrow_schema::{DataType, Field, Schema};
//! use laminar_slicing::batch::assign_batch;
//! use laminar_slicing::slicing::TumblingSliceAssigner;
//! use laminar_slicing::time::SystemClock;
//!
//! let schema = Arc::new(Schema::new(vec![Field::new("ts", DataType::Int64, false)]));
//! let batch = RecordBatch::try_new(
//!     schema,
//!     vec![Arc::new(Int64Array::from(vec![100, 1_500, 2_999]))],
//! ).unwrap();
//!
//! let assigner = TumblingSliceAssigner::from_millis(1_000).unwrap();
//! let ends = assign_batch(&assigner, &batch, 0, &SystemClock::new()).unwrap();
//! assert_eq!(ends.values().to_vec(), vec![1_000, 2_000, 3_000]);
//! ```

use arrow_array::cast::AsArray;
use arrow_array::types::{
    Int64Type, TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use arrow_array::{Array, ArrayRef, ArrowPrimitiveType, Int64Array, RecordBatch};
use arrow_schema::{DataType, TimeUnit};

use crate::slicing::SliceAssigner;
use crate::time::{ClockService, TimeAttribute};

/// Errors that can occur during batch slice assignment.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Column index out of bounds
    #[error("Rowtime column index {index} out of bounds (batch has {num_columns} columns)")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Number of columns in batch
        num_columns: usize,
    },

    /// Column is neither `Int64` nor an Arrow `Timestamp`
    #[error("Unsupported rowtime column type: {0}")]
    UnsupportedType(DataType),

    /// Null timestamp encountered
    #[error("Null timestamp at row {row}")]
    NullTimestamp {
        /// Row index with null value
        row: usize,
    },
}

/// Assigns each row of `batch` to a slice end.
///
/// Event-time assigners read the rowtime column at `rowtime_column`.
/// Processing-time assigners ignore it and read `clock` once, so every row
/// of the batch lands in the same slice.
///
/// # Errors
///
/// Returns [`BatchError`] if the rowtime column is missing, has an
/// unsupported type, or contains a null.
pub fn assign_batch<A>(
    assigner: &A,
    batch: &RecordBatch,
    rowtime_column: usize,
    clock: &dyn ClockService,
) -> Result<Int64Array, BatchError>
where
    A: SliceAssigner + ?Sized,
{
    let zone = assigner.shift_time_zone();

    if assigner.time_attribute() == TimeAttribute::ProcessingTime {
        let slice_end = assigner.slice_end_of(zone.to_local_millis(clock.current_processing_time()));
        return Ok(Int64Array::from(vec![slice_end; batch.num_rows()]));
    }

    let timestamps = rowtime_millis(batch, rowtime_column)?;
    let slice_ends: Vec<i64> = timestamps
        .into_iter()
        .map(|ts| assigner.slice_end_of(zone.to_local_millis(ts)))
        .collect();
    Ok(Int64Array::from(slice_ends))
}

/// Reads the rowtime column as epoch milliseconds.
///
/// # Errors
///
/// See [`assign_batch`].
pub fn rowtime_millis(batch: &RecordBatch, rowtime_column: usize) -> Result<Vec<i64>, BatchError> {
    let num_columns = batch.num_columns();
    if rowtime_column >= num_columns {
        return Err(BatchError::IndexOutOfBounds {
            index: rowtime_column,
            num_columns,
        });
    }
    let column = batch.column(rowtime_column);

    match column.data_type() {
        DataType::Int64 => collect_millis::<Int64Type>(column, |v| v),
        DataType::Timestamp(TimeUnit::Second, _) => {
            collect_millis::<TimestampSecondType>(column, |v| v.saturating_mul(1000))
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            collect_millis::<TimestampMillisecondType>(column, |v| v)
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            collect_millis::<TimestampMicrosecondType>(column, |v| v.div_euclid(1_000))
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            collect_millis::<TimestampNanosecondType>(column, |v| v.div_euclid(1_000_000))
        }
        other => Err(BatchError::UnsupportedType(other.clone())),
    }
}

fn collect_millis<T>(column: &ArrayRef, to_millis: impl Fn(i64) -> i64) -> Result<Vec<i64>, BatchError>
where
    T: ArrowPrimitiveType<Native = i64>,
{
    let array = column
        .as_primitive_opt::<T>()
        .ok_or_else(|| BatchError::UnsupportedType(column.data_type().clone()))?;

    let mut out = Vec::with_capacity(array.len());
    for row in 0..array.len() {
        if array.is_null(row) {
            return Err(BatchError::NullTimestamp { row });
        }
        out.push(to_millis(array.value(row)));
    }
    Ok(out)
}
