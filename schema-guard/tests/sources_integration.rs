//! Integration tests for record sources feeding the statistics pass.

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use schema_guard::core::{FeatureType, Record, Value};
use schema_guard::schema::SchemaInferencer;
use schema_guard::sources::{
    batch_to_records, CsvSource, MemorySource, QuerySource, RecordSource,
};
use schema_guard::statistics::StatisticsComputer;
use schema_guard::validation::{AnomalyKind, Validator};
use std::io::Write;
use std::sync::Arc;

fn trips_batch(offset: i64, rows: usize) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("trip_id", DataType::Int64, false),
        Field::new("payment_type", DataType::Utf8, true),
        Field::new("fare", DataType::Float64, true),
        Field::new("tipped", DataType::Boolean, true),
    ]));
    let ids: Vec<i64> = (0..rows as i64).map(|i| offset + i).collect();
    let payments: Vec<Option<&str>> = ids
        .iter()
        .map(|i| match i % 4 {
            0 => Some("Cash"),
            1 | 2 => Some("Credit Card"),
            _ => None,
        })
        .collect();
    let fares: Vec<Option<f64>> = ids
        .iter()
        .map(|i| if i % 5 == 0 { None } else { Some(*i as f64 * 0.75) })
        .collect();
    let tipped: Vec<Option<bool>> = ids.iter().map(|i| Some(i % 2 == 0)).collect();

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)) as ArrayRef,
            Arc::new(StringArray::from(payments)) as ArrayRef,
            Arc::new(Float64Array::from(fares)) as ArrayRef,
            Arc::new(BooleanArray::from(tipped)) as ArrayRef,
        ],
    )
    .unwrap()
}

fn equivalent_records(batches: &[RecordBatch]) -> Vec<Record> {
    let mut records = Vec::new();
    for batch in batches {
        for row in 0..batch.num_rows() {
            let id = batch
                .column(0)
                .as_any()
                .downcast_ref::<Int64Array>()
                .unwrap()
                .value(row);
            let payment = match id % 4 {
                0 => Value::from("Cash"),
                1 | 2 => Value::from("Credit Card"),
                _ => Value::Null,
            };
            let fare = if id % 5 == 0 { Value::Null } else { Value::from(id as f64 * 0.75) };
            records.push(
                Record::new()
                    .with("trip_id", id)
                    .with("payment_type", payment)
                    .with("fare", fare)
                    .with("tipped", id % 2 == 0),
            );
        }
    }
    records
}

#[test]
fn test_arrow_batches_match_equivalent_records() {
    let batches = vec![trips_batch(0, 50), trips_batch(50, 30)];
    let computer = StatisticsComputer::new();

    let from_batches = computer.compute_batches(&batches).unwrap();
    let from_records = computer.compute(&equivalent_records(&batches)).unwrap();
    assert_eq!(from_batches, from_records);
    assert_eq!(from_batches.row_count(), 80);
    assert_eq!(
        from_batches.column("payment_type").unwrap().missing_count,
        20
    );
}

#[test]
fn test_batch_rows_keep_column_order() {
    let records = batch_to_records(&trips_batch(3, 1)).unwrap();
    let columns: Vec<&str> = records[0].iter().map(|(name, _)| name).collect();
    assert_eq!(columns, vec!["trip_id", "payment_type", "fare", "tipped"]);
    assert_eq!(records[0].get("payment_type"), Some(&Value::Null));
}

#[tokio::test]
async fn test_query_source_over_registered_batches() {
    let ctx = SessionContext::new();
    ctx.register_batch("trips", trips_batch(0, 100)).unwrap();

    let training = QuerySource::new(ctx.clone(), "SELECT * FROM trips WHERE trip_id < 60").unwrap();
    let serving = QuerySource::new(
        ctx,
        "SELECT trip_id, payment_type, fare FROM trips WHERE trip_id >= 60",
    )
    .unwrap();

    let computer = StatisticsComputer::builder().partitions(4).build();
    let baseline = computer.compute_source(&training).await.unwrap();
    let current = computer.compute_source(&serving).await.unwrap();
    assert_eq!(baseline.row_count(), 60);
    assert_eq!(current.row_count(), 40);

    let mut schema = SchemaInferencer::new().infer(&baseline);
    assert_eq!(
        schema.feature("tipped").unwrap().feature_type(),
        FeatureType::Boolean
    );

    let anomalies = Validator::new().validate(&current, &schema, None, None);
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].kind, AnomalyKind::MissingExpectedColumn);

    schema
        .edit()
        .declare_environments(["SERVING"])
        .unwrap()
        .mark_absent_in_environment("tipped", "SERVING")
        .unwrap();
    assert!(Validator::new()
        .validate(&current, &schema, None, Some("SERVING"))
        .is_empty());
}

#[tokio::test]
async fn test_csv_source_pipeline() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "station,temperature,raining").unwrap();
    for i in 0..30 {
        let station = ["north", "south", "east"][i % 3];
        let temperature = if i % 10 == 0 {
            String::new()
        } else {
            format!("{}.5", 10 + i)
        };
        writeln!(file, "{station},{temperature},{}", i % 4 == 0).unwrap();
    }
    file.flush().unwrap();

    let source = CsvSource::new(file.path().to_string_lossy()).unwrap();
    assert!(source.description().starts_with("csv file"));

    let snapshot = StatisticsComputer::new().compute_source(&source).await.unwrap();
    assert_eq!(snapshot.row_count(), 30);

    let temperature = snapshot.column("temperature").unwrap();
    assert_eq!(temperature.feature_type, Some(FeatureType::Numeric));
    assert_eq!(temperature.missing_count, 3);
    assert_eq!(
        snapshot.column("raining").unwrap().feature_type,
        Some(FeatureType::Boolean)
    );
    assert_eq!(snapshot.column("station").unwrap().distinct_count(), Some(3));
}

#[tokio::test]
async fn test_memory_source_from_batches() {
    let source = MemorySource::from_batches(&[trips_batch(0, 10), trips_batch(10, 5)]).unwrap();
    assert_eq!(source.len(), 15);

    let snapshot = StatisticsComputer::new().compute_source(&source).await.unwrap();
    assert_eq!(snapshot.row_count(), 15);
    assert_eq!(
        snapshot.column("fare").unwrap().present_count,
        12
    );
}
