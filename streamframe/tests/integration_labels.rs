//! Integration tests for labels push mode.

use streamframe::error::Result;
use streamframe::frame::DISPLAY_NAME_KEY;
use streamframe::labels::parse_labels;
use streamframe::{
    DataFrameMessage, FieldSchema, FieldType, FieldValue, FrameError, FrameSchema, PushError,
    PushMode, StreamingDataFrame, StreamingFrameOptions,
};

fn sensor_schema() -> FrameSchema {
    FrameSchema::new(vec![
        FieldSchema::new("labels", FieldType::String),
        FieldSchema::new("time", FieldType::Time),
        FieldSchema::new("speed", FieldType::Number),
    ])
}

/// Builds a labeled payload from `(labels, time, speed)` rows.
fn rows(rows: &[(&str, f64, f64)]) -> Vec<Vec<FieldValue>> {
    vec![
        rows.iter().map(|r| FieldValue::from(r.0)).collect(),
        rows.iter().map(|r| FieldValue::from(r.1)).collect(),
        rows.iter().map(|r| FieldValue::from(r.2)).collect(),
    ]
}

fn cells(values: &[Option<f64>]) -> Vec<FieldValue> {
    values.iter().copied().map(FieldValue::from).collect()
}

fn column_for<'a>(frame: &'a StreamingDataFrame, labels: &str) -> &'a [FieldValue] {
    let labels = parse_labels(labels).unwrap();
    let index = frame.matching_field_indexes(|f| f.labels.as_ref() == Some(&labels));
    assert_eq!(index.len(), 1, "expected one column for {labels:?}");
    &frame.fields()[index[0]].values
}

#[test]
fn test_sparse_series_aligned_on_time() -> Result<()> {
    let mut frame = StreamingDataFrame::new(StreamingFrameOptions::new(Some(4), None)?)?;

    frame.push(DataFrameMessage::new(
        sensor_schema(),
        rows(&[("sensor=A", 100.0, 10.0), ("sensor=B", 100.0, 15.0)]),
    ))?;
    frame.push_new_values(rows(&[("sensor=B", 200.0, 20.0), ("sensor=C", 200.0, 25.0)]))?;
    frame.push_new_values(rows(&[("sensor=A", 300.0, 30.0), ("sensor=C", 400.0, 40.0)]))?;

    assert_eq!(frame.push_mode(), PushMode::Labels);
    assert_eq!(frame.fields().len(), 4);
    assert_eq!(frame.len(), 4);

    let time: Vec<f64> = frame.fields()[0].numbers().map(Option::unwrap).collect();
    assert_eq!(time, [100.0, 200.0, 300.0, 400.0]);

    assert_eq!(
        column_for(&frame, "sensor=A"),
        cells(&[Some(10.0), None, Some(30.0), None])
    );
    assert_eq!(
        column_for(&frame, "sensor=B"),
        cells(&[Some(15.0), Some(20.0), None, None])
    );
    assert_eq!(
        column_for(&frame, "sensor=C"),
        cells(&[None, Some(25.0), None, Some(40.0)])
    );

    let series: Vec<_> = frame.series_labels().iter().map(|l| l["sensor"].as_str()).collect();
    assert_eq!(series, ["A", "B", "C"]);
    Ok(())
}

#[test]
fn test_labels_column_after_time_field() -> Result<()> {
    let mut frame = StreamingDataFrame::new(StreamingFrameOptions::new(Some(4), None)?)?;

    let messages = [
        r#"{"schema": {"fields": [{"name": "time", "type": "time"}, {"name": "labels", "type": "string"}, {"name": "speed", "type": "number"}]},
            "data": {"values": [[100, 100], ["sensor=A", "sensor=B"], [10, 15]]}}"#,
        r#"{"data": {"values": [[200, 200], ["sensor=B", "sensor=C"], [20, 25]]}}"#,
        r#"{"data": {"values": [[300, 400], ["sensor=A", "sensor=C"], [30, 40]]}}"#,
    ];
    for message in messages {
        frame.push(DataFrameMessage::from_json(message)?)?;
    }

    assert_eq!(frame.push_mode(), PushMode::Labels);
    assert_eq!(frame.time_index(), Some(0));
    assert_eq!(frame.fields().len(), 4);
    assert!(frame.fields().iter().all(|f| f.name != "labels"));

    let time: Vec<f64> = frame.fields()[0].numbers().map(Option::unwrap).collect();
    assert_eq!(time, [100.0, 200.0, 300.0, 400.0]);

    assert_eq!(
        column_for(&frame, "sensor=A"),
        cells(&[Some(10.0), None, Some(30.0), None])
    );
    assert_eq!(
        column_for(&frame, "sensor=B"),
        cells(&[Some(15.0), Some(20.0), None, None])
    );
    assert_eq!(
        column_for(&frame, "sensor=C"),
        cells(&[None, Some(25.0), None, Some(40.0)])
    );
    Ok(())
}

#[test]
fn test_series_columns_trimmed_with_time() -> Result<()> {
    let mut frame = StreamingDataFrame::new(StreamingFrameOptions::new(Some(2), None)?)?;

    frame.push(DataFrameMessage::new(sensor_schema(), rows(&[("host=a", 1.0, 1.0)])))?;
    frame.push_new_values(rows(&[("host=b", 2.0, 2.0)]))?;
    frame.push_new_values(rows(&[("host=a", 3.0, 3.0)]))?;

    // Series b survives eviction of the rows that created it
    assert_eq!(frame.fields().len(), 3);
    assert_eq!(column_for(&frame, "host=a"), cells(&[None, Some(3.0)]));
    assert_eq!(column_for(&frame, "host=b"), cells(&[Some(2.0), None]));
    Ok(())
}

#[test]
fn test_label_formats_map_to_same_series() -> Result<()> {
    let mut frame = StreamingDataFrame::empty();

    frame.push(DataFrameMessage::new(
        sensor_schema(),
        rows(&[
            (r#"{"host":"a","dc":"x"}"#, 1.0, 1.0),
            (r#"{dc="x", host="a"}"#, 2.0, 2.0),
            ("host=a,dc=x", 3.0, 3.0),
        ]),
    ))?;

    assert_eq!(frame.series_labels().len(), 1);
    assert_eq!(frame.fields().len(), 2);
    assert_eq!(frame.len(), 3);
    Ok(())
}

#[test]
fn test_empty_label_string_is_a_series() -> Result<()> {
    let mut frame = StreamingDataFrame::empty();

    frame.push(DataFrameMessage::new(
        sensor_schema(),
        rows(&[("", 1.0, 1.0), ("host=a", 1.0, 2.0)]),
    ))?;

    assert_eq!(frame.series_labels().len(), 2);
    assert!(frame.series_labels()[0].is_empty());
    Ok(())
}

#[test]
fn test_malformed_row_skipped_batch_continues() -> Result<()> {
    let mut frame = StreamingDataFrame::empty();

    frame.push(DataFrameMessage::new(
        sensor_schema(),
        rows(&[
            ("sensor=A", 100.0, 1.0),
            ("sensor", 200.0, 2.0),
            (r#"sensor="B"#, 300.0, 3.0),
            ("sensor=B", 400.0, 4.0),
        ]),
    ))?;

    let time: Vec<f64> = frame.fields()[0].numbers().map(Option::unwrap).collect();
    assert_eq!(time, [100.0, 400.0]);
    assert_eq!(column_for(&frame, "sensor=A"), cells(&[Some(1.0), None]));
    assert_eq!(column_for(&frame, "sensor=B"), cells(&[None, Some(4.0)]));
    assert_eq!(frame.packet_info().length, 2);
    Ok(())
}

#[test]
fn test_missing_labels_column_rejected() -> Result<()> {
    let mut frame = StreamingDataFrame::empty();
    frame.push(DataFrameMessage::new(sensor_schema(), rows(&[("sensor=A", 1.0, 1.0)])))?;
    let before = frame.clone();

    let result = frame.push_new_values(vec![vec![FieldValue::from(2.0)], vec![FieldValue::from(2.0)]]);
    assert!(matches!(
        result,
        Err(FrameError::Push(PushError::MissingLabelsColumn { .. }))
    ));

    let result = frame.push_new_values(vec![vec![FieldValue::from(2.0)]]);
    assert!(matches!(
        result,
        Err(FrameError::Push(PushError::SchemaMismatch { labels: true, .. }))
    ));

    assert_eq!(frame, before);
    Ok(())
}

#[test]
fn test_display_names_rendered_per_series() -> Result<()> {
    let options = StreamingFrameOptions::default().with_display_name_format("{{sensor}} ({{room}})");
    let mut frame = StreamingDataFrame::new(options)?;

    frame.push(DataFrameMessage::new(
        sensor_schema(),
        rows(&[("sensor=A,room=lab", 1.0, 1.0), ("sensor=B", 1.0, 2.0)]),
    ))?;

    let names: Vec<_> = frame.fields()[1..]
        .iter()
        .map(|f| f.config[DISPLAY_NAME_KEY].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["A (lab)", "B ()"]);
    assert!(!frame.fields()[0].config.contains_key(DISPLAY_NAME_KEY));
    Ok(())
}

#[test]
fn test_multiple_value_fields_per_series() -> Result<()> {
    let schema = FrameSchema::new(vec![
        FieldSchema::new("labels", FieldType::String),
        FieldSchema::new("speed", FieldType::Number),
        FieldSchema::new("time", FieldType::Time),
        FieldSchema::new("light", FieldType::Number),
    ]);
    let mut frame = StreamingDataFrame::empty();

    frame.push(DataFrameMessage::new(
        schema,
        vec![
            vec!["s=A".into(), "s=B".into()],
            vec![1.0.into(), 2.0.into()],
            vec![100.0.into(), 100.0.into()],
            vec![7.0.into(), 8.0.into()],
        ],
    ))?;

    let names: Vec<_> = frame.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["time", "speed", "light", "speed", "light"]);
    assert_eq!(frame.time_index(), Some(0));
    assert_eq!(frame.fields()[3].values, [FieldValue::from(2.0)]);
    assert_eq!(frame.fields()[4].values, [FieldValue::from(8.0)]);
    Ok(())
}
