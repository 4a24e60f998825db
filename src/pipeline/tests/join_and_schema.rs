//! Feature join and output schema

use super::*;
use crate::constants::columns;
use crate::error::BalneabilityError;
use crate::features::PointFeatureSource;
use tempfile::TempDir;

#[tokio::test]
async fn test_points_without_features_are_dropped() {
    let temp_dir = TempDir::new().unwrap();

    let source = FakeSource::new().with_report(
        2020,
        report(&[(1, rows(2020, 2)), (2, rows(2020, 3)), (9, rows(2020, 4))]),
    );

    let stats = pipeline(source, features(&[1, 2]), test_config(&temp_dir))
        .process()
        .await
        .unwrap();

    assert_eq!(stats.measurements, 9);
    assert_eq!(stats.rows_without_features, 4);
    assert_eq!(stats.total_rows, 5);

    let (header, data) = read_rows(&output_path(&temp_dir));
    let point = header.iter().position(|h| h == columns::POINT_ID).unwrap();
    assert!(data.iter().all(|row| row[point] != "9"));
}

#[tokio::test]
async fn test_feature_columns_joined() {
    let temp_dir = TempDir::new().unwrap();
    let source = FakeSource::new().with_report(2020, report(&[(2, rows(2020, 1))]));

    pipeline(source, features(&[2]), test_config(&temp_dir))
        .process()
        .await
        .unwrap();

    let (header, data) = read_rows(&output_path(&temp_dir));
    let field = |name: &str| {
        let index = header.iter().position(|h| h == name).unwrap();
        data[0][index].clone()
    };
    assert_eq!(field(columns::BALNEARY), "jurerê");
    assert_eq!(field(columns::REFERENCE), "acesso 2");
    assert_eq!(field(columns::DRENAGE_BEACH), "true");
    assert_eq!(field(columns::FRESH_WATER), "false");
}

#[tokio::test]
async fn test_column_order_is_fixed() {
    let temp_dir = TempDir::new().unwrap();
    let source = FakeSource::new()
        .with_report(2021, report(&[(1, rows(2021, 1))]))
        .with_report(2022, report(&[(1, rows(2022, 1))]));

    pipeline(source, features(&[1]), test_config(&temp_dir))
        .process()
        .await
        .unwrap();

    let (header, _) = read_rows(&output_path(&temp_dir));
    assert_eq!(header[0], "");
    assert_eq!(&header[1..], columns::output_columns().as_slice());
}

#[tokio::test]
async fn test_empty_run_still_writes_header() {
    let temp_dir = TempDir::new().unwrap();
    let source = FakeSource::new().with_failure(2020, "status 500");

    let stats = pipeline(source, features(&[1]), test_config(&temp_dir))
        .process()
        .await
        .unwrap();

    assert_eq!(stats.total_rows, 0);
    let (header, data) = read_rows(&output_path(&temp_dir));
    assert_eq!(&header[1..], columns::output_columns().as_slice());
    assert!(data.is_empty());
}

struct BrokenFeatures;

impl PointFeatureSource for BrokenFeatures {
    fn load(&self) -> crate::error::Result<Vec<crate::models::PointFeature>> {
        Err(BalneabilityError::FeatureFile {
            path: "features_points.csv".into(),
            reason: "file not found".to_string(),
        })
    }
}

#[tokio::test]
async fn test_feature_failure_stops_before_fetching() {
    let temp_dir = TempDir::new().unwrap();
    let source = FakeSource::new().with_report(2020, report(&[(1, rows(2020, 1))]));

    let pipeline = BalneabilityPipeline::new(source, BrokenFeatures, test_config(&temp_dir))
        .unwrap()
        .with_progress(false);
    let result = pipeline.process().await;

    assert!(matches!(result, Err(BalneabilityError::FeatureFile { .. })));
    assert!(pipeline.source.requested().is_empty());
}
