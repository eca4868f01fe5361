use crate::testing::{MockConnector, fixed_clock};

use super::*;

const LOGIN: &str =
    r#"{"TestDetail":{"Name":"login"},"NodeName":"n1","Summary":{"Timing":{"Total":1.5}}}"#;

fn server_ingestor(connector: MockConnector) -> Ingestor<MockConnector> {
    Ingestor::new(connector, TimestampPolicy::ProcessingTime(fixed_clock))
}

#[tokio::test]
async fn writes_three_points_in_one_batch() {
    let connector = MockConnector::new();
    server_ingestor(connector.clone())
        .ingest(LOGIN.as_bytes())
        .await
        .unwrap();

    let written = connector.written();
    assert_eq!(written.len(), 1, "exactly one write call");
    assert_eq!(
        written[0],
        "test_timing,nodename=n1,testname=login doccomplete=0,domload=0,renderstart=0,total=1.5 1714564800\n\
         test_byte,nodename=n1,testname=login css=0,html=0,image=0,script=0,totalcontent=0 1714564800\n\
         test_counter,nodename=n1,testname=login availability=100,jsfailures=0 1714564800"
    );
}

#[tokio::test]
async fn report_policy_writes_calendar_fields_and_report_time() {
    let connector = MockConnector::new();
    Ingestor::new(connector.clone(), TimestampPolicy::FromReport)
        .ingest(br#"{"Summary":{"Timestamp":"20230615143000XYZ"}}"#)
        .await
        .unwrap();

    let written = connector.written();
    let counter = written[0].lines().nth(2).unwrap();
    assert_eq!(
        counter,
        r#"test_counter availability=100,jsfailures=0,month="06",year="2023",year-month="2023-06" 1686839400"#
    );
}

#[tokio::test]
async fn report_policy_without_timestamp_writes_untimed_lines() {
    let connector = MockConnector::new();
    Ingestor::new(connector.clone(), TimestampPolicy::FromReport)
        .ingest(b"{}")
        .await
        .unwrap();

    let written = connector.written();
    let lines: Vec<_> = written[0].lines().collect();
    assert_eq!(lines[0], "test_timing doccomplete=0,domload=0,renderstart=0");
    assert_eq!(
        lines[2],
        r#"test_counter availability=100,jsfailures=0,month="01",year="0001",year-month="0001-01""#
    );
}

#[tokio::test]
async fn invalid_json_fails_before_connecting() {
    let connector = MockConnector::new();
    let err = server_ingestor(connector.clone())
        .ingest(b"{\"Summary\":")
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Decode(_)));
    assert!(err.to_string().starts_with("JSON decode error: "));
    assert_eq!(connector.connects(), 0);
}

#[tokio::test]
async fn malformed_timestamp_fails_without_writing() {
    let connector = MockConnector::new();
    let err = Ingestor::new(connector.clone(), TimestampPolicy::FromReport)
        .ingest(br#"{"Summary":{"Timestamp":"2023-06"}}"#)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Timestamp(_)));
    assert_eq!(err.error_type(), "Ingest.TimestampInvalid");
    assert_eq!(connector.connects(), 0);
    assert!(connector.written().is_empty());
}

#[tokio::test]
async fn leap_second_timestamp_fails_without_writing() {
    let connector = MockConnector::new();
    let err = Ingestor::new(connector.clone(), TimestampPolicy::FromReport)
        .ingest(br#"{"Summary":{"Timestamp":"20230615143060"}}"#)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Timestamp(_)));
    assert!(connector.written().is_empty());
}

#[tokio::test]
async fn connect_failure_is_reported() {
    let connector = MockConnector::failing_connect();
    let err = server_ingestor(connector.clone())
        .ingest(LOGIN.as_bytes())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Connect(_)));
    assert!(err.to_string().starts_with("InfluxDB connection error: "));
    assert!(connector.written().is_empty());
}

#[tokio::test]
async fn missing_database_is_a_batch_error() {
    let connector = MockConnector::new().with_database("");
    let err = server_ingestor(connector.clone())
        .ingest(LOGIN.as_bytes())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Batch(BatchError::DatabaseMissing)));
    assert_eq!(err.error_type(), "Ingest.BackendBatch");
    assert!(connector.written().is_empty());
}

#[tokio::test]
async fn write_failure_is_reported() {
    let connector = MockConnector::failing_write();
    let err = server_ingestor(connector.clone())
        .ingest(LOGIN.as_bytes())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Write(_)));
    assert_eq!(err.error_type(), "Ingest.BackendWrite");
    assert!(err.to_string().contains("simulated outage"));
    assert_eq!(connector.connects(), 1);
}

#[tokio::test]
async fn invalid_point_aborts_whole_batch() {
    let connector = MockConnector::new();
    let ingestor = server_ingestor(connector.clone());

    let mut measurements = Measurements::build(
        &Report::parse(LOGIN.as_bytes()).unwrap(),
        ingestor.policy(),
    )
    .unwrap();
    measurements
        .counter
        .insert("hosts".into(), f64::NAN.into());

    let err = ingestor.write(&measurements).await.unwrap_err();
    assert!(matches!(err, IngestError::Point(PointError::NonFinite { .. })));
    assert!(err.to_string().starts_with("InfluxDB point error: "));
    assert!(connector.written().is_empty(), "no partial batch");
}

#[test]
fn error_types_are_stage_specific() {
    assert_eq!(IngestError::EmptyBody.error_type(), "Ingest.InputInvalid");
    assert_eq!(
        IngestError::Point(PointError::MissingMeasurement).error_type(),
        "Ingest.PointInvalid"
    );
    assert_eq!(
        IngestError::Connect(ClientError::UnsupportedScheme("ftp".into())).error_type(),
        "Ingest.BackendConnection"
    );
}
