use c2i::testing::MockConnector;
use c2i::{Ingestor, TimestampPolicy};

use super::*;
use crate::testing::{MockRuntime, Posted};

const EVENT: &str = r#"{"httpMethod":"POST","path":"/data","body":"{\"TestDetail\":{\"Name\":\"login\"},\"NodeName\":\"n1\"}"}"#;
const EMPTY_EVENT: &str = r#"{"httpMethod":"POST","path":"/data","body":""}"#;

fn ingestor(connector: MockConnector) -> Ingestor<MockConnector> {
    Ingestor::new(connector, TimestampPolicy::FromReport)
}

#[tokio::test]
async fn posts_ok_response_for_successful_invocation() {
    let api = MockRuntime::new(&[("req-1", EVENT)]);
    let connector = MockConnector::new();

    serve_next(&api, &ingestor(connector.clone())).await.unwrap();

    match &api.posted()[..] {
        [Posted::Response { request_id, body }] => {
            assert_eq!(request_id, "req-1");
            assert!(body.contains(r#""statusCode":200"#), "body: {body}");
            assert!(body.contains(r#""body":"OK""#), "body: {body}");
        }
        other => panic!("unexpected posts: {other:?}"),
    }
    assert_eq!(connector.written().len(), 1);
}

#[tokio::test]
async fn posts_error_for_failed_invocation() {
    let api = MockRuntime::new(&[("req-2", EMPTY_EVENT)]);
    let connector = MockConnector::new();

    serve_next(&api, &ingestor(connector.clone())).await.unwrap();

    assert_eq!(
        api.posted(),
        vec![Posted::Error {
            request_id: "req-2".into(),
            error: FunctionError::new(
                "Ingest.InputInvalid",
                "no name was provided in the HTTP body"
            ),
        }]
    );
    assert_eq!(connector.connects(), 0);
}

#[tokio::test]
async fn backend_failure_is_reported_as_write_error() {
    let api = MockRuntime::new(&[("req-3", EVENT)]);

    serve_next(&api, &ingestor(MockConnector::failing_write()))
        .await
        .unwrap();

    match &api.posted()[..] {
        [Posted::Error { error, .. }] => {
            assert_eq!(error.error_type, "Ingest.BackendWrite");
            assert!(error.message.contains("simulated outage"));
        }
        other => panic!("unexpected posts: {other:?}"),
    }
}

#[tokio::test]
async fn post_failure_does_not_stop_the_loop() {
    let api = MockRuntime::rejecting(&[("req-4", EVENT)]);
    serve_next(&api, &ingestor(MockConnector::new()))
        .await
        .unwrap();
    assert_eq!(api.posted().len(), 1);
}

#[tokio::test]
async fn run_serves_until_next_invocation_fails() {
    let api = MockRuntime::new(&[("a", EVENT), ("b", EMPTY_EVENT), ("c", EVENT)]);
    let connector = MockConnector::new();

    let err = run(&api, &ingestor(connector.clone())).await;

    assert!(matches!(err, ApiError::MissingRequestId));
    let ids: Vec<_> = api
        .posted()
        .into_iter()
        .map(|p| match p {
            Posted::Response { request_id, .. } | Posted::Error { request_id, .. } => request_id,
        })
        .collect();
    assert_eq!(ids, ["a", "b", "c"]);
    assert_eq!(connector.written().len(), 2);
}
