use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::runtime_api::{ApiError, FunctionError, Invocation, RuntimeApi};

#[derive(Debug, Clone, PartialEq)]
pub enum Posted {
    Response { request_id: String, body: String },
    Error { request_id: String, error: FunctionError },
}

pub struct MockRuntimeState {
    pub invocations: Mutex<VecDeque<Invocation>>,
    pub posted: Mutex<Vec<Posted>>,
    pub reject_posts: bool,
}

/// Hands out queued invocations, then fails with `MissingRequestId`.
#[derive(Clone)]
pub struct MockRuntime {
    pub state: Arc<MockRuntimeState>,
}

impl MockRuntime {
    pub fn new(events: &[(&str, &str)]) -> Self {
        Self::with_state(events, false)
    }

    /// Every response and error post fails.
    pub fn rejecting(events: &[(&str, &str)]) -> Self {
        Self::with_state(events, true)
    }

    fn with_state(events: &[(&str, &str)], reject_posts: bool) -> Self {
        let invocations = events
            .iter()
            .map(|(id, body)| Invocation {
                request_id: (*id).to_owned(),
                body: (*body).to_owned(),
            })
            .collect();
        Self {
            state: Arc::new(MockRuntimeState {
                invocations: Mutex::new(invocations),
                posted: Mutex::new(Vec::new()),
                reject_posts,
            }),
        }
    }

    pub fn posted(&self) -> Vec<Posted> {
        self.state.posted.lock().unwrap().clone()
    }

    fn record(&self, posted: Posted) -> Result<(), ApiError> {
        self.state.posted.lock().unwrap().push(posted);
        if self.state.reject_posts {
            return Err(ApiError::Rejected {
                path: "invocation".into(),
                status: 500,
            });
        }
        Ok(())
    }
}

impl RuntimeApi for MockRuntime {
    async fn next_invocation(&self) -> Result<Invocation, ApiError> {
        self.state
            .invocations
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ApiError::MissingRequestId)
    }

    async fn send_response(&self, request_id: &str, body: String) -> Result<(), ApiError> {
        self.record(Posted::Response {
            request_id: request_id.to_owned(),
            body,
        })
    }

    async fn send_error(&self, request_id: &str, error: &FunctionError) -> Result<(), ApiError> {
        self.record(Posted::Error {
            request_id: request_id.to_owned(),
            error: error.clone(),
        })
    }
}
