//! Mock transport for testing
//!
//! Returns queued responses without network access and records every request.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{DataRequest, Transport, TransportError};

#[derive(Debug, Clone)]
struct Queued {
    body: Result<String, TransportError>,
    delay: Duration,
}

/// Mock transport that answers from a FIFO queue
#[derive(Debug, Clone)]
pub struct MockTransport {
    /// Responses to return (FIFO)
    responses: Arc<Mutex<VecDeque<Queued>>>,
    /// Body returned when the queue is empty
    default_body: String,
    /// Every request made (for assertions)
    requests: Arc<Mutex<Vec<DataRequest>>>,
}

impl MockTransport {
    /// Answers `{}` until responses are queued
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            default_body: "{}".to_string(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the body returned when the queue is empty
    pub fn with_default(mut self, body: impl Into<String>) -> Self {
        self.default_body = body.into();
        self
    }

    pub fn queue_body(&self, body: impl Into<String>) {
        self.push(Ok(body.into()), Duration::ZERO);
    }

    pub fn queue_json(&self, value: Value) {
        self.push(Ok(value.to_string()), Duration::ZERO);
    }

    /// Queue a JSON response that completes after `delay`
    pub fn queue_json_delayed(&self, value: Value, delay: Duration) {
        self.push(Ok(value.to_string()), delay);
    }

    pub fn queue_error(&self, error: TransportError) {
        self.push(Err(error), Duration::ZERO);
    }

    fn push(&self, body: Result<String, TransportError>, delay: Duration) {
        self.responses.lock().push_back(Queued { body, delay });
    }

    /// All requests made so far
    pub fn requests(&self) -> Vec<DataRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<DataRequest> {
        self.requests.lock().last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn request(&self, request: &DataRequest) -> Result<String, TransportError> {
        self.requests.lock().push(request.clone());

        // Dequeue before sleeping so overlapping requests keep their order
        let queued = self.responses.lock().pop_front();
        let Some(Queued { body, delay }) = queued else {
            return Ok(self.default_body.clone());
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn default_body_when_queue_empty() {
        let transport = MockTransport::new();
        let body = transport.request(&DataRequest::get("http://x")).await.unwrap();
        assert_eq!(body, "{}");
    }

    #[tokio::test]
    async fn queued_responses_in_order() {
        let transport = MockTransport::new();
        transport.queue_json(json!({"n": 1}));
        transport.queue_error(TransportError::Status {
            url: "http://x".into(),
            status: 500,
        });

        let request = DataRequest::get("http://x");
        assert_eq!(transport.request_json(&request).await.unwrap(), json!({"n": 1}));
        assert!(matches!(
            transport.request(&request).await,
            Err(TransportError::Status { status: 500, .. })
        ));
        assert_eq!(transport.request(&request).await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn records_requests() {
        let transport = MockTransport::new();
        transport
            .request(&DataRequest::get("http://x/a"))
            .await
            .unwrap();
        transport
            .request(&DataRequest::get("http://x/b"))
            .await
            .unwrap();

        assert_eq!(transport.request_count(), 2);
        assert_eq!(transport.last_request().unwrap().url, "http://x/b");
    }

    #[tokio::test]
    async fn clones_share_state() {
        let transport = MockTransport::new();
        let clone = transport.clone();
        clone.queue_body("[]");
        assert_eq!(transport.request(&DataRequest::get("http://x")).await.unwrap(), "[]");
        assert_eq!(clone.request_count(), 1);
    }
}
