use super::SolverService;
use crate::models::{ImageData, ProblemPayload};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted [`SolverService`] for tests and harnesses.
///
/// Responses cycle in the order they were added; an `Err` entry fails that
/// call with [`Error::Service`]. A delay keeps each call in flight for a
/// while before it settles.
pub struct MockSolverClient {
    responses: Arc<Mutex<Vec<std::result::Result<String, String>>>>,
    requests: Arc<Mutex<Vec<ProblemPayload>>>,
    call_count: Arc<Mutex<usize>>,
    delay: Option<Duration>,
}

impl MockSolverClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_solution(self, solution: String) -> Self {
        self.responses.lock().unwrap().push(Ok(solution));
        self
    }

    pub fn with_failure(self, message: String) -> Self {
        self.responses.lock().unwrap().push(Err(message));
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Payloads received so far, in call order.
    pub fn requests(&self) -> Vec<ProblemPayload> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockSolverClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SolverService for MockSolverClient {
    async fn solve(&self, text: &str, image: Option<&ImageData>) -> Result<String> {
        let count = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };

        self.requests.lock().unwrap().push(ProblemPayload {
            text: text.to_string(),
            image: image.cloned(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(format!("Solution for: {}", text));
        }

        match &responses[(count - 1) % responses.len()] {
            Ok(solution) => Ok(solution.clone()),
            Err(message) => Err(Error::Service(message.clone())),
        }
    }
}
