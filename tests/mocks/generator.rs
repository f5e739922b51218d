use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use ytstudy::error::GenerateError;
use ytstudy::llm::Generator;

/// A recorded `generate` call
#[derive(Debug, Clone)]
pub struct GenerateCall {
    pub system: String,
    pub user: String,
}

#[derive(Clone)]
pub struct MockGenerator {
    pub response: String,
    pub calls: Arc<Mutex<Vec<GenerateCall>>>,
    pub fail: bool,
}

impl MockGenerator {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            response: String::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<GenerateCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, system: &str, user: &str, _cancel: &CancellationToken) -> Result<String, GenerateError> {
        self.calls.lock().unwrap().push(GenerateCall {
            system: system.to_string(),
            user: user.to_string(),
        });
        if self.fail {
            return Err(GenerateError::Status {
                provider: "Mock",
                status: 429,
                body: "quota exceeded".to_string(),
            });
        }
        Ok(self.response.clone())
    }
}
