use std::sync::Mutex;

use async_trait::async_trait;
use llmdrift_core::{DriftError, RequestId, Result};
use serde::{Deserialize, Serialize};

/// A reply delivered by the oracle, addressed by the id it was submitted under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleResponse {
    pub request_id: RequestId,
    pub content: String,
}

/// Outbound side of the oracle transport.
///
/// `submit` must not wait for the reply. `Ok` means the prompt was accepted
/// for delivery; the reply arrives later through the orchestrator's callback.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn submit(&self, request_id: RequestId, prompt: &str) -> Result<()>;
}

/// In-memory oracle that only records what it was asked (testing only).
#[derive(Debug, Default)]
pub struct MemoryOracle {
    submitted: Mutex<Vec<(RequestId, String)>>,
    reject: bool,
}

impl MemoryOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// An oracle whose every dispatch fails.
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn submitted(&self) -> Vec<(RequestId, String)> {
        self.submitted.lock().expect("memory oracle lock poisoned").clone()
    }
}

#[async_trait]
impl Oracle for MemoryOracle {
    async fn submit(&self, request_id: RequestId, prompt: &str) -> Result<()> {
        if self.reject {
            return Err(DriftError::Oracle(format!("request {} rejected", request_id)));
        }
        self.submitted
            .lock()
            .expect("memory oracle lock poisoned")
            .push((request_id, prompt.to_string()));
        Ok(())
    }
}
