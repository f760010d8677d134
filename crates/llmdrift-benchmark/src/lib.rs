pub mod ollama;
pub mod oracle;
pub mod orchestrator;
pub mod reporter;

pub use ollama::{OllamaClient, OllamaOracle};
pub use oracle::{MemoryOracle, Oracle, OracleResponse};
pub use orchestrator::{FireSummary, Orchestrator, RunEvent};
pub use reporter::{render, Reporter};
