pub mod benchmark;
pub mod canonical;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod group;
pub mod registry;
pub mod request;

pub use benchmark::{Benchmark, BenchmarkKind};
pub use canonical::{CanonicalSet, CANONICAL_SET_VERSION, MAX_RANGE_WIDTH};
pub use config::{DriftConfig, OracleConfig, OrchestratorConfig, ReporterConfig};
pub use error::{DriftError, Result};
pub use evaluator::{Evaluator, MAX_SCORE};
pub use group::{BenchmarkGroup, FireState, GroupSnapshot, RunRecord};
pub use registry::{Registry, UnfiredBenchmark};
pub use request::{BenchmarkRef, RequestId};
