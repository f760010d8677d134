use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::{
    Benchmark, BenchmarkGroup, BenchmarkRef, CanonicalSet, DriftError, GroupSnapshot, Result,
    RunRecord,
};

/// Catalog of benchmark groups. Groups are only ever appended, so a group id
/// (its index) stays valid for the registry's lifetime.
///
/// All mutation happens under one write lock: a run append and its score-sum
/// update are never observed separately.
#[derive(Debug, Default)]
pub struct Registry {
    groups: RwLock<Vec<BenchmarkGroup>>,
}

/// One benchmark that still needs to be sent to the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnfiredBenchmark {
    pub target: BenchmarkRef,
    pub id: String,
    pub prompt: String,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // Poisoning means a writer panicked mid-update; there is no safe state to recover.
    fn read(&self) -> RwLockReadGuard<'_, Vec<BenchmarkGroup>> {
        self.groups.read().expect("registry lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<BenchmarkGroup>> {
        self.groups.write().expect("registry lock poisoned")
    }

    pub fn create_group(&self, name: impl Into<String>, description: impl Into<String>) -> usize {
        let mut groups = self.write();
        groups.push(BenchmarkGroup::new(name, description));
        let group_id = groups.len() - 1;
        debug!(group_id, "Created benchmark group");
        group_id
    }

    pub fn add_benchmarks(&self, group_id: usize, benchmarks: Vec<Benchmark>) -> Result<()> {
        let mut groups = self.write();
        let group = groups
            .get_mut(group_id)
            .ok_or(DriftError::GroupNotFound(group_id))?;
        debug!(group_id, count = benchmarks.len(), "Adding benchmarks");
        group.add_benchmarks(benchmarks);
        Ok(())
    }

    /// Create a group and fill it in one step.
    pub fn add_group(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        benchmarks: Vec<Benchmark>,
    ) -> usize {
        let mut group = BenchmarkGroup::new(name, description);
        group.add_benchmarks(benchmarks);

        let mut groups = self.write();
        groups.push(group);
        groups.len() - 1
    }

    /// Generate a canonical batch and wrap it in a new group. Nothing is
    /// added when generation fails.
    pub fn add_canonical_set(&self, set: &CanonicalSet) -> Result<usize> {
        let benchmarks = set.benchmarks()?;
        let count = benchmarks.len();
        let group_id = self.add_group(set.name(), set.description(), benchmarks);
        info!(group_id, count, "Added canonical set: {}", set.name());
        Ok(group_id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn group(&self, group_id: usize) -> Result<GroupSnapshot> {
        self.read()
            .get(group_id)
            .map(BenchmarkGroup::snapshot)
            .ok_or(DriftError::GroupNotFound(group_id))
    }

    pub fn list_groups(&self) -> Vec<GroupSnapshot> {
        self.read().iter().map(BenchmarkGroup::snapshot).collect()
    }

    /// Every unfired benchmark across all groups, in group then insertion order.
    pub fn unfired(&self) -> Vec<UnfiredBenchmark> {
        let groups = self.read();
        let unfired: Vec<UnfiredBenchmark> = groups
            .iter()
            .enumerate()
            .flat_map(|(group_id, group)| {
                group.unfired().map(move |index| {
                    let benchmark = &group.benchmarks()[index];
                    UnfiredBenchmark {
                        target: BenchmarkRef::new(group_id, index),
                        id: benchmark.id().to_string(),
                        prompt: benchmark.prompt().to_string(),
                    }
                })
            })
            .collect();
        unfired
    }

    pub fn mark_pending(&self, target: BenchmarkRef) -> Result<()> {
        let mut groups = self.write();
        groups
            .get_mut(target.group_id)
            .ok_or(DriftError::GroupNotFound(target.group_id))?
            .mark_pending(target.group_id, target.index)
    }

    /// Score and append a run. Returns the run and the group's new score sum.
    pub fn record_run(&self, target: BenchmarkRef, response: &str) -> Result<(RunRecord, u64)> {
        let mut groups = self.write();
        let group = groups
            .get_mut(target.group_id)
            .ok_or(DriftError::GroupNotFound(target.group_id))?;
        let run = group.record_run(target.group_id, target.index, response, unix_now())?;
        Ok((run, group.score_sum()))
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
