//! Execution ordering over a built [`Dag`].
//!
//! All three routines expect an acyclic graph. Ordering and phase computation
//! detect a cycle themselves and fail with [`Error::Cycle`] rather than return
//! a partial result.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::core::dag::Dag;
use crate::error::{Error, Result};

impl Dag {
    /// Tasks in an order where every task follows all of its dependencies.
    ///
    /// Kahn's algorithm with a FIFO work-list seeded by the roots. Ties are
    /// broken by discovery order, so the result is deterministic for a given
    /// declaration order.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let mut in_degree: HashMap<&str, usize> = self
            .task_ids()
            .map(|id| (id, self.upstream(id).len()))
            .collect();

        let mut queue: VecDeque<&str> = self
            .task_ids()
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();

        let mut sorted = Vec::with_capacity(self.task_count());

        while let Some(id) = queue.pop_front() {
            sorted.push(id.to_string());

            for child in self.downstream(id) {
                if let Some(degree) = in_degree.get_mut(child.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(child.as_str());
                    }
                }
            }
        }

        if sorted.len() != self.task_count() {
            return Err(Error::Cycle {
                processed: sorted.len(),
                total: self.task_count(),
            });
        }

        tracing::trace!(order = ?sorted, "topological order");
        Ok(sorted)
    }

    /// Partition tasks into waves that can run in parallel.
    ///
    /// Each wave holds every unprocessed task whose dependencies all lie in
    /// earlier waves. A wave is closed before its members' dependents are
    /// released, so siblings never land in the same wave as each other's
    /// dependents. Tasks within a wave keep declaration order.
    pub fn execution_phases(&self) -> Result<Vec<Vec<String>>> {
        let mut in_degree: HashMap<&str, usize> = self
            .task_ids()
            .map(|id| (id, self.upstream(id).len()))
            .collect();
        let mut processed: HashSet<&str> = HashSet::with_capacity(self.task_count());
        let mut phases = Vec::new();

        while processed.len() < self.task_count() {
            let phase: Vec<&str> = self
                .task_ids()
                .filter(|id| !processed.contains(id) && in_degree.get(id) == Some(&0))
                .collect();

            if phase.is_empty() {
                return Err(Error::Cycle {
                    processed: processed.len(),
                    total: self.task_count(),
                });
            }

            for &id in &phase {
                processed.insert(id);
                for child in self.downstream(id) {
                    if let Some(degree) = in_degree.get_mut(child.as_str()) {
                        *degree = degree.saturating_sub(1);
                    }
                }
            }

            tracing::trace!(phase = phases.len(), tasks = ?phase, "execution phase");
            phases.push(phase.into_iter().map(String::from).collect());
        }

        Ok(phases)
    }

    /// Longest-path distance of every task from a root.
    ///
    /// Roots have depth 0; any other task is one deeper than its deepest
    /// dependency. Equal to the index of the task's execution phase.
    pub fn task_depths(&self) -> Result<HashMap<String, usize>> {
        let order = self.topological_order()?;
        let mut depths: HashMap<String, usize> = HashMap::with_capacity(order.len());

        for id in order {
            let depth = self
                .upstream(&id)
                .iter()
                .map(|dep| depths.get(dep).copied().unwrap_or(0) + 1)
                .max()
                .unwrap_or(0);
            depths.insert(id, depth);
        }

        Ok(depths)
    }
}
