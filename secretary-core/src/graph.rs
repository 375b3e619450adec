//! Dependency graph resolver.
//!
//! Builds the precedence DAG between tasks, rejects cycles, and exposes both a
//! full topological order (Kahn) and a live ready-set for schedulers that pick
//! the next task themselves.
//!
//! Edges to ids outside the node set and self edges are dropped while
//! building; they are not errors.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::CycleError;
use crate::task::Task;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    // succs[i] / preds[i] are sorted by node index, deduplicated.
    succs: Vec<Vec<usize>>,
    preds: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// `predecessors` maps a node id to the ids that must come before it.
    pub fn new<I, S>(ids: I, predecessors: &HashMap<String, HashSet<String>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = Self::with_nodes(ids);
        for succ in 0..graph.nodes.len() {
            let Some(preds) = predecessors.get(&graph.nodes[succ]) else {
                continue;
            };
            let preds: Vec<String> = preds.iter().cloned().collect();
            graph.link(succ, &preds);
        }
        graph.normalize();
        graph
    }

    /// Graph over the given tasks using their declared dependencies.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut graph = Self::with_nodes(tasks.iter().map(|t| t.id.clone()));
        for task in tasks {
            let Some(&succ) = graph.index.get(&task.id) else {
                continue;
            };
            let preds: Vec<String> = task
                .dependencies
                .iter()
                .map(|d| d.predecessor_id.clone())
                .collect();
            graph.link(succ, &preds);
        }
        graph.normalize();
        graph
    }

    fn with_nodes<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = Self::default();
        for id in ids {
            let id = id.into();
            if graph.index.contains_key(&id) {
                tracing::debug!(task_id = %id, "duplicate node ignored");
                continue;
            }
            graph.index.insert(id.clone(), graph.nodes.len());
            graph.nodes.push(id);
            graph.succs.push(Vec::new());
            graph.preds.push(Vec::new());
        }
        graph
    }

    fn link(&mut self, succ: usize, preds: &[String]) {
        for pred_id in preds {
            match self.index.get(pred_id) {
                Some(&pred) if pred != succ => {
                    self.preds[succ].push(pred);
                    self.succs[pred].push(succ);
                }
                Some(_) => {
                    tracing::debug!(task_id = %self.nodes[succ], "self dependency dropped");
                }
                None => {
                    tracing::debug!(
                        task_id = %self.nodes[succ],
                        predecessor = %pred_id,
                        "dangling dependency dropped"
                    );
                }
            }
        }
    }

    fn normalize(&mut self) {
        for list in self.preds.iter_mut().chain(self.succs.iter_mut()) {
            list.sort_unstable();
            list.dedup();
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn id(&self, idx: usize) -> &str {
        &self.nodes[idx]
    }

    pub fn successors(&self, idx: usize) -> &[usize] {
        &self.succs[idx]
    }

    pub fn predecessors(&self, idx: usize) -> &[usize] {
        &self.preds[idx]
    }

    pub fn edge_count(&self) -> usize {
        self.preds.iter().map(Vec::len).sum()
    }

    /// Unresolved predecessor count per node, in node order.
    pub fn in_degrees(&self) -> Vec<usize> {
        self.preds.iter().map(Vec::len).collect()
    }

    /// Kahn's algorithm. Nodes that become ready at the same time keep their
    /// discovery order; callers that need a specific order among equals must
    /// impose their own key.
    pub fn topological_indices(&self) -> Result<Vec<usize>, CycleError> {
        let mut indegree = self.in_degrees();
        let mut queue: VecDeque<usize> = (0..self.nodes.len())
            .filter(|&i| indegree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &succ in &self.succs[node] {
                indegree[succ] -= 1;
                if indegree[succ] == 0 {
                    queue.push_back(succ);
                }
            }
        }

        if order.len() < self.nodes.len() {
            let unresolved = (0..self.nodes.len())
                .filter(|&i| indegree[i] > 0)
                .map(|i| self.nodes[i].clone())
                .collect();
            return Err(CycleError { unresolved });
        }
        Ok(order)
    }

    pub fn topological_order(&self) -> Result<Vec<String>, CycleError> {
        Ok(self
            .topological_indices()?
            .into_iter()
            .map(|i| self.nodes[i].clone())
            .collect())
    }

    /// Position of every node in the topological order.
    pub fn topological_rank(&self) -> Result<Vec<usize>, CycleError> {
        let order = self.topological_indices()?;
        let mut rank = vec![0; self.nodes.len()];
        for (pos, idx) in order.into_iter().enumerate() {
            rank[idx] = pos;
        }
        Ok(rank)
    }

    pub fn ready_set(&self) -> ReadySet<'_> {
        ReadySet::new(self)
    }
}

/// Topological order of `ids` under `predecessors` (successor -> predecessor ids).
pub fn topological_sort<I, S>(
    ids: I,
    predecessors: &HashMap<String, HashSet<String>>,
) -> Result<Vec<String>, CycleError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    DependencyGraph::new(ids, predecessors).topological_order()
}

/// Live set of nodes whose predecessors have all been completed.
///
/// The set never decides which ready node goes next; a scheduler inspects
/// [`ReadySet::ready_indices`], picks one, and reports it via
/// [`ReadySet::complete`]. Completing a node is O(1) amortized plus its
/// out-degree.
#[derive(Debug, Clone)]
pub struct ReadySet<'g> {
    graph: &'g DependencyGraph,
    remaining: Vec<usize>,
    // Release order. Completed entries stay until the next compaction.
    queue: Vec<usize>,
    is_ready: Vec<bool>,
    live: usize,
    completed: usize,
}

impl<'g> ReadySet<'g> {
    fn new(graph: &'g DependencyGraph) -> Self {
        let remaining = graph.in_degrees();
        let queue: Vec<usize> = (0..graph.len()).filter(|&i| remaining[i] == 0).collect();
        let mut is_ready = vec![false; graph.len()];
        for &i in &queue {
            is_ready[i] = true;
        }
        Self {
            graph,
            remaining,
            live: queue.len(),
            queue,
            is_ready,
            completed: 0,
        }
    }

    /// Currently ready nodes, in the order they became ready.
    pub fn ready_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.queue.iter().copied().filter(|&i| self.is_ready[i])
    }

    pub fn ready(&self) -> impl Iterator<Item = &'g str> + '_ {
        let graph = self.graph;
        self.ready_indices().map(move |i| graph.id(i))
    }

    pub fn is_exhausted(&self) -> bool {
        self.live == 0
    }

    /// Marks a ready node complete and returns the successors that just became
    /// ready. Returns `None` if `idx` is not currently ready.
    pub fn complete_index(&mut self, idx: usize) -> Option<Vec<usize>> {
        if !self.is_ready.get(idx).copied().unwrap_or(false) {
            return None;
        }
        self.is_ready[idx] = false;
        self.live -= 1;
        self.completed += 1;

        let graph = self.graph;
        let mut released = Vec::new();
        for &succ in graph.successors(idx) {
            self.remaining[succ] -= 1;
            if self.remaining[succ] == 0 {
                released.push(succ);
                self.is_ready[succ] = true;
                self.queue.push(succ);
                self.live += 1;
            }
        }

        if self.queue.len() > 2 * self.live + 16 {
            self.queue.retain(|&i| self.is_ready[i]);
        }
        Some(released)
    }

    pub fn complete(&mut self, id: &str) -> Option<Vec<&'g str>> {
        let idx = self.graph.index_of(id)?;
        let released = self.complete_index(idx)?;
        let graph = self.graph;
        Some(released.into_iter().map(|i| graph.id(i)).collect())
    }

    /// Nodes completed so far.
    pub fn completed(&self) -> usize {
        self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::DependencyRef;

    fn edges(pairs: &[(&str, &[&str])]) -> HashMap<String, HashSet<String>> {
        pairs
            .iter()
            .map(|(succ, preds)| {
                (
                    succ.to_string(),
                    preds.iter().map(|p| p.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn chain_is_ordered() {
        let order = topological_sort(["c", "b", "a"], &edges(&[("b", &["a"]), ("c", &["b"])])).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn independent_nodes_keep_input_order() {
        let order = topological_sort(["x", "y", "z"], &HashMap::new()).unwrap();
        assert_eq!(order, vec!["x", "y", "z"]);
    }

    #[test]
    fn two_node_cycle_fails() {
        let err = topological_sort(["a", "b"], &edges(&[("a", &["b"]), ("b", &["a"])])).unwrap_err();
        assert_eq!(err.unresolved, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn cycle_behind_a_valid_prefix_still_fails() {
        let result = topological_sort(
            ["root", "a", "b", "c"],
            &edges(&[("a", &["root", "c"]), ("b", &["a"]), ("c", &["b"])]),
        );
        let err = result.unwrap_err();
        assert!(!err.unresolved.contains(&"root".to_string()));
        assert_eq!(err.unresolved.len(), 3);
    }

    #[test]
    fn dangling_and_self_edges_are_dropped() {
        let g = DependencyGraph::new(["a", "b"], &edges(&[("a", &["a", "ghost"]), ("b", &["a"])]));
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.topological_order().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn from_tasks_reads_dependency_refs() {
        let tasks = vec![
            Task::new("b", "second").depends_on(DependencyRef::finish_to_start("a")),
            Task::new("a", "first"),
        ];
        let g = DependencyGraph::from_tasks(&tasks);
        assert_eq!(g.in_degrees(), vec![1, 0]);
        assert_eq!(g.topological_order().unwrap(), vec!["a", "b"]);
        assert_eq!(g.topological_rank().unwrap(), vec![1, 0]);
    }

    #[test]
    fn ready_set_releases_successors_once_all_preds_done() {
        let g = DependencyGraph::new(
            ["a", "b", "c"],
            &edges(&[("c", &["a", "b"])]),
        );
        let mut ready = g.ready_set();
        assert_eq!(ready.ready().collect::<Vec<_>>(), vec!["a", "b"]);

        assert_eq!(ready.complete("b").unwrap(), Vec::<&str>::new());
        assert_eq!(ready.complete("a").unwrap(), vec!["c"]);
        assert_eq!(ready.ready().collect::<Vec<_>>(), vec!["c"]);

        // not ready anymore
        assert!(ready.complete("a").is_none());

        ready.complete("c").unwrap();
        assert!(ready.is_exhausted());
        assert_eq!(ready.completed(), 3);
    }

    #[test]
    fn ready_set_survives_long_runs_of_completions() {
        let ids: Vec<String> = (0..200).map(|i| format!("n{i}")).collect();
        // n{i} waits on n{i-1} for odd i
        let mut preds: HashMap<String, HashSet<String>> = HashMap::new();
        for i in (1..200).step_by(2) {
            preds.insert(ids[i].clone(), [ids[i - 1].clone()].into_iter().collect());
        }
        let g = DependencyGraph::new(ids.iter().cloned(), &preds);
        let mut ready = g.ready_set();
        assert_eq!(ready.ready_indices().count(), 100);

        let mut seen = 0;
        loop {
            let Some(next) = ready.ready_indices().next() else {
                break;
            };
            ready.complete_index(next).unwrap();
            seen += 1;
            assert!(ready.ready_indices().all(|i| i != next));
        }
        assert_eq!(seen, 200);
        assert_eq!(ready.completed(), 200);
        assert!(ready.is_exhausted());
        assert!(ready.complete_index(0).is_none());
        assert!(ready.complete_index(10_000).is_none());
    }
}
