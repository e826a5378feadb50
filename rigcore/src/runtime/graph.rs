use super::hierarchy::{Node, Rig};
use crate::Error;
use std::collections::VecDeque;

/// Evaluation order plus, per node, every node whose value derives from it.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    sorted: Vec<usize>,
    /// `position[node]` is the node's index in `sorted`.
    position: Vec<usize>,
    /// Transitive dependents of each node, in forward topological order.
    dependents: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Node indices such that every node comes after its parent and its constraint targets.
    pub fn sorted_nodes(&self) -> &[usize] {
        &self.sorted
    }

    /// Transitive dependents of `index`; empty for unknown indices.
    pub fn dependents(&self, index: usize) -> &[usize] {
        self.dependents
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Position of `index` in [`DependencyGraph::sorted_nodes`].
    pub fn position(&self, index: usize) -> Option<usize> {
        self.position.get(index).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Kahn's algorithm over parent → child and constraint target → constraint source edges.
    ///
    /// Ties are broken first-in first-out, seeded in node index order. On a cycle the indices
    /// that could not be ordered are returned instead.
    pub(crate) fn build(nodes: &[Node]) -> Result<Self, Vec<usize>> {
        let count = nodes.len();
        let direct = direct_dependents(nodes);

        let mut in_degree = vec![0usize; count];
        for edges in &direct {
            for &dependent in edges {
                in_degree[dependent] += 1;
            }
        }

        let mut queue: VecDeque<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
        let mut sorted = Vec::with_capacity(count);
        while let Some(index) = queue.pop_front() {
            sorted.push(index);
            for &dependent in &direct[index] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if sorted.len() < count {
            let remaining = (0..count).filter(|&i| in_degree[i] > 0).collect();
            return Err(remaining);
        }

        let mut position = vec![0usize; count];
        for (order, &index) in sorted.iter().enumerate() {
            position[index] = order;
        }

        let mut dependents = Vec::with_capacity(count);
        let mut visited = vec![false; count];
        let mut stack = Vec::new();
        for index in 0..count {
            visited.fill(false);
            let mut closure = Vec::new();
            stack.clear();
            stack.extend_from_slice(&direct[index]);
            while let Some(next) = stack.pop() {
                if visited[next] {
                    continue;
                }
                visited[next] = true;
                closure.push(next);
                stack.extend_from_slice(&direct[next]);
            }
            closure.sort_unstable_by_key(|&i| position[i]);
            dependents.push(closure);
        }

        Ok(Self {
            sorted,
            position,
            dependents,
        })
    }
}

/// Immediate dependents per node: children first, then sources of constraints targeting it.
/// An edge appears once per parent link or constraint, so in-degrees count duplicates.
fn direct_dependents(nodes: &[Node]) -> Vec<Vec<usize>> {
    let count = nodes.len();
    let mut direct = vec![Vec::new(); count];
    for (index, node) in nodes.iter().enumerate() {
        if let Some(parent) = node.parent_index().filter(|&p| p < count) {
            direct[parent].push(index);
        }
    }
    for (index, node) in nodes.iter().enumerate() {
        for constraint in node.constraints() {
            if constraint.target < count {
                direct[constraint.target].push(index);
            }
        }
    }
    direct
}

impl Rig {
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn is_dependency_graph_dirty(&self) -> bool {
        self.graph_dirty
    }

    /// Default evaluation order, as node indices.
    pub fn sorted_nodes(&self) -> &[usize] {
        self.graph.sorted_nodes()
    }

    pub fn sorted_node_names(&self) -> Vec<&str> {
        self.graph
            .sorted_nodes()
            .iter()
            .filter_map(|&i| self.node_name(i))
            .collect()
    }

    /// Rebuilds the dependency graph if the hierarchy or constraint set changed since the last
    /// build.
    ///
    /// A cycle leaves the previous graph in place and is reported as
    /// [`Error::CycleDetected`]. The dirty flag is cleared either way, so a cyclic rig is not
    /// re-sorted every frame; the next structural edit schedules another attempt.
    pub fn update_dependency_graph(&mut self) -> Result<(), Error> {
        if !self.graph_dirty {
            return Ok(());
        }
        self.graph_dirty = false;

        match DependencyGraph::build(&self.nodes) {
            Ok(graph) => {
                log::debug!(
                    "rebuilt dependency graph: {} nodes, {} dependent links",
                    graph.sorted.len(),
                    graph.dependents.iter().map(Vec::len).sum::<usize>()
                );
                self.graph = graph;
                Ok(())
            }
            Err(remaining) => {
                let nodes: Vec<String> = remaining
                    .iter()
                    .filter_map(|&i| self.node_name(i).map(str::to_string))
                    .collect();
                log::warn!(
                    "dependency cycle between nodes [{}]; keeping previous evaluation order",
                    nodes.join(", ")
                );
                Err(Error::CycleDetected { nodes })
            }
        }
    }
}
