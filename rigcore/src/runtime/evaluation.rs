use super::hierarchy::Rig;
use super::solver::{ResolvedTarget, solve_constraints};

impl Rig {
    /// Recomputes every global transform in dependency order and resolves constraints along
    /// the way. Rebuilds the dependency graph first if it is dirty; a cyclic rig evaluates with
    /// the last order that was built successfully.
    pub fn evaluate(&mut self) {
        if let Err(err) = self.update_dependency_graph() {
            // Already logged by the rebuild; evaluation keeps the last good order.
            log::debug!("evaluating with stale dependency graph: {err}");
        }

        let graph = std::mem::take(&mut self.graph);
        for &index in graph.sorted_nodes() {
            self.propagate(index);
            self.resolve_constraints(index);
        }
        self.graph = graph;
    }

    /// Re-evaluates `name` and everything downstream of it after an edit. Unknown names are a
    /// no-op.
    pub fn evaluate_node(&mut self, name: &str) {
        if let Some(index) = self.find_node(name) {
            self.evaluate_node_index(index);
        }
    }

    /// Resolves the node's own constraints, then walks its dependents in forward topological
    /// order: each one first takes its parent's current global, then resolves its own
    /// constraints, so every node sees fully resolved upstream state.
    pub fn evaluate_node_index(&mut self, index: usize) {
        if index >= self.nodes.len() {
            return;
        }
        if let Err(err) = self.update_dependency_graph() {
            log::debug!("evaluating with stale dependency graph: {err}");
        }

        self.resolve_constraints(index);

        let graph = std::mem::take(&mut self.graph);
        for &dependent in graph.dependents(index) {
            self.propagate(dependent);
            self.resolve_constraints(dependent);
        }
        self.graph = graph;
    }

    /// global = parent.global ∘ local. Written directly so the local is never re-derived.
    fn propagate(&mut self, index: usize) {
        if index >= self.nodes.len() {
            return;
        }
        let global = self
            .parent_global_transform(index)
            .mul_transform(&self.nodes[index].local())
            .normalized();
        self.set_global_unchecked(index, global);
    }

    /// Blends the node's active constraints into its global transform. The local transform is
    /// left untouched, so evaluating twice gives the same result.
    fn resolve_constraints(&mut self, index: usize) {
        let Some(node) = self.nodes.get(index) else {
            return;
        };
        if !node.constraints.iter().any(|c| c.is_active()) {
            return;
        }

        let parent_global = self.parent_global_transform(index);
        let mut targets = std::mem::take(&mut self.target_scratch);
        targets.clear();
        for constraint in &self.nodes[index].constraints {
            if !constraint.is_active() {
                continue;
            }
            let Some(target) = self.nodes.get(constraint.target) else {
                continue;
            };
            targets.push(ResolvedTarget {
                transform: target.global().relative_to(&parent_global),
                weight: constraint.weight,
                kind: constraint.kind,
                offset: constraint.offset,
            });
        }

        let local = solve_constraints(&self.nodes[index].local(), &targets);
        self.set_global_unchecked(index, parent_global.mul_transform(&local).normalized());
        self.target_scratch = targets;
    }
}
