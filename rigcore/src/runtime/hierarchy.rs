use super::constraint::Constraint;
use super::graph::DependencyGraph;
use super::solver::ResolvedTarget;
use crate::{Error, RigData, Transform};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Opaque per-node payload owned by the host.
#[derive(Clone)]
pub struct UserData(Arc<dyn Any + Send + Sync>);

impl UserData {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UserData(..)")
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    name: String,
    parent: Option<usize>,
    local: Transform,
    global: Transform,
    pub(crate) constraints: Vec<Constraint>,
    pub user_data: Option<UserData>,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_index(&self) -> Option<usize> {
        self.parent
    }

    /// Parent-relative transform, before constraints.
    pub fn local(&self) -> Transform {
        self.local
    }

    /// Rig-space transform, after constraints once the rig has been evaluated.
    pub fn global(&self) -> Transform {
        self.global
    }

    /// Constraints for which this node is the source.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}

/// A flat, index-addressed node hierarchy with its constraints and dependency graph.
///
/// Node indices are stable until a node is removed; removal shifts every later index down by
/// one. Names are unique and resolved through an index that is rebuilt after each structural
/// change.
#[derive(Clone, Debug, Default)]
pub struct Rig {
    pub(crate) nodes: Vec<Node>,
    name_index: HashMap<String, usize>,
    pub(crate) graph: DependencyGraph,
    pub(crate) graph_dirty: bool,
    pub(crate) target_scratch: Vec<ResolvedTarget>,
}

impl Rig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a rig from a data description: nodes first, then constraints (so maintained
    /// offsets capture the bind pose), then one full evaluation.
    pub fn from_data(data: &RigData) -> Result<Self, Error> {
        let mut rig = Self::new();
        for node in &data.nodes {
            rig.add_node(&node.name, node.parent.as_deref(), node.transform)?;
        }
        for constraint in &data.constraints {
            rig.add_constraint(constraint)?;
        }
        rig.update_dependency_graph()?;
        rig.evaluate();
        Ok(rig)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn find_node(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.find_node(name).and_then(|i| self.nodes.get(i))
    }

    pub fn node_name(&self, index: usize) -> Option<&str> {
        self.nodes.get(index).map(|n| n.name.as_str())
    }

    pub fn parent_name(&self, index: usize) -> Option<&str> {
        self.nodes
            .get(index)
            .and_then(|n| n.parent)
            .and_then(|p| self.node_name(p))
    }

    pub fn children(&self, index: usize) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent == Some(index))
            .map(|(i, _)| i)
            .collect()
    }

    /// Adds a node under `parent` (or as a root) with the given local transform and returns its
    /// index. Its global transform is derived from the parent's current global.
    pub fn add_node(
        &mut self,
        name: &str,
        parent: Option<&str>,
        local: Transform,
    ) -> Result<usize, Error> {
        if self.name_index.contains_key(name) {
            return Err(Error::DuplicateNode {
                name: name.to_string(),
            });
        }
        let parent = match parent {
            None => None,
            Some(parent_name) => {
                Some(
                    self.find_node(parent_name)
                        .ok_or_else(|| Error::UnknownParent {
                            node: name.to_string(),
                            parent: parent_name.to_string(),
                        })?,
                )
            }
        };

        let local = local.normalized();
        let global = match parent {
            Some(p) => self.nodes[p].global.mul_transform(&local),
            None => local,
        };

        let index = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            parent,
            local,
            global,
            constraints: Vec::new(),
            user_data: None,
        });
        self.rebuild_name_index();
        self.invalidate_dependency_graph();
        Ok(index)
    }

    /// Removes a node. Its children move to its parent without changing their global transform,
    /// and constraints targeting it are dropped. Returns `false` if the name is unknown.
    pub fn remove_node(&mut self, name: &str) -> bool {
        let Some(removed) = self.find_node(name) else {
            return false;
        };
        let new_parent = self.nodes[removed].parent;
        let new_parent_global = self.parent_global_of(new_parent);

        for node in &mut self.nodes {
            if node.parent == Some(removed) {
                node.parent = new_parent;
                node.local = node.global.relative_to(&new_parent_global).normalized();
            }
        }

        self.nodes.remove(removed);

        let shift = |index: usize| if index > removed { index - 1 } else { index };
        for node in &mut self.nodes {
            node.parent = node.parent.map(shift);
            node.constraints.retain(|c| c.target != removed);
            for constraint in &mut node.constraints {
                constraint.target = shift(constraint.target);
            }
        }

        self.rebuild_name_index();
        self.invalidate_dependency_graph();
        true
    }

    /// Renames a node. Parent links and constraints refer to nodes by index, so only the name
    /// index needs rebuilding.
    pub fn rename_node(&mut self, name: &str, new_name: &str) -> Result<(), Error> {
        let index = self.find_node(name).ok_or_else(|| Error::UnknownNode {
            name: name.to_string(),
        })?;
        if name == new_name {
            return Ok(());
        }
        if self.name_index.contains_key(new_name) {
            return Err(Error::DuplicateNode {
                name: new_name.to_string(),
            });
        }
        self.nodes[index].name = new_name.to_string();
        self.rebuild_name_index();
        Ok(())
    }

    /// Reparents `name` under `parent` (or makes it a root), keeping its global transform.
    pub fn set_parent(&mut self, name: &str, parent: Option<&str>) -> Result<(), Error> {
        let index = self.find_node(name).ok_or_else(|| Error::UnknownNode {
            name: name.to_string(),
        })?;
        let parent_index = match parent {
            None => None,
            Some(parent_name) => {
                let p = self
                    .find_node(parent_name)
                    .ok_or_else(|| Error::UnknownParent {
                        node: name.to_string(),
                        parent: parent_name.to_string(),
                    })?;
                if p == index || self.is_ancestor(index, p) {
                    return Err(Error::ParentCycle {
                        node: name.to_string(),
                        parent: parent_name.to_string(),
                    });
                }
                Some(p)
            }
        };

        let parent_global = self.parent_global_of(parent_index);
        let node = &mut self.nodes[index];
        node.parent = parent_index;
        node.local = node.global.relative_to(&parent_global).normalized();
        self.invalidate_dependency_graph();
        Ok(())
    }

    /// `true` if `ancestor` appears on the parent path of `index`.
    pub fn is_ancestor(&self, ancestor: usize, index: usize) -> bool {
        let mut current = self.nodes.get(index).and_then(|n| n.parent);
        let mut steps = 0usize;
        while let Some(i) = current {
            if i == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self.nodes.get(i).and_then(|n| n.parent);
        }
        false
    }

    /// Indices from `start` down to `end` along parent links, both inclusive. `None` unless
    /// `start` is `end` or one of its ancestors.
    pub fn chain_between(&self, start: &str, end: &str) -> Option<Vec<usize>> {
        let start = self.find_node(start)?;
        let end = self.find_node(end)?;
        let mut chain = vec![end];
        let mut current = end;
        while current != start {
            current = self.nodes.get(current)?.parent?;
            chain.push(current);
            if chain.len() > self.nodes.len() {
                return None;
            }
        }
        chain.reverse();
        Some(chain)
    }

    pub fn local_transform(&self, index: usize) -> Transform {
        self.nodes
            .get(index)
            .map(|n| n.local)
            .unwrap_or(Transform::IDENTITY)
    }

    pub fn global_transform(&self, index: usize) -> Transform {
        self.nodes
            .get(index)
            .map(|n| n.global)
            .unwrap_or(Transform::IDENTITY)
    }

    pub fn local_transform_by_name(&self, name: &str) -> Transform {
        self.find_node(name)
            .map(|i| self.local_transform(i))
            .unwrap_or(Transform::IDENTITY)
    }

    pub fn global_transform_by_name(&self, name: &str) -> Transform {
        self.find_node(name)
            .map(|i| self.global_transform(i))
            .unwrap_or(Transform::IDENTITY)
    }

    /// Global transform of the node's parent, identity for roots.
    pub fn parent_global_transform(&self, index: usize) -> Transform {
        self.parent_global_of(self.nodes.get(index).and_then(|n| n.parent))
    }

    /// Sets the local transform and recomputes this node's global from its parent. Dependents
    /// are not touched until the rig is evaluated.
    pub fn set_local_transform(&mut self, index: usize, transform: Transform) {
        if index >= self.nodes.len() {
            return;
        }
        let parent_global = self.parent_global_transform(index);
        let node = &mut self.nodes[index];
        node.local = transform.normalized();
        node.global = parent_global.mul_transform(&node.local).normalized();
    }

    /// Sets the global transform and derives the local one against the parent's current global.
    pub fn set_global_transform(&mut self, index: usize, transform: Transform) {
        if index >= self.nodes.len() {
            return;
        }
        let parent_global = self.parent_global_transform(index);
        let node = &mut self.nodes[index];
        node.global = transform.normalized();
        node.local = node.global.relative_to(&parent_global).normalized();
    }

    pub fn set_local_transform_by_name(&mut self, name: &str, transform: Transform) {
        if let Some(index) = self.find_node(name) {
            self.set_local_transform(index, transform);
        }
    }

    pub fn set_global_transform_by_name(&mut self, name: &str, transform: Transform) {
        if let Some(index) = self.find_node(name) {
            self.set_global_transform(index, transform);
        }
    }

    pub fn set_user_data(&mut self, index: usize, data: Option<UserData>) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.user_data = data;
        }
    }

    pub fn user_data<T: Any>(&self, index: usize) -> Option<&T> {
        self.nodes
            .get(index)
            .and_then(|n| n.user_data.as_ref())
            .and_then(|d| d.downcast_ref::<T>())
    }

    pub(crate) fn parent_global_of(&self, parent: Option<usize>) -> Transform {
        parent
            .and_then(|p| self.nodes.get(p))
            .map(|p| p.global)
            .unwrap_or(Transform::IDENTITY)
    }

    pub(crate) fn set_global_unchecked(&mut self, index: usize, global: Transform) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.global = global;
        }
    }

    pub(crate) fn invalidate_dependency_graph(&mut self) {
        self.graph_dirty = true;
    }

    fn rebuild_name_index(&mut self) {
        self.name_index.clear();
        self.name_index.reserve(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            self.name_index.insert(node.name.clone(), i);
        }
    }
}
