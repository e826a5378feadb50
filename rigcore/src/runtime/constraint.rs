use super::hierarchy::Rig;
use super::solver::aim_rotation;
use crate::transform::{normalize_or_identity, safe_reciprocal};
use crate::{ConstraintData, ConstraintKind, Error, Transform, TransformOperator, WEIGHT_EPSILON};
use glam::{Quat, Vec3};

/// Relative pose between a constrained node and its target, captured at bind time so the
/// constraint holds that relationship instead of snapping onto the target.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub enum ConstraintOffset {
    #[default]
    None,
    Components {
        translation: Vec3,
        rotation: Quat,
        scale: Vec3,
    },
    Parent(Transform),
}

impl ConstraintOffset {
    /// Captures the offset so that `apply(kind, target, ..)` returns `source` for the given
    /// pose. Both transforms must be in the source's parent space.
    pub fn capture(kind: &ConstraintKind, source: &Transform, target: &Transform) -> Self {
        match kind {
            ConstraintKind::Transform(TransformOperator::Parent) => {
                Self::Parent(source.relative_to(target).normalized())
            }
            ConstraintKind::Transform(TransformOperator::Components(_)) => Self::Components {
                translation: source.translation - target.translation,
                rotation: normalize_or_identity(target.rotation.inverse() * source.rotation),
                scale: source.scale * safe_reciprocal(target.scale),
            },
            ConstraintKind::Aim { aim_axis, up_axis } => {
                let aim = aim_rotation(source, target, *aim_axis, *up_axis);
                Self::Components {
                    translation: Vec3::ZERO,
                    rotation: normalize_or_identity(aim.inverse() * source.rotation),
                    scale: Vec3::ONE,
                }
            }
        }
    }

    /// Re-applies the offset to a target transform (parent mode and component mode) or to an
    /// already solved aim rotation (aim mode, rotation only).
    pub fn apply(&self, target: &Transform) -> Transform {
        match self {
            Self::None => *target,
            Self::Parent(offset) => target.mul_transform(offset).normalized(),
            Self::Components {
                translation,
                rotation,
                scale,
            } => Transform {
                translation: target.translation + *translation,
                rotation: normalize_or_identity(target.rotation * *rotation),
                scale: target.scale * *scale,
            },
        }
    }
}

/// A constraint bound into a [`Rig`], owned by its source node.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    pub(crate) target: usize,
    pub weight: f32,
    pub kind: ConstraintKind,
    maintain_offset: bool,
    pub(crate) offset: ConstraintOffset,
}

impl Constraint {
    pub fn target_index(&self) -> usize {
        self.target
    }

    pub fn maintain_offset(&self) -> bool {
        self.maintain_offset
    }

    pub fn offset(&self) -> &ConstraintOffset {
        &self.offset
    }

    pub fn is_active(&self) -> bool {
        self.weight > WEIGHT_EPSILON
    }
}

impl Rig {
    /// Binds a constraint to its source node. A constraint already binding the same
    /// (source, target) pair is replaced in place. With `maintain_offset`, the offset is
    /// captured from the current global transforms, so the next evaluation reproduces the
    /// current pose.
    pub fn add_constraint(&mut self, data: &ConstraintData) -> Result<(), Error> {
        let source = self.find_node(&data.source).ok_or_else(|| Error::UnknownNode {
            name: data.source.clone(),
        })?;
        let target = self.find_node(&data.target).ok_or_else(|| Error::UnknownNode {
            name: data.target.clone(),
        })?;
        if source == target {
            return Err(Error::InvalidValue {
                message: format!("node '{}' cannot be constrained to itself", data.source),
            });
        }
        if !data.weight.is_finite() {
            return Err(Error::InvalidValue {
                message: format!(
                    "constraint weight {} on '{}' is not finite",
                    data.weight, data.source
                ),
            });
        }

        let mut constraint = Constraint {
            target,
            weight: data.weight.clamp(0.0, 1.0),
            kind: data.kind,
            maintain_offset: data.maintain_offset,
            offset: ConstraintOffset::None,
        };
        if constraint.maintain_offset {
            constraint.offset = self.capture_offset(source, target, &constraint.kind);
        }

        let constraints = &mut self.nodes[source].constraints;
        match constraints.iter_mut().find(|c| c.target == target) {
            Some(existing) => *existing = constraint,
            None => constraints.push(constraint),
        }
        self.invalidate_dependency_graph();
        Ok(())
    }

    /// Removes the constraint binding `source` to `target`. Returns `false` if there was none.
    pub fn remove_constraint(&mut self, source: &str, target: &str) -> bool {
        let (Some(source), Some(target)) = (self.find_node(source), self.find_node(target)) else {
            return false;
        };
        let constraints = &mut self.nodes[source].constraints;
        let before = constraints.len();
        constraints.retain(|c| c.target != target);
        if constraints.len() == before {
            return false;
        }
        self.invalidate_dependency_graph();
        true
    }

    pub fn constraints(&self, index: usize) -> &[Constraint] {
        self.nodes
            .get(index)
            .map(|n| n.constraints.as_slice())
            .unwrap_or(&[])
    }

    /// The node's constraints as name-based data, e.g. for saving a rig.
    pub fn constraint_data(&self, index: usize) -> Vec<ConstraintData> {
        let Some(node) = self.nodes.get(index) else {
            return Vec::new();
        };
        node.constraints
            .iter()
            .filter_map(|c| {
                Some(ConstraintData {
                    source: node.name().to_string(),
                    target: self.node_name(c.target)?.to_string(),
                    weight: c.weight,
                    kind: c.kind,
                    maintain_offset: c.maintain_offset,
                })
            })
            .collect()
    }

    /// Changes a constraint's weight. Weights are plain values, so the dependency graph stays
    /// valid.
    pub fn set_constraint_weight(&mut self, source: &str, target: &str, weight: f32) -> bool {
        let (Some(source), Some(target)) = (self.find_node(source), self.find_node(target)) else {
            return false;
        };
        if !weight.is_finite() {
            return false;
        }
        match self.nodes[source]
            .constraints
            .iter_mut()
            .find(|c| c.target == target)
        {
            Some(c) => {
                c.weight = weight.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    /// Recaptures every maintained offset on `index` from the current pose.
    pub fn recapture_constraint_offsets(&mut self, index: usize) {
        let Some(node) = self.nodes.get(index) else {
            return;
        };
        let captured: Vec<ConstraintOffset> = node
            .constraints
            .iter()
            .map(|c| {
                if c.maintain_offset {
                    self.capture_offset(index, c.target, &c.kind)
                } else {
                    ConstraintOffset::None
                }
            })
            .collect();
        for (constraint, offset) in self.nodes[index].constraints.iter_mut().zip(captured) {
            constraint.offset = offset;
        }
    }

    fn capture_offset(
        &self,
        source: usize,
        target: usize,
        kind: &ConstraintKind,
    ) -> ConstraintOffset {
        let parent_global = self.parent_global_transform(source);
        let source_local = self.global_transform(source).relative_to(&parent_global);
        let target_local = self.global_transform(target).relative_to(&parent_global);
        ConstraintOffset::capture(kind, &source_local, &target_local)
    }
}
