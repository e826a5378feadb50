use super::constraint::ConstraintOffset;
use crate::kinematics::{AimSettings, solve_aim};
use crate::transform::{align_hemisphere, fast_lerp, normalize_or_identity};
use crate::{AxisFilter, ConstraintKind, Transform, WEIGHT_EPSILON};
use glam::{EulerRot, Quat, Vec3};

/// One constraint's contribution, with its target already expressed in the constrained node's
/// parent space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ResolvedTarget {
    pub transform: Transform,
    pub weight: f32,
    pub kind: ConstraintKind,
    pub offset: ConstraintOffset,
}

impl ResolvedTarget {
    pub fn new(transform: Transform, weight: f32, kind: ConstraintKind) -> Self {
        Self {
            transform,
            weight,
            kind,
            offset: ConstraintOffset::None,
        }
    }

    fn is_active(&self) -> bool {
        self.weight > WEIGHT_EPSILON
    }

    /// The transform this constraint pulls toward, offset included.
    fn goal(&self, current: &Transform) -> Transform {
        match self.kind {
            ConstraintKind::Transform(_) => self.offset.apply(&self.transform),
            ConstraintKind::Aim { aim_axis, up_axis } => {
                let aim = aim_rotation(current, &self.transform, aim_axis, up_axis);
                let rotation = self.offset.apply(&Transform::from_rotation(aim)).rotation;
                Transform::new(current.translation, rotation, current.scale)
            }
        }
    }
}

/// Rotation pointing `current`'s aim axis at `target`'s position, optionally keeping its up axis
/// toward the target's up axis.
pub(crate) fn aim_rotation(
    current: &Transform,
    target: &Transform,
    aim_axis: Vec3,
    up_axis: Option<Vec3>,
) -> Quat {
    let settings = AimSettings {
        aim_axis,
        up_axis,
        clamp_degrees: 0.0,
    };
    let up_direction = up_axis.map(|axis| target.rotation * axis);
    solve_aim(current, target.translation, up_direction, &settings)
}

/// Blends the active targets into `current` (the node's unconstrained local transform).
///
/// If any active target uses parent mode, only parent-mode targets are blended, as whole
/// transforms, and every other constraint on the node is ignored. Otherwise translation,
/// rotation and scale are blended independently from the targets that drive them; components
/// nothing drives keep their value from `current`.
///
/// Weights summing above one are rescaled to one. Below one, the remainder stays with
/// `current`, so a lone target at weight `w` lands at `lerp(current, target, w)`.
pub fn solve_constraints(current: &Transform, targets: &[ResolvedTarget]) -> Transform {
    let has_parent = targets.iter().any(|t| t.is_active() && t.kind.is_parent());
    if has_parent {
        return blend_parents(
            current,
            targets
                .iter()
                .filter(|t| t.is_active() && t.kind.is_parent())
                .map(|t| (t.goal(current), t.weight)),
        );
    }

    let active = || targets.iter().filter(|t| t.is_active());
    let mut result = *current;

    result.translation = blend_axes(
        current.translation,
        active().filter_map(|t| {
            let filter = t.kind.translation_filter();
            filter
                .any()
                .then(|| (t.goal(current).translation, t.weight, filter))
        }),
    );
    result.scale = blend_axes(
        current.scale,
        active().filter_map(|t| {
            let filter = t.kind.scale_filter();
            filter.any().then(|| (t.goal(current).scale, t.weight, filter))
        }),
    );
    if let Some(rotation) = blend_rotations(
        current.rotation,
        active().filter_map(|t| {
            let filter = t.kind.rotation_filter();
            filter
                .any()
                .then(|| (t.goal(current).rotation, t.weight, filter))
        }),
    ) {
        result.rotation = rotation;
    }

    result.normalized()
}

fn blend_parents(
    current: &Transform,
    items: impl Iterator<Item = (Transform, f32)> + Clone,
) -> Transform {
    let total: f32 = items.clone().map(|(_, w)| w).sum();
    if total <= WEIGHT_EPSILON {
        return *current;
    }
    let rescale = if total > 1.0 { 1.0 / total } else { 1.0 };
    let remainder = (1.0 - total).max(0.0);

    let mut accumulated = remainder;
    let mut translation = current.translation;
    let mut rotation = current.rotation;
    let mut scale = current.scale * remainder;
    for (goal, weight) in items {
        let weight = weight * rescale;
        accumulated += weight;
        if accumulated <= WEIGHT_EPSILON {
            continue;
        }
        let alpha = weight / accumulated;
        translation = translation.lerp(goal.translation, alpha);
        rotation = fast_lerp(rotation, goal.rotation, alpha);
        scale += goal.scale * weight;
    }

    Transform::new(translation, normalize_or_identity(rotation), scale)
}

fn blend_axes(original: Vec3, items: impl Iterator<Item = (Vec3, f32, AxisFilter)>) -> Vec3 {
    let mut weights = [0.0f32; 3];
    let mut sums = [0.0f32; 3];
    for (value, weight, filter) in items {
        for (axis, enabled) in filter.mask().into_iter().enumerate() {
            if enabled {
                weights[axis] += weight;
                sums[axis] += value[axis] * weight;
            }
        }
    }

    let mut out = original;
    for axis in 0..3 {
        let weight = weights[axis];
        if weight <= WEIGHT_EPSILON {
            continue;
        }
        out[axis] = if weight > 1.0 {
            sums[axis] / weight
        } else {
            sums[axis] + original[axis] * (1.0 - weight)
        };
    }
    out
}

fn blend_rotations(
    original: Quat,
    items: impl Iterator<Item = (Quat, f32, AxisFilter)> + Clone,
) -> Option<Quat> {
    let total: f32 = items.clone().map(|(_, w, _)| w).sum();
    if total <= WEIGHT_EPSILON {
        return None;
    }
    let rescale = if total > 1.0 { 1.0 / total } else { 1.0 };
    let remainder = (1.0 - total).max(0.0);

    let mut sum = original * remainder;
    for (rotation, weight, filter) in items {
        let rotation = filter_rotation(original, rotation, filter);
        let reference = if sum.length_squared() > 0.0 { sum } else { rotation };
        sum += align_hemisphere(reference, rotation) * (weight * rescale);
    }
    Some(normalize_or_identity(sum))
}

/// Keeps the enabled Euler axes (XYZ order) of `rotation` and takes the rest from `original`.
fn filter_rotation(original: Quat, rotation: Quat, filter: AxisFilter) -> Quat {
    if filter.all() {
        return rotation;
    }
    let (ox, oy, oz) = original.to_euler(EulerRot::XYZ);
    let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
    Quat::from_euler(
        EulerRot::XYZ,
        if filter.x { x } else { ox },
        if filter.y { y } else { oy },
        if filter.z { z } else { oz },
    )
}
