use crate::Transform;
use crate::transform::{KINDA_SMALL, find_between, normalize_or_identity};
use glam::{Quat, Vec3};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AimSettings {
    /// Local axis that should point at the target.
    pub aim_axis: Vec3,
    /// Local axis kept toward the requested up direction, if any.
    pub up_axis: Option<Vec3>,
    /// Maximum angle in degrees the aim axis may turn; `0` disables clamping.
    pub clamp_degrees: f32,
}

impl Default for AimSettings {
    fn default() -> Self {
        Self {
            aim_axis: Vec3::X,
            up_axis: None,
            clamp_degrees: 0.0,
        }
    }
}

/// Returns the rotation for `current` that points its aim axis at `target`.
///
/// `up_direction` is a direction in the same space as `target`. It only takes effect when the
/// settings carry an up axis, and is projected onto the plane perpendicular to the aim so it
/// never fights the aim itself. Degenerate input (target on top of the node, zero axes) keeps the
/// current rotation.
pub fn solve_aim(
    current: &Transform,
    target: Vec3,
    up_direction: Option<Vec3>,
    settings: &AimSettings,
) -> Quat {
    let Some(aim_axis) = settings.aim_axis.try_normalize() else {
        return current.rotation;
    };
    let world_aim = current.rotation * aim_axis;
    let Some(mut to_target) = (target - current.translation).try_normalize() else {
        return current.rotation;
    };

    if settings.clamp_degrees > KINDA_SMALL {
        let max_angle = settings.clamp_degrees.min(180.0).to_radians();
        let angle = world_aim.dot(to_target).clamp(-1.0, 1.0).acos();
        if angle > max_angle {
            let axis = world_aim
                .cross(to_target)
                .try_normalize()
                .unwrap_or_else(|| world_aim.any_orthonormal_vector());
            to_target = Quat::from_axis_angle(axis, max_angle) * world_aim;
        }
    }

    let mut rotation = find_between(world_aim, to_target) * current.rotation;

    if let (Some(up_axis), Some(up_direction)) = (settings.up_axis, up_direction) {
        let current_up = rotation * up_axis;
        let from = current_up - to_target * current_up.dot(to_target);
        let to = up_direction - to_target * up_direction.dot(to_target);
        if from.length_squared() > KINDA_SMALL * KINDA_SMALL
            && to.length_squared() > KINDA_SMALL * KINDA_SMALL
        {
            // Signed angle about the aim direction, so opposite up vectors still turn about it.
            let angle = to_target.dot(from.cross(to)).atan2(from.dot(to));
            rotation = Quat::from_axis_angle(to_target, angle) * rotation;
        }
    }

    normalize_or_identity(rotation)
}
