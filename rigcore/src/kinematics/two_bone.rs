use crate::Transform;
use crate::transform::{KINDA_SMALL, find_between, normalize_or_identity, swing_twist};
use glam::{Quat, Vec3};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TwoBoneIkSettings {
    pub allow_stretch: bool,
    /// Reach ratio (desired length / full limb length) at which stretching begins.
    pub start_stretch_ratio: f32,
    /// Segment scale reached once the reach ratio hits this same value.
    pub max_stretch_scale: f32,
    /// When set, twist about this local bone axis introduced by the solve is removed from the
    /// root and joint rotations.
    pub twist_axis: Option<Vec3>,
}

impl Default for TwoBoneIkSettings {
    fn default() -> Self {
        Self {
            allow_stretch: false,
            start_stretch_ratio: 1.0,
            max_stretch_scale: 1.2,
            twist_axis: None,
        }
    }
}

/// Root, joint and end positions of a two-segment chain.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TwoBoneChain {
    pub root: Vec3,
    pub joint: Vec3,
    pub end: Vec3,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TwoBoneGoal {
    pub effector: Vec3,
    /// Point the joint bends toward (pole target).
    pub joint_target: Vec3,
}

/// Solves joint and end positions so the end reaches `goal.effector` when it can, bending in
/// the plane spanned by the reach direction and the joint target. The root never moves.
pub fn solve_two_bone_ik(
    chain: &TwoBoneChain,
    goal: &TwoBoneGoal,
    upper_length: f32,
    lower_length: f32,
    settings: &TwoBoneIkSettings,
) -> TwoBoneChain {
    let root = chain.root;
    let desired = goal.effector;
    let desired_delta = desired - root;
    let mut desired_length = desired_delta.length();

    let desired_dir = if desired_length < KINDA_SMALL {
        desired_length = KINDA_SMALL;
        Vec3::X
    } else {
        desired_delta / desired_length
    };

    let bend_dir = bend_direction(root, desired_dir, goal.joint_target);

    let mut upper = upper_length.max(0.0);
    let mut lower = lower_length.max(0.0);
    let mut max_length = upper + lower;

    if settings.allow_stretch {
        let range = settings.max_stretch_scale - settings.start_stretch_ratio;
        if range > KINDA_SMALL && max_length > KINDA_SMALL {
            let reach_ratio = desired_length / max_length;
            let t = ((reach_ratio - settings.start_stretch_ratio) / range).clamp(0.0, 1.0);
            let factor = (settings.max_stretch_scale - 1.0) * t;
            if factor > KINDA_SMALL {
                upper *= 1.0 + factor;
                lower *= 1.0 + factor;
                max_length *= 1.0 + factor;
            }
        }
    }

    if desired_length >= max_length {
        return TwoBoneChain {
            root,
            joint: root + desired_dir * upper,
            end: root + desired_dir * max_length,
        };
    }

    // Law of cosines for the angle at the root between the upper segment and the reach line.
    let two_ab = 2.0 * upper * desired_length;
    let cos_angle = if two_ab > 0.0 {
        ((upper * upper + desired_length * desired_length - lower * lower) / two_ab)
            .clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let angle = cos_angle.acos();
    let joint_line_dist = upper * angle.sin();
    let proj_sq = upper * upper - joint_line_dist * joint_line_dist;
    let mut proj_joint_dist = if proj_sq > 0.0 { proj_sq.sqrt() } else { 0.0 };
    if cos_angle < 0.0 {
        proj_joint_dist = -proj_joint_dist;
    }

    TwoBoneChain {
        root,
        joint: root + desired_dir * proj_joint_dist + bend_dir * joint_line_dist,
        end: desired,
    }
}

/// Runs [`solve_two_bone_ik`] on the translations of three transforms and rotates the root and
/// joint by the change in their bone directions. The end keeps its rotation.
pub fn solve_two_bone_ik_transforms(
    root: &mut Transform,
    joint: &mut Transform,
    end: &mut Transform,
    goal: &TwoBoneGoal,
    upper_length: f32,
    lower_length: f32,
    settings: &TwoBoneIkSettings,
) {
    let before = TwoBoneChain {
        root: root.translation,
        joint: joint.translation,
        end: end.translation,
    };
    let after = solve_two_bone_ik(&before, goal, upper_length, lower_length, settings);

    let root_delta = find_between(before.joint - before.root, after.joint - after.root);
    root.rotation = rotate_keeping_twist(root.rotation, root_delta, settings.twist_axis);

    let joint_delta = find_between(before.end - before.joint, after.end - after.joint);
    joint.rotation = rotate_keeping_twist(joint.rotation, joint_delta, settings.twist_axis);
    joint.translation = after.joint;

    end.translation = after.end;
}

fn rotate_keeping_twist(rotation: Quat, delta: Quat, twist_axis: Option<Vec3>) -> Quat {
    let rotated = normalize_or_identity(delta * rotation);
    let Some(axis) = twist_axis else {
        return rotated;
    };
    let local_delta = rotation.inverse() * rotated;
    let (swing, _twist) = swing_twist(local_delta, axis);
    normalize_or_identity(rotation * swing)
}

fn bend_direction(root: Vec3, desired_dir: Vec3, joint_target: Vec3) -> Vec3 {
    let target_delta = joint_target - root;
    if target_delta.length_squared() < KINDA_SMALL * KINDA_SMALL {
        return Vec3::Y;
    }
    let plane_normal = desired_dir.cross(target_delta);
    if plane_normal.length_squared() < KINDA_SMALL * KINDA_SMALL {
        // Joint target sits on the reach line; any perpendicular will do.
        let (bend, _) = desired_dir.any_orthonormal_pair();
        return bend;
    }
    (target_delta - desired_dir * target_delta.dot(desired_dir))
        .try_normalize()
        .unwrap_or(Vec3::Y)
}
