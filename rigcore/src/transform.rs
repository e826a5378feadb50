use glam::{Quat, Vec3};

/// Geometric tolerance shared by the solvers and the hierarchy math.
pub const KINDA_SMALL: f32 = 1.0e-4;

/// Scales with a component below this magnitude are treated as collapsed when inverted.
const SMALL_SCALE: f32 = 1.0e-8;

/// Translation, rotation and non-uniform scale, applied in scale → rotate → translate order.
///
/// There is no shear: composing two transforms with non-uniform scale and rotation drops the
/// shear term, which is the usual convention for rig hierarchies.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    /// `self` is the parent; returns the global transform of `child` expressed in `self`'s space.
    pub fn mul_transform(&self, child: &Transform) -> Transform {
        Transform {
            translation: self.transform_point(child.translation),
            rotation: self.rotation * child.rotation,
            scale: self.scale * child.scale,
        }
    }

    /// Inverse of [`Transform::mul_transform`]: the transform that, composed under `parent`,
    /// reproduces `self`.
    pub fn relative_to(&self, parent: &Transform) -> Transform {
        let inv_rotation = parent.rotation.inverse();
        let inv_scale = safe_reciprocal(parent.scale);
        Transform {
            translation: (inv_rotation * (self.translation - parent.translation)) * inv_scale,
            rotation: inv_rotation * self.rotation,
            scale: self.scale * inv_scale,
        }
    }

    pub fn inverse(&self) -> Transform {
        Transform::IDENTITY.relative_to(self)
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * (point * self.scale) + self.translation
    }

    pub fn normalized(mut self) -> Self {
        self.rotation = normalize_or_identity(self.rotation);
        self
    }

    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }

    /// Position lerp, rotation nlerp (shortest arc), scale lerp.
    pub fn blend(&self, other: &Transform, alpha: f32) -> Transform {
        Transform {
            translation: self.translation.lerp(other.translation, alpha),
            rotation: fast_lerp(self.rotation, other.rotation, alpha),
            scale: self.scale.lerp(other.scale, alpha),
        }
    }

    /// Component-wise comparison; rotations that differ only in sign compare equal.
    pub fn approx_eq(&self, other: &Transform, tolerance: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, tolerance)
            && self.scale.abs_diff_eq(other.scale, tolerance)
            && quat_approx_eq(self.rotation, other.rotation, tolerance)
    }
}

pub fn quat_approx_eq(a: Quat, b: Quat, tolerance: f32) -> bool {
    a.abs_diff_eq(b, tolerance) || a.abs_diff_eq(-b, tolerance)
}

pub fn safe_reciprocal(v: Vec3) -> Vec3 {
    fn recip(c: f32) -> f32 {
        if c.abs() <= SMALL_SCALE { 0.0 } else { 1.0 / c }
    }
    Vec3::new(recip(v.x), recip(v.y), recip(v.z))
}

pub fn normalize_or_identity(q: Quat) -> Quat {
    let length = q.length();
    if !length.is_finite() || length <= SMALL_SCALE {
        return Quat::IDENTITY;
    }
    q / length
}

/// Flips `q` into the same hemisphere as `reference` so that summing or interpolating them
/// follows the short arc.
pub fn align_hemisphere(reference: Quat, q: Quat) -> Quat {
    if reference.dot(q) < 0.0 { -q } else { q }
}

/// Normalized linear interpolation with hemisphere correction.
pub fn fast_lerp(a: Quat, b: Quat, alpha: f32) -> Quat {
    if alpha <= 0.0 {
        return a;
    }
    if alpha >= 1.0 {
        return b;
    }
    let b = align_hemisphere(a, b);
    normalize_or_identity(a * (1.0 - alpha) + b * alpha)
}

/// Shortest rotation taking direction `from` onto direction `to`. Inputs do not need to be
/// normalized; a degenerate input yields the identity.
pub fn find_between(from: Vec3, to: Vec3) -> Quat {
    let (Some(from), Some(to)) = (from.try_normalize(), to.try_normalize()) else {
        return Quat::IDENTITY;
    };
    Quat::from_rotation_arc(from, to)
}

/// Splits `q` into `swing * twist`, where `twist` rotates purely about `axis`.
pub fn swing_twist(q: Quat, axis: Vec3) -> (Quat, Quat) {
    let Some(axis) = axis.try_normalize() else {
        return (q, Quat::IDENTITY);
    };
    let projection = axis * q.xyz().dot(axis);
    let twist = Quat::from_xyzw(projection.x, projection.y, projection.z, q.w);
    let length = twist.length();
    let twist = if length <= SMALL_SCALE {
        Quat::IDENTITY
    } else {
        twist / length
    };
    let swing = q * twist.inverse();
    (swing, twist)
}
