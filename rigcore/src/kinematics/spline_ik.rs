use crate::Transform;
use crate::spline::{SplineCurves, SplineSample};
use crate::transform::{KINDA_SMALL, find_between, normalize_or_identity};
use glam::{Quat, Vec3};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SplineIkSettings {
    /// Local axis each bone points along toward the next bone.
    pub bone_axis: Vec3,
    /// Constant twist about the bone axis, in degrees.
    pub roll: f32,
    /// Twist in degrees at the start and end of the spline, interpolated along its length.
    pub twist_start: f32,
    pub twist_end: f32,
    /// 0 keeps bind-time bone lengths, 1 stretches them with the spline.
    pub stretch: f32,
    /// Distance along the spline at which the first bone is placed.
    pub offset: f32,
    /// Linear approximation samples per spline segment.
    pub approximation_density: usize,
}

impl Default for SplineIkSettings {
    fn default() -> Self {
        Self {
            bone_axis: Vec3::X,
            roll: 0.0,
            twist_start: 0.0,
            twist_end: 0.0,
            stretch: 1.0,
            offset: 0.0,
            approximation_density: 10,
        }
    }
}

impl SplineIkSettings {
    /// Twist mapping that blends linearly from `twist_start` to `twist_end`.
    pub fn linear_twist(&self) -> impl Fn(f32) -> f32 + use<> {
        let (start, end) = (self.twist_start, self.twist_end);
        move |alpha| start + (end - start) * alpha
    }
}

/// Bind-time data for one chain on one spline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SplineIkBinding {
    /// Distance from each bone to the previous one; the first entry is zero.
    pub bone_lengths: Vec<f32>,
    /// Rotation of each bone relative to the spline rotation at its bind parameter.
    pub offset_rotations: Vec<Quat>,
    pub original_spline_length: f32,
}

impl SplineIkBinding {
    pub fn new(bones: &[Transform], spline: &SplineCurves, settings: &SplineIkSettings) -> Self {
        let bone_lengths: Vec<f32> = bones
            .iter()
            .enumerate()
            .map(|(i, bone)| {
                if i == 0 {
                    0.0
                } else {
                    bone.translation.distance(bones[i - 1].translation)
                }
            })
            .collect();

        let samples = spline.linear_approximation(settings.approximation_density);
        let params = place_along_spline(spline, &samples, &bone_lengths, 1.0, settings.offset);
        let offset_rotations = bones
            .iter()
            .zip(&params)
            .map(|(bone, &param)| {
                normalize_or_identity(spline.rotation(param).inverse() * bone.rotation)
            })
            .collect();

        Self {
            bone_lengths,
            offset_rotations,
            original_spline_length: spline.length(),
        }
    }

    pub fn bone_count(&self) -> usize {
        self.bone_lengths.len()
    }
}

/// Walks a sphere of radius `radius` centred at `origin` forward along the linear approximation
/// and returns the spline parameter where it first leaves the sphere.
///
/// `origin_param` is where `origin` lies on the spline; samples behind it are skipped and the
/// origin itself stands in for the inner sample of its segment, so the result never lands before
/// it. `*start_index` advances so a chain walked front to back costs roughly one pass over the
/// samples. If nothing intersects, the index resets and the last parameter is returned.
pub fn find_param_at_first_sphere_intersection(
    samples: &[SplineSample],
    origin: Vec3,
    origin_param: f32,
    radius: f32,
    start_index: &mut usize,
) -> f32 {
    let radius_sq = radius * radius;
    let segments = samples.len().saturating_sub(1);
    for i in (*start_index).min(segments)..segments {
        let outer = &samples[i + 1];
        if outer.param <= origin_param {
            continue;
        }
        let inner = if samples[i].param < origin_param {
            SplineSample {
                position: origin,
                param: origin_param,
            }
        } else {
            samples[i]
        };
        let inner_sq = origin.distance_squared(inner.position);
        let outer_sq = origin.distance_squared(outer.position);
        if inner_sq <= radius_sq && outer_sq >= radius_sq {
            *start_index = i;
            let inner_d = inner_sq.sqrt();
            let outer_d = outer_sq.sqrt();
            let span = outer_d - inner_d;
            let t = if span > f32::EPSILON {
                ((radius - inner_d) / span).clamp(0.0, 1.0)
            } else {
                0.0
            };
            return inner.param + (outer.param - inner.param) * t;
        }
    }
    *start_index = 0;
    samples.last().map(|s| s.param).unwrap_or(0.0)
}

/// Fits `bones` onto `spline`.
///
/// Bones are placed front to back so each lies `bone_length * stretch_ratio` from the previous
/// one, then rotated: spline rotation, roll plus `twist(normalized arc length)` about the bone
/// axis, the bind-time offset, and finally a correction that turns the bone axis toward the next
/// bone. Bones beyond the binding's length keep their input transform.
pub fn solve_spline_ik<F>(
    bones: &[Transform],
    spline: &SplineCurves,
    binding: &SplineIkBinding,
    settings: &SplineIkSettings,
    twist: F,
) -> Vec<Transform>
where
    F: Fn(f32) -> f32,
{
    if bones.is_empty() || spline.is_empty() {
        return bones.to_vec();
    }
    let count = bones.len().min(binding.bone_count());

    let current_length = spline.length();
    let original_length = binding.original_spline_length;
    let stretch_ratio = if original_length > KINDA_SMALL {
        (original_length + (current_length - original_length) * settings.stretch) / original_length
    } else {
        1.0
    };

    let samples = spline.linear_approximation(settings.approximation_density);
    let params = place_along_spline(
        spline,
        &samples,
        &binding.bone_lengths[..count],
        stretch_ratio,
        settings.offset,
    );

    let mut out = bones.to_vec();
    for (i, &param) in params.iter().enumerate() {
        out[i].translation = spline.position(param);
        out[i].scale = spline.scale(param);
    }

    let bone_axis = settings.bone_axis.try_normalize().unwrap_or(Vec3::X);
    for i in 0..count {
        let param = params[i];
        let alpha = if current_length > KINDA_SMALL {
            (spline.distance_at_param(param) / current_length).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let twist_degrees = twist(alpha) + settings.roll;
        let twist_rotation = Quat::from_axis_angle(bone_axis, twist_degrees.to_radians());
        let offset = binding
            .offset_rotations
            .get(i)
            .copied()
            .unwrap_or(Quat::IDENTITY);
        let base = normalize_or_identity(spline.rotation(param) * twist_rotation * offset);

        out[i].rotation = if i + 1 < count {
            let old_dir = base * bone_axis;
            let new_dir = out[i + 1].translation - out[i].translation;
            normalize_or_identity(find_between(old_dir, new_dir) * base)
        } else {
            base
        };
    }

    out
}

fn place_along_spline(
    spline: &SplineCurves,
    samples: &[SplineSample],
    bone_lengths: &[f32],
    stretch_ratio: f32,
    offset: f32,
) -> Vec<f32> {
    let mut params = Vec::with_capacity(bone_lengths.len());
    if bone_lengths.is_empty() {
        return params;
    }
    let mut start_index = 0usize;
    let origin = spline.position(0.0);
    let first = if offset.abs() <= KINDA_SMALL {
        0.0
    } else {
        find_param_at_first_sphere_intersection(
            samples,
            origin,
            0.0,
            offset.abs(),
            &mut start_index,
        )
    };
    params.push(first);

    let mut previous = spline.position(first);
    let mut previous_param = first;
    for &length in &bone_lengths[1..] {
        if length * stretch_ratio <= KINDA_SMALL {
            params.push(params[params.len() - 1]);
            continue;
        }
        let param = find_param_at_first_sphere_intersection(
            samples,
            previous,
            previous_param,
            length * stretch_ratio,
            &mut start_index,
        );
        previous = spline.position(param);
        previous_param = param;
        params.push(param);
    }
    params
}
