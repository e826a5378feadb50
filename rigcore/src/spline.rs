//! Position, rotation and scale curves through a sequence of control transforms.
//!
//! Keys sit at integer parameters `0, 1, .., n - 1`. Positions use cubic Hermite segments with
//! Catmull-Rom style automatic tangents, rotations are slerped between keys and scales are
//! lerped. An arc-length table maps distances along the curve back to parameters.

use crate::Transform;
use crate::transform::normalize_or_identity;
use glam::{Quat, Vec3};

const REPARAM_STEPS_PER_SEGMENT: usize = 16;

/// One vertex of the piecewise-linear approximation of a [`SplineCurves`] position curve.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SplineSample {
    pub position: Vec3,
    pub param: f32,
}

#[derive(Clone, Debug, Default)]
pub struct SplineCurves {
    positions: Vec<Vec3>,
    tangents: Vec<Vec3>,
    rotations: Vec<Quat>,
    scales: Vec<Vec3>,
    /// `(distance, param)` pairs, increasing in both.
    reparam: Vec<(f32, f32)>,
}

impl SplineCurves {
    pub fn new(points: &[Transform]) -> Self {
        let positions: Vec<Vec3> = points.iter().map(|p| p.translation).collect();
        let mut rotations: Vec<Quat> = Vec::with_capacity(points.len());
        for p in points {
            let q = normalize_or_identity(p.rotation);
            // Keep neighbouring keys in one hemisphere so slerp never takes the long arc.
            let q = match rotations.last() {
                Some(prev) if prev.dot(q) < 0.0 => -q,
                _ => q,
            };
            rotations.push(q);
        }
        let scales = points.iter().map(|p| p.scale).collect();

        let mut curves = Self {
            tangents: auto_tangents(&positions),
            positions,
            rotations,
            scales,
            reparam: Vec::new(),
        };
        curves.rebuild_reparam_table();
        curves
    }

    pub fn from_positions(positions: &[Vec3]) -> Self {
        let points: Vec<Transform> = positions
            .iter()
            .map(|&p| Transform::from_translation(p))
            .collect();
        Self::new(&points)
    }

    pub fn point_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Parameter of the last key.
    pub fn max_param(&self) -> f32 {
        self.positions.len().saturating_sub(1) as f32
    }

    pub fn length(&self) -> f32 {
        self.reparam.last().map(|&(d, _)| d).unwrap_or(0.0)
    }

    pub fn position(&self, param: f32) -> Vec3 {
        let Some((i, u)) = self.segment(param) else {
            return self.positions.first().copied().unwrap_or(Vec3::ZERO);
        };
        let p0 = self.positions[i];
        let p1 = self.positions[i + 1];
        let m0 = self.tangents[i];
        let m1 = self.tangents[i + 1];

        let u2 = u * u;
        let u3 = u2 * u;
        let h00 = 2.0 * u3 - 3.0 * u2 + 1.0;
        let h10 = u3 - 2.0 * u2 + u;
        let h01 = -2.0 * u3 + 3.0 * u2;
        let h11 = u3 - u2;
        p0 * h00 + m0 * h10 + p1 * h01 + m1 * h11
    }

    pub fn rotation(&self, param: f32) -> Quat {
        let Some((i, u)) = self.segment(param) else {
            return self.rotations.first().copied().unwrap_or(Quat::IDENTITY);
        };
        self.rotations[i].slerp(self.rotations[i + 1], u)
    }

    pub fn scale(&self, param: f32) -> Vec3 {
        let Some((i, u)) = self.segment(param) else {
            return self.scales.first().copied().unwrap_or(Vec3::ONE);
        };
        self.scales[i].lerp(self.scales[i + 1], u)
    }

    /// Parameter at arc-length `distance`, clamped to the curve.
    pub fn param_at_distance(&self, distance: f32) -> f32 {
        let Some(&(last_d, last_p)) = self.reparam.last() else {
            return 0.0;
        };
        if distance <= 0.0 {
            return 0.0;
        }
        if distance >= last_d {
            return last_p;
        }
        let upper = self.reparam.partition_point(|&(d, _)| d < distance);
        let (d0, p0) = self.reparam[upper - 1];
        let (d1, p1) = self.reparam[upper];
        let span = d1 - d0;
        if span <= f32::EPSILON {
            return p0;
        }
        p0 + (p1 - p0) * ((distance - d0) / span)
    }

    /// Arc-length distance from the start of the curve to `param`.
    pub fn distance_at_param(&self, param: f32) -> f32 {
        let Some(&(last_d, last_p)) = self.reparam.last() else {
            return 0.0;
        };
        if param <= 0.0 {
            return 0.0;
        }
        if param >= last_p {
            return last_d;
        }
        let upper = self.reparam.partition_point(|&(_, p)| p < param);
        let (d0, p0) = self.reparam[upper - 1];
        let (d1, p1) = self.reparam[upper];
        let span = p1 - p0;
        if span <= f32::EPSILON {
            return d0;
        }
        d0 + (d1 - d0) * ((param - p0) / span)
    }

    /// Samples the position curve `density` times per segment (plus the final key).
    pub fn linear_approximation(&self, density: usize) -> Vec<SplineSample> {
        let density = density.max(1);
        let segments = self.positions.len().saturating_sub(1);
        if segments == 0 {
            return self
                .positions
                .first()
                .map(|&position| vec![SplineSample { position, param: 0.0 }])
                .unwrap_or_default();
        }
        let mut samples = Vec::with_capacity(segments * density + 1);
        for segment in 0..segments {
            for step in 0..density {
                let param = segment as f32 + step as f32 / density as f32;
                samples.push(SplineSample {
                    position: self.position(param),
                    param,
                });
            }
        }
        let param = self.max_param();
        samples.push(SplineSample {
            position: self.position(param),
            param,
        });
        samples
    }

    fn segment(&self, param: f32) -> Option<(usize, f32)> {
        let count = self.positions.len();
        if count < 2 {
            return None;
        }
        let param = if param.is_finite() {
            param.clamp(0.0, (count - 1) as f32)
        } else {
            0.0
        };
        let i = (param.floor() as usize).min(count - 2);
        Some((i, param - i as f32))
    }

    fn rebuild_reparam_table(&mut self) {
        self.reparam.clear();
        if self.positions.is_empty() {
            return;
        }
        self.reparam.push((0.0, 0.0));
        let segments = self.positions.len() - 1;
        let mut distance = 0.0f32;
        let mut previous = self.positions[0];
        for segment in 0..segments {
            for step in 1..=REPARAM_STEPS_PER_SEGMENT {
                let param = segment as f32 + step as f32 / REPARAM_STEPS_PER_SEGMENT as f32;
                let point = self.position(param);
                distance += point.distance(previous);
                previous = point;
                self.reparam.push((distance, param));
            }
        }
    }
}

fn auto_tangents(points: &[Vec3]) -> Vec<Vec3> {
    let n = points.len();
    match n {
        0 => Vec::new(),
        1 => vec![Vec3::ZERO],
        _ => (0..n)
            .map(|i| {
                if i == 0 {
                    points[1] - points[0]
                } else if i == n - 1 {
                    points[n - 1] - points[n - 2]
                } else {
                    (points[i + 1] - points[i - 1]) * 0.5
                }
            })
            .collect(),
    }
}
