use super::hierarchy::Rig;
use super::limb::resolve;
use crate::kinematics::{SplineIkBinding, SplineIkSettings, solve_spline_ik};
use crate::spline::SplineCurves;
use crate::transform::KINDA_SMALL;
use crate::{ConstraintData, ConstraintKind, Error, KinematicSpace, SpineData, Transform};

/// A spine chain driven by a spline through its control points.
///
/// Each control point is parent-constrained to both cluster anchors with complementary weights
/// given by its normalized distance along the control points, so moving one cluster bends the
/// spline smoothly toward it.
#[derive(Clone, Debug)]
pub struct SpineControl {
    name: String,
    fk: Vec<usize>,
    ik: Vec<usize>,
    result: Vec<usize>,
    control_points: Vec<usize>,
    root_cluster: usize,
    end_cluster: usize,
    pub blend: f32,
    pub space: KinematicSpace,
    pub settings: SplineIkSettings,
    binding: SplineIkBinding,
}

impl SpineControl {
    /// Adds the cluster constraints to `rig`, evaluates it and binds the IK chain to the spline
    /// through the control points in the resulting pose.
    pub fn new(rig: &mut Rig, data: &SpineData) -> Result<Self, Error> {
        let count = data.ik_chain.len();
        if count < 2 || data.fk_chain.len() != count || data.result_chain.len() != count {
            return Err(Error::InvalidChain {
                message: format!(
                    "spine '{}' needs FK, IK and result chains of equal length (at least 2), got {}/{}/{}",
                    data.name,
                    data.fk_chain.len(),
                    count,
                    data.result_chain.len()
                ),
            });
        }
        if data.control_points.len() < 2 {
            return Err(Error::InvalidChain {
                message: format!("spine '{}' needs at least 2 control points", data.name),
            });
        }

        let fk = resolve_all(rig, &data.fk_chain)?;
        let ik = resolve_all(rig, &data.ik_chain)?;
        let result = resolve_all(rig, &data.result_chain)?;
        let control_points = resolve_all(rig, &data.control_points)?;
        let root_cluster = resolve(rig, &data.root_cluster)?;
        let end_cluster = resolve(rig, &data.end_cluster)?;

        let positions: Vec<_> = control_points
            .iter()
            .map(|&i| rig.global_transform(i).translation)
            .collect();
        let params = cluster_weights(&positions);
        for (name, t) in data.control_points.iter().zip(params) {
            rig.add_constraint(
                &ConstraintData::new(name, &data.root_cluster, ConstraintKind::PARENT, 1.0 - t)
                    .with_maintain_offset(true),
            )?;
            rig.add_constraint(
                &ConstraintData::new(name, &data.end_cluster, ConstraintKind::PARENT, t)
                    .with_maintain_offset(true),
            )?;
        }
        rig.update_dependency_graph()?;
        rig.evaluate();

        let mut control = Self {
            name: data.name.clone(),
            fk,
            ik,
            result,
            control_points,
            root_cluster,
            end_cluster,
            blend: data.blend.clamp(0.0, 1.0),
            space: data.space,
            settings: data.settings,
            binding: SplineIkBinding::default(),
        };
        control.rebind(rig);
        Ok(control)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fk_chain(&self) -> &[usize] {
        &self.fk
    }

    pub fn ik_chain(&self) -> &[usize] {
        &self.ik
    }

    pub fn result_chain(&self) -> &[usize] {
        &self.result
    }

    pub fn control_points(&self) -> &[usize] {
        &self.control_points
    }

    pub fn root_cluster(&self) -> usize {
        self.root_cluster
    }

    pub fn end_cluster(&self) -> usize {
        self.end_cluster
    }

    pub fn binding(&self) -> &SplineIkBinding {
        &self.binding
    }

    pub fn ik_weight(&self) -> f32 {
        match self.space {
            KinematicSpace::Fk => 0.0,
            KinematicSpace::Ik => 1.0,
            KinematicSpace::Weighted => self.blend.clamp(0.0, 1.0),
        }
    }

    /// The spline through the control points' current global positions.
    pub fn spline(&self, rig: &Rig) -> SplineCurves {
        let points: Vec<Transform> = self
            .control_points
            .iter()
            .map(|&i| rig.global_transform(i))
            .collect();
        SplineCurves::new(&points)
    }

    /// Recaptures bone lengths and offset rotations from the current IK chain and spline.
    pub fn rebind(&mut self, rig: &Rig) {
        let bones: Vec<Transform> = self.ik.iter().map(|&i| rig.global_transform(i)).collect();
        self.binding = SplineIkBinding::new(&bones, &self.spline(rig), &self.settings);
    }

    /// Fits the IK chain to the spline (when IK contributes) and blends FK and IK into the
    /// result chain.
    pub fn evaluate(&self, rig: &mut Rig) {
        if !self.is_bound_to(rig) {
            log::warn!("spine '{}' references missing nodes; skipping", self.name);
            return;
        }

        let weight = self.ik_weight();
        if weight > 0.0 {
            let bones: Vec<Transform> =
                self.ik.iter().map(|&i| rig.global_transform(i)).collect();
            let solved = solve_spline_ik(
                &bones,
                &self.spline(rig),
                &self.binding,
                &self.settings,
                self.settings.linear_twist(),
            );
            for (&index, transform) in self.ik.iter().zip(solved) {
                rig.set_global_transform(index, transform);
            }
            rig.evaluate_node_index(self.ik[0]);
        }

        for i in 0..self.result.len() {
            let fk = rig.global_transform(self.fk[i]);
            let ik = rig.global_transform(self.ik[i]);
            rig.set_global_transform(self.result[i], fk.blend(&ik, weight));
        }
        rig.evaluate_node_index(self.result[0]);
    }

    /// Copies the current result pose into the FK chain.
    pub fn switch_to_fk(&mut self, rig: &mut Rig) {
        if !self.is_bound_to(rig) {
            return;
        }
        for (&fk, &result) in self.fk.iter().zip(&self.result) {
            let transform = rig.global_transform(result);
            rig.set_global_transform(fk, transform);
        }
        self.space = KinematicSpace::Fk;
        rig.evaluate_node_index(self.fk[0]);
    }

    fn is_bound_to(&self, rig: &Rig) -> bool {
        let len = rig.len();
        self.fk
            .iter()
            .chain(&self.ik)
            .chain(&self.result)
            .chain(&self.control_points)
            .chain([&self.root_cluster, &self.end_cluster])
            .all(|&i| i < len)
    }
}

fn resolve_all(rig: &Rig, names: &[String]) -> Result<Vec<usize>, Error> {
    names.iter().map(|name| resolve(rig, name)).collect()
}

/// Normalized distance of each point along the polyline through `points`, 0 at the first point
/// and 1 at the last. Coincident points fall back to even spacing.
pub(crate) fn cluster_weights(points: &[glam::Vec3]) -> Vec<f32> {
    let mut distances = Vec::with_capacity(points.len());
    let mut total = 0.0;
    for (i, point) in points.iter().enumerate() {
        if i > 0 {
            total += point.distance(points[i - 1]);
        }
        distances.push(total);
    }
    if total <= KINDA_SMALL {
        let last = points.len().saturating_sub(1).max(1) as f32;
        return (0..points.len()).map(|i| i as f32 / last).collect();
    }
    distances.into_iter().map(|d| d / total).collect()
}
