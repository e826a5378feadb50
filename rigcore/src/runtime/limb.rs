use super::hierarchy::Rig;
use crate::kinematics::{
    AimSettings, TwoBoneGoal, TwoBoneIkSettings, solve_aim, solve_two_bone_ik_transforms,
};
use crate::transform::{KINDA_SMALL, normalize_or_identity};
use crate::{Error, KinematicSpace, LimbData, Transform};
use glam::{Quat, Vec3};

/// A three-bone limb (root, joint, end) with FK, IK and result chains.
///
/// The IK chain is solved toward the effector with the joint bending toward the joint target;
/// the result chain blends FK and IK by [`LimbControl::ik_weight`].
#[derive(Clone, Debug)]
pub struct LimbControl {
    name: String,
    fk: [usize; 3],
    ik: [usize; 3],
    result: [usize; 3],
    effector: usize,
    joint_target: usize,
    bone_axis: Vec3,
    upper_length: f32,
    lower_length: f32,
    pub blend: f32,
    pub space: KinematicSpace,
    pub settings: TwoBoneIkSettings,
    /// Rotation of the IK end bone relative to the effector.
    end_offset: Quat,
    /// Local axes of the root and joint that face the joint target.
    root_pole_axis: Vec3,
    joint_pole_axis: Vec3,
}

impl LimbControl {
    /// Binds a limb to `rig` using its current pose: segment lengths, the effector offset and the
    /// pole axes all come from the IK chain as it stands now.
    pub fn new(rig: &Rig, data: &LimbData) -> Result<Self, Error> {
        let fk = resolve_chain(rig, &data.fk_chain)?;
        let ik = resolve_chain(rig, &data.ik_chain)?;
        let result = resolve_chain(rig, &data.result_chain)?;
        let effector = resolve(rig, &data.effector)?;
        let joint_target = resolve(rig, &data.joint_target)?;
        let bone_axis = data.bone_axis.try_normalize().ok_or_else(|| Error::InvalidValue {
            message: format!("limb '{}' has a zero bone axis", data.name),
        })?;

        let [root, joint, end] = ik.map(|i| rig.global_transform(i));
        let upper_length = root.translation.distance(joint.translation);
        let lower_length = joint.translation.distance(end.translation);
        if upper_length <= KINDA_SMALL || lower_length <= KINDA_SMALL {
            return Err(Error::InvalidChain {
                message: format!("limb '{}' has a zero-length segment", data.name),
            });
        }

        let target = rig.global_transform(joint_target).translation;
        let end_offset = normalize_or_identity(
            rig.global_transform(effector).rotation.inverse() * end.rotation,
        );

        Ok(Self {
            name: data.name.clone(),
            fk,
            ik,
            result,
            effector,
            joint_target,
            bone_axis,
            upper_length,
            lower_length,
            blend: data.blend.clamp(0.0, 1.0),
            space: data.space,
            settings: data.settings,
            end_offset,
            root_pole_axis: pole_axis(&root, joint.translation, target, bone_axis),
            joint_pole_axis: pole_axis(&joint, end.translation, target, bone_axis),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fk_chain(&self) -> [usize; 3] {
        self.fk
    }

    pub fn ik_chain(&self) -> [usize; 3] {
        self.ik
    }

    pub fn result_chain(&self) -> [usize; 3] {
        self.result
    }

    pub fn effector(&self) -> usize {
        self.effector
    }

    pub fn joint_target(&self) -> usize {
        self.joint_target
    }

    pub fn upper_length(&self) -> f32 {
        self.upper_length
    }

    pub fn lower_length(&self) -> f32 {
        self.lower_length
    }

    pub fn end_offset(&self) -> Quat {
        self.end_offset
    }

    /// 0 is pure FK, 1 pure IK.
    pub fn ik_weight(&self) -> f32 {
        match self.space {
            KinematicSpace::Fk => 0.0,
            KinematicSpace::Ik => 1.0,
            KinematicSpace::Weighted => self.blend.clamp(0.0, 1.0),
        }
    }

    /// Solves the IK chain (when IK contributes at all) and blends FK and IK into the result
    /// chain. Expects the rest of the rig to be evaluated already.
    pub fn evaluate(&self, rig: &mut Rig) {
        if !self.is_bound_to(rig) {
            log::warn!("limb '{}' references missing nodes; skipping", self.name);
            return;
        }

        let weight = self.ik_weight();
        if weight > 0.0 {
            self.solve_ik(rig);
        }

        for i in 0..3 {
            let fk = rig.global_transform(self.fk[i]);
            let ik = rig.global_transform(self.ik[i]);
            rig.set_global_transform(self.result[i], fk.blend(&ik, weight));
        }
        rig.evaluate_node_index(self.result[0]);
    }

    /// Moves the IK controls onto the current result pose so the limb can switch to IK without a
    /// jump: the IK chain copies the result chain, the effector lands on the end bone, and the
    /// joint target is placed in the plane of the three joints on the side the joint bends to.
    /// The pole axes are recaptured from that pose, so the first solve reproduces it.
    pub fn switch_to_ik(&mut self, rig: &mut Rig) {
        if !self.is_bound_to(rig) {
            return;
        }
        let pose = self.result.map(|i| rig.global_transform(i));
        for (&ik, transform) in self.ik.iter().zip(&pose) {
            rig.set_global_transform(ik, *transform);
        }

        let [root, joint, end] = pose;
        let mut effector = rig.global_transform(self.effector);
        effector.translation = end.translation;
        effector.rotation = normalize_or_identity(end.rotation * self.end_offset.inverse());
        rig.set_global_transform(self.effector, effector);

        let reach = end.translation - root.translation;
        let bend = joint.translation - root.translation;
        let direction = reach
            .cross(bend.cross(reach))
            .try_normalize()
            .or_else(|| reach.try_normalize().map(|r| r.any_orthonormal_vector()))
            .unwrap_or(Vec3::Y);
        let mut target = rig.global_transform(self.joint_target);
        target.translation = joint.translation + direction * self.upper_length;
        rig.set_global_transform(self.joint_target, target);

        // The pose may bend outside the bind plane; re-derive the roll the solve applies.
        self.root_pole_axis =
            pole_axis(&root, joint.translation, target.translation, self.bone_axis);
        self.joint_pole_axis =
            pole_axis(&joint, end.translation, target.translation, self.bone_axis);

        self.space = KinematicSpace::Ik;
        rig.evaluate_node_index(self.effector);
        rig.evaluate_node_index(self.joint_target);
        rig.evaluate_node_index(self.ik[0]);
    }

    /// Copies the current result pose into the FK chain and records the IK end bone's offset
    /// from the effector for the next switch back.
    pub fn switch_to_fk(&mut self, rig: &mut Rig) {
        if !self.is_bound_to(rig) {
            return;
        }
        for i in 0..3 {
            let transform = rig.global_transform(self.result[i]);
            rig.set_global_transform(self.fk[i], transform);
        }
        self.end_offset = normalize_or_identity(
            rig.global_transform(self.effector).rotation.inverse()
                * rig.global_transform(self.ik[2]).rotation,
        );
        self.space = KinematicSpace::Fk;
        rig.evaluate_node_index(self.fk[0]);
    }

    fn solve_ik(&self, rig: &mut Rig) {
        let [mut root, mut joint, mut end] = self.ik.map(|i| rig.global_transform(i));
        let effector = rig.global_transform(self.effector);
        let goal = TwoBoneGoal {
            effector: effector.translation,
            joint_target: rig.global_transform(self.joint_target).translation,
        };
        solve_two_bone_ik_transforms(
            &mut root,
            &mut joint,
            &mut end,
            &goal,
            self.upper_length,
            self.lower_length,
            &self.settings,
        );

        // Face the joint target with both bones.
        root.rotation = solve_aim(
            &root,
            joint.translation,
            Some(goal.joint_target - root.translation),
            &AimSettings {
                aim_axis: self.bone_axis,
                up_axis: Some(self.root_pole_axis),
                clamp_degrees: 0.0,
            },
        );
        joint.rotation = solve_aim(
            &joint,
            end.translation,
            Some(goal.joint_target - joint.translation),
            &AimSettings {
                aim_axis: self.bone_axis,
                up_axis: Some(self.joint_pole_axis),
                clamp_degrees: 0.0,
            },
        );
        end.rotation = normalize_or_identity(effector.rotation * self.end_offset);

        rig.set_global_transform(self.ik[0], root);
        rig.set_global_transform(self.ik[1], joint);
        rig.set_global_transform(self.ik[2], end);
        rig.evaluate_node_index(self.ik[0]);
    }

    fn is_bound_to(&self, rig: &Rig) -> bool {
        let len = rig.len();
        self.fk
            .iter()
            .chain(&self.ik)
            .chain(&self.result)
            .chain([&self.effector, &self.joint_target])
            .all(|&i| i < len)
    }
}

pub(crate) fn resolve(rig: &Rig, name: &str) -> Result<usize, Error> {
    rig.find_node(name).ok_or_else(|| Error::UnknownNode {
        name: name.to_string(),
    })
}

fn resolve_chain(rig: &Rig, names: &[String; 3]) -> Result<[usize; 3], Error> {
    Ok([
        resolve(rig, &names[0])?,
        resolve(rig, &names[1])?,
        resolve(rig, &names[2])?,
    ])
}

/// Local axis of `bone` pointing toward `target`, perpendicular to the bone's direction toward
/// `next`.
fn pole_axis(bone: &Transform, next: Vec3, target: Vec3, bone_axis: Vec3) -> Vec3 {
    let toward = target - bone.translation;
    let along = (next - bone.translation).try_normalize();
    let perpendicular = match along {
        Some(along) => toward - along * toward.dot(along),
        None => toward,
    };
    let local = bone.rotation.inverse() * perpendicular;
    let local = local - bone_axis * local.dot(bone_axis);
    local
        .try_normalize()
        .unwrap_or_else(|| bone_axis.any_orthonormal_vector())
}
