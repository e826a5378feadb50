use super::binding::ManipulatorSet;
use super::hierarchy::Rig;
use super::limb::LimbControl;
use super::spine::SpineControl;
use crate::{Error, RigData};

/// A rig together with its limb and spine controls and manipulators; one
/// [`ControlRig::evaluate`] call runs a whole frame.
#[derive(Clone, Debug, Default)]
pub struct ControlRig {
    pub rig: Rig,
    pub limbs: Vec<LimbControl>,
    pub spines: Vec<SpineControl>,
    pub manipulators: ManipulatorSet,
}

impl ControlRig {
    pub fn new(rig: Rig) -> Self {
        Self {
            rig,
            ..Self::default()
        }
    }

    /// Builds the rig, then binds limbs and spines in the order they are listed.
    pub fn from_data(data: &RigData) -> Result<Self, Error> {
        let mut control_rig = Self::new(Rig::from_data(data)?);
        for limb in &data.limbs {
            let control = LimbControl::new(&control_rig.rig, limb)?;
            control_rig.limbs.push(control);
        }
        for spine in &data.spines {
            let control = SpineControl::new(&mut control_rig.rig, spine)?;
            control_rig.spines.push(control);
        }
        Ok(control_rig)
    }

    pub fn limb(&self, name: &str) -> Option<&LimbControl> {
        self.limbs.iter().find(|l| l.name() == name)
    }

    pub fn limb_mut(&mut self, name: &str) -> Option<&mut LimbControl> {
        self.limbs.iter_mut().find(|l| l.name() == name)
    }

    pub fn spine(&self, name: &str) -> Option<&SpineControl> {
        self.spines.iter().find(|s| s.name() == name)
    }

    pub fn spine_mut(&mut self, name: &str) -> Option<&mut SpineControl> {
        self.spines.iter_mut().find(|s| s.name() == name)
    }

    /// Switches a limb to IK without a visible jump. Returns `false` for unknown limbs.
    pub fn switch_limb_to_ik(&mut self, name: &str) -> bool {
        let Some(limb) = self.limbs.iter_mut().find(|l| l.name() == name) else {
            return false;
        };
        limb.switch_to_ik(&mut self.rig);
        true
    }

    pub fn switch_limb_to_fk(&mut self, name: &str) -> bool {
        let Some(limb) = self.limbs.iter_mut().find(|l| l.name() == name) else {
            return false;
        };
        limb.switch_to_fk(&mut self.rig);
        true
    }

    /// Manipulators in, full rig pass, limbs, spines, manipulators out.
    pub fn evaluate(&mut self) {
        self.manipulators.apply(&mut self.rig);
        self.rig.evaluate();
        for limb in &self.limbs {
            limb.evaluate(&mut self.rig);
        }
        for spine in &self.spines {
            spine.evaluate(&mut self.rig);
        }
        self.manipulators.read_back(&self.rig);
    }
}
