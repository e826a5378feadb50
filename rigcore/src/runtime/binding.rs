use super::hierarchy::Rig;
use crate::{Error, Transform};
use std::collections::HashMap;

/// One bone of a host's reference pose.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceBone {
    pub name: String,
    pub parent: Option<String>,
    /// Parent-relative transform.
    pub local: Transform,
}

/// A host skeleton the rig reads from: its reference pose once, then live transforms each frame.
pub trait TransformSource {
    /// Bones in an order where every parent precedes its children.
    fn reference_pose(&self) -> Vec<ReferenceBone>;

    /// Current global transform of a host bone, or `None` if the host has no such bone.
    fn global_transform(&self, name: &str) -> Option<Transform>;
}

/// A host skeleton the rig writes its evaluated transforms to.
pub trait TransformSink {
    fn set_global_transform(&mut self, name: &str, transform: Transform);
}

impl Rig {
    /// Builds a node per bone of the host's reference pose and evaluates it once.
    pub fn from_source(source: &impl TransformSource) -> Result<Self, Error> {
        let mut rig = Rig::new();
        for bone in source.reference_pose() {
            rig.add_node(&bone.name, bone.parent.as_deref(), bone.local)?;
        }
        rig.evaluate();
        Ok(rig)
    }
}

/// Per-frame traffic between a rig and its host: `inputs` are pulled from the host before
/// evaluation, `outputs` pushed to it afterwards. Each entry pairs a node with the host bone of
/// the same name.
#[derive(Clone, Debug, Default)]
pub struct Binding {
    inputs: Vec<(usize, String)>,
    outputs: Vec<(usize, String)>,
}

impl Binding {
    pub fn new(rig: &Rig, inputs: &[&str], outputs: &[&str]) -> Result<Self, Error> {
        let lookup = |names: &[&str]| {
            names
                .iter()
                .map(|&name| {
                    rig.find_node(name)
                        .map(|index| (index, name.to_string()))
                        .ok_or_else(|| Error::UnknownNode {
                            name: name.to_string(),
                        })
                })
                .collect::<Result<Vec<_>, Error>>()
        };
        Ok(Self {
            inputs: lookup(inputs)?,
            outputs: lookup(outputs)?,
        })
    }

    pub fn inputs(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|(_, name)| name.as_str())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|(_, name)| name.as_str())
    }

    /// Copies the host's current transforms into the input nodes. Bones the host does not know
    /// are left alone.
    pub fn pull(&self, rig: &mut Rig, source: &impl TransformSource) {
        for (index, name) in &self.inputs {
            if let Some(transform) = source.global_transform(name) {
                rig.set_global_transform(*index, transform);
            }
        }
    }

    pub fn push(&self, rig: &Rig, sink: &mut impl TransformSink) {
        for (index, name) in &self.outputs {
            sink.set_global_transform(name, rig.global_transform(*index));
        }
    }
}

/// Which parts of a manipulator's value it writes and reads.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TransformComponents {
    pub translation: bool,
    pub rotation: bool,
    pub scale: bool,
}

impl Default for TransformComponents {
    fn default() -> Self {
        Self::ALL
    }
}

impl TransformComponents {
    pub const ALL: Self = Self {
        translation: true,
        rotation: true,
        scale: true,
    };

    /// `value`'s enabled components over `base`.
    pub fn merge(self, base: &Transform, value: &Transform) -> Transform {
        Transform {
            translation: if self.translation {
                value.translation
            } else {
                base.translation
            },
            rotation: if self.rotation {
                value.rotation
            } else {
                base.rotation
            },
            scale: if self.scale { value.scale } else { base.scale },
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub enum ManipulatorSpace {
    #[default]
    Global,
    Local,
    /// Global, seen through a fixed remap. Values are `rig_global ∘ remap`, so writing applies
    /// the remap's inverse and reading applies the remap itself.
    Mapped(Transform),
}

/// An externally settable transform bound to one node.
#[derive(Clone, Debug)]
pub struct Manipulator {
    name: String,
    node: usize,
    pub components: TransformComponents,
    pub space: ManipulatorSpace,
    pub value: Transform,
}

impl Manipulator {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self) -> usize {
        self.node
    }

    fn current(&self, rig: &Rig) -> Transform {
        match self.space {
            ManipulatorSpace::Global => rig.global_transform(self.node),
            ManipulatorSpace::Local => rig.local_transform(self.node),
            ManipulatorSpace::Mapped(remap) => {
                rig.global_transform(self.node).mul_transform(&remap)
            }
        }
    }

    fn apply(&self, rig: &mut Rig) {
        let value = self.components.merge(&self.current(rig), &self.value);
        match self.space {
            ManipulatorSpace::Global => rig.set_global_transform(self.node, value),
            ManipulatorSpace::Local => rig.set_local_transform(self.node, value),
            ManipulatorSpace::Mapped(remap) => {
                rig.set_global_transform(self.node, value.mul_transform(&remap.inverse()))
            }
        }
    }
}

/// Named manipulators, written into the rig before evaluation and read back after it.
#[derive(Clone, Debug, Default)]
pub struct ManipulatorSet {
    manipulators: Vec<Manipulator>,
    by_name: HashMap<String, usize>,
}

impl ManipulatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.manipulators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manipulators.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Manipulator> {
        self.manipulators.iter()
    }

    /// Adds a manipulator on `node`, initialised from the node's current transform.
    pub fn add(
        &mut self,
        rig: &Rig,
        name: &str,
        node: &str,
        components: TransformComponents,
        space: ManipulatorSpace,
    ) -> Result<usize, Error> {
        if self.by_name.contains_key(name) {
            return Err(Error::DuplicateNode {
                name: name.to_string(),
            });
        }
        let node_index = rig.find_node(node).ok_or_else(|| Error::UnknownNode {
            name: node.to_string(),
        })?;
        let mut manipulator = Manipulator {
            name: name.to_string(),
            node: node_index,
            components,
            space,
            value: Transform::IDENTITY,
        };
        manipulator.value = manipulator.current(rig);

        let index = self.manipulators.len();
        self.manipulators.push(manipulator);
        self.by_name.insert(name.to_string(), index);
        Ok(index)
    }

    pub fn get(&self, name: &str) -> Option<&Manipulator> {
        self.by_name.get(name).map(|&i| &self.manipulators[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Manipulator> {
        self.by_name.get(name).map(|&i| &mut self.manipulators[i])
    }

    /// Returns `false` if there is no manipulator called `name`.
    pub fn set_value(&mut self, name: &str, value: Transform) -> bool {
        match self.get_mut(name) {
            Some(manipulator) => {
                manipulator.value = value.normalized();
                true
            }
            None => false,
        }
    }

    /// Identity for unknown names.
    pub fn value(&self, name: &str) -> Transform {
        self.get(name)
            .map(|m| m.value)
            .unwrap_or(Transform::IDENTITY)
    }

    pub fn apply(&self, rig: &mut Rig) {
        for manipulator in &self.manipulators {
            if manipulator.node < rig.len() {
                manipulator.apply(rig);
            }
        }
    }

    /// Refreshes every value from the evaluated rig.
    pub fn read_back(&mut self, rig: &Rig) {
        for manipulator in &mut self.manipulators {
            if manipulator.node < rig.len() {
                manipulator.value = manipulator.current(rig);
            }
        }
    }
}
