use crate::{SplineIkSettings, Transform, TwoBoneIkSettings};
use glam::Vec3;

/// Constraints at or below this weight are inactive.
pub const WEIGHT_EPSILON: f32 = 1.0e-4;

#[derive(Clone, Debug)]
pub struct NodeData {
    pub name: String,
    /// `None` for a root node.
    pub parent: Option<String>,
    /// Local (parent-relative) transform.
    pub transform: Transform,
}

impl NodeData {
    pub fn new(name: impl Into<String>, parent: Option<&str>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_string),
            transform,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AxisFilter {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl Default for AxisFilter {
    fn default() -> Self {
        Self::ALL
    }
}

impl AxisFilter {
    pub const ALL: Self = Self {
        x: true,
        y: true,
        z: true,
    };
    pub const NONE: Self = Self {
        x: false,
        y: false,
        z: false,
    };

    pub fn any(self) -> bool {
        self.x || self.y || self.z
    }

    pub fn all(self) -> bool {
        self.x && self.y && self.z
    }

    pub(crate) fn mask(self) -> [bool; 3] {
        [self.x, self.y, self.z]
    }
}

/// Which components a component-wise transform constraint drives.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TransformFilter {
    pub translation: AxisFilter,
    pub rotation: AxisFilter,
    pub scale: AxisFilter,
}

impl Default for TransformFilter {
    fn default() -> Self {
        Self::ALL
    }
}

impl TransformFilter {
    pub const ALL: Self = Self {
        translation: AxisFilter::ALL,
        rotation: AxisFilter::ALL,
        scale: AxisFilter::ALL,
    };
    pub const TRANSLATION: Self = Self {
        translation: AxisFilter::ALL,
        rotation: AxisFilter::NONE,
        scale: AxisFilter::NONE,
    };
    pub const ROTATION: Self = Self {
        translation: AxisFilter::NONE,
        rotation: AxisFilter::ALL,
        scale: AxisFilter::NONE,
    };
    pub const SCALE: Self = Self {
        translation: AxisFilter::NONE,
        rotation: AxisFilter::NONE,
        scale: AxisFilter::ALL,
    };
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TransformOperator {
    /// Blend whole transforms, as if the target were an additional parent.
    Parent,
    Components(TransformFilter),
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ConstraintKind {
    Transform(TransformOperator),
    /// Rotates the constrained node so `aim_axis` points at the target. With an `up_axis`, the
    /// node's up axis is kept toward the target's up axis.
    Aim {
        aim_axis: Vec3,
        up_axis: Option<Vec3>,
    },
}

impl ConstraintKind {
    pub const PARENT: Self = Self::Transform(TransformOperator::Parent);

    pub fn components(filter: TransformFilter) -> Self {
        Self::Transform(TransformOperator::Components(filter))
    }

    pub fn is_parent(&self) -> bool {
        matches!(self, Self::Transform(TransformOperator::Parent))
    }

    pub fn translation_filter(&self) -> AxisFilter {
        match self {
            Self::Transform(TransformOperator::Parent) => AxisFilter::ALL,
            Self::Transform(TransformOperator::Components(f)) => f.translation,
            Self::Aim { .. } => AxisFilter::NONE,
        }
    }

    pub fn rotation_filter(&self) -> AxisFilter {
        match self {
            Self::Transform(TransformOperator::Parent) => AxisFilter::ALL,
            Self::Transform(TransformOperator::Components(f)) => f.rotation,
            Self::Aim { .. } => AxisFilter::ALL,
        }
    }

    pub fn scale_filter(&self) -> AxisFilter {
        match self {
            Self::Transform(TransformOperator::Parent) => AxisFilter::ALL,
            Self::Transform(TransformOperator::Components(f)) => f.scale,
            Self::Aim { .. } => AxisFilter::NONE,
        }
    }
}

/// "`source` is constrained toward `target`".
#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintData {
    pub source: String,
    pub target: String,
    pub weight: f32,
    pub kind: ConstraintKind,
    pub maintain_offset: bool,
}

impl ConstraintData {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        kind: ConstraintKind,
        weight: f32,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight,
            kind,
            maintain_offset: false,
        }
    }

    pub fn with_maintain_offset(mut self, maintain_offset: bool) -> Self {
        self.maintain_offset = maintain_offset;
        self
    }

    pub fn is_active(&self) -> bool {
        self.weight > WEIGHT_EPSILON
    }
}

/// Which chain drives a limb or spine's result chain.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum KinematicSpace {
    #[default]
    Fk,
    Ik,
    /// Blend FK and IK by the control's blend weight.
    Weighted,
}

#[derive(Clone, Debug)]
pub struct LimbData {
    pub name: String,
    /// Root, joint and end node names of each chain.
    pub fk_chain: [String; 3],
    pub ik_chain: [String; 3],
    pub result_chain: [String; 3],
    pub effector: String,
    pub joint_target: String,
    /// Local axis each chain bone points along toward its child.
    pub bone_axis: Vec3,
    pub blend: f32,
    pub space: KinematicSpace,
    pub settings: TwoBoneIkSettings,
}

#[derive(Clone, Debug)]
pub struct SpineData {
    pub name: String,
    pub fk_chain: Vec<String>,
    pub ik_chain: Vec<String>,
    pub result_chain: Vec<String>,
    /// Nodes the spline is built from, ordered from the spine root to its tip.
    pub control_points: Vec<String>,
    pub root_cluster: String,
    pub end_cluster: String,
    pub blend: f32,
    pub space: KinematicSpace,
    pub settings: SplineIkSettings,
}

#[derive(Clone, Debug, Default)]
pub struct RigData {
    pub nodes: Vec<NodeData>,
    pub constraints: Vec<ConstraintData>,
    pub limbs: Vec<LimbData>,
    pub spines: Vec<SpineData>,
}

impl RigData {
    pub fn node(&self, name: &str) -> Option<&NodeData> {
        self.nodes.iter().find(|n| n.name == name)
    }
}
