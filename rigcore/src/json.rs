use crate::{
    AxisFilter, ConstraintData, ConstraintKind, Error, KinematicSpace, LimbData, NodeData,
    RigData, SpineData, SplineIkSettings, Transform, TransformFilter, TwoBoneIkSettings,
};
use glam::{Quat, Vec3};
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
struct Root {
    #[serde(default)]
    nodes: Vec<NodeDef>,
    #[serde(default)]
    constraints: Vec<ConstraintDef>,
    #[serde(default)]
    limbs: Vec<LimbDef>,
    #[serde(default)]
    spines: Vec<SpineDef>,
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn default_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn default_weight() -> f32 {
    1.0
}

fn default_axis() -> [f32; 3] {
    [1.0, 0.0, 0.0]
}

#[derive(Debug, Deserialize)]
struct NodeDef {
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    translation: [f32; 3],
    /// `[x, y, z, w]`.
    #[serde(default = "default_rotation")]
    rotation: [f32; 4],
    #[serde(default = "default_scale")]
    scale: [f32; 3],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConstraintDef {
    source: String,
    target: String,
    #[serde(default = "default_weight")]
    weight: f32,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    translation: Option<String>,
    #[serde(default)]
    rotation: Option<String>,
    #[serde(default)]
    scale: Option<String>,
    #[serde(default = "default_axis")]
    aim_axis: [f32; 3],
    #[serde(default)]
    up_axis: Option<[f32; 3]>,
    #[serde(default)]
    maintain_offset: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LimbDef {
    name: String,
    fk: [String; 3],
    ik: [String; 3],
    result: [String; 3],
    effector: String,
    joint_target: String,
    #[serde(default = "default_axis")]
    bone_axis: [f32; 3],
    #[serde(default)]
    blend: f32,
    #[serde(default)]
    space: Option<String>,
    #[serde(default)]
    allow_stretch: bool,
    #[serde(default)]
    start_stretch_ratio: Option<f32>,
    #[serde(default)]
    max_stretch_scale: Option<f32>,
    #[serde(default)]
    twist_axis: Option<[f32; 3]>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpineDef {
    name: String,
    fk: Vec<String>,
    ik: Vec<String>,
    result: Vec<String>,
    control_points: Vec<String>,
    root_cluster: String,
    end_cluster: String,
    #[serde(default)]
    blend: f32,
    #[serde(default)]
    space: Option<String>,
    #[serde(default = "default_axis")]
    bone_axis: [f32; 3],
    #[serde(default)]
    roll: f32,
    #[serde(default)]
    twist_start: f32,
    #[serde(default)]
    twist_end: f32,
    #[serde(default)]
    stretch: Option<f32>,
    #[serde(default)]
    offset: f32,
}

impl RigData {
    /// Parses a rig description. Parents must be listed before their children; constraint
    /// endpoints may appear anywhere in `nodes`.
    pub fn from_json_str(input: &str) -> Result<Self, Error> {
        let root: Root = serde_json::from_str(input).map_err(|e| Error::JsonParse {
            message: e.to_string(),
        })?;

        let mut seen = HashSet::<String>::new();
        let mut nodes = Vec::with_capacity(root.nodes.len());
        for node in root.nodes {
            let parent = match node.parent.as_deref() {
                None | Some("none") | Some("") => None,
                Some(parent_name) => {
                    if !seen.contains(parent_name) {
                        return Err(Error::JsonUnknownParent {
                            node: node.name.clone(),
                            parent: parent_name.to_string(),
                        });
                    }
                    Some(parent_name.to_string())
                }
            };
            if !seen.insert(node.name.clone()) {
                return Err(Error::DuplicateNode { name: node.name });
            }
            let [x, y, z, w] = node.rotation;
            nodes.push(NodeData {
                name: node.name,
                parent,
                transform: Transform::new(
                    Vec3::from_array(node.translation),
                    Quat::from_xyzw(x, y, z, w),
                    Vec3::from_array(node.scale),
                )
                .normalized(),
            });
        }

        let mut constraints = Vec::with_capacity(root.constraints.len());
        for constraint in root.constraints {
            for endpoint in [&constraint.source, &constraint.target] {
                if !seen.contains(endpoint.as_str()) {
                    return Err(Error::JsonUnknownConstraintNode {
                        constraint: constraint.source.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
            let kind = parse_constraint_kind(&constraint)?;
            constraints.push(
                ConstraintData::new(constraint.source, constraint.target, kind, constraint.weight)
                    .with_maintain_offset(constraint.maintain_offset),
            );
        }

        let mut limbs = Vec::with_capacity(root.limbs.len());
        for limb in root.limbs {
            let defaults = TwoBoneIkSettings::default();
            limbs.push(LimbData {
                space: parse_space(limb.space.as_deref())?,
                bone_axis: Vec3::from_array(limb.bone_axis),
                blend: limb.blend,
                settings: TwoBoneIkSettings {
                    allow_stretch: limb.allow_stretch,
                    start_stretch_ratio: limb
                        .start_stretch_ratio
                        .unwrap_or(defaults.start_stretch_ratio),
                    max_stretch_scale: limb.max_stretch_scale.unwrap_or(defaults.max_stretch_scale),
                    twist_axis: limb.twist_axis.map(Vec3::from_array),
                },
                name: limb.name,
                fk_chain: limb.fk,
                ik_chain: limb.ik,
                result_chain: limb.result,
                effector: limb.effector,
                joint_target: limb.joint_target,
            });
        }

        let mut spines = Vec::with_capacity(root.spines.len());
        for spine in root.spines {
            let defaults = SplineIkSettings::default();
            spines.push(SpineData {
                space: parse_space(spine.space.as_deref())?,
                blend: spine.blend,
                settings: SplineIkSettings {
                    bone_axis: Vec3::from_array(spine.bone_axis),
                    roll: spine.roll,
                    twist_start: spine.twist_start,
                    twist_end: spine.twist_end,
                    stretch: spine.stretch.unwrap_or(defaults.stretch),
                    offset: spine.offset,
                    approximation_density: defaults.approximation_density,
                },
                name: spine.name,
                fk_chain: spine.fk,
                ik_chain: spine.ik,
                result_chain: spine.result,
                control_points: spine.control_points,
                root_cluster: spine.root_cluster,
                end_cluster: spine.end_cluster,
            });
        }

        Ok(Self {
            nodes,
            constraints,
            limbs,
            spines,
        })
    }
}

fn parse_constraint_kind(def: &ConstraintDef) -> Result<ConstraintKind, Error> {
    match def.kind.as_deref().unwrap_or("parent") {
        "parent" => Ok(ConstraintKind::PARENT),
        "transform" => {
            // Components left out are not driven; a constraint naming none drives everything.
            let names_none =
                def.translation.is_none() && def.rotation.is_none() && def.scale.is_none();
            let filter = if names_none {
                TransformFilter::ALL
            } else {
                TransformFilter {
                    translation: parse_axes(def.translation.as_deref())?,
                    rotation: parse_axes(def.rotation.as_deref())?,
                    scale: parse_axes(def.scale.as_deref())?,
                }
            };
            Ok(ConstraintKind::components(filter))
        }
        "aim" => Ok(ConstraintKind::Aim {
            aim_axis: Vec3::from_array(def.aim_axis),
            up_axis: def.up_axis.map(Vec3::from_array),
        }),
        other => Err(Error::InvalidValue {
            message: format!(
                "unknown constraint type '{other}' on '{}' (expected parent, transform or aim)",
                def.source
            ),
        }),
    }
}

/// "xyz", "xz", "" and so on.
fn parse_axes(raw: Option<&str>) -> Result<AxisFilter, Error> {
    let mut filter = AxisFilter::NONE;
    for c in raw.unwrap_or("").chars() {
        match c.to_ascii_lowercase() {
            'x' => filter.x = true,
            'y' => filter.y = true,
            'z' => filter.z = true,
            _ => {
                return Err(Error::InvalidValue {
                    message: format!("unknown axis '{c}' in filter"),
                });
            }
        }
    }
    Ok(filter)
}

fn parse_space(raw: Option<&str>) -> Result<KinematicSpace, Error> {
    match raw.unwrap_or("fk") {
        "fk" => Ok(KinematicSpace::Fk),
        "ik" => Ok(KinematicSpace::Ik),
        "weighted" => Ok(KinematicSpace::Weighted),
        other => Err(Error::InvalidValue {
            message: format!("unknown kinematic space '{other}'"),
        }),
    }
}
