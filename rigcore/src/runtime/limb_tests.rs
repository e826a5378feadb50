use crate::{
    ControlRig, Error, KinematicSpace, LimbControl, LimbData, NodeData, Rig, RigData, Transform,
    TwoBoneIkSettings,
};
use glam::{Quat, Vec3};

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-3,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

fn assert_vec3_approx(actual: Vec3, expected: Vec3) {
    assert!(
        actual.abs_diff_eq(expected, 1.0e-3),
        "expected {expected:?}, got {actual:?}"
    );
}

fn translation(x: f32, y: f32, z: f32) -> Transform {
    Transform::from_translation(Vec3::new(x, y, z))
}

fn chain_nodes(prefix: &str) -> Vec<NodeData> {
    vec![
        NodeData::new(format!("{prefix}_upper"), Some("root"), Transform::IDENTITY),
        NodeData::new(
            format!("{prefix}_lower"),
            Some(format!("{prefix}_upper").as_str()),
            translation(1.0, 0.0, 0.0),
        ),
        NodeData::new(
            format!("{prefix}_end"),
            Some(format!("{prefix}_lower").as_str()),
            translation(1.0, 0.0, 0.0),
        ),
    ]
}

fn chain_names(prefix: &str) -> [String; 3] {
    [
        format!("{prefix}_upper"),
        format!("{prefix}_lower"),
        format!("{prefix}_end"),
    ]
}

fn arm_data(space: KinematicSpace) -> LimbData {
    LimbData {
        name: "arm".to_string(),
        fk_chain: chain_names("fk"),
        ik_chain: chain_names("ik"),
        result_chain: chain_names("result"),
        effector: "effector".to_string(),
        joint_target: "pole".to_string(),
        bone_axis: Vec3::X,
        blend: 0.0,
        space,
        settings: TwoBoneIkSettings::default(),
    }
}

/// A straight two-segment arm along +X with its pole above the elbow.
fn arm(space: KinematicSpace) -> ControlRig {
    let mut nodes = vec![NodeData::new("root", None, Transform::IDENTITY)];
    nodes.extend(chain_nodes("fk"));
    nodes.extend(chain_nodes("ik"));
    nodes.extend(chain_nodes("result"));
    nodes.push(NodeData::new("effector", Some("root"), translation(2.0, 0.0, 0.0)));
    nodes.push(NodeData::new("pole", Some("root"), translation(1.0, 1.0, 0.0)));
    let data = RigData {
        nodes,
        limbs: vec![arm_data(space)],
        ..RigData::default()
    };
    ControlRig::from_data(&data).unwrap()
}

fn global(control_rig: &ControlRig, name: &str) -> Transform {
    control_rig.rig.global_transform_by_name(name)
}

#[test]
fn binding_caches_segment_lengths() {
    let control_rig = arm(KinematicSpace::Ik);
    let limb = control_rig.limb("arm").unwrap();
    assert_approx(limb.upper_length(), 1.0);
    assert_approx(limb.lower_length(), 1.0);
    assert_eq!(limb.ik_weight(), 1.0);
}

#[test]
fn ik_reaches_the_effector_and_faces_the_pole() {
    let mut control_rig = arm(KinematicSpace::Ik);
    control_rig
        .rig
        .set_global_transform_by_name("effector", translation(1.2, 0.8, 0.0));
    control_rig.evaluate();

    let upper = global(&control_rig, "ik_upper");
    let lower = global(&control_rig, "ik_lower");
    let end = global(&control_rig, "ik_end");
    assert_vec3_approx(end.translation, Vec3::new(1.2, 0.8, 0.0));
    assert_approx(upper.translation.distance(lower.translation), 1.0);
    assert_approx(lower.translation.distance(end.translation), 1.0);

    assert_vec3_approx(
        upper.rotation * Vec3::X,
        (lower.translation - upper.translation).normalize(),
    );
    assert_vec3_approx(
        lower.rotation * Vec3::X,
        (end.translation - lower.translation).normalize(),
    );

    // The elbow sits on the pole's side of the reach line.
    let reach = end.translation - upper.translation;
    let pole = global(&control_rig, "pole").translation;
    assert!(reach.cross(lower.translation).z * reach.cross(pole).z > 0.0);

    for name in ["upper", "lower", "end"] {
        let ik = global(&control_rig, &format!("ik_{name}"));
        let result = global(&control_rig, &format!("result_{name}"));
        assert!(ik.approx_eq(&result, 1.0e-4), "{name}: {ik:?} != {result:?}");
    }
}

#[test]
fn end_bone_follows_effector_rotation() {
    let mut control_rig = arm(KinematicSpace::Ik);
    let turn = Quat::from_rotation_x(0.7);
    control_rig.rig.set_global_transform_by_name(
        "effector",
        Transform::new(Vec3::new(1.5, 0.5, 0.0), turn, Vec3::ONE),
    );
    control_rig.evaluate();

    let end = global(&control_rig, "ik_end");
    assert_vec3_approx(end.rotation * Vec3::Y, turn * Vec3::Y);
}

#[test]
fn fk_space_copies_the_fk_chain() {
    let mut control_rig = arm(KinematicSpace::Fk);
    control_rig.rig.set_local_transform_by_name(
        "fk_upper",
        Transform::from_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2)),
    );
    control_rig
        .rig
        .set_global_transform_by_name("effector", translation(0.0, -5.0, 0.0));
    control_rig.evaluate();

    assert_vec3_approx(global(&control_rig, "result_lower").translation, Vec3::new(0.0, 1.0, 0.0));
    assert_vec3_approx(global(&control_rig, "result_end").translation, Vec3::new(0.0, 2.0, 0.0));
}

#[test]
fn weighted_space_blends_fk_and_ik() {
    let mut control_rig = arm(KinematicSpace::Weighted);
    control_rig.limb_mut("arm").unwrap().blend = 0.5;
    control_rig
        .rig
        .set_global_transform_by_name("effector", translation(0.0, 2.0, 0.0));
    control_rig.evaluate();

    assert_vec3_approx(global(&control_rig, "ik_end").translation, Vec3::new(0.0, 2.0, 0.0));
    assert_vec3_approx(global(&control_rig, "result_lower").translation, Vec3::new(0.5, 0.5, 0.0));
    assert_vec3_approx(global(&control_rig, "result_end").translation, Vec3::new(1.0, 1.0, 0.0));
}

#[test]
fn switching_fk_to_ik_does_not_pop() {
    let mut control_rig = arm(KinematicSpace::Fk);
    let before = pose_fk_and_switch_to_ik(
        &mut control_rig,
        Quat::from_rotation_z(0.5),
        Quat::from_rotation_z(-0.8),
    );
    assert_eq!(control_rig.limb("arm").unwrap().space, KinematicSpace::Ik);
    assert_result_pose(&control_rig, &before);
    assert_vec3_approx(global(&control_rig, "effector").translation, before[2].translation);
}

#[test]
fn switching_fk_to_ik_out_of_the_bind_plane_does_not_roll() {
    let mut control_rig = arm(KinematicSpace::Fk);
    let before = pose_fk_and_switch_to_ik(
        &mut control_rig,
        Quat::from_rotation_y(-0.5),
        Quat::from_rotation_y(0.8),
    );
    assert_result_pose(&control_rig, &before);

    // Moving the effector afterwards keeps bending in the new plane.
    let end = before[2].translation;
    control_rig
        .rig
        .set_global_transform_by_name("effector", translation(end.x - 0.1, end.y, end.z));
    control_rig.evaluate();
    let upper = global(&control_rig, "result_upper");
    let lower = global(&control_rig, "result_lower").translation;
    assert_approx(lower.y, 0.0);
    assert_vec3_approx(upper.rotation * Vec3::X, lower.normalize());
}

const RESULT_CHAIN: [&str; 3] = ["result_upper", "result_lower", "result_end"];

/// Poses the FK chain, evaluates, switches to IK and evaluates again. Returns the result pose
/// from before the switch.
fn pose_fk_and_switch_to_ik(
    control_rig: &mut ControlRig,
    upper: Quat,
    lower: Quat,
) -> Vec<Transform> {
    control_rig
        .rig
        .set_local_transform_by_name("fk_upper", Transform::from_rotation(upper));
    control_rig.rig.set_local_transform_by_name(
        "fk_lower",
        Transform::new(Vec3::new(1.0, 0.0, 0.0), lower, Vec3::ONE),
    );
    control_rig.evaluate();
    let before = RESULT_CHAIN.iter().map(|n| global(control_rig, n)).collect();

    assert!(control_rig.switch_limb_to_ik("arm"));
    control_rig.evaluate();
    before
}

fn assert_result_pose(control_rig: &ControlRig, expected: &[Transform]) {
    for (name, expected) in RESULT_CHAIN.iter().zip(expected) {
        let actual = global(control_rig, name);
        assert!(actual.approx_eq(expected, 1.0e-3), "{name}: {actual:?} != {expected:?}");
    }
}

#[test]
fn switching_ik_to_fk_does_not_pop() {
    let mut control_rig = arm(KinematicSpace::Ik);
    control_rig
        .rig
        .set_global_transform_by_name("effector", translation(1.0, 1.2, 0.3));
    control_rig.evaluate();
    let before: Vec<Transform> = ["result_upper", "result_lower", "result_end"]
        .iter()
        .map(|n| global(&control_rig, n))
        .collect();

    assert!(control_rig.switch_limb_to_fk("arm"));
    control_rig.evaluate();

    for (name, expected) in ["result_upper", "result_lower", "result_end"].iter().zip(&before) {
        let actual = global(&control_rig, name);
        assert!(actual.approx_eq(expected, 1.0e-3), "{name}: {actual:?} != {expected:?}");
    }
    assert!(!control_rig.switch_limb_to_fk("leg"));
}

#[test]
fn binding_rejects_unknown_nodes_and_zero_length_segments() {
    let control_rig = arm(KinematicSpace::Ik);
    let mut data = arm_data(KinematicSpace::Ik);
    data.effector = "ghost".to_string();
    assert!(matches!(
        LimbControl::new(&control_rig.rig, &data),
        Err(Error::UnknownNode { .. })
    ));

    let mut rig = Rig::new();
    rig.add_node("root", None, Transform::IDENTITY).unwrap();
    for prefix in ["fk", "ik", "result"] {
        for name in chain_names(prefix) {
            rig.add_node(&name, Some("root"), Transform::IDENTITY).unwrap();
        }
    }
    rig.add_node("effector", None, Transform::IDENTITY).unwrap();
    rig.add_node("pole", None, Transform::IDENTITY).unwrap();
    assert!(matches!(
        LimbControl::new(&rig, &arm_data(KinematicSpace::Ik)),
        Err(Error::InvalidChain { .. })
    ));
}

#[test]
fn removed_nodes_make_evaluation_a_no_op() {
    let mut control_rig = arm(KinematicSpace::Ik);
    let limb = control_rig.limbs[0].clone();
    let mut rig = Rig::new();
    rig.add_node("only", None, Transform::IDENTITY).unwrap();
    limb.evaluate(&mut rig);
    assert_eq!(rig.global_transform(0), Transform::IDENTITY);

    control_rig.evaluate();
    assert!(global(&control_rig, "result_end").is_finite());
}
