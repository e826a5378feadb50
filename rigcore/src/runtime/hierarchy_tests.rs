use crate::{ConstraintData, ConstraintKind, Error, NodeData, Rig, RigData, Transform, UserData};
use glam::{Quat, Vec3};

fn assert_vec3_approx(actual: Vec3, expected: Vec3) {
    assert!(
        actual.abs_diff_eq(expected, 1.0e-4),
        "expected {expected:?}, got {actual:?}"
    );
}

fn assert_transform_approx(actual: Transform, expected: Transform) {
    assert!(
        actual.approx_eq(&expected, 1.0e-4),
        "expected {expected:?}, got {actual:?}"
    );
}

fn translation(x: f32, y: f32, z: f32) -> Transform {
    Transform::from_translation(Vec3::new(x, y, z))
}

fn root_a_b() -> Rig {
    let mut rig = Rig::new();
    rig.add_node("root", None, Transform::IDENTITY).unwrap();
    rig.add_node("A", Some("root"), translation(1.0, 0.0, 0.0)).unwrap();
    rig.add_node("B", Some("A"), translation(1.0, 0.0, 0.0)).unwrap();
    rig
}

#[test]
fn child_global_composes_parent_chain() {
    let rig = root_a_b();
    assert_vec3_approx(rig.global_transform_by_name("B").translation, Vec3::new(2.0, 0.0, 0.0));
    assert_eq!(rig.find_node("B"), Some(2));
    assert_eq!(rig.parent_name(2), Some("A"));
    assert_eq!(rig.children(0), vec![1]);
}

#[test]
fn set_parent_keeps_global_and_recomputes_local() {
    let mut rig = root_a_b();
    rig.set_parent("B", Some("root")).unwrap();

    assert_vec3_approx(rig.global_transform_by_name("B").translation, Vec3::new(2.0, 0.0, 0.0));
    assert_vec3_approx(rig.local_transform_by_name("B").translation, Vec3::new(2.0, 0.0, 0.0));
    assert_eq!(rig.parent_name(2), Some("root"));
    assert!(rig.is_dependency_graph_dirty());
}

#[test]
fn set_parent_rejects_descendants_and_self() {
    let mut rig = root_a_b();
    assert!(matches!(
        rig.set_parent("A", Some("B")),
        Err(Error::ParentCycle { .. })
    ));
    assert!(matches!(
        rig.set_parent("A", Some("A")),
        Err(Error::ParentCycle { .. })
    ));
    assert!(matches!(
        rig.set_parent("A", Some("missing")),
        Err(Error::UnknownParent { .. })
    ));
    assert_eq!(rig.parent_name(1), Some("root"));
}

#[test]
fn set_parent_to_none_makes_a_root() {
    let mut rig = root_a_b();
    rig.set_parent("B", None).unwrap();
    assert_eq!(rig.node(2).unwrap().parent_index(), None);
    assert_transform_approx(rig.local_transform(2), rig.global_transform(2));
}

#[test]
fn duplicate_name_and_unknown_parent_fail_without_mutation() {
    let mut rig = root_a_b();
    assert!(matches!(
        rig.add_node("A", None, Transform::IDENTITY),
        Err(Error::DuplicateNode { .. })
    ));
    assert!(matches!(
        rig.add_node("C", Some("nope"), Transform::IDENTITY),
        Err(Error::UnknownParent { .. })
    ));
    assert_eq!(rig.len(), 3);
    assert_eq!(rig.find_node("C"), None);
}

#[test]
fn rename_updates_lookups_and_keeps_links() {
    let mut rig = root_a_b();
    rig.add_node("T", None, translation(5.0, 0.0, 0.0)).unwrap();
    rig.add_constraint(&ConstraintData::new("B", "A", ConstraintKind::PARENT, 0.5))
        .unwrap();

    rig.rename_node("A", "upper").unwrap();

    assert_eq!(rig.find_node("A"), None);
    assert_eq!(rig.find_node("upper"), Some(1));
    assert_eq!(rig.parent_name(2), Some("upper"));
    let data = rig.constraint_data(2);
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].target, "upper");
    assert_eq!(data[0].source, "B");
}

#[test]
fn rename_onto_existing_name_fails() {
    let mut rig = root_a_b();
    assert!(matches!(
        rig.rename_node("A", "B"),
        Err(Error::DuplicateNode { .. })
    ));
    assert!(matches!(
        rig.rename_node("missing", "Z"),
        Err(Error::UnknownNode { .. })
    ));
    assert_eq!(rig.find_node("A"), Some(1));
    assert_eq!(rig.find_node("B"), Some(2));
}

#[test]
fn remove_reparents_children_preserving_global() {
    let mut rig = Rig::new();
    rig.add_node("root", None, translation(0.0, 1.0, 0.0)).unwrap();
    rig.add_node(
        "A",
        Some("root"),
        Transform::new(
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::splat(2.0),
        ),
    )
    .unwrap();
    rig.add_node("B", Some("A"), translation(1.0, 0.0, 0.0)).unwrap();
    let before = rig.global_transform_by_name("B");

    assert!(rig.remove_node("A"));

    assert_eq!(rig.len(), 2);
    assert_eq!(rig.find_node("B"), Some(1));
    assert_eq!(rig.parent_name(1), Some("root"));
    assert_transform_approx(rig.global_transform_by_name("B"), before);
    assert!(!rig.remove_node("A"));
}

#[test]
fn remove_drops_constraints_targeting_the_node_and_shifts_indices() {
    let mut rig = root_a_b();
    rig.add_node("T", None, translation(5.0, 0.0, 0.0)).unwrap();
    rig.add_node("U", None, translation(0.0, 5.0, 0.0)).unwrap();
    rig.add_constraint(&ConstraintData::new("B", "T", ConstraintKind::PARENT, 1.0))
        .unwrap();
    rig.add_constraint(&ConstraintData::new("B", "U", ConstraintKind::PARENT, 1.0))
        .unwrap();

    assert!(rig.remove_node("T"));

    let constraints = rig.constraints(2);
    assert_eq!(constraints.len(), 1);
    assert_eq!(constraints[0].target_index(), rig.find_node("U").unwrap());
}

#[test]
fn local_and_global_round_trip() {
    let mut rig = root_a_b();
    let t = Transform::new(
        Vec3::new(0.5, -2.0, 3.0),
        Quat::from_euler(glam::EulerRot::XYZ, 0.3, -0.7, 1.1),
        Vec3::ONE,
    );
    for index in 0..rig.len() {
        rig.set_local_transform(index, t);
        assert_transform_approx(rig.local_transform(index), t);
        rig.set_global_transform(index, t);
        assert_transform_approx(rig.global_transform(index), t);
    }
    // Root: local == global.
    assert_transform_approx(rig.local_transform(0), rig.global_transform(0));
}

#[test]
fn writes_normalize_rotation() {
    let mut rig = root_a_b();
    rig.set_local_transform(1, Transform::from_rotation(Quat::from_xyzw(0.0, 0.0, 0.0, 3.0)));
    let rotation = rig.local_transform(1).rotation;
    assert!((rotation.length() - 1.0).abs() < 1.0e-5);
}

#[test]
fn unknown_lookups_degrade_to_identity_and_no_ops() {
    let mut rig = root_a_b();
    assert_eq!(rig.global_transform(99), Transform::IDENTITY);
    assert_eq!(rig.local_transform_by_name("missing"), Transform::IDENTITY);
    assert_eq!(rig.global_transform_by_name("missing"), Transform::IDENTITY);

    let before: Vec<Transform> = rig.nodes().iter().map(|n| n.global()).collect();
    rig.set_global_transform(99, translation(1.0, 1.0, 1.0));
    rig.set_local_transform_by_name("missing", translation(1.0, 1.0, 1.0));
    let after: Vec<Transform> = rig.nodes().iter().map(|n| n.global()).collect();
    assert_eq!(before, after);
}

#[test]
fn chain_between_walks_parent_links() {
    let rig = root_a_b();
    assert_eq!(rig.chain_between("root", "B"), Some(vec![0, 1, 2]));
    assert_eq!(rig.chain_between("A", "A"), Some(vec![1]));
    assert_eq!(rig.chain_between("B", "root"), None);
    assert_eq!(rig.chain_between("root", "missing"), None);
}

#[test]
fn user_data_downcasts_to_its_type() {
    let mut rig = root_a_b();
    rig.set_user_data(1, Some(UserData::new(42u32)));
    assert_eq!(rig.user_data::<u32>(1), Some(&42));
    assert_eq!(rig.user_data::<String>(1), None);
    assert_eq!(rig.user_data::<u32>(0), None);
}

#[test]
fn from_data_builds_and_evaluates() {
    let data = RigData {
        nodes: vec![
            NodeData::new("root", None, Transform::IDENTITY),
            NodeData::new("A", Some("root"), translation(1.0, 0.0, 0.0)),
            NodeData::new("T", None, translation(0.0, 4.0, 0.0)),
        ],
        constraints: vec![ConstraintData::new(
            "A",
            "T",
            ConstraintKind::components(crate::TransformFilter::TRANSLATION),
            1.0,
        )],
        ..RigData::default()
    };
    let rig = Rig::from_data(&data).unwrap();

    assert_eq!(rig.len(), 3);
    assert!(!rig.is_dependency_graph_dirty());
    assert_vec3_approx(rig.global_transform_by_name("A").translation, Vec3::new(0.0, 4.0, 0.0));
    // The authored local stays unconstrained.
    assert_vec3_approx(rig.local_transform_by_name("A").translation, Vec3::new(1.0, 0.0, 0.0));
}

#[test]
fn from_data_reports_unknown_parent() {
    let data = RigData {
        nodes: vec![NodeData::new("A", Some("ghost"), Transform::IDENTITY)],
        ..RigData::default()
    };
    assert!(matches!(
        Rig::from_data(&data),
        Err(Error::UnknownParent { .. })
    ));
}
