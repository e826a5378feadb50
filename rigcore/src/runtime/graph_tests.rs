use crate::{ConstraintData, ConstraintKind, Error, Rig, Transform};
use glam::Vec3;

fn translation(x: f32, y: f32, z: f32) -> Transform {
    Transform::from_translation(Vec3::new(x, y, z))
}

fn position_of(rig: &Rig, name: &str) -> usize {
    let index = rig.find_node(name).unwrap();
    rig.dependency_graph().position(index).unwrap()
}

/// Two chains where the first chain's tip is constrained to the second chain's tip, so the
/// constraint forces an order that node indices alone do not give.
fn crossed_chains() -> Rig {
    let mut rig = Rig::new();
    rig.add_node("a0", None, Transform::IDENTITY).unwrap();
    rig.add_node("a1", Some("a0"), translation(1.0, 0.0, 0.0)).unwrap();
    rig.add_node("a2", Some("a1"), translation(1.0, 0.0, 0.0)).unwrap();
    rig.add_node("b0", None, translation(0.0, 3.0, 0.0)).unwrap();
    rig.add_node("b1", Some("b0"), translation(1.0, 0.0, 0.0)).unwrap();
    rig.add_constraint(&ConstraintData::new("a1", "b1", ConstraintKind::PARENT, 1.0))
        .unwrap();
    rig
}

#[test]
fn every_node_sorts_after_its_parent_and_targets() {
    let mut rig = crossed_chains();
    rig.update_dependency_graph().unwrap();

    assert_eq!(rig.sorted_nodes().len(), rig.len());
    for (index, node) in rig.nodes().iter().enumerate() {
        let position = rig.dependency_graph().position(index).unwrap();
        if let Some(parent) = node.parent_index() {
            assert!(rig.dependency_graph().position(parent).unwrap() < position);
        }
        for constraint in node.constraints() {
            assert!(rig.dependency_graph().position(constraint.target_index()).unwrap() < position);
        }
    }
    assert!(position_of(&rig, "b1") < position_of(&rig, "a1"));
}

#[test]
fn dependents_are_transitive_and_in_topological_order() {
    let mut rig = crossed_chains();
    rig.update_dependency_graph().unwrap();

    let b0 = rig.find_node("b0").unwrap();
    let names: Vec<&str> = rig
        .dependency_graph()
        .dependents(b0)
        .iter()
        .map(|&i| rig.node_name(i).unwrap())
        .collect();
    assert_eq!(names, vec!["b1", "a1", "a2"]);

    for index in 0..rig.len() {
        let dependents = rig.dependency_graph().dependents(index);
        for pair in dependents.windows(2) {
            let graph = rig.dependency_graph();
            assert!(graph.position(pair[0]).unwrap() < graph.position(pair[1]).unwrap());
        }
        for &dependent in dependents {
            assert!(
                rig.dependency_graph().position(index).unwrap()
                    < rig.dependency_graph().position(dependent).unwrap()
            );
        }
    }
}

#[test]
fn independent_nodes_keep_insertion_order() {
    let mut rig = Rig::new();
    for name in ["c", "a", "b"] {
        rig.add_node(name, None, Transform::IDENTITY).unwrap();
    }
    rig.update_dependency_graph().unwrap();
    assert_eq!(rig.sorted_node_names(), vec!["c", "a", "b"]);
}

#[test]
fn structural_edits_mark_the_graph_dirty() {
    let mut rig = crossed_chains();
    rig.update_dependency_graph().unwrap();
    assert!(!rig.is_dependency_graph_dirty());

    rig.set_constraint_weight("a1", "b1", 0.25);
    assert!(!rig.is_dependency_graph_dirty());

    rig.remove_constraint("a1", "b1");
    assert!(rig.is_dependency_graph_dirty());
    rig.update_dependency_graph().unwrap();

    rig.add_node("extra", Some("a2"), Transform::IDENTITY).unwrap();
    assert!(rig.is_dependency_graph_dirty());
    rig.update_dependency_graph().unwrap();
    assert_eq!(rig.sorted_nodes().len(), 6);
}

#[test]
fn cycle_is_reported_and_previous_graph_kept() {
    let mut rig = crossed_chains();
    rig.update_dependency_graph().unwrap();
    let previous: Vec<usize> = rig.sorted_nodes().to_vec();

    // b0 <- a2 closes the loop b0 -> b1 -> a1 -> a2 -> b0.
    rig.add_constraint(&ConstraintData::new("b0", "a2", ConstraintKind::PARENT, 1.0))
        .unwrap();
    let result = rig.update_dependency_graph();

    let Err(Error::CycleDetected { nodes }) = &result else {
        panic!("expected a cycle, got {result:?}");
    };
    for name in ["b0", "b1", "a1", "a2"] {
        assert!(nodes.iter().any(|n| n == name), "{name} missing from {nodes:?}");
    }
    assert!(!nodes.iter().any(|n| n == "a0"));
    assert_eq!(rig.sorted_nodes(), previous.as_slice());
    assert!(!rig.is_dependency_graph_dirty());

    // Evaluation still runs with the stale order.
    rig.evaluate();
    assert!(rig.global_transform_by_name("a2").is_finite());
}

#[test]
fn empty_rig_has_empty_graph() {
    let mut rig = Rig::new();
    rig.update_dependency_graph().unwrap();
    assert!(rig.dependency_graph().is_empty());
    assert!(rig.dependency_graph().dependents(0).is_empty());
}
