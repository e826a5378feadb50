use glam::Vec3;
use rigcore::{ControlRig, RigData, Transform};
use serde_json::json;
use std::path::PathBuf;

fn transform_json(transform: &Transform) -> serde_json::Value {
    json!({
        "translation": transform.translation.to_array(),
        "rotation": transform.rotation.to_array(),
        "scale": transform.scale.to_array(),
    })
}

fn main() {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut positional = Vec::<String>::new();
    let mut moves = Vec::<(String, Vec3)>::new();
    let mut switch_to_ik = false;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--move" => {
                // --move <node> <x> <y> <z>
                let name = args.get(i + 1).cloned().unwrap_or_default();
                let coords: Vec<f32> = (2..5)
                    .map(|k| {
                        args.get(i + k)
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(0.0)
                    })
                    .collect();
                moves.push((name, Vec3::new(coords[0], coords[1], coords[2])));
                i += 5;
            }
            "--ik" => {
                switch_to_ik = true;
                i += 1;
            }
            other => {
                positional.push(other.to_string());
                i += 1;
            }
        }
    }

    let json_path = positional
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./assets/arm.json"));

    let input = std::fs::read_to_string(&json_path).expect("read json");
    let data = RigData::from_json_str(&input).expect("parse json");
    let mut control_rig = ControlRig::from_data(&data).expect("build rig");

    control_rig.evaluate();
    if switch_to_ik {
        let names: Vec<String> = control_rig
            .limbs
            .iter()
            .map(|l| l.name().to_string())
            .collect();
        for name in names {
            control_rig.switch_limb_to_ik(&name);
        }
    }

    for (name, position) in &moves {
        let current = control_rig.rig.global_transform_by_name(name);
        control_rig.rig.set_global_transform_by_name(
            name,
            Transform::new(*position, current.rotation, current.scale),
        );
    }
    control_rig.evaluate();

    let rig = &control_rig.rig;
    let limbs: Vec<_> = control_rig
        .limbs
        .iter()
        .map(|limb| {
            let chain = |indices: [usize; 3]| -> Vec<serde_json::Value> {
                indices
                    .iter()
                    .map(|&i| {
                        json!({
                            "name": rig.node_name(i).unwrap_or("<unknown>"),
                            "global": transform_json(&rig.global_transform(i)),
                        })
                    })
                    .collect()
            };
            json!({
                "name": limb.name(),
                "space": format!("{:?}", limb.space),
                "ikWeight": limb.ik_weight(),
                "upperLength": limb.upper_length(),
                "lowerLength": limb.lower_length(),
                "fk": chain(limb.fk_chain()),
                "ik": chain(limb.ik_chain()),
                "result": chain(limb.result_chain()),
            })
        })
        .collect();

    let spines: Vec<_> = control_rig
        .spines
        .iter()
        .map(|spine| {
            let result: Vec<_> = spine
                .result_chain()
                .iter()
                .map(|&i| {
                    json!({
                        "name": rig.node_name(i).unwrap_or("<unknown>"),
                        "global": transform_json(&rig.global_transform(i)),
                    })
                })
                .collect();
            json!({
                "name": spine.name(),
                "space": format!("{:?}", spine.space),
                "splineLength": spine.spline(rig).length(),
                "result": result,
            })
        })
        .collect();

    let nodes: Vec<_> = rig
        .nodes()
        .iter()
        .enumerate()
        .map(|(i, node)| {
            json!({
                "i": i,
                "name": node.name(),
                "parent": node.parent_index().and_then(|p| rig.node_name(p)),
                "global": transform_json(&node.global()),
            })
        })
        .collect();

    let out = json!({
        "input": json_path.display().to_string(),
        "nodes": nodes,
        "limbs": limbs,
        "spines": spines,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&out).expect("serialize json")
    );
}
