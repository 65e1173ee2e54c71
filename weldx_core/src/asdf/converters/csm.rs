// weldx_core/src/asdf/converters/csm.rs

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use crate::annotations::{Annotated, Annotations};
use crate::asdf::tree::{as_mapping, as_seq, from_record, nested, take, take_opt, take_string, to_record};
use crate::asdf::{from_tagged, to_tagged, TreeConverter};
use crate::error::{Result, WeldxError};
use crate::time::ReferenceTime;
use crate::transformations::csm::CoordinateSystemManager;
use crate::transformations::lcs::LocalCoordinateSystem;
use crate::transformations::subsystems::Subsystem;

/// Plain fields of a `coordinate_systems` entry; `transformation` is a tagged
/// child and handled next to it.
#[derive(Serialize, Deserialize)]
struct EdgeRecord {
    name: String,
    parent_system: String,
}

/// Plain fields of a `subsystems` entry. `reference_time` and annotations are
/// handled next to it.
#[derive(Serialize, Deserialize)]
struct SubsystemRecord {
    name: String,
    parent_system: String,
    root_cs: String,
    members: Vec<String>,
    #[serde(default)]
    subsystem_names: Vec<String>,
}

/// One `coordinate_systems` record after parsing.
struct PendingEdge {
    name: String,
    parent: String,
    lcs: LocalCoordinateSystem,
}

impl TreeConverter for CoordinateSystemManager {
    const NAME: &'static str = "core/transformations/coordinate_system_hierarchy";
    const VERSION: &'static str = "0.1.0";

    fn to_tree(&self) -> Result<Mapping> {
        let mut tree = Mapping::new();
        tree.insert("name".into(), self.name().into());
        tree.insert("root_system_name".into(), self.root_name().into());
        if let Some(rt) = self.reference_time() {
            tree.insert("reference_time".into(), to_tagged(&rt)?);
        }

        let records = self
            .edges()
            .into_iter()
            .map(|(name, parent, lcs)| {
                let mut record = to_record(&EdgeRecord {
                    name: name.to_string(),
                    parent_system: parent.to_string(),
                })?;
                record.insert("transformation".into(), to_tagged(lcs)?);
                Ok(Value::Mapping(record))
            })
            .collect::<Result<Vec<_>>>()?;
        tree.insert("coordinate_systems".into(), Value::Sequence(records));

        if !self.subsystems().is_empty() {
            let subsystems = self
                .subsystems()
                .iter()
                .map(subsystem_to_tree)
                .collect::<Result<Vec<_>>>()?;
            tree.insert("subsystems".into(), Value::Sequence(subsystems));
        }
        Ok(tree)
    }

    /// Edges may appear in any order; records whose parent is not known yet
    /// are retried until a full pass adds nothing.
    fn from_tree(mut tree: Mapping) -> Result<Self> {
        let name = take_string(&mut tree, "name")?;
        let root = take_string(&mut tree, "root_system_name")?;
        let mut csm = CoordinateSystemManager::with_name(name, root);
        if let Some(rt) = take_opt(&mut tree, "reference_time") {
            let rt: ReferenceTime = nested("reference_time", from_tagged(rt))?;
            csm = csm.with_reference_time(rt);
        }

        let mut pending = as_seq(take(&mut tree, "coordinate_systems")?, "coordinate_systems")?
            .into_iter()
            .enumerate()
            .map(|(i, v)| nested(&format!("coordinate_systems/{i}"), edge_from_tree(v)))
            .collect::<Result<Vec<_>>>()?;

        let mut passes = 0;
        while !pending.is_empty() {
            passes += 1;
            let before = pending.len();
            let mut deferred = Vec::new();
            for edge in pending {
                if csm.has_node(&edge.parent) {
                    csm.add_cs(&edge.name, &edge.parent, edge.lcs)?;
                } else {
                    deferred.push(edge);
                }
            }
            if deferred.len() == before {
                let names: Vec<String> = deferred.into_iter().map(|e| e.name).collect();
                warn!(csm = %csm.name(), "unresolved coordinate systems: {:?}", names);
                return Err(WeldxError::CyclicOrUnresolvedReference(names));
            }
            pending = deferred;
        }
        if passes > 1 {
            debug!(csm = %csm.name(), "coordinate systems resolved in {} passes", passes);
        }

        if let Some(subsystems) = take_opt(&mut tree, "subsystems") {
            for (i, v) in as_seq(subsystems, "subsystems")?.into_iter().enumerate() {
                let sub = nested(&format!("subsystems/{i}"), subsystem_from_tree(v))?;
                csm.restore_subsystem(sub)?;
            }
        }
        Ok(csm)
    }

    fn tree_annotations(&self) -> Option<&Annotations> {
        Some(self.annotations())
    }

    fn restore_annotations(&mut self, annotations: Annotations) {
        *self.annotations_mut() = annotations;
    }
}

fn edge_from_tree(value: Value) -> Result<PendingEdge> {
    let mut tree = as_mapping(value, "")?;
    let transformation = take(&mut tree, "transformation")?;
    let record: EdgeRecord = from_record(tree)?;
    Ok(PendingEdge {
        name: record.name,
        parent: record.parent_system,
        lcs: nested("transformation", from_tagged(transformation))?,
    })
}

fn subsystem_to_tree(sub: &Subsystem) -> Result<Value> {
    let mut tree = to_record(&SubsystemRecord {
        name: sub.name.clone(),
        parent_system: sub.parent_system.clone(),
        root_cs: sub.root_cs.clone(),
        members: sub.members.clone(),
        subsystem_names: sub.subsystem_names.clone(),
    })?;
    if let Some(rt) = sub.reference_time {
        tree.insert("reference_time".into(), to_tagged(&rt)?);
    }
    sub.annotations.write_into(&mut tree);
    Ok(Value::Mapping(tree))
}

fn subsystem_from_tree(value: Value) -> Result<Subsystem> {
    let mut tree = as_mapping(value, "")?;
    let annotations = Annotations::take_from(&mut tree)?;
    let reference_time = take_opt(&mut tree, "reference_time")
        .map(|v| nested("reference_time", from_tagged::<ReferenceTime>(v)))
        .transpose()?;
    let record: SubsystemRecord = from_record(tree)?;
    Ok(Subsystem {
        name: record.name,
        parent_system: record.parent_system,
        root_cs: record.root_cs,
        reference_time,
        members: record.members,
        subsystem_names: record.subsystem_names,
        annotations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TimeAxis;
    use crate::transformations::lcs::Coordinates;
    use chrono::NaiveDate;
    use nalgebra::{Matrix3, Rotation3, Vector3};

    const EPS: f64 = 1e-12;

    fn lcs(coords: [f64; 3], angle: f64) -> LocalCoordinateSystem {
        let r = Rotation3::from_axis_angle(&Vector3::z_axis(), angle).into_inner();
        LocalCoordinateSystem::from_static(coords, "mm", r).unwrap()
    }

    fn cell() -> CoordinateSystemManager {
        let start = NaiveDate::from_ymd_opt(2020, 6, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let mut csm = CoordinateSystemManager::with_name("cell", "base").with_reference_time(start);
        csm.add_cs("workpiece", "base", lcs([100.0, 0.0, 0.0], 0.5)).unwrap();
        csm.add_cs("camera", "base", lcs([0.0, 0.0, 500.0], -0.7)).unwrap();
        let seam = LocalCoordinateSystem::new(
            Coordinates::series(&[[5.0, 0.0, 2.0], [-5.0, 0.0, 2.0]], "mm"),
            vec![Matrix3::identity()],
            Some(TimeAxis::from_seconds(&[0.0, 30.0]).unwrap()),
        )
        .unwrap();
        csm.add_cs("tcp", "workpiece", seam).unwrap();

        let mut torch = CoordinateSystemManager::with_name("torch", "flange");
        torch.add_cs("nozzle", "flange", lcs([0.0, 0.0, 300.0], 0.0)).unwrap();
        csm.add_subsystem(torch, "camera").unwrap();
        csm.annotations_mut().insert_user("cell_id", 7.into());
        csm
    }

    #[test]
    fn test_roundtrip_is_isomorphic() {
        let csm = cell();
        let back: CoordinateSystemManager = from_tagged(to_tagged(&csm).unwrap()).unwrap();
        assert!(back.approx_eq(&csm, EPS));
        assert_eq!(back.node_names().len(), csm.node_names().len());
        assert_eq!(back.annotations(), csm.annotations());
        let a = csm.get_cs("nozzle", "tcp").unwrap();
        let b = back.get_cs("nozzle", "tcp").unwrap();
        assert!(a.approx_eq(&b, 1e-9));
    }

    #[test]
    fn test_records_are_breadth_first() {
        let tree = cell().to_tree().unwrap();
        let names: Vec<&str> = tree["coordinate_systems"]
            .as_sequence()
            .unwrap()
            .iter()
            .filter_map(|r| r["name"].as_str())
            .collect();
        assert_eq!(names, vec!["workpiece", "camera", "tcp", "flange", "nozzle"]);
    }

    #[test]
    fn test_out_of_order_records_are_resolved() {
        let mut tree = cell().to_tree().unwrap();
        if let Some(Value::Sequence(records)) = tree.get_mut("coordinate_systems") {
            records.reverse();
        }
        let back = CoordinateSystemManager::from_tree(tree).unwrap();
        assert!(back.approx_eq(&cell(), EPS));
    }

    #[test]
    fn test_unresolvable_parent() {
        let mut tree = cell().to_tree().unwrap();
        if let Some(Value::Sequence(records)) = tree.get_mut("coordinate_systems") {
            records[0]["parent_system"] = "nowhere".into();
        }
        match CoordinateSystemManager::from_tree(tree) {
            Err(WeldxError::CyclicOrUnresolvedReference(names)) => {
                assert!(names.contains(&"workpiece".to_string()));
                assert!(names.contains(&"tcp".to_string()));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_subsystem_member() {
        let mut tree = cell().to_tree().unwrap();
        if let Some(Value::Sequence(subs)) = tree.get_mut("subsystems") {
            subs[0]["members"] = Value::Sequence(vec!["ghost".into()]);
        }
        assert!(matches!(
            CoordinateSystemManager::from_tree(tree),
            Err(WeldxError::CyclicOrUnresolvedReference(_))
        ));
    }

    #[test]
    fn test_nested_error_path() {
        let mut tree = cell().to_tree().unwrap();
        if let Some(Value::Sequence(records)) = tree.get_mut("coordinate_systems") {
            if let Value::Mapping(m) = &mut records[1] {
                m.remove("name");
            }
        }
        assert!(matches!(
            CoordinateSystemManager::from_tree(tree),
            Err(WeldxError::MalformedTree { path, .. }) if path == "coordinate_systems/1/name"
        ));
    }

    #[test]
    fn test_subsystem_record_defaults_and_errors() {
        let mut tree = cell().to_tree().unwrap();
        if let Some(Value::Sequence(subs)) = tree.get_mut("subsystems") {
            if let Value::Mapping(m) = &mut subs[0] {
                m.remove("subsystem_names");
            }
        }
        let back = CoordinateSystemManager::from_tree(tree).unwrap();
        assert!(back.subsystems()[0].subsystem_names.is_empty());

        let mut tree = cell().to_tree().unwrap();
        if let Some(Value::Sequence(subs)) = tree.get_mut("subsystems") {
            subs[0]["members"] = "nozzle".into();
        }
        assert!(matches!(
            CoordinateSystemManager::from_tree(tree),
            Err(WeldxError::MalformedTree { path, .. }) if path.starts_with("subsystems/0")
        ));
    }
}
