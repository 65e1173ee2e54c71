// weldx_core/src/transformations/subsystems.rs

//! Merging whole managers into each other and splitting them apart again.

use std::collections::HashSet;

use tracing::info;

use crate::annotations::Annotations;
use crate::error::{Result, WeldxError};
use crate::time::ReferenceTime;
use crate::transformations::csm::{CoordinateSystemManager, Edge};
use crate::transformations::lcs::LocalCoordinateSystem;

/// Bookkeeping for a manager that was merged into another one.
///
/// `root_cs` is the node the subsystem hangs from. It is only listed in
/// `members` when the merge created it; otherwise it is a shared boundary
/// node owned by the parent system. `members` holds the nodes owned directly,
/// nodes of nested subsystems are listed by those subsystems.
#[derive(Debug, Clone, PartialEq)]
pub struct Subsystem {
    pub name: String,
    /// Name of the manager or subsystem this one was merged into.
    pub parent_system: String,
    pub root_cs: String,
    pub reference_time: Option<ReferenceTime>,
    pub members: Vec<String>,
    pub subsystem_names: Vec<String>,
    pub annotations: Annotations,
}

impl Subsystem {
    /// Copy with order-insensitive lists sorted, for comparisons.
    pub(crate) fn normalized(&self) -> Subsystem {
        let mut s = self.clone();
        s.members.sort();
        s.subsystem_names.sort();
        s
    }
}

impl CoordinateSystemManager {
    pub fn subsystems(&self) -> &[Subsystem] {
        &self.subsystems
    }

    pub fn subsystem(&self, name: &str) -> Result<&Subsystem> {
        self.subsystems
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| WeldxError::SubsystemNotFound(name.to_string()))
    }

    pub fn subsystem_names(&self) -> Vec<&str> {
        self.subsystems.iter().map(|s| s.name.as_str()).collect()
    }

    /// The subsystem that directly owns `node`, if any.
    pub fn subsystem_of(&self, node: &str) -> Option<&str> {
        self.owner_index(node).map(|i| self.subsystems[i].name.as_str())
    }

    pub(crate) fn owner_index(&self, node: &str) -> Option<usize> {
        self.subsystems
            .iter()
            .position(|s| s.members.iter().any(|m| m == node))
    }

    /// Grafts `other` onto this manager at the node named like `other`'s root.
    ///
    /// The root of `other` must already exist here; it becomes the shared
    /// boundary node. Fails without modifying anything if any other name of
    /// `other` (node or subsystem) is already taken.
    pub fn merge(&mut self, other: CoordinateSystemManager) -> Result<()> {
        if !self.has_node(&other.root_name) {
            return Err(WeldxError::ParentNotFound {
                name: other.name.clone(),
                parent: other.root_name.clone(),
            });
        }
        self.graft(other, None)
    }

    /// Attaches `other` below `parent_name`.
    ///
    /// If `other`'s root is `parent_name` itself this is a [`merge`](Self::merge).
    /// Otherwise the root of `other` is added as a new child of `parent_name`
    /// with an identity transform and belongs to the subsystem.
    pub fn add_subsystem(&mut self, other: CoordinateSystemManager, parent_name: &str) -> Result<()> {
        if other.root_name == parent_name {
            return self.merge(other);
        }
        self.add_subsystem_with(other, parent_name, LocalCoordinateSystem::identity())
    }

    /// Like [`add_subsystem`](Self::add_subsystem), with an explicit transform
    /// of `other`'s root expressed in `parent_name`.
    pub fn add_subsystem_with(
        &mut self,
        other: CoordinateSystemManager,
        parent_name: &str,
        lcs: LocalCoordinateSystem,
    ) -> Result<()> {
        if !self.has_node(parent_name) {
            return Err(WeldxError::ParentNotFound {
                name: other.root_name.clone(),
                parent: parent_name.to_string(),
            });
        }
        if self.has_node(&other.root_name) {
            return Err(WeldxError::NameCollision {
                subsystem: other.name.clone(),
                name: other.root_name.clone(),
            });
        }
        self.graft(other, Some((parent_name.to_string(), lcs)))
    }

    fn graft(
        &mut self,
        other: CoordinateSystemManager,
        connector: Option<(String, LocalCoordinateSystem)>,
    ) -> Result<()> {
        // --- Validate everything before touching any state ---
        let collision = |name: &str| WeldxError::NameCollision {
            subsystem: other.name.clone(),
            name: name.to_string(),
        };
        let incoming_subsystems =
            std::iter::once(other.name.as_str()).chain(other.subsystems.iter().map(|s| s.name.as_str()));
        for sub_name in incoming_subsystems {
            if self.subsystems.iter().any(|s| s.name == sub_name) {
                return Err(collision(sub_name));
            }
        }
        if let Some(taken) = other.edges.keys().find(|n| self.has_node(n)) {
            return Err(collision(taken));
        }

        // --- Apply ---
        let CoordinateSystemManager {
            name,
            root_name,
            reference_time,
            mut edges,
            order,
            subsystems: nested,
            annotations,
        } = other;

        let parent_system = match &connector {
            Some((parent, _)) => self.owner_index(parent),
            None => self.owner_index(&root_name),
        }
        .map(|i| self.subsystems[i].name.clone())
        .unwrap_or_else(|| self.name.clone());

        let nested_members: HashSet<&str> = nested
            .iter()
            .flat_map(|s| s.members.iter().map(String::as_str))
            .collect();
        let mut members: Vec<String> = Vec::new();

        if let Some((parent, lcs)) = connector {
            self.edges.insert(root_name.clone(), Edge { parent, lcs });
            self.order.push(root_name.clone());
            members.push(root_name.clone());
        }
        for node in order.iter().filter(|n| **n != root_name) {
            let Some(mut edge) = edges.remove(node) else {
                continue;
            };
            // Keep the merged system's clock when the edge has none of its own.
            if let (true, None, Some(rt)) = (
                edge.lcs.is_time_dependent(),
                edge.lcs.reference_time(),
                reference_time,
            ) {
                edge.lcs = edge.lcs.with_reference_time(rt);
            }
            self.edges.insert(node.clone(), edge);
            self.order.push(node.clone());
            if !nested_members.contains(node.as_str()) {
                members.push(node.clone());
            }
        }

        let subsystem_names: Vec<String> = nested
            .iter()
            .filter(|s| s.parent_system == name)
            .map(|s| s.name.clone())
            .collect();
        if let Some(owner) = self.subsystems.iter_mut().find(|s| s.name == parent_system) {
            owner.subsystem_names.push(name.clone());
        }
        info!(
            csm = %self.name,
            "merged subsystem '{}' ({} coordinate systems) at '{}'",
            name,
            order.len() - 1,
            root_name
        );
        self.subsystems.push(Subsystem {
            name,
            parent_system,
            root_cs: root_name,
            reference_time,
            members,
            subsystem_names,
            annotations,
        });
        self.subsystems.extend(nested);
        Ok(())
    }

    /// Detaches a subsystem with its whole subtree, nested subsystems included.
    ///
    /// Returns the detached part as a manager of its own, rooted at the
    /// subsystem's root system, so it can be merged again later.
    pub fn remove_subsystem(&mut self, name: &str) -> Result<CoordinateSystemManager> {
        let sub = self.subsystem(name)?.clone();

        let mut sub_names: Vec<String> = vec![sub.name.clone()];
        let mut i = 0;
        while i < sub_names.len() {
            let current = self.subsystem(&sub_names[i])?;
            sub_names.extend(current.subsystem_names.iter().cloned());
            i += 1;
        }
        let sub_names: HashSet<String> = sub_names.into_iter().collect();

        let members: Vec<&str> = self
            .subsystems
            .iter()
            .filter(|s| sub_names.contains(&s.name))
            .flat_map(|s| s.members.iter().map(String::as_str))
            .collect();
        let mut nodes = self.descendants(members.iter().copied());
        nodes.extend(members.iter().map(|m| m.to_string()));

        let mut detached = CoordinateSystemManager::with_name(&sub.name, &sub.root_cs);
        detached.reference_time = sub.reference_time;
        detached.annotations = sub.annotations.clone();
        for node in self.order.iter().filter(|n| nodes.contains(*n) && **n != sub.root_cs) {
            if let Some(edge) = self.edges.get(node) {
                detached.edges.insert(node.clone(), edge.clone());
                detached.order.push(node.clone());
            }
        }
        detached.subsystems = self
            .subsystems
            .iter()
            .filter(|s| s.name != sub.name && sub_names.contains(&s.name))
            .cloned()
            .collect();

        self.remove_nodes(&nodes);
        self.subsystems.retain(|s| !sub_names.contains(&s.name));
        for s in &mut self.subsystems {
            s.subsystem_names.retain(|n| n != name);
        }
        info!(
            csm = %self.name,
            "removed subsystem '{}' with {} coordinate systems",
            name,
            nodes.len()
        );
        Ok(detached)
    }

    /// Re-registers a subsystem read from a file; the nodes must already exist.
    pub(crate) fn restore_subsystem(&mut self, sub: Subsystem) -> Result<()> {
        let unresolved: Vec<String> = sub
            .members
            .iter()
            .chain(std::iter::once(&sub.root_cs))
            .filter(|m| !self.has_node(m))
            .cloned()
            .collect();
        if !unresolved.is_empty() {
            return Err(WeldxError::CyclicOrUnresolvedReference(unresolved));
        }
        if self.subsystems.iter().any(|s| s.name == sub.name) {
            return Err(WeldxError::NameCollision {
                subsystem: sub.name.clone(),
                name: sub.name,
            });
        }
        let owned: HashSet<&str> = self
            .subsystems
            .iter()
            .flat_map(|s| s.members.iter().map(String::as_str))
            .collect();
        if let Some(m) = sub.members.iter().find(|m| owned.contains(m.as_str())) {
            return Err(WeldxError::malformed(
                format!("subsystems/{}/members", sub.name),
                format!("'{m}' already belongs to another subsystem"),
            ));
        }
        self.subsystems.push(sub);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix3, Vector3};

    fn lcs(x: f64) -> LocalCoordinateSystem {
        LocalCoordinateSystem::from_static([x, 0.0, 0.0], "mm", Matrix3::identity()).unwrap()
    }

    fn cell() -> CoordinateSystemManager {
        let mut csm = CoordinateSystemManager::with_name("cell", "base");
        csm.add_cs("robot", "base", lcs(1000.0)).unwrap();
        csm.add_cs("workpiece", "base", lcs(500.0)).unwrap();
        csm
    }

    fn torch() -> CoordinateSystemManager {
        let mut csm = CoordinateSystemManager::with_name("torch", "flange");
        csm.add_cs("tcp", "flange", lcs(300.0)).unwrap();
        csm.add_cs("wire", "tcp", lcs(15.0)).unwrap();
        csm
    }

    #[test]
    fn test_merge_and_remove_restores_node_set() {
        let mut main = cell();
        let before: Vec<String> = main.node_names().to_vec();

        main.add_subsystem(torch(), "robot").unwrap();
        assert!(main.has_node("wire"));
        assert_eq!(main.subsystem_of("tcp"), Some("torch"));
        assert_eq!(main.subsystem_of("flange"), Some("torch"));

        let wire_in_base = main.get_cs("wire", "base").unwrap();
        assert!((wire_in_base.coordinates()[0] - Vector3::new(1315.0, 0.0, 0.0)).amax() < 1e-9);

        let detached = main.remove_subsystem("torch").unwrap();
        assert_eq!(main.node_names(), before.as_slice());
        assert!(main.subsystems().is_empty());
        assert!(detached.approx_eq(&torch(), 1e-12));
    }

    #[test]
    fn test_merge_at_shared_root() {
        let mut main = cell();
        let mut fixture = CoordinateSystemManager::with_name("fixture", "workpiece");
        fixture.add_cs("clamp", "workpiece", lcs(20.0)).unwrap();
        main.merge(fixture).unwrap();

        let sub = main.subsystem("fixture").unwrap();
        assert_eq!(sub.root_cs, "workpiece");
        assert_eq!(sub.members, vec!["clamp".to_string()]);
        assert_eq!(sub.parent_system, "cell");

        main.remove_subsystem("fixture").unwrap();
        assert!(main.has_node("workpiece"));
        assert!(!main.has_node("clamp"));
    }

    #[test]
    fn test_merge_requires_existing_root() {
        let mut main = cell();
        assert!(matches!(
            main.merge(torch()),
            Err(WeldxError::ParentNotFound { .. })
        ));
    }

    #[test]
    fn test_name_collision_is_all_or_nothing() {
        let mut main = cell();
        let mut clash = CoordinateSystemManager::with_name("clash", "robot");
        clash.add_cs("new_one", "robot", lcs(1.0)).unwrap();
        clash.add_cs("workpiece", "new_one", lcs(1.0)).unwrap();
        let before = main.clone();

        let err = main.merge(clash);
        assert!(matches!(err, Err(WeldxError::NameCollision { name, .. }) if name == "workpiece"));
        assert!(main.approx_eq(&before, 1e-12));
        assert!(!main.has_node("new_one"));
    }

    #[test]
    fn test_attach_with_existing_root_leaves_state_unchanged() {
        let mut main = cell();
        let before = main.clone();
        let mut fixture = CoordinateSystemManager::with_name("fixture", "workpiece");
        fixture.add_cs("clamp", "workpiece", lcs(20.0)).unwrap();

        let err = main.add_subsystem_with(fixture, "robot", lcs(2.0));
        assert!(matches!(err, Err(WeldxError::NameCollision { name, .. }) if name == "workpiece"));
        assert!(main.approx_eq(&before, 1e-12));
        assert!(main.subsystems().is_empty());
        assert!(!main.has_node("clamp"));
    }

    #[test]
    fn test_subsystem_name_collision() {
        let mut main = cell();
        main.add_subsystem(torch(), "robot").unwrap();
        let mut again = CoordinateSystemManager::with_name("torch", "workpiece");
        again.add_cs("other", "workpiece", lcs(1.0)).unwrap();
        assert!(matches!(main.merge(again), Err(WeldxError::NameCollision { .. })));
    }

    #[test]
    fn test_nested_subsystems_are_removed_together() {
        let mut torch = torch();
        let mut nozzle = CoordinateSystemManager::with_name("nozzle", "tcp");
        nozzle.add_cs("nozzle_tip", "tcp", lcs(5.0)).unwrap();
        torch.merge(nozzle).unwrap();

        let mut main = cell();
        main.add_subsystem(torch, "robot").unwrap();
        assert_eq!(main.subsystem("nozzle").unwrap().parent_system, "torch");
        assert_eq!(main.subsystem("torch").unwrap().subsystem_names, vec!["nozzle".to_string()]);

        // Nodes added later below a member join its subsystem.
        main.add_cs("sensor", "nozzle_tip", lcs(1.0)).unwrap();
        assert_eq!(main.subsystem_of("sensor"), Some("nozzle"));

        let detached = main.remove_subsystem("torch").unwrap();
        assert_eq!(main.number_of_coordinate_systems(), 3);
        assert!(main.subsystems().is_empty());
        assert!(detached.has_node("sensor"));
        assert_eq!(detached.subsystem_names(), vec!["nozzle"]);
    }

    #[test]
    fn test_remove_nested_subsystem_only() {
        let mut torch = torch();
        let mut nozzle = CoordinateSystemManager::with_name("nozzle", "tcp");
        nozzle.add_cs("nozzle_tip", "tcp", lcs(5.0)).unwrap();
        torch.merge(nozzle).unwrap();
        let mut main = cell();
        main.add_subsystem(torch, "robot").unwrap();

        main.remove_subsystem("nozzle").unwrap();
        assert!(!main.has_node("nozzle_tip"));
        assert!(main.has_node("tcp"));
        assert!(main.subsystem("torch").unwrap().subsystem_names.is_empty());
    }

    #[test]
    fn test_remove_long_chain_subsystem() {
        let mut arm = CoordinateSystemManager::with_name("arm", "link_0");
        for i in 1..2000 {
            arm.add_cs(&format!("link_{i}"), &format!("link_{}", i - 1), lcs(1.0))
                .unwrap();
        }
        let mut main = cell();
        main.add_subsystem(arm, "base").unwrap();
        assert_eq!(main.number_of_coordinate_systems(), 2003);

        let detached = main.remove_subsystem("arm").unwrap();
        assert_eq!(main.number_of_coordinate_systems(), 3);
        assert_eq!(detached.number_of_coordinate_systems(), 2000);
        assert_eq!(detached.parent_of("link_1999").unwrap(), Some("link_1998"));
    }

    #[test]
    fn test_remove_unknown_subsystem() {
        let mut main = cell();
        assert!(matches!(
            main.remove_subsystem("ghost"),
            Err(WeldxError::SubsystemNotFound(_))
        ));
    }
}
