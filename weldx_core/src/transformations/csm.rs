// weldx_core/src/transformations/csm.rs

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::TimeDelta;
use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::annotations::{Annotated, Annotations};
use crate::error::{Result, WeldxError};
use crate::time::{ReferenceTime, TimeAxis};
use crate::transformations::lcs::LocalCoordinateSystem;
use crate::transformations::subsystems::Subsystem;
use crate::units::LengthUnit;

pub const DEFAULT_CSM_NAME: &str = "Coordinate system manager";

/// The edge from a node to its parent. Nodes refer to parents by name only.
#[derive(Debug, Clone)]
pub(crate) struct Edge {
    pub(crate) parent: String,
    pub(crate) lcs: LocalCoordinateSystem,
}

/// A tree of named coordinate systems connected by [`LocalCoordinateSystem`] edges.
///
/// Every node except the root has exactly one parent edge holding the
/// transform of the node expressed in its parent. Transformations between
/// arbitrary pairs are derived on demand by walking the tree; no shortcut
/// edges are ever stored.
///
/// Mutations take `&mut self` and queries take `&self`, so shared read
/// access is safe and writers must be serialized by the caller.
#[derive(Debug, Clone)]
pub struct CoordinateSystemManager {
    pub(crate) name: String,
    pub(crate) root_name: String,
    pub(crate) reference_time: Option<ReferenceTime>,
    pub(crate) edges: HashMap<String, Edge>,
    /// Every node including the root, in insertion order.
    pub(crate) order: Vec<String>,
    pub(crate) subsystems: Vec<Subsystem>,
    pub(crate) annotations: Annotations,
}

impl CoordinateSystemManager {
    /// Creates a manager containing only the root system.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self::with_name(DEFAULT_CSM_NAME, root_name)
    }

    pub fn with_name(name: impl Into<String>, root_name: impl Into<String>) -> Self {
        let root_name = root_name.into();
        Self {
            name: name.into(),
            order: vec![root_name.clone()],
            root_name,
            reference_time: None,
            edges: HashMap::new(),
            subsystems: Vec::new(),
            annotations: Annotations::default(),
        }
    }

    pub fn with_reference_time(mut self, reference_time: ReferenceTime) -> Self {
        self.reference_time = Some(reference_time);
        self
    }

    // --- Queries ---

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    pub fn reference_time(&self) -> Option<ReferenceTime> {
        self.reference_time
    }

    pub fn has_node(&self, name: &str) -> bool {
        name == self.root_name || self.edges.contains_key(name)
    }

    /// All coordinate system names in insertion order, root first.
    pub fn node_names(&self) -> &[String] {
        &self.order
    }

    pub fn number_of_coordinate_systems(&self) -> usize {
        self.order.len()
    }

    pub fn parent_of(&self, name: &str) -> Result<Option<&str>> {
        if name == self.root_name {
            return Ok(None);
        }
        self.edges
            .get(name)
            .map(|e| Some(e.parent.as_str()))
            .ok_or_else(|| WeldxError::NodeNotFound(name.to_string()))
    }

    pub fn children_of(&self, name: &str) -> Result<Vec<&str>> {
        if !self.has_node(name) {
            return Err(WeldxError::NodeNotFound(name.to_string()));
        }
        Ok(self
            .order
            .iter()
            .filter(|n| self.edges.get(n.as_str()).is_some_and(|e| e.parent == name))
            .map(String::as_str)
            .collect())
    }

    /// The stored edge of `name` (the node expressed in its parent).
    pub fn edge(&self, name: &str) -> Result<&LocalCoordinateSystem> {
        self.edges
            .get(name)
            .map(|e| &e.lcs)
            .ok_or_else(|| WeldxError::NodeNotFound(name.to_string()))
    }

    /// Every edge as `(child, parent, lcs)`, breadth-first from the root.
    pub fn edges(&self) -> Vec<(&str, &str, &LocalCoordinateSystem)> {
        self.bfs_order()
            .into_iter()
            .skip(1)
            .filter_map(|n| {
                self.edges
                    .get_key_value(n)
                    .map(|(k, e)| (k.as_str(), e.parent.as_str(), &e.lcs))
            })
            .collect()
    }

    /// Union of the time axes of all time-dependent edges.
    pub fn time_union(&self) -> Option<TimeAxis> {
        let mut all: Vec<TimeDelta> = self
            .edges
            .values()
            .filter_map(|e| e.lcs.time())
            .flat_map(|t| t.deltas().iter().copied())
            .collect();
        all.sort();
        all.dedup();
        TimeAxis::new(all).ok()
    }

    // --- Mutation ---

    /// Inserts `name` as a child of `reference_system_name`.
    ///
    /// `lcs` describes the new system expressed in the reference system. When
    /// the reference belongs to a subsystem, the new node joins it.
    pub fn add_cs(
        &mut self,
        name: &str,
        reference_system_name: &str,
        lcs: LocalCoordinateSystem,
    ) -> Result<()> {
        if self.has_node(name) {
            return Err(WeldxError::NodeExists(name.to_string()));
        }
        if !self.has_node(reference_system_name) {
            return Err(WeldxError::ParentNotFound {
                name: name.to_string(),
                parent: reference_system_name.to_string(),
            });
        }

        self.edges.insert(
            name.to_string(),
            Edge {
                parent: reference_system_name.to_string(),
                lcs,
            },
        );
        self.order.push(name.to_string());
        if let Some(idx) = self.owner_index(reference_system_name) {
            self.subsystems[idx].members.push(name.to_string());
        }
        debug!(
            csm = %self.name,
            "added coordinate system '{}' in '{}'", name, reference_system_name
        );
        Ok(())
    }

    /// Removes a coordinate system, and with `delete_children` its whole subtree.
    ///
    /// The root and subsystem boundary nodes cannot be deleted; remove the
    /// subsystem first.
    pub fn delete_cs(&mut self, name: &str, delete_children: bool) -> Result<()> {
        if !self.has_node(name) {
            return Err(WeldxError::NodeNotFound(name.to_string()));
        }
        if name == self.root_name {
            return Err(WeldxError::InvalidOperation {
                name: name.to_string(),
                reason: "the root system cannot be deleted".into(),
            });
        }
        let mut doomed = self.descendants([name]);
        if !doomed.is_empty() && !delete_children {
            return Err(WeldxError::InvalidOperation {
                name: name.to_string(),
                reason: format!("it still has {} child system(s)", doomed.len()),
            });
        }
        doomed.insert(name.to_string());
        if let Some(sub) = self.subsystems.iter().find(|s| doomed.contains(&s.root_cs)) {
            return Err(WeldxError::InvalidOperation {
                name: name.to_string(),
                reason: format!("subsystem '{}' is attached to the subtree", sub.name),
            });
        }

        self.remove_nodes(&doomed);
        debug!(csm = %self.name, "deleted {} coordinate system(s) at '{}'", doomed.len(), name);
        Ok(())
    }

    // --- Transformations ---

    /// The transform of `name` expressed in `reference_name`.
    ///
    /// Edges walked from `name` up to the lowest common ancestor are composed
    /// as stored; edges walked down towards `reference_name` are inverted.
    /// Time-dependent edges are combined on the union of their time values
    /// within the interval where all of them overlap.
    pub fn get_cs(&self, name: &str, reference_name: &str) -> Result<LocalCoordinateSystem> {
        for n in [name, reference_name] {
            if !self.has_node(n) {
                return Err(WeldxError::NodeNotFound(n.to_string()));
            }
        }

        let up = self.path_to_root(name);
        let down = self.path_to_root(reference_name);
        let down_set: HashSet<&str> = down.iter().map(String::as_str).collect();
        // The root is on both paths, so a common ancestor always exists.
        let lca = up
            .iter()
            .find(|n| down_set.contains(n.as_str()))
            .map(String::as_str)
            .unwrap_or(self.root_name.as_str());

        let name_in_lca = self.chain_to(&up, lca)?;
        let reference_in_lca = self.chain_to(&down, lca)?;
        let mut result = reference_in_lca.invert().compose(&name_in_lca)?;

        let unit = match self.edges.get(name) {
            Some(edge) => edge.lcs.unit(),
            None => self
                .edges
                .get(reference_name)
                .map(|e| e.lcs.unit())
                .unwrap_or_default(),
        };
        result = result.with_unit(unit);
        if result.is_time_dependent() && result.reference_time().is_none() {
            if let Some(rt) = self.reference_time {
                result = result.with_reference_time(rt);
            }
        }
        Ok(result)
    }

    /// [`get_cs`](Self::get_cs) resampled at `time_points`.
    pub fn get_cs_at(
        &self,
        name: &str,
        reference_name: &str,
        time_points: &TimeAxis,
        extrapolate: bool,
    ) -> Result<LocalCoordinateSystem> {
        self.get_cs(name, reference_name)?
            .interpolate(time_points, extrapolate)
    }

    /// Transforms points given in `source` coordinates into `target` coordinates.
    ///
    /// Points are read and returned in `unit`. A time is required when the
    /// transform between both systems is time-dependent.
    pub fn transform_points(
        &self,
        points: &[Vector3<f64>],
        unit: LengthUnit,
        source: &str,
        target: &str,
        time: Option<TimeDelta>,
    ) -> Result<Vec<Vector3<f64>>> {
        let lcs = self.get_cs(source, target)?;
        let iso = match (lcs.is_time_dependent(), time) {
            (false, _) => lcs.isometries()[0],
            (true, Some(t)) => lcs.isometry_at(t, false)?,
            (true, None) => {
                return Err(WeldxError::Shape(format!(
                    "transform from '{source}' to '{target}' is time-dependent, a time is required"
                )))
            }
        };
        Ok(points
            .iter()
            .map(|p| {
                let p_m = Point3::from(p.map(|c| unit.to_meters(c)));
                (iso * p_m).coords.map(|c| unit.from_meters(c))
            })
            .collect())
    }

    /// Structural and numerical equality, used to check tree round trips.
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        if self.name != other.name
            || self.root_name != other.root_name
            || self.reference_time != other.reference_time
            || self.edges.len() != other.edges.len()
        {
            return false;
        }
        let edges_match = self.edges.iter().all(|(name, edge)| {
            other
                .edges
                .get(name)
                .is_some_and(|o| o.parent == edge.parent && o.lcs.approx_eq(&edge.lcs, epsilon))
        });
        let mut mine: Vec<_> = self.subsystems.iter().map(Subsystem::normalized).collect();
        let mut theirs: Vec<_> = other.subsystems.iter().map(Subsystem::normalized).collect();
        mine.sort_by(|a, b| a.name.cmp(&b.name));
        theirs.sort_by(|a, b| a.name.cmp(&b.name));
        edges_match && mine == theirs
    }

    // --- Internal helpers ---

    /// `[name, parent, ..., root]`
    fn path_to_root(&self, name: &str) -> Vec<String> {
        let mut path = vec![name.to_string()];
        let mut current = name;
        while let Some(edge) = self.edges.get(current) {
            path.push(edge.parent.clone());
            current = &edge.parent;
        }
        path
    }

    /// Composes the edges along `path` until `stop` is reached.
    fn chain_to(&self, path: &[String], stop: &str) -> Result<LocalCoordinateSystem> {
        let mut acc = LocalCoordinateSystem::identity();
        for node in path.iter().take_while(|n| n.as_str() != stop) {
            let edge = self.edge_in_csm_time(node)?;
            acc = edge.compose(&acc)?;
        }
        Ok(acc)
    }

    /// The stored edge, anchored to the manager's reference time when it has none.
    fn edge_in_csm_time(&self, name: &str) -> Result<LocalCoordinateSystem> {
        let lcs = self.edge(name)?;
        Ok(match (lcs.is_time_dependent(), lcs.reference_time(), self.reference_time) {
            (true, None, Some(rt)) => lcs.clone().with_reference_time(rt),
            _ => lcs.clone(),
        })
    }

    /// Node names breadth-first from the root, siblings in insertion order.
    pub(crate) fn bfs_order(&self) -> Vec<&str> {
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        for name in &self.order {
            if let Some(edge) = self.edges.get(name) {
                children.entry(edge.parent.as_str()).or_default().push(name);
            }
        }
        let mut out = Vec::with_capacity(self.order.len());
        let mut queue = VecDeque::from([self.root_name.as_str()]);
        while let Some(node) = queue.pop_front() {
            out.push(node);
            if let Some(kids) = children.get(node) {
                queue.extend(kids.iter().copied());
            }
        }
        out
    }

    /// All nodes strictly below any of `roots`, found in one breadth-first pass.
    pub(crate) fn descendants<'a>(&self, roots: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        for (child, edge) in &self.edges {
            children.entry(edge.parent.as_str()).or_default().push(child);
        }
        let mut found: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<&str> = roots.into_iter().collect();
        while let Some(current) = queue.pop_front() {
            for child in children.get(current).into_iter().flatten() {
                if found.insert(child.to_string()) {
                    queue.push_back(*child);
                }
            }
        }
        found
    }

    /// Drops the nodes from the tree, the insertion order and subsystem memberships.
    pub(crate) fn remove_nodes(&mut self, nodes: &HashSet<String>) {
        for n in nodes {
            self.edges.remove(n);
        }
        self.order.retain(|n| !nodes.contains(n));
        for sub in &mut self.subsystems {
            sub.members.retain(|m| !nodes.contains(m));
        }
    }
}

impl Annotated for CoordinateSystemManager {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
}
