// weldx_core/src/asdf/converters/lcs.rs

use serde_yaml::{Mapping, Value};

use crate::annotations::{Annotated, Annotations};
use crate::asdf::tree::{as_matrix3, as_seq, as_vector3, matrix_value, nested, take, take_opt, take_string, vector_value};
use crate::asdf::{from_tagged, to_tagged, TreeConverter};
use crate::error::Result;
use crate::time::{ReferenceTime, TimeAxis};
use crate::transformations::lcs::{Coordinates, LocalCoordinateSystem};

/// `coordinates` is a list of `[x, y, z]` in `unit`, `orientations` a list of
/// row-major 3x3 matrices; both have one entry for a static system.
impl TreeConverter for LocalCoordinateSystem {
    const NAME: &'static str = "core/transformations/local_coordinate_system";
    const VERSION: &'static str = "0.1.0";

    fn to_tree(&self) -> Result<Mapping> {
        let mut tree = Mapping::new();
        if let Some(time) = self.time() {
            tree.insert("time".into(), to_tagged(time)?);
        }
        if let Some(rt) = self.reference_time() {
            tree.insert("reference_time".into(), to_tagged(&rt)?);
        }
        tree.insert("unit".into(), self.unit().symbol().into());
        tree.insert(
            "coordinates".into(),
            Value::Sequence(self.coordinates().iter().map(vector_value).collect()),
        );
        tree.insert(
            "orientations".into(),
            Value::Sequence(self.orientations().iter().map(matrix_value).collect()),
        );
        Ok(tree)
    }

    fn from_tree(mut tree: Mapping) -> Result<Self> {
        let time: Option<TimeAxis> = take_opt(&mut tree, "time")
            .map(|v| nested("time", from_tagged(v)))
            .transpose()?;
        let reference_time: Option<ReferenceTime> = take_opt(&mut tree, "reference_time")
            .map(|v| nested("reference_time", from_tagged(v)))
            .transpose()?;
        let unit = take_string(&mut tree, "unit")?;

        let values = as_seq(take(&mut tree, "coordinates")?, "coordinates")?
            .iter()
            .enumerate()
            .map(|(i, v)| as_vector3(v, &format!("coordinates/{i}")))
            .collect::<Result<Vec<_>>>()?;
        let orientations = as_seq(take(&mut tree, "orientations")?, "orientations")?
            .iter()
            .enumerate()
            .map(|(i, v)| as_matrix3(v, &format!("orientations/{i}")))
            .collect::<Result<Vec<_>>>()?;

        let lcs = LocalCoordinateSystem::new(Coordinates { values, unit }, orientations, time)?;
        Ok(match reference_time {
            Some(rt) => lcs.with_reference_time(rt),
            None => lcs,
        })
    }

    fn tree_annotations(&self) -> Option<&Annotations> {
        Some(self.annotations())
    }

    fn restore_annotations(&mut self, annotations: Annotations) {
        *self.annotations_mut() = annotations;
    }
}
