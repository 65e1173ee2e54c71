// weldx_cli/src/commands/inspect.rs

use std::fmt::Write;
use weldx_core::prelude::*;

use super::csm_keys;

/// Lists the entries of `file` and draws every coordinate system hierarchy.
pub fn inspect(file: &WeldxFile) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "{} entries", file.len())?;
    for (key, tag) in file.entries() {
        writeln!(out, "  {key}: {}", tag.as_deref().unwrap_or("<untagged>"))?;
    }
    for key in csm_keys(file) {
        let csm: CoordinateSystemManager = file.get(&key)?;
        writeln!(out)?;
        out.push_str(&render_tree(&csm));
    }
    Ok(out)
}

/// Indented tree of a manager, marking time-dependent edges and subsystem owners.
pub fn render_tree(csm: &CoordinateSystemManager) -> String {
    let mut out = format!(
        "{} ({} coordinate systems)\n",
        csm.name(),
        csm.number_of_coordinate_systems()
    );
    if let Some(rt) = csm.reference_time() {
        out.push_str(&format!("reference time: {}\n", weldx_core::time::format_timestamp(&rt)));
    }
    render_node(csm, csm.root_name(), 0, &mut out);
    for sub in csm.subsystems() {
        out.push_str(&format!(
            "subsystem '{}' in '{}' at '{}': {}\n",
            sub.name,
            sub.parent_system,
            sub.root_cs,
            sub.members.join(", ")
        ));
    }
    out
}

fn render_node(csm: &CoordinateSystemManager, name: &str, depth: usize, out: &mut String) {
    let mut line = format!("{}{}", "  ".repeat(depth), name);
    if let Ok(lcs) = csm.edge(name) {
        if let Some(time) = lcs.time() {
            line.push_str(&format!(" [{} samples]", time.len()));
        }
    }
    if let Some(sub) = csm.subsystem_of(name) {
        line.push_str(&format!(" <{sub}>"));
    }
    out.push_str(&line);
    out.push('\n');
    for child in csm.children_of(name).unwrap_or_default() {
        render_node(csm, child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::demo::build_demo_file;

    #[test]
    fn test_inspect_demo_file() {
        let file = build_demo_file().unwrap();
        let text = inspect(&file).unwrap();
        assert!(text.contains("coordinate_systems: asdf://weldx.bam.de/weldx/tags/core/transformations/coordinate_system_hierarchy-0.1.0"));
        assert!(text.contains("    tcp [3 samples]"));
        assert!(text.contains("subsystem 'torch'"));
    }
}
