// weldx_cli/src/commands/validate.rs

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;
use weldx_core::prelude::*;

const EXTENSIONS: [&str; 3] = ["asdf", "yaml", "yml"];

/// The outcome for one file.
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    /// Parse failure or schema violations; empty when valid.
    pub problems: Vec<String>,
}

impl FileReport {
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Files to check: `path` itself, or every matching file below it.
pub fn collect_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| {
            !e.file_type().is_dir()
                && e.path()
                    .extension()
                    .is_some_and(|ext| EXTENSIONS.iter().any(|x| ext == *x))
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

pub fn validate_bytes(bytes: &[u8], validator: Option<Box<dyn SchemaValidator>>) -> Vec<String> {
    match WeldxFile::parse(bytes, None) {
        Ok(mut file) => {
            file.set_validator(validator);
            file.violations().iter().map(ToString::to_string).collect()
        }
        Err(e) => vec![e.to_string()],
    }
}

pub fn validate_path(path: &Path, validator: Option<Box<dyn SchemaValidator>>) -> Vec<FileReport> {
    collect_files(path)
        .into_iter()
        .map(|file| {
            let problems = match fs::read(&file) {
                Ok(bytes) => validate_bytes(&bytes, validator.clone()),
                Err(e) => vec![format!("cannot read file: {e}")],
            };
            if problems.is_empty() {
                debug!("{} is valid", file.display());
            } else {
                warn!("{} has {} problem(s)", file.display(), problems.len());
            }
            FileReport { path: file, problems }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::demo::build_demo_file;

    #[test]
    fn test_demo_file_is_valid() {
        let bytes = build_demo_file().unwrap().to_bytes().unwrap();
        assert!(validate_bytes(&bytes, Some(Box::new(BuiltinSchemas::strict()))).is_empty());
    }

    #[test]
    fn test_violations_are_listed() {
        let text = String::from_utf8(build_demo_file().unwrap().to_bytes().unwrap())
            .unwrap()
            .replace("root_system_name:", "root_name:");
        let problems = validate_bytes(text.as_bytes(), Some(Box::new(BuiltinSchemas::default())));
        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("coordinate_systems/root_system_name"));
    }

    #[test]
    fn test_directory_walk() {
        let dir = std::env::temp_dir().join(format!("weldx_validate_{}", std::process::id()));
        fs::create_dir_all(dir.join("nested")).unwrap();
        let bytes = build_demo_file().unwrap().to_bytes().unwrap();
        fs::write(dir.join("good.asdf"), &bytes).unwrap();
        fs::write(dir.join("nested/broken.yaml"), b"key: [unclosed").unwrap();
        fs::write(dir.join("notes.txt"), b"ignored").unwrap();

        let reports = validate_path(&dir, Some(Box::new(BuiltinSchemas::default())));
        assert_eq!(reports.len(), 2);
        assert!(reports[0].is_valid());
        assert!(!reports[1].is_valid());
        fs::remove_dir_all(&dir).unwrap();
    }
}
