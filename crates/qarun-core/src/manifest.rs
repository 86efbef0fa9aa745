//! Exported constraint manifests.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::scratch::ScratchFile;

/// A pinned requirements file written by the lock resolver.
///
/// Owns the scratch file it lives in; the file is removed on [`Manifest::release`]
/// or when the manifest is dropped.
#[derive(Debug)]
pub struct Manifest {
    file: ScratchFile,
}

impl Manifest {
    pub(crate) fn new(file: ScratchFile) -> Self {
        Self { file }
    }

    /// Path handed to the installer or to a command.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Pinned `name -> version` pairs, read leniently.
    ///
    /// Hash lines, options and unpinned requirements are skipped. This is
    /// informational only; the installer stays the authority on the contents.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn pins(&self) -> Result<BTreeMap<String, String>> {
        let contents = fs::read_to_string(self.path())?;
        Ok(parse_pins(&contents))
    }

    /// Deletes the manifest file.
    ///
    /// # Errors
    /// Returns `Error::Resource` if the file cannot be deleted.
    pub fn release(self) -> Result<()> {
        self.file.release()
    }
}

fn parse_pins(contents: &str) -> BTreeMap<String, String> {
    let joined = contents.replace("\\\r\n", " ").replace("\\\n", " ");
    joined.lines().filter_map(parse_pin).collect()
}

fn parse_pin(line: &str) -> Option<(String, String)> {
    let requirement = line.split('#').next().unwrap_or_default();
    let requirement = requirement.split(';').next().unwrap_or_default().trim();
    if requirement.is_empty() || requirement.starts_with('-') {
        return None;
    }

    let (name, rest) = requirement.split_once("==")?;
    let name = name.split('[').next().unwrap_or_default().trim();
    let version = rest.split_whitespace().next()?;
    if name.is_empty() {
        return None;
    }
    Some((name.to_lowercase(), version.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EXPORTED: &str = r#"black==19.10b0 \
    --hash=sha256:1b30e59be925fafc1ee4565e5e08abef6b03fe455102883820fe5ee2e4734e0b \
    --hash=sha256:c2edb73a08e9e0e6f65a0e6af18b059b8b1cdd5bef997d7a0b181df93dc81539
coverage[toml]==5.0.3; python_version >= "3.5" and python_version < "4"
Flake8==3.7.9
# comment line
-e ./vendored
requests>=2.0
"#;

    #[test]
    fn test_parse_pins_reads_exported_requirements() {
        let pins = parse_pins(EXPORTED);

        assert_eq!(pins.len(), 3);
        assert_eq!(pins["black"], "19.10b0");
        assert_eq!(pins["coverage"], "5.0.3");
        assert_eq!(pins["flake8"], "3.7.9");
        assert!(!pins.contains_key("requests"));
    }

    #[test]
    fn test_parse_pins_ignores_garbage() {
        assert!(parse_pins("==1.0\nnot a requirement\n\n").is_empty());
    }

    #[test]
    fn test_manifest_owns_its_scratch_file() {
        let temp = TempDir::new().unwrap();
        let manifest = Manifest::new(ScratchFile::acquire_in(temp.path(), Some(".txt")).unwrap());
        fs::write(manifest.path(), "pytest==5.3.5\n").unwrap();
        let path = manifest.path().to_path_buf();

        assert_eq!(manifest.pins().unwrap()["pytest"], "5.3.5");
        manifest.release().unwrap();
        assert!(!path.exists());
    }
}
