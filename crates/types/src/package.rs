//! Driver-supplied package references

use conpack_errors::{ConfigError, Error, PackageError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One upstream package handed to a consolidation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSource {
    pub id: String,
    pub version: String,
    /// `true` for a flat single-platform package whose identity lives in its
    /// embedded metadata; `false` for a container of per-platform archives.
    #[serde(default)]
    pub is_single_payload: bool,
    pub path: PathBuf,
}

impl PackageSource {
    pub fn new(
        id: impl Into<String>,
        version: impl Into<String>,
        is_single_payload: bool,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            is_single_payload,
            path: path.into(),
        }
    }
}

/// TOML package list consumed by the CLI
///
/// ```toml
/// [[package]]
/// id = "Tool.Cloud"
/// version = "1.4.0"
/// is_single_payload = true
/// path = "artifacts/Tool.Cloud.1.4.0.nupkg"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageList {
    #[serde(default, rename = "package")]
    pub packages: Vec<PackageSource>,
}

impl PackageList {
    /// Parse a package list from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for a package list or
    /// if any entry has an empty id or version.
    pub fn from_toml(contents: &str) -> Result<Self, Error> {
        let list: Self = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        list.validate()?;
        Ok(list)
    }

    /// Load a package list file; relative package paths resolve against the
    /// directory containing the list.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|_| ConfigError::NotFound {
            path: path.display().to_string(),
        })?;
        let mut list = Self::from_toml(&contents)?;
        if let Some(base) = path.parent() {
            for package in &mut list.packages {
                if package.path.is_relative() {
                    package.path = base.join(&package.path);
                }
            }
        }
        Ok(list)
    }

    fn validate(&self) -> Result<(), Error> {
        for package in &self.packages {
            if package.id.trim().is_empty() || package.version.trim().is_empty() {
                return Err(PackageError::InvalidFormat {
                    message: format!(
                        "package list entry for {} needs both id and version",
                        package.path.display()
                    ),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_package_list() {
        let list = PackageList::from_toml(
            r#"
            [[package]]
            id = "Tool"
            version = "1.0.0"
            is_single_payload = true
            path = "Tool.1.0.0.nupkg"

            [[package]]
            id = "Tool.Plugins"
            version = "1.0.0"
            path = "Tool.Plugins.zip"
            "#,
        )
        .unwrap();

        assert_eq!(list.packages.len(), 2);
        assert!(list.packages[0].is_single_payload);
        assert!(!list.packages[1].is_single_payload);
    }

    #[test]
    fn test_empty_id_rejected() {
        let result = PackageList::from_toml(
            r#"
            [[package]]
            id = ""
            version = "1.0.0"
            path = "x.zip"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let list_path = dir.path().join("packages.toml");
        std::fs::write(
            &list_path,
            "[[package]]\nid = \"A\"\nversion = \"1\"\npath = \"a.zip\"\n",
        )
        .unwrap();

        let list = PackageList::load(&list_path).unwrap();
        assert_eq!(list.packages[0].path, dir.path().join("a.zip"));
    }
}
