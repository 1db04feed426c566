//! Installed package lookup over ament install prefixes

use crate::config::substitution::Environment;
use std::path::{Path, PathBuf};

/// Environment variable listing install prefixes, colon separated
pub const PREFIX_PATH_ENV: &str = "AMENT_PREFIX_PATH";

/// Ordered list of install prefixes to search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageIndex {
    prefixes: Vec<PathBuf>,
}

impl PackageIndex {
    pub fn new(prefixes: Vec<PathBuf>) -> Self {
        Self { prefixes }
    }

    /// Build from `AMENT_PREFIX_PATH` in the given environment
    pub fn from_environment(environment: &Environment) -> Self {
        let prefixes = environment
            .get(PREFIX_PATH_ENV)
            .map(|value| parse_prefix_path(&value))
            .unwrap_or_default();
        Self { prefixes }
    }

    /// Search `prefix` before every prefix already known
    pub fn with_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.prefixes.insert(0, prefix.into());
        self
    }

    pub fn prefixes(&self) -> &[PathBuf] {
        &self.prefixes
    }

    /// Locate `<prefix>/share/<package>`
    pub fn share_dir(&self, package: &str) -> Result<PathBuf, PackageError> {
        self.find(|prefix| prefix.join("share").join(package), Path::is_dir)
            .ok_or_else(|| PackageError::PackageNotFound {
                package: package.to_string(),
                searched: self.prefixes.len(),
            })
    }

    /// Locate `<prefix>/lib/<package>/<executable>`
    pub fn executable(&self, package: &str, executable: &str) -> Result<PathBuf, PackageError> {
        self.find(
            |prefix| prefix.join("lib").join(package).join(executable),
            Path::is_file,
        )
        .ok_or_else(|| PackageError::ExecutableNotFound {
            package: package.to_string(),
            executable: executable.to_string(),
        })
    }

    fn find(
        &self,
        candidate: impl Fn(&Path) -> PathBuf,
        exists: impl Fn(&Path) -> bool,
    ) -> Option<PathBuf> {
        self.prefixes
            .iter()
            .map(|prefix| candidate(prefix))
            .find(|path| exists(path))
    }
}

fn parse_prefix_path(value: &str) -> Vec<PathBuf> {
    value
        .split(':')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Errors locating installed resources
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("Package '{package}' not found in {searched} install prefix(es)")]
    PackageNotFound { package: String, searched: usize },

    #[error("Executable '{executable}' not found in package '{package}'")]
    ExecutableNotFound { package: String, executable: String },
}
