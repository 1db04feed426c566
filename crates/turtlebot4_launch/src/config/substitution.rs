//! Substitution engine for $(arg), $(env), $(find-pkg-share) patterns

use crate::config::package::{PackageError, PackageIndex};
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Regex for matching substitution patterns: $(type value) or $(type)
///
/// The value may not contain parentheses, so an inner `$(...)` is expanded
/// first and the outer pattern matches on the next pass.
static SUBSTITUTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\(([\w-]+)\s+([^()]+)\)|\$\(([\w-]+)\)").expect("valid substitution regex")
});

const MAX_ITERATIONS: usize = 10;

/// Delimits the index of a literal argument value held back until the end
const SPLICE_MARK: char = '\u{E000}';

static SPLICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("\u{E000}(\\d+)\u{E000}").expect("valid splice regex")
});

/// Environment snapshot used for `$(env ...)` and namespace lookups
#[derive(Debug, Clone, Default)]
pub enum Environment {
    /// Read the process environment
    #[default]
    System,
    /// Fixed set of variables, nothing else is visible
    Fixed(HashMap<String, String>),
}

impl Environment {
    /// Environment with no variables set
    pub fn empty() -> Self {
        Environment::Fixed(HashMap::new())
    }

    /// Look up a variable
    pub fn get(&self, name: &str) -> Option<String> {
        match self {
            Environment::System => std::env::var(name).ok(),
            Environment::Fixed(vars) => vars.get(name).cloned(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Environment::Fixed(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Substitution context containing all available variables
#[derive(Debug, Clone, Default)]
pub struct SubstitutionContext {
    /// Launch arguments
    pub args: HashMap<String, String>,
    /// Arguments whose values are inserted verbatim and never re-expanded
    pub literal: HashSet<String>,
    /// Environment lookups
    pub environment: Environment,
    /// Installed packages for `$(find-pkg-share ...)`
    pub packages: PackageIndex,
}

impl SubstitutionContext {
    /// Create a new substitution context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Add multiple arguments
    pub fn with_args<I, K, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.args
            .extend(args.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add arguments whose values are final: they are spliced into the
    /// result as-is, even when they contain `$(...)` text
    pub fn with_literal_args<I, K, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in args {
            let name = name.into();
            self.literal.insert(name.clone());
            self.args.insert(name, value.into());
        }
        self
    }

    /// Set the environment snapshot
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Set the package index
    pub fn with_packages(mut self, packages: PackageIndex) -> Self {
        self.packages = packages;
        self
    }

    /// Substitute all patterns in a string
    pub fn substitute(&self, input: &str) -> Result<String, SubstitutionError> {
        let mut spliced = Vec::new();
        let mut result = input.to_string();
        let mut last_result = String::new();

        // Iterate until no more substitutions are made (handles nested substitutions)
        let mut iterations = 0;

        while result != last_result && iterations < MAX_ITERATIONS {
            last_result = result.clone();
            result = self.substitute_once(&result, &mut spliced)?;
            iterations += 1;
        }

        if result != last_result && SUBSTITUTION_PATTERN.is_match(&result) {
            return Err(SubstitutionError::MaxIterationsExceeded(input.to_string()));
        }

        Ok(splice(&result, &spliced))
    }

    /// Perform a single pass of substitution
    fn substitute_once(
        &self,
        input: &str,
        spliced: &mut Vec<String>,
    ) -> Result<String, SubstitutionError> {
        let mut error: Option<SubstitutionError> = None;

        let result = SUBSTITUTION_PATTERN.replace_all(input, |caps: &Captures| {
            if error.is_some() {
                return String::new();
            }

            match self.resolve_capture(caps, spliced) {
                Ok(value) => value,
                Err(e) => {
                    error = Some(e);
                    String::new()
                }
            }
        });

        if let Some(e) = error {
            return Err(e);
        }

        Ok(result.into_owned())
    }

    /// Resolve a single capture group
    fn resolve_capture(
        &self,
        caps: &Captures,
        spliced: &mut Vec<String>,
    ) -> Result<String, SubstitutionError> {
        let (subst_type, value) = match (caps.get(1), caps.get(2), caps.get(3)) {
            // $(type value), e.g. $(arg model)
            (Some(subst_type), Some(value), _) => {
                (subst_type.as_str(), splice(value.as_str().trim(), spliced))
            }
            // $(type) with no value
            (_, _, Some(subst_type)) => (subst_type.as_str(), String::new()),
            _ => {
                return Err(SubstitutionError::InvalidPattern(
                    caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default(),
                ))
            }
        };

        if subst_type == "arg" && self.literal.contains(&value) {
            let arg = self.resolve_arg(&value)?;
            spliced.push(arg);
            return Ok(format!("{SPLICE_MARK}{}{SPLICE_MARK}", spliced.len() - 1));
        }

        self.resolve_typed(subst_type, &value)
    }

    /// Resolve a typed substitution
    fn resolve_typed(&self, subst_type: &str, value: &str) -> Result<String, SubstitutionError> {
        match subst_type {
            "arg" => self.resolve_arg(value),
            "env" => self.resolve_env(value),
            "find-pkg-share" => self.resolve_package_share(value),
            _ => Err(SubstitutionError::UnknownType(subst_type.to_string())),
        }
    }

    /// Resolve an argument reference
    fn resolve_arg(&self, name: &str) -> Result<String, SubstitutionError> {
        if name.is_empty() {
            return Err(SubstitutionError::InvalidPattern("$(arg)".to_string()));
        }
        self.args
            .get(name)
            .cloned()
            .ok_or_else(|| SubstitutionError::UndefinedArg(name.to_string()))
    }

    /// Resolve `NAME` or `NAME DEFAULT`
    fn resolve_env(&self, value: &str) -> Result<String, SubstitutionError> {
        let (name, default) = match value.split_once(char::is_whitespace) {
            Some((name, default)) => (name, Some(unquote(default.trim()))),
            None => (value, None),
        };
        if name.is_empty() {
            return Err(SubstitutionError::InvalidPattern("$(env)".to_string()));
        }

        match (self.environment.get(name), default) {
            (Some(v), _) => Ok(v),
            (None, Some(default)) => Ok(default.to_string()),
            (None, None) => Err(SubstitutionError::UndefinedEnv(name.to_string())),
        }
    }

    fn resolve_package_share(&self, package: &str) -> Result<String, SubstitutionError> {
        let dir = self.packages.share_dir(package)?;
        Ok(dir.to_string_lossy().into_owned())
    }
}

/// Put held-back literal values in place of their marks
fn splice(text: &str, values: &[String]) -> String {
    if !text.contains(SPLICE_MARK) {
        return text.to_string();
    }
    SPLICE_PATTERN
        .replace_all(text, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| values.get(i))
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

fn unquote(s: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}

/// Errors that can occur during substitution
#[derive(Debug, thiserror::Error)]
pub enum SubstitutionError {
    #[error("Unknown substitution type: {0}")]
    UnknownType(String),

    #[error("Undefined argument: {0}")]
    UndefinedArg(String),

    #[error("Undefined environment variable: {0}")]
    UndefinedEnv(String),

    #[error("Invalid substitution pattern: {0}")]
    InvalidPattern(String),

    #[error("Maximum substitution iterations exceeded for: {0}")]
    MaxIterationsExceeded(String),

    #[error(transparent)]
    Package(#[from] PackageError),
}
