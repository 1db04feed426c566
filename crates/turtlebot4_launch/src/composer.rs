//! Launch composer - resolves arguments and emits process directives

use crate::computed::{CommandRunner, SystemCommandRunner};
use crate::config::{
    ComputedValue, Environment, InlineValue, LaunchFile, NamespaceSource, NodeTemplate,
    PackageIndex, ParameterTemplate, ScalarValue, SubstitutionContext,
};
use crate::directive::{ParameterSource, ProcessDirective};
use crate::error::LaunchError;
use crate::plan::LaunchPlan;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Declared launch argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchArgument {
    pub name: String,
    /// Default value, may contain substitutions
    pub default: String,
    /// Allowed values (empty = unconstrained)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    pub description: String,
}

impl LaunchArgument {
    pub fn new(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            choices: Vec::new(),
            description: String::new(),
        }
    }

    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether `value` satisfies the allowed-value set
    pub fn allows(&self, value: &str) -> bool {
        self.choices.is_empty() || self.choices.iter().any(|c| c == value)
    }

    fn default_is_template(&self) -> bool {
        self.default.contains("$(")
    }
}

/// Argument values and namespace after resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedArguments {
    values: IndexMap<String, String>,
    namespace: String,
}

impl ResolvedArguments {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Values in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Turns a launch description into an ordered list of process directives
pub struct LaunchComposer {
    arguments: IndexMap<String, LaunchArgument>,
    namespace: NamespaceSource,
    nodes: IndexMap<String, NodeTemplate>,
    packages: PackageIndex,
    environment: Environment,
    runner: Box<dyn CommandRunner>,
}

impl LaunchComposer {
    /// Empty composer with no arguments and no nodes
    pub fn new(packages: PackageIndex) -> Self {
        Self {
            arguments: IndexMap::new(),
            namespace: NamespaceSource::default(),
            nodes: IndexMap::new(),
            packages,
            environment: Environment::System,
            runner: Box::new(SystemCommandRunner),
        }
    }

    /// Composer for a parsed launch description
    pub fn from_launch_file(
        launch_file: LaunchFile,
        packages: PackageIndex,
    ) -> Result<Self, LaunchError> {
        let mut composer = Self::new(packages);

        for (name, def) in launch_file.args {
            let mut argument =
                LaunchArgument::new(name, def.default.to_string()).with_choices(def.choices);
            if let Some(description) = def.description {
                argument = argument.with_description(description);
            }
            composer.declare_argument(argument)?;
        }

        composer.namespace = launch_file.namespace;
        composer.nodes = launch_file.nodes;
        Ok(composer)
    }

    /// Set the environment snapshot used for namespace and `$(env)` lookups
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Replace the runner used for computed parameters
    pub fn with_command_runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    /// Register an argument
    pub fn declare_argument(&mut self, argument: LaunchArgument) -> Result<(), LaunchError> {
        if self.arguments.contains_key(&argument.name) {
            return Err(LaunchError::DuplicateArgument(argument.name));
        }

        // Template defaults are checked once expanded in resolve()
        if !argument.default_is_template() && !argument.allows(&argument.default) {
            return Err(LaunchError::DefaultNotAllowed {
                name: argument.name,
                default: argument.default,
                choices: argument.choices,
            });
        }

        log::debug!(
            "Declared argument '{}' (default: '{}')",
            argument.name,
            argument.default
        );
        self.arguments.insert(argument.name.clone(), argument);
        Ok(())
    }

    /// Declared arguments in declaration order
    pub fn arguments(&self) -> impl Iterator<Item = &LaunchArgument> {
        self.arguments.values()
    }

    pub fn packages(&self) -> &PackageIndex {
        &self.packages
    }

    fn context(&self) -> SubstitutionContext {
        SubstitutionContext::new()
            .with_environment(self.environment.clone())
            .with_packages(self.packages.clone())
    }

    /// Pick the override or default for every declared argument
    pub fn resolve(
        &self,
        overrides: &HashMap<String, String>,
    ) -> Result<ResolvedArguments, LaunchError> {
        let mut unknown: Vec<&String> = overrides
            .keys()
            .filter(|name| !self.arguments.contains_key(*name))
            .collect();
        unknown.sort();
        if let Some(name) = unknown.first() {
            return Err(LaunchError::UnknownArgument((*name).clone()));
        }

        let mut defaults = IndexMap::new();
        let mut overridden = IndexMap::new();
        for (name, arg) in &self.arguments {
            match overrides.get(name) {
                Some(value) => {
                    if !arg.allows(value) {
                        return Err(LaunchError::InvalidChoice {
                            name: name.clone(),
                            value: value.clone(),
                            choices: arg.choices.clone(),
                        });
                    }
                    overridden.insert(name.clone(), value.clone());
                }
                None => {
                    defaults.insert(name.clone(), arg.default.clone());
                }
            }
        }

        let ctx = self
            .context()
            .with_args(defaults)
            .with_literal_args(overridden.clone());

        let mut values = IndexMap::new();
        for (name, arg) in &self.arguments {
            if let Some(value) = overridden.get(name) {
                values.insert(name.clone(), value.clone());
                continue;
            }

            let value = ctx.substitute(&arg.default).map_err(|e| {
                LaunchError::SubstitutionFailed {
                    context: format!("default of argument '{}'", name),
                    source: e,
                }
            })?;
            if !arg.allows(&value) {
                return Err(LaunchError::DefaultNotAllowed {
                    name: name.clone(),
                    default: value,
                    choices: arg.choices.clone(),
                });
            }
            values.insert(name.clone(), value);
        }

        let ctx = self.context().with_literal_args(values.clone());
        let namespace = match &self.namespace {
            NamespaceSource::Fixed(template) => {
                ctx.substitute(template)
                    .map_err(|e| LaunchError::SubstitutionFailed {
                        context: "namespace".to_string(),
                        source: e,
                    })?
            }
            NamespaceSource::FromEnv { env, default } => {
                self.environment.get(env).unwrap_or_else(|| default.clone())
            }
        };

        for (name, value) in &values {
            log::debug!("Argument {}:={}", name, value);
        }
        log::debug!("Namespace: '{}'", namespace);

        Ok(ResolvedArguments { values, namespace })
    }

    /// Build the directive list in declaration order
    pub fn compose(
        &self,
        resolved: &ResolvedArguments,
    ) -> Result<Vec<ProcessDirective>, LaunchError> {
        let ctx = self.context().with_literal_args(resolved.values.clone());
        let mut directives = Vec::with_capacity(self.nodes.len());

        for (name, node) in &self.nodes {
            if !self.is_active(name, node, resolved)? {
                log::debug!("[{}] Skipped, condition '{}' not met", name, node.condition);
                continue;
            }
            directives.push(self.build_directive(name, node, resolved.namespace(), &ctx)?);
        }

        log::info!("Composed {} of {} nodes", directives.len(), self.nodes.len());
        Ok(directives)
    }

    /// Resolve and compose in one step
    pub fn plan(&self, overrides: &HashMap<String, String>) -> Result<LaunchPlan, LaunchError> {
        let arguments = self.resolve(overrides)?;
        let directives = self.compose(&arguments)?;
        Ok(LaunchPlan {
            arguments,
            directives,
        })
    }

    fn is_active(
        &self,
        name: &str,
        node: &NodeTemplate,
        resolved: &ResolvedArguments,
    ) -> Result<bool, LaunchError> {
        let Some(argument) = node.condition.argument() else {
            return Ok(true);
        };
        let value =
            resolved
                .get(argument)
                .ok_or_else(|| LaunchError::UndeclaredConditionArgument {
                    node: name.to_string(),
                    argument: argument.to_string(),
                })?;
        Ok(node.condition.holds(Some(value)))
    }

    fn build_directive(
        &self,
        name: &str,
        node: &NodeTemplate,
        namespace: &str,
        ctx: &SubstitutionContext,
    ) -> Result<ProcessDirective, LaunchError> {
        let mut parameters = Vec::with_capacity(node.parameters.len());

        for param in &node.parameters {
            let source = match param {
                ParameterTemplate::File(template) => {
                    let path = PathBuf::from(ctx.substitute(template).map_err(|e| {
                        LaunchError::SubstitutionFailed {
                            context: format!("node '{}' parameter file", name),
                            source: e,
                        }
                    })?);
                    if !path.is_file() {
                        return Err(LaunchError::MissingParameterFile {
                            node: name.to_string(),
                            path,
                        });
                    }
                    ParameterSource::File(path)
                }
                ParameterTemplate::Inline(map) => {
                    let mut resolved = IndexMap::with_capacity(map.len());
                    for (key, value) in map {
                        let value = match value {
                            InlineValue::Scalar(ScalarValue::String(template)) => {
                                let text = ctx.substitute(template).map_err(|e| {
                                    LaunchError::SubstitutionFailed {
                                        context: format!("node '{}' parameter '{}'", name, key),
                                        source: e,
                                    }
                                })?;
                                if text == *template {
                                    ScalarValue::String(text)
                                } else {
                                    ScalarValue::parse_scalar(&text)
                                }
                            }
                            InlineValue::Scalar(scalar) => scalar.clone(),
                            InlineValue::Computed(computed) => {
                                ScalarValue::String(self.compute(name, key, computed, ctx)?)
                            }
                        };
                        resolved.insert(key.clone(), value);
                    }
                    ParameterSource::Inline(resolved)
                }
            };
            parameters.push(source);
        }

        Ok(ProcessDirective {
            name: name.to_string(),
            package: node.package.clone(),
            executable: node.executable.clone(),
            node_name: node.name.clone(),
            namespace: namespace.to_string(),
            output: node.output,
            parameters,
            condition: node.condition.clone(),
        })
    }

    fn compute(
        &self,
        node: &str,
        parameter: &str,
        computed: &ComputedValue,
        ctx: &SubstitutionContext,
    ) -> Result<String, LaunchError> {
        let argv = computed
            .command
            .iter()
            .map(|part| ctx.substitute(part))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| LaunchError::SubstitutionFailed {
                context: format!("node '{}' parameter '{}' command", node, parameter),
                source: e,
            })?;

        self.runner
            .run(&argv)
            .map_err(|e| LaunchError::ComputedParameterFailed {
                node: node.to_string(),
                parameter: parameter.to_string(),
                source: e,
            })
    }
}
