//! Turtlebot4 Launch
//!
//! Launch composer for the Turtlebot4 robot bring-up.
//!
//! # Overview
//!
//! A launch description declares arguments, a namespace source and an
//! ordered set of node templates. The composer:
//! - Resolves argument overrides against their defaults and allowed values
//! - Evaluates each node's activation condition once
//! - Emits an ordered list of [`ProcessDirective`]s with fully resolved parameters
//!
//! The [`runtime`] module can then start the directives as child processes.
//!
//! # Example Launch File
//!
//! ```yaml
//! version: "1.0"
//!
//! args:
//!   model:
//!     default: standard
//!     choices: [standard, lite]
//!
//! namespace:
//!   env: ROBOT_NAMESPACE
//!   default: ""
//!
//! nodes:
//!   turtlebot4_base_node:
//!     package: turtlebot4_base
//!     executable: turtlebot4_base_node
//!     output: screen
//!     parameters:
//!       - file: "$(find-pkg-share turtlebot4_bringup)/config/turtlebot4.yaml"
//!     condition:
//!       if_equals: { arg: model, value: standard }
//! ```

pub mod cli;
pub mod composer;
pub mod computed;
pub mod config;
pub mod directive;
pub mod error;
pub mod plan;
pub mod runtime;

pub use cli::LaunchArgs;
pub use composer::{LaunchArgument, LaunchComposer, ResolvedArguments};
pub use computed::{CommandError, CommandRunner, SystemCommandRunner};
pub use config::{
    BuiltinLaunch, Condition, Environment, LaunchFile, LaunchFileError, PackageError,
    PackageIndex, SubstitutionContext, SubstitutionError,
};
pub use directive::{ParameterSource, ProcessDirective};
pub use error::{ErrorKind, LaunchError};
pub use plan::{LaunchPlan, PlanError, PlanFormat};
pub use runtime::{
    CommandLine, CommandLineError, ManagedProcess, ProcessError, ProcessEvent, ProcessStatus,
    Supervisor, SupervisorConfig, SupervisorError,
};
