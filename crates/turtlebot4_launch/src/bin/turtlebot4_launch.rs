//! Turtlebot4 Launch CLI
//!
//! Usage:
//!   turtlebot4_launch robot
//!   turtlebot4_launch robot_full -a model:=lite -a use_sim:=true
//!   turtlebot4_launch robot --dry-run --format yaml
//!   turtlebot4_launch launch/custom.launch.yaml --validate

use tokio::sync::watch;
use turtlebot4_launch::{
    Environment, LaunchArgs, LaunchComposer, PackageIndex, Supervisor, SupervisorConfig,
};

#[tokio::main]
async fn main() {
    let args: LaunchArgs = argh::from_env();

    // Initialize logging
    let env = env_logger::Env::default().default_filter_or(args.log_filter());
    env_logger::init_from_env(env);

    // Load launch description
    log::info!("Loading launch description: {}", args.launch);
    let launch_file = match args.load_launch_file() {
        Ok(lf) => lf,
        Err(e) => {
            log::error!("Failed to load launch description: {}", e);
            std::process::exit(1);
        }
    };

    let packages = args
        .prefix
        .iter()
        .rev()
        .fold(PackageIndex::from_environment(&Environment::System), |index, prefix| {
            index.with_prefix(prefix.clone())
        });
    log::debug!("Install prefixes: {:?}", packages.prefixes());

    let composer = match LaunchComposer::from_launch_file(launch_file, packages) {
        Ok(c) => c,
        Err(e) => {
            log::error!("Invalid launch description: {}", e);
            std::process::exit(1);
        }
    };

    // Validate only mode
    if args.validate {
        println!("Launch description '{}' is valid", args.launch);
        println!("Arguments:");
        for arg in composer.arguments() {
            let choices = if arg.choices.is_empty() {
                String::new()
            } else {
                format!(" [{}]", arg.choices.join(", "))
            };
            println!("  {} (default: '{}'){}", arg.name, arg.default, choices);
            if !arg.description.is_empty() {
                println!("      {}", arg.description);
            }
        }
        return;
    }

    let plan = match composer.plan(&args.arg_overrides()) {
        Ok(plan) => plan,
        Err(e) => {
            log::error!("Failed to compose launch ({:?} error): {}", e.kind(), e);
            std::process::exit(1);
        }
    };

    // Dry run mode
    if args.dry_run {
        match plan.render(args.format) {
            Ok(rendered) => print!("{}", rendered),
            Err(e) => {
                log::error!("Failed to render launch plan: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let mut supervisor = Supervisor::new(SupervisorConfig::default());
    if let Err(e) = supervisor.prepare(&plan.directives, composer.packages()) {
        match e.kind() {
            Some(kind) => log::error!("Failed to prepare launch ({:?} error): {}", kind, e),
            None => log::error!("Failed to prepare launch: {}", e),
        }
        std::process::exit(1);
    }

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    // Set up Ctrl+C handler
    {
        let shutdown_tx = shutdown_tx.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            log::info!("Received Ctrl+C, initiating shutdown...");
            let _ = shutdown_tx.send(());
        }) {
            log::error!("Error setting Ctrl+C handler: {}", e);
            std::process::exit(1);
        }
    }

    // Launch all nodes
    if let Err(e) = supervisor.launch(&shutdown_rx).await {
        log::error!("Launch failed: {}", e);
        supervisor.shutdown().await;
        std::process::exit(1);
    }

    // Wait for shutdown signal or all processes to exit
    supervisor.wait(shutdown_rx).await;

    // Shutdown all processes
    supervisor.shutdown().await;

    log::info!("Turtlebot4 launcher exiting");
}
