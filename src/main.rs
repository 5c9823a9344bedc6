use clap::Parser;
use tagdex::cli::commands;
use tagdex::cli::{Cli, Commands};
use tagdex::config::Settings;

fn load_settings(cli: &Cli) -> Settings {
    let loaded = match &cli.config {
        Some(path) => Settings::load_from(path).map(|mut settings| {
            if settings.workspace_root.is_none() {
                settings.workspace_root = path
                    .parent()
                    .and_then(|dir| dir.parent())
                    .map(|root| root.to_path_buf());
            }
            settings
        }),
        None => Settings::load(),
    };
    loaded.unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // For non-init commands, check if project is initialized
    if !matches!(cli.command, Commands::Init { .. }) && cli.config.is_none() {
        if let Err(warning) = Settings::check_init() {
            eprintln!("Warning: {warning}");
            eprintln!("Using default configuration for now.");
        }
    }

    let mut config = load_settings(&cli);
    tagdex::logging::init_with_config(&config.logging);

    match cli.command {
        Commands::Init { force } => commands::init::run_init(force),
        Commands::Config => commands::init::run_config(&config),
        Commands::Clear => commands::init::run_clear(&config),
        Commands::Index {
            project,
            force,
            batch,
            threads,
        } => commands::index::run(
            commands::index::IndexArgs {
                project,
                force,
                batch,
                threads,
            },
            &mut config,
        ),
        Commands::Update {
            project,
            added,
            changed,
            removed,
        } => commands::index::run_update(&config, project, added, changed, removed),
        Commands::Remove { path, project } => commands::index::run_remove(&config, path, project),
        Commands::Retrieve { query } => {
            if !commands::retrieve::run(query, &config)? {
                std::process::exit(3);
            }
            Ok(())
        }
    }
}
