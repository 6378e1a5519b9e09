mod commands;
mod logging;
mod repl;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use buffkeep_core::catalog::{default_custom_dir, load_definitions};
use buffkeep_core::{BuffService, EntityRegistry, TokioWorldClock};
use buffkeep_types::EngineConfig;
use commands::AppState;
use repl::readline;

#[derive(Parser)]
#[command(version, about = "Interactive buff engine console")]
struct Args {
    /// Engine config file (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Builtin buff definition directory
    #[arg(short, long)]
    definitions: Option<PathBuf>,

    /// Custom buff definition directory (overrides builtins by name)
    #[arg(long)]
    custom: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();
    let (mut config, config_error) = load_config(args.config.as_deref());
    if args.definitions.is_some() {
        config.builtin_definitions = args.definitions;
    }
    if args.custom.is_some() {
        config.custom_definitions = args.custom;
    }
    let _log_guard = logging::init(&config.log);
    if let Some(e) = config_error {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
    }

    let custom_dir = config.custom_definitions.clone().or_else(default_custom_dir);
    let definitions = Arc::new(
        load_definitions(config.builtin_definitions.as_deref(), custom_dir.as_deref())
            .map_err(|e| e.to_string())?,
    );

    let clock = Arc::new(TokioWorldClock::new(config.world_time_offset));
    let BuffService {
        handle,
        mut notifications,
        tasks,
    } = BuffService::spawn(
        &config,
        definitions.clone(),
        definitions.clone(),
        clock,
        EntityRegistry::new(),
    );

    let printer_defs = definitions.clone();
    let printer = tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            println!("{}", commands::describe(&notification, &printer_defs));
        }
    });

    let state = AppState {
        service: handle,
        definitions,
    };

    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, &state).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                tracing::debug!(%line, error = %err.trim_end(), "Command failed");
                write!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    tracing::info!("Shutting down buff service");
    state.service.shutdown();
    tasks.join().await;
    printer.abort();
    Ok(())
}

/// Load the engine config, falling back to defaults.
///
/// The error is handed back rather than logged since logging is configured
/// from the result.
fn load_config(path: Option<&Path>) -> (EngineConfig, Option<confy::ConfyError>) {
    let loaded: Result<EngineConfig, confy::ConfyError> = match path {
        Some(path) => confy::load_path(path),
        None => confy::load("buffkeep", None),
    };
    match loaded {
        Ok(config) => (config, None),
        Err(e) => (EngineConfig::default(), Some(e)),
    }
}

#[derive(Parser)]
#[command(version, about = "buffkeep console")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a creature
    Spawn {
        #[arg(short, long)]
        id: i64,
        #[arg(short, long)]
        name: String,
        /// World-clock NPC instead of a player
        #[arg(long)]
        npc: bool,
        /// Play time already banked (players only)
        #[arg(short, long, default_value_t = 0)]
        play_time: i64,
    },
    Apply {
        #[arg(short, long)]
        target: i64,
        #[arg(short, long)]
        buff: String,
        #[arg(short, long, default_value_t = 0)]
        source: i64,
    },
    Remove {
        #[arg(short, long)]
        target: i64,
        #[arg(short, long)]
        buff: String,
    },
    Kill {
        #[arg(short, long)]
        target: i64,
    },
    Disconnect {
        #[arg(short, long)]
        target: i64,
    },
    Reconnect {
        #[arg(short, long)]
        target: i64,
    },
    Destroy {
        #[arg(short, long)]
        target: i64,
    },
    Status {
        #[arg(short, long)]
        target: i64,
    },
    Buffs {
        #[arg(short, long)]
        target: i64,
    },
    /// Set a creature's movement scale, as a movement ability would
    Scale {
        #[arg(short, long)]
        target: i64,
        #[arg(short, long)]
        scale: f32,
    },
    Definitions,
    Exit,
}

async fn respond(line: &str, state: &AppState) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "buffkeep".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match &cli.command {
        Some(Commands::Spawn {
            id,
            name,
            npc,
            play_time,
        }) => commands::spawn(state, *id, name, *npc, *play_time)?,
        Some(Commands::Apply {
            target,
            buff,
            source,
        }) => commands::apply(state, *target, buff, *source).await?,
        Some(Commands::Remove { target, buff }) => commands::remove(state, *target, buff).await?,
        Some(Commands::Kill { target }) => commands::kill(state, *target).await?,
        Some(Commands::Disconnect { target }) => commands::disconnect(state, *target).await?,
        Some(Commands::Reconnect { target }) => commands::reconnect(state, *target).await?,
        Some(Commands::Destroy { target }) => commands::destroy(state, *target).await?,
        Some(Commands::Status { target }) => commands::status(state, *target)?,
        Some(Commands::Buffs { target }) => commands::buffs(state, *target)?,
        Some(Commands::Scale { target, scale }) => commands::scale(state, *target, *scale)?,
        Some(Commands::Definitions) => commands::definitions(state)?,
        Some(Commands::Exit) => {
            commands::exit();
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
