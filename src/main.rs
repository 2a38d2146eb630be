//! tg CLI - move tasks and subtasks within and between tags.

use clap::Parser;
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use tagtask::action_log::{self, ActionOutcome};
use tagtask::cli::{Cli, Commands, MoveArgs};
use tagtask::commands::{self, Output};
use tagtask::config::{ConfigOverrides, OutputFormat, ResolvedConfig, resolve_config};
use tracing_subscriber::EnvFilter;

/// Filter directives for diagnostics, e.g. `TG_LOG=tagtask=debug`.
const LOG_ENV: &str = "TG_LOG";

/// Set to `json` for structured diagnostics.
const LOG_FORMAT_ENV: &str = "TG_LOG_FORMAT";

/// Marker directory that identifies a project root.
const PROJECT_MARKER: &str = ".taskmaster";

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let human_flag = cli.human_readable;

    // Determine project path: --repo flag > TG_REPO env > nearest .taskmaster > cwd
    let project_root = resolve_project_root(cli.repo_path.clone(), human_flag);

    let mut overrides = ConfigOverrides::new();
    if let Some(ref path) = cli.tasks_file {
        overrides = overrides.with_tasks_file(path.clone());
    }
    if human_flag {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    if let Commands::Move(MoveArgs {
        max_depth: Some(depth),
        ..
    }) = &cli.command
    {
        overrides = overrides.with_max_dependency_depth(*depth);
    }

    let config = match resolve_config(&project_root, &overrides) {
        Ok(config) => config,
        Err(e) => {
            report_error(&e, human_flag);
            process::exit(1);
        }
    };
    let human = config.output_format() == OutputFormat::Human;

    // Serialize command for logging
    let (cmd_name, args_json) = serialize_command(&cli.command);

    let start = Instant::now();
    let result = run_command(cli.command, &config, human);
    let duration = start.elapsed().as_millis() as u64;

    let outcome = match &result {
        Ok(()) => ActionOutcome::success(),
        Err(e) => ActionOutcome::failure(e),
    };
    action_log::log_action(&config, &cmd_name, args_json, outcome, duration);

    if let Err(e) = result {
        report_error(&e, human);
        process::exit(1);
    }
}

/// Diagnostics go to stderr so stdout stays machine readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

/// Resolve the project path based on explicit flag, environment variable, or auto-detection.
///
/// An explicit path (via -C/--repo or TG_REPO) is used literally and must
/// exist. Otherwise the nearest ancestor of the current directory holding a
/// `.taskmaster` directory is used, falling back to the current directory.
fn resolve_project_root(explicit_path: Option<PathBuf>, human: bool) -> PathBuf {
    match explicit_path {
        Some(path) => {
            if !path.exists() {
                let err = tagtask::Error::InvalidInput(format!(
                    "Specified repo path does not exist: {}",
                    path.display()
                ));
                report_error(&err, human);
                process::exit(1);
            }
            path
        }
        None => {
            let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            find_project_root(&cwd).unwrap_or(cwd)
        }
    }
}

fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_MARKER).is_dir())
        .map(Path::to_path_buf)
}

fn run_command(command: Commands, config: &ResolvedConfig, human: bool) -> Result<(), tagtask::Error> {
    match command {
        Commands::Init => output(&commands::init(config)?, human),
        Commands::Move(args) => {
            let policy = args.policy();
            match (args.from_tag, args.to_tag, args.to) {
                (Some(from_tag), Some(to_tag), _) => {
                    let result = commands::move_between_tags(
                        config,
                        &args.from,
                        &from_tag,
                        &to_tag,
                        policy,
                        args.dry_run,
                    )?;
                    output(&result, human);
                }
                (None, None, Some(to)) => {
                    let result = commands::move_within_tag(
                        config,
                        &args.from,
                        &to,
                        args.tag.as_deref(),
                        args.dry_run,
                    )?;
                    output(&result, human);
                }
                _ => {
                    return Err(tagtask::Error::InvalidInput(
                        "Give --to for a move within a tag, or both --from-tag and --to-tag".to_string(),
                    ));
                }
            }
        }
        Commands::Tags => output(&commands::tags(config)?, human),
        Commands::Validate { tag } => output(&commands::validate(config, tag.as_deref())?, human),
    }
    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Print an error: plain text for humans, `{error, code, data}` JSON otherwise.
fn report_error(error: &tagtask::Error, human: bool) {
    if human {
        eprintln!("Error: {}", error);
        if let Some(suggestions) = error.data().get("suggestions").and_then(|s| s.as_array()) {
            for suggestion in suggestions.iter().filter_map(|s| s.as_str()) {
                eprintln!("  hint: {}", suggestion);
            }
        }
    } else {
        let body = serde_json::json!({
            "error": error.to_string(),
            "code": error.code(),
            "data": error.data(),
        });
        eprintln!("{}", body);
    }
}

fn serialize_command(command: &Commands) -> (String, serde_json::Value) {
    match command {
        Commands::Init => ("init".to_string(), serde_json::json!({})),
        Commands::Move(args) => (
            "move".to_string(),
            serde_json::json!({
                "from": args.from,
                "to": args.to,
                "tag": args.tag,
                "from_tag": args.from_tag,
                "to_tag": args.to_tag,
                "with_dependencies": args.with_dependencies,
                "ignore_dependencies": args.ignore_dependencies,
                "max_depth": args.max_depth,
                "dry_run": args.dry_run,
            }),
        ),
        Commands::Tags => ("tags".to_string(), serde_json::json!({})),
        Commands::Validate { tag } => ("validate".to_string(), serde_json::json!({ "tag": tag })),
    }
}
