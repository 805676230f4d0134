use std::fmt;
use std::str::FromStr;

use progress_core::model::{Module, ProgressData};
use serde_json::{Map, Value};
use services::config::normalize_sqlite_url;
use services::{AppServices, Clock, ProgressSync, SyncConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArg { name: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidModule { raw: String },
    InvalidField { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArg { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidModule { raw } => write!(f, "unknown module: {raw}"),
            ArgsError::InvalidField { raw } => {
                write!(f, "expected key=value, got: {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--db <sqlite_url>] [--offline] <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  status                                  user id, connectivity, pending count");
    eprintln!("  save <module> <item-id> [key=value ...] record progress on one item");
    eprintln!("  unlock <achievement-id>                 unlock an achievement");
    eprintln!("  stats [key=value ...]                   merge fields into stats");
    eprintln!("  overall                                 aggregate completion");
    eprintln!("  resync                                  flush queued updates");
    eprintln!();
    eprintln!("Modules: bokforing, quiz, analyse, case_studies, hjernetrim");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PROGRESS_DB_URL, PROGRESS_REMOTE_URL, PROGRESS_API_KEY, PROGRESS_AUTH_URL,");
    eprintln!("  PROGRESS_HTTP_TIMEOUT_SECS, PROGRESS_START_ONLINE, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Status,
    Save {
        module: Module,
        item_id: String,
        data: ProgressData,
    },
    Unlock {
        id: String,
    },
    Stats {
        fields: Map<String, Value>,
    },
    Overall,
    Resync,
}

impl Command {
    fn parse(name: &str, rest: Vec<String>) -> Result<Self, ArgsError> {
        let mut rest = rest.into_iter();
        let command = match name {
            "status" => Self::Status,
            "overall" => Self::Overall,
            "resync" => Self::Resync,
            "save" => {
                let raw = rest.next().ok_or(ArgsError::MissingArg { name: "module" })?;
                let module =
                    Module::from_str(&raw).map_err(|_| ArgsError::InvalidModule { raw })?;
                let item_id = rest.next().ok_or(ArgsError::MissingArg { name: "item-id" })?;
                let data = ProgressData::from_map(parse_fields(&mut rest)?);
                return Ok(Self::Save {
                    module,
                    item_id,
                    data,
                });
            }
            "unlock" => {
                let id = rest.next().ok_or(ArgsError::MissingArg {
                    name: "achievement-id",
                })?;
                Self::Unlock { id }
            }
            "stats" => {
                return Ok(Self::Stats {
                    fields: parse_fields(&mut rest)?,
                });
            }
            other => return Err(ArgsError::UnknownCommand(other.to_owned())),
        };

        match rest.next() {
            Some(extra) => Err(ArgsError::UnknownArg(extra)),
            None => Ok(command),
        }
    }
}

/// `key=value` pairs; values are JSON when they parse as JSON, text otherwise.
fn parse_fields(args: &mut impl Iterator<Item = String>) -> Result<Map<String, Value>, ArgsError> {
    let mut fields = Map::new();
    for raw in args {
        let Some((key, value)) = raw.split_once('=') else {
            return Err(ArgsError::InvalidField { raw });
        };
        if key.is_empty() {
            return Err(ArgsError::InvalidField { raw });
        }
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
        fields.insert(key.to_owned(), value);
    }
    Ok(fields)
}

struct Args {
    db_url: Option<String>,
    offline: bool,
    command: Command,
}

impl Args {
    /// `None` when help was requested.
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut args = args.into_iter();
        let mut db_url = None;
        let mut offline = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = Some(normalize_sqlite_url(value));
                }
                "--offline" => offline = true,
                "--help" | "-h" => return Ok(None),
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => {
                    let command = Command::parse(&arg, args.collect())?;
                    return Ok(Some(Self {
                        db_url,
                        offline,
                        command,
                    }));
                }
            }
        }

        Ok(Some(Self {
            db_url,
            offline,
            command: Command::Status,
        }))
    }
}

fn prepare_sqlite_dir(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn execute(sync: &ProgressSync, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Status => {
            let user = sync
                .user_id()
                .map_or_else(|| "(local only)".to_owned(), |id| id.to_string());
            println!("user:    {user}");
            println!("online:  {}", sync.is_online());
            println!("pending: {}", sync.pending_updates().len());
        }
        Command::Save {
            module,
            item_id,
            data,
        } => {
            let record = sync.save_progress(module, &item_id, data).await;
            print_json(&record)?;
        }
        Command::Unlock { id } => {
            let outcome = sync.unlock_achievement(&id).await;
            if !outcome.is_new() {
                println!("{id} was already unlocked");
            }
            print_json(&outcome.achievement())?;
        }
        Command::Stats { fields } => {
            sync.update_stats(fields).await;
            print_json(&sync.get_stats())?;
        }
        Command::Overall => {
            let overall = sync.calculate_overall_progress();
            for (module, progress) in &overall.modules {
                println!(
                    "{:<14} {:>4} / {:<4}",
                    module.as_str(),
                    progress.completed,
                    progress.total
                );
            }
            println!(
                "{:<14} {:>4} / {:<4} ({}%)",
                "overall", overall.completed, overall.total, overall.percent
            );
        }
        Command::Resync => {
            let outcome = sync.resync().await;
            println!("{outcome:?}");
        }
    }

    let pending = sync.pending_updates().len();
    if pending > 0 {
        println!("{pending} update(s) queued for the next resync");
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = match Args::parse(std::env::args().skip(1)) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(err) => {
            print_usage();
            return Err(err.into());
        }
    };

    let mut config = SyncConfig::from_env()?;
    if let Some(db_url) = parsed.db_url {
        config.db_url = db_url;
    }
    if parsed.offline {
        config.start_online = false;
    }
    debug!(db = %config.db_url, online = config.start_online, "starting");

    // The local store creates the file; only the directory has to exist.
    prepare_sqlite_dir(&config.db_url)?;
    let services = AppServices::from_config(&config, Clock::default_clock()).await?;
    let sync = services.progress();

    sync.init().await?;
    let result = execute(&sync, parsed.command).await;
    sync.shutdown();
    result
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn save_parses_module_and_typed_fields() {
        let parsed = Args::parse(args(&[
            "--offline",
            "save",
            "quiz",
            "q7",
            "score=80",
            "completed=true",
            "note=well done",
        ]))
        .unwrap()
        .unwrap();

        assert!(parsed.offline);
        let Command::Save {
            module,
            item_id,
            data,
        } = parsed.command
        else {
            panic!("expected save");
        };
        assert_eq!(module, Module::Quiz);
        assert_eq!(item_id, "q7");
        assert_eq!(data.fields()["score"], json!(80));
        assert_eq!(data.fields()["completed"], json!(true));
        assert_eq!(data.fields()["note"], json!("well done"));
    }

    #[test]
    fn no_command_means_status() {
        let parsed = Args::parse(args(&["--db", "sqlite://x.db"])).unwrap().unwrap();
        assert_eq!(parsed.command, Command::Status);
        assert_eq!(parsed.db_url.as_deref(), Some("sqlite://x.db"));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            Args::parse(args(&["save", "history", "x"])),
            Err(ArgsError::InvalidModule { .. })
        ));
        assert!(matches!(
            Args::parse(args(&["stats", "streak"])),
            Err(ArgsError::InvalidField { .. })
        ));
        assert!(matches!(
            Args::parse(args(&["unlock"])),
            Err(ArgsError::MissingArg { .. })
        ));
        assert!(matches!(
            Args::parse(args(&["resync", "now"])),
            Err(ArgsError::UnknownArg(_))
        ));
        assert!(matches!(Args::parse(args(&["--help"])), Ok(None)));
    }

    #[test]
    fn relative_db_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/progress.db".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/progress.db"));
    }
}
