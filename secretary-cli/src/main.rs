use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use secretary_core::{parse_local_to_utc, Planner};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod state;

#[derive(Parser, Debug)]
#[command(
    name = "secretary",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SECRETARY_BUILD_SHA"), ")"),
    about = "Personal task planner"
)]
struct Cli {
    /// Verbose logging (debug level unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Place tasks on the calendar between --from and --to
    Plan {
        /// Task snapshot (JSON planning context)
        #[arg(long)]
        tasks: PathBuf,

        /// Horizon start (RFC 3339, or local "YYYY-MM-DD HH:MM" in --tz)
        #[arg(long)]
        from: String,

        /// Horizon end
        #[arg(long)]
        to: String,

        /// IANA zone for local timestamps
        #[arg(long, default_value = "UTC")]
        tz: String,

        /// Config file (defaults to ~/.secretary/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Suggest the top tasks to work on next, starting now
    Propose {
        #[arg(long)]
        tasks: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Planner configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config unless one already exists
    Init {
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Print the effective config
    Show {
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    // stdout carries JSON; logs go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_instant(raw: &str, tz: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    parse_local_to_utc(raw, tz).with_context(|| format!("invalid timestamp: {raw}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Plan {
            tasks,
            from,
            to,
            tz,
            config,
        } => {
            let start = parse_instant(&from, &tz)?;
            let end = parse_instant(&to, &tz)?;
            if start >= end {
                bail!("--from must be before --to ({start} >= {end})");
            }

            let cfg = config::load_config(config.as_deref())?;
            let ctx = state::read_context(&tasks)?;
            tracing::debug!(tasks = ctx.tasks.len(), %start, %end, "planning");

            let solution = Planner::new(cfg).solve_context(&ctx, start, end)?;
            println!("{}", serde_json::to_string_pretty(&solution)?);
        }

        Command::Propose { tasks, config } => {
            let cfg = config::load_config(config.as_deref())?;
            let ctx = state::read_context(&tasks)?;

            let response = Planner::new(cfg).propose_context(&ctx)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Command::Config { command } => match command {
            ConfigCommand::Init { path } => config::init_config(path.as_deref())?,
            ConfigCommand::Show { path } => config::show_config(path.as_deref())?,
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rfc3339_ignores_tz_flag() {
        let dt = parse_instant("2026-03-02T09:00:00+01:00", "America/New_York").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap());
    }

    #[test]
    fn local_timestamp_uses_zone() {
        let dt = parse_instant("2026-03-02 09:00", "Europe/Berlin").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap());
    }

    #[test]
    fn garbage_timestamp_is_an_error() {
        assert!(parse_instant("next tuesday", "UTC").is_err());
    }

    #[test]
    fn cli_parses_plan() {
        let cli = Cli::try_parse_from([
            "secretary", "plan", "--tasks", "t.json", "--from", "a", "--to", "b",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Plan { ref tz, .. } if tz == "UTC"));
    }
}
