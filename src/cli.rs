use std::{env, path::PathBuf};

use anyhow::{Result, anyhow};

const USAGE: &str =
    "usage: overlap-cleaner [--config <path>] --events <path|-> [--output <path>]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub config_path: PathBuf,
    /// `None` reads events from stdin.
    pub events_path: Option<PathBuf>,
    /// `None` writes cleaned events to stdout.
    pub output_path: Option<PathBuf>,
}

pub fn args_from_env() -> Result<CliArgs> {
    parse_args(env::args().skip(1))
}

pub fn parse_args<I>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = String>,
{
    let mut config_path = None;
    let mut events_path = None;
    let mut output_path = None;

    let mut args = args.into_iter();
    while let Some(flag) = args.next() {
        let slot = match flag.as_str() {
            "--config" => &mut config_path,
            "--events" => &mut events_path,
            "--output" => &mut output_path,
            other => return Err(anyhow!("unexpected argument '{other}'. {USAGE}")),
        };
        let value = args
            .next()
            .ok_or_else(|| anyhow!("missing value for {flag}. {USAGE}"))?;
        if slot.replace(value).is_some() {
            return Err(anyhow!("{flag} given more than once. {USAGE}"));
        }
    }

    let events = events_path.ok_or_else(|| anyhow!("--events is required. {USAGE}"))?;
    let config_path = match config_path {
        Some(path) => PathBuf::from(path),
        None => {
            let mut path = env::current_dir()?;
            path.push("cleaner.jsonc");
            path
        }
    };

    Ok(CliArgs {
        config_path,
        events_path: (events != "-").then(|| PathBuf::from(events)),
        output_path: output_path.map(PathBuf::from),
    })
}
