use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::{
    consent::ConsentCategories,
    requests::{RequestStatus, RequestType},
};

pub const DEFAULT_CONFIG_PATH: &str = "./ndpr-consent.json5";

const USAGE: &str = "usage: ndpr-consent [--config <path>] \
<show|accept-all|reject-all|save <category>=<bool>...|history|reset|\
request new <type> <name> <email> [details...]|request list|request status <id> <status>>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    AcceptAll,
    RejectAll,
    Save(ConsentCategories),
    History,
    Reset,
    NewRequest {
        request_type: RequestType,
        name: String,
        email: String,
        details: String,
    },
    ListRequests,
    SetRequestStatus {
        id: Uuid,
        status: RequestStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    /// `None` when `--config` was not given.
    pub config_path: Option<PathBuf>,
    pub command: Command,
}

impl CliArgs {
    pub fn from_env() -> Result<Self> {
        parse_args(std::env::args().skip(1))
    }

    pub fn config_path_or_default(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}

pub fn parse_args<I>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut config_path = None;
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --config"))?;
                config_path = Some(PathBuf::from(value));
            }
            flag if flag.starts_with("--") => {
                return Err(anyhow!("unknown flag: {flag}. {USAGE}"));
            }
            _ => positional.push(arg),
        }
    }

    let command = parse_command(&positional)?;
    Ok(CliArgs {
        config_path,
        command,
    })
}

fn parse_command(positional: &[String]) -> Result<Command> {
    let Some((name, rest)) = positional.split_first() else {
        return Err(anyhow!("missing command. {USAGE}"));
    };

    let command = match (name.as_str(), rest) {
        ("show", []) => Command::Show,
        ("accept-all", []) => Command::AcceptAll,
        ("reject-all", []) => Command::RejectAll,
        ("history", []) => Command::History,
        ("reset", []) => Command::Reset,
        ("save", assignments) if !assignments.is_empty() => {
            Command::Save(parse_assignments(assignments)?)
        }
        ("save", _) => return Err(anyhow!("save needs at least one <category>=<bool>")),
        ("request", rest) => parse_request_command(rest)?,
        (other, _) => return Err(anyhow!("unknown command or arguments: {other}. {USAGE}")),
    };
    Ok(command)
}

fn parse_assignments(assignments: &[String]) -> Result<ConsentCategories> {
    assignments
        .iter()
        .map(|assignment| -> Result<(String, bool)> {
            let (category, value) = assignment
                .split_once('=')
                .ok_or_else(|| anyhow!("expected <category>=<bool>, got '{assignment}'"))?;
            let granted = value
                .parse::<bool>()
                .with_context(|| format!("invalid bool for category '{category}': '{value}'"))?;
            Ok((category.to_string(), granted))
        })
        .collect()
}

fn parse_request_command(rest: &[String]) -> Result<Command> {
    match rest {
        [sub, request_type, name, email, details @ ..] if sub == "new" => Ok(Command::NewRequest {
            request_type: parse_kebab(request_type, "request type")?,
            name: name.clone(),
            email: email.clone(),
            details: details.join(" "),
        }),
        [sub] if sub == "list" => Ok(Command::ListRequests),
        [sub, id, status] if sub == "status" => Ok(Command::SetRequestStatus {
            id: Uuid::parse_str(id).with_context(|| format!("invalid request id '{id}'"))?,
            status: parse_kebab(status, "request status")?,
        }),
        _ => Err(anyhow!("unknown request subcommand. {USAGE}")),
    }
}

fn parse_kebab<T: DeserializeOwned>(value: &str, what: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .with_context(|| format!("invalid {what} '{value}'"))
}
