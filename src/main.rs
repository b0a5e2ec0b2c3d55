use anyhow::{Context, Result, anyhow};
use ndpr_consent::{
    cli::{CliArgs, Command},
    config::Config,
    consent::{ConsentError, ConsentPort},
    events::{ConsentEventKind, ConsentManager},
    logging::init_tracing,
    records::ConsentRecordService,
    requests::RequestService,
};
use serde_json::json;

fn main() -> Result<()> {
    let args = CliArgs::from_env()?;
    let config_path = args.config_path_or_default();
    let config = if args.config_path.is_some() || config_path.exists() {
        Config::load(&config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))?
    } else {
        Config::default()
    };

    let _logging_guard = init_tracing(&config.logging)?;

    let storage = config.storage.open();
    if !storage.is_available() {
        tracing::warn!(target: "consent", "consent_storage_unavailable");
    }
    let container = config
        .consent
        .build_container(storage.clone())
        .map_err(consent_failure)?;
    let mut manager = ConsentManager::new(container);
    let _subscriptions: Vec<_> = ConsentEventKind::ALL
        .into_iter()
        .map(|kind| {
            manager.on(kind, |event| {
                tracing::debug!(target: "events", kind = %event.kind, "consent_event_observed");
            })
        })
        .collect();

    let records = ConsentRecordService::new(storage.clone(), config.client.clone());
    let requests = RequestService::new(storage);

    let output = match args.command {
        Command::Show => serde_json::to_value(manager.state())?,
        Command::AcceptAll => {
            manager.accept_all().map_err(consent_failure)?;
            record_decision(&records, &manager, "accept all")?;
            serde_json::to_value(manager.state())?
        }
        Command::RejectAll => {
            manager.reject_all().map_err(consent_failure)?;
            record_decision(&records, &manager, "reject all")?;
            serde_json::to_value(manager.state())?
        }
        Command::Save(preferences) => {
            manager
                .save_preferences(&preferences)
                .map_err(consent_failure)?;
            record_decision(&records, &manager, "preferences saved")?;
            serde_json::to_value(manager.state())?
        }
        Command::History => json!({
            "current": records.current_consent(),
            "history": records.history(),
        }),
        Command::Reset => {
            let state_cleared = manager.with_inner_mut(|container| container.reset());
            let records_cleared = records.clear();
            json!({ "stateCleared": state_cleared, "recordsCleared": records_cleared })
        }
        Command::NewRequest {
            request_type,
            name,
            email,
            details,
        } => {
            let request = requests
                .create_request(request_type, &name, &email, &details)
                .map_err(|err| anyhow!("{:?}: {}", err.kind, err.message))?;
            serde_json::to_value(request)?
        }
        Command::ListRequests => serde_json::to_value(requests.all_requests())?,
        Command::SetRequestStatus { id, status } => {
            let updated = requests
                .update_status(id, status)
                .map_err(|err| anyhow!("{:?}: {}", err.kind, err.message))?
                .ok_or_else(|| anyhow!("no request with id {id}"))?;
            serde_json::to_value(updated)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn record_decision(
    records: &ConsentRecordService,
    manager: &ConsentManager,
    reason: &str,
) -> Result<()> {
    records
        .update_consent(&manager.state().consent_state, Some(reason), None)
        .map_err(consent_failure)?;
    Ok(())
}

fn consent_failure(err: ConsentError) -> anyhow::Error {
    anyhow!("{:?}: {}", err.kind, err.message)
}
