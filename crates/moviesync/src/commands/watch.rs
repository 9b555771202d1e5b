//! `watch`: stream session state until interrupted.

use serde::Serialize;

use moviesync_core::{Movie, SessionState, SyncCoordinator};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Serializable view of one state snapshot.
#[derive(Serialize)]
struct StateView<'a> {
    loaded: bool,
    records: &'a [Movie],
    fetching: bool,
    saving: bool,
    deleting: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    fetch_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    save_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delete_error: Option<String>,
}

impl<'a> From<&'a SessionState> for StateView<'a> {
    fn from(s: &'a SessionState) -> Self {
        Self {
            loaded: s.is_loaded(),
            records: s.records.as_deref().unwrap_or_default(),
            fetching: s.fetching,
            saving: s.saving,
            deleting: s.deleting,
            fetch_error: s.fetch_error.as_ref().map(ToString::to_string),
            save_error: s.save_error.as_ref().map(ToString::to_string),
            delete_error: s.delete_error.as_ref().map(ToString::to_string),
        }
    }
}

fn summary(state: &SessionState) -> String {
    let mut line = match &state.records {
        Some(records) => format!("{} movies", records.len()),
        None => "not loaded".into(),
    };
    for (flag, label) in [
        (state.fetching, "fetching"),
        (state.saving, "saving"),
        (state.deleting, "deleting"),
    ] {
        if flag {
            line.push_str(", ");
            line.push_str(label);
        }
    }
    if let Some(e) = &state.fetch_error {
        line.push_str(&format!(" | fetch failed: {e}"));
    }
    if let Some(e) = &state.save_error {
        line.push_str(&format!(" | save failed: {e}"));
    }
    if let Some(e) = &state.delete_error {
        line.push_str(&format!(" | delete failed: {e}"));
    }
    line
}

fn render(format: &OutputFormat, state: &SessionState) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(&StateView::from(state))?,
        OutputFormat::JsonCompact => serde_json::to_string(&StateView::from(state))?,
        OutputFormat::Table | OutputFormat::Plain => summary(state),
    })
}

pub async fn handle(coordinator: &SyncCoordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let mut stream = coordinator.subscribe();
    output::print_output(&render(&global.output, stream.current())?, global.quiet);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            snapshot = stream.changed() => {
                let Some(state) = snapshot else { break };
                output::print_output(&render(&global.output, &state)?, global.quiet);
            }
        }
    }
    Ok(())
}
