//! Movie command handlers: list, save, delete.

use std::time::Duration;

use tabled::Tabled;

use moviesync_core::{CoreError, Movie, SyncCoordinator};

use crate::cli::{DeleteArgs, GlobalOpts, ListArgs, SaveArgs};
use crate::error::CliError;
use crate::output;

use super::settle;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct MovieRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Investment")]
    investment: String,
    #[tabled(rename = "Released")]
    release_date: String,
    #[tabled(rename = "Sequel")]
    sequel: String,
}

impl From<&Movie> for MovieRow {
    fn from(m: &Movie) -> Self {
        Self {
            id: m.id().unwrap_or("-").to_owned(),
            title: m.title.clone(),
            investment: format!("{:.2}", m.investment),
            release_date: m.release_date.clone(),
            sequel: if m.has_sequel { "yes" } else { "no" }.into(),
        }
    }
}

fn detail(m: &Movie) -> String {
    [
        format!("ID:          {}", m.id().unwrap_or("-")),
        format!("Title:       {}", m.title),
        format!("Investment:  {:.2}", m.investment),
        format!("Released:    {}", m.release_date),
        format!("Sequel:      {}", if m.has_sequel { "yes" } else { "no" }),
    ]
    .join("\n")
}

fn id_of(m: &Movie) -> String {
    m.id().unwrap_or_default().to_owned()
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn list(
    coordinator: &SyncCoordinator,
    args: ListArgs,
    global: &GlobalOpts,
    timeout: Duration,
) -> Result<(), CliError> {
    let state = settle(coordinator, timeout).await?;
    let movies = state.window(args.limit.unwrap_or(usize::MAX));

    let out = output::render_list(&global.output, movies, |m| MovieRow::from(m), id_of)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn save(
    coordinator: &SyncCoordinator,
    args: SaveArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut movie = Movie::new(args.title, args.investment, args.release_date, args.sequel);
    if let Some(id) = args.id {
        movie = movie.with_id(id);
    }

    let Some(saved) = coordinator.save(movie).await else {
        return Err(failure(coordinator.state().save_error.clone()));
    };

    let out = output::render_single(&global.output, &saved, detail, id_of)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn delete(
    coordinator: &SyncCoordinator,
    args: DeleteArgs,
    global: &GlobalOpts,
    timeout: Duration,
) -> Result<(), CliError> {
    // Prefer the loaded record so state drops exactly that entry.
    let state = settle(coordinator, timeout).await?;
    let movie = state
        .movie(&args.id)
        .cloned()
        .unwrap_or_else(|| Movie::new("", 0.0, "", false).with_id(args.id.clone()));

    if !coordinator.delete(movie).await {
        return Err(failure(coordinator.state().delete_error.clone()));
    }

    if !global.quiet {
        eprintln!("Movie '{}' deleted", args.id);
    }
    Ok(())
}

fn failure(error: Option<CoreError>) -> CliError {
    error.map_or_else(
        || CliError::Internal("session ended before the operation finished".into()),
        CliError::from,
    )
}
