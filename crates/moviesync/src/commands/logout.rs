//! `logout`: forget the remembered session token.

use moviesync_core::{FileCache, cache};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let dir = config::resolve_cache_dir(global);
    let cache = FileCache::open(dir).await?;
    cache::clear_credential(&cache).await?;

    if !global.quiet {
        eprintln!("Logged out");
    }
    Ok(())
}
