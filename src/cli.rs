//! Command-line surface of apkeep.
//!
//! Parsing lives in [`Cli`]; [`run`] is the async entry point used by both
//! `main` and integration tests. All pipeline logic lives in the library
//! modules; this module only wires them together.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;

use crate::config::{PublishConfig, StoreConfig};
use crate::documents::DocumentSet;
use crate::error::ApError;
use crate::outbox::OutboxView;
use crate::publish::{PublishReport, Publisher};
use crate::upload::PerkeepClient;

/// Upload the notes of an ActivityStreams archive to a Perkeep server.
#[derive(Debug, Parser)]
#[clap(
    name = "apkeep",
    version,
    about = "Publish the notes of an exported ActivityStreams outbox into Perkeep"
)]
pub struct Cli {
    /// Path to the archive files (defaults to the current directory)
    #[clap(long, short = 'd', value_name = "PATH")]
    pub directory: Option<PathBuf>,

    /// ActivityStreams id of the target actor (defaults to the first Person found)
    #[clap(long, short = 'a')]
    pub actor: Option<String>,

    /// Address of the running Perkeep server
    #[clap(value_name = "PERKEEP")]
    pub perkeep: String,

    /// Turn on debug logging
    #[clap(long, short = 'v')]
    pub verbose: bool,
}

impl Cli {
    pub fn to_config(&self) -> Result<PublishConfig> {
        Ok(PublishConfig {
            archive_root: self.directory.clone().unwrap_or_else(|| PathBuf::from(".")),
            actor: self.actor.clone(),
            store: StoreConfig::from_env(&self.perkeep)?,
        })
    }
}

/// Picks the archive's actor: the requested one, or the first `Person`.
pub fn select_actor(documents: &DocumentSet, requested: Option<&str>) -> Result<String, ApError> {
    if let Some(actor) = requested {
        return Ok(actor.to_string());
    }

    let mut persons = documents.find_persons();
    let first = persons
        .next()
        .ok_or_else(|| ApError::missing("No Person found in the archive"))?;
    let others = persons.count();
    if others > 0 {
        tracing::warn!(actor = first, others, "Archive holds several actors, using the first one");
    } else {
        tracing::info!(actor = first, "Auto-detected actor");
    }
    Ok(first.to_string())
}

/// Runs one full publishing pass as described by `cli`.
pub async fn run(cli: Cli) -> Result<PublishReport> {
    tracing::info!("trace_initialised");

    let config = cli.to_config()?;
    config.trace_loaded();

    let documents = DocumentSet::load_from_dir(Some(&config.archive_root));
    let actor = select_actor(&documents, config.actor.as_deref())?;
    let outbox = OutboxView::new(&documents, &actor)?;
    tracing::info!(actor = %actor, activities = outbox.len(), "Outbox resolved");

    let client = PerkeepClient::connect(&config.store)
        .await
        .map_err(|e| anyhow!("Could not connect to Perkeep at {}: {e}", config.store.server))?;

    let publisher = Publisher::new(&client, &config.archive_root);
    let report = publisher.publish_all(outbox.notes_only()).await?;
    Ok(report)
}
