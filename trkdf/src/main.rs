use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use trkcore::algorithm::config::AssociatorConfig;
use trkdf::association::{
    associate_events, distinct_event_ids, write_associations_json, write_associations_json_file,
};
use trkdf::data::handle::TrackerEventDataHandle;

#[derive(Parser)]
#[command(name = "trkdf")]
#[command(about = "Associate reconstructed tracker hits with simulated tracks", long_about = None)]
struct Cli {
    /// SQLite event store
    #[arg(short, long)]
    db: PathBuf,

    /// Events to process (all events when omitted)
    #[arg(short, long)]
    event: Vec<u32>,

    /// Associator config JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip strip hits
    #[arg(long, default_value_t = false)]
    no_strip: bool,

    /// Skip pixel hits
    #[arg(long, default_value_t = false)]
    no_pixel: bool,

    /// Output JSON file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the results to the hit_associations table
    #[arg(long, default_value_t = false)]
    store: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AssociatorConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {:?}", path))?,
        None => AssociatorConfig::default(),
    };
    if cli.no_strip {
        config.associate_strip = false;
    }
    if cli.no_pixel {
        config.associate_pixel = false;
    }

    let handle = TrackerEventDataHandle::new(&cli.db)
        .with_context(|| format!("failed to open event store {:?}", cli.db))?;

    let event_ids = if cli.event.is_empty() {
        handle.read_event_ids().context("failed to list events")?
    } else {
        distinct_event_ids(&cli.event)
    };
    log::info!("processing {} events from {:?}", event_ids.len(), cli.db);

    let associations = associate_events(&handle, &event_ids, &config)?;

    if cli.store {
        handle.create_schema().context("failed to create result table")?;
        for &event_id in &event_ids {
            let event_rows: Vec<_> = associations
                .iter()
                .filter(|a| a.event_id == event_id)
                .cloned()
                .collect();
            let written = handle.write_associations(event_id, &event_rows)?;
            log::info!("event {}: stored {} association rows", event_id, written);
        }
    }

    match &cli.output {
        Some(path) => {
            write_associations_json_file(path, &associations)?;
            log::info!("wrote {} associations to {:?}", associations.len(), path);
        }
        None => write_associations_json(io::stdout().lock(), &associations)?,
    }

    Ok(())
}
