use anyhow::{Context, Result};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};

mod channel;
mod cli;
mod config;
mod error;
mod hillslope;
mod horizon;
mod io;
mod logging;
mod lookup;
mod params;
mod pipeline;
mod report;
mod soil;
mod store;
mod weights;

use channel::ChannelRecord;
use cli::{Command, get_args};
use config::{ParameterizationRun, STATUS_COMPUTED, STORE_VERSION, TOOL_VERSION};
use hillslope::HillslopeRecord;
use io::export::export_partition;
use pipeline::RunOptions;
use store::ParameterStore;

fn main() -> Result<()> {
    let args = get_args();
    logging::init_logging(args.log_level.as_deref());

    let mut store = ParameterStore::open(&args.db)
        .with_context(|| format!("Failed to open parameter store: {:?}", args.db))?;

    match args.command {
        Command::Init { lookup_dir } => {
            store.set_lookup_directory(&lookup_dir.to_string_lossy(), Local::now().naive_local())?;
            log::info!("Lookup directory set to {}", lookup_dir.display());
        }
        Command::Register {
            key,
            slope_type,
            flow_length_method,
            hydraulic_geometry,
            channel_type,
            land_cover,
            land_cover_lut,
            soils,
            soils_db,
            max_horizons,
            max_thickness,
        } => {
            let run = ParameterizationRun {
                key: key.key(),
                slope_type,
                flow_length_method,
                hydraulic_geometry,
                channel_type,
                land_cover_path: land_cover.to_string_lossy().into_owned(),
                land_cover_lut,
                soils_path: soils.to_string_lossy().into_owned(),
                soils_database_path: soils_db.to_string_lossy().into_owned(),
                max_horizons,
                max_thickness,
                creation_date: Local::now().naive_local(),
                tool_version: TOOL_VERSION.to_string(),
                store_version: STORE_VERSION.to_string(),
                status: STATUS_COMPUTED.to_string(),
            };
            store.register_run(&run)?;
            log::info!("Registered parameterization {}", run.key);
        }
        Command::ImportElements {
            key,
            hillslopes,
            channels,
        } => {
            let key = key.key();
            let (h, c) = pipeline::import_elements(
                &mut store,
                &key,
                hillslopes.as_deref(),
                channels.as_deref(),
            )
            .with_context(|| format!("Failed to import elements into {}", key))?;
            log::info!("Imported {} hillslopes and {} channels into {}", h, c, key);
        }
        Command::Parameterize {
            key,
            save_intermediate,
        } => {
            let key = key.key();
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} map units ({eta})")?
                    .progress_chars("#>-"),
            );
            let report = pipeline::run_parameterization(
                &mut store,
                &key,
                RunOptions { save_intermediate },
                &pb,
            )
            .with_context(|| format!("Parameterization {} failed", key))?;
            report.log_summary();
        }
        Command::CopyPrevious { key, previous } => {
            let key = key.key();
            pipeline::copy_previous(&mut store, &key, &previous)
                .with_context(|| format!("Failed to copy {} into {}", previous, key))?;
        }
        Command::Export {
            key,
            hillslopes,
            channels,
        } => {
            let key = key.key();
            if let Some(path) = hillslopes {
                export_partition::<HillslopeRecord>(&store, &key, &path)?;
            }
            if let Some(path) = channels {
                export_partition::<ChannelRecord>(&store, &key, &path)?;
            }
        }
    }

    Ok(())
}
