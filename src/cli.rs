use crate::config::PartitionKey;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Soil and land-cover parameterization of hydrologic model elements
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// SQLite parameter store
    #[arg(long, global = true, default_value = "parameters.sqlite")]
    pub db: PathBuf,

    /// Log level (error, warn, info, debug, trace); falls back to RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Args, Debug, Clone)]
pub struct KeyArgs {
    #[arg(long)]
    pub delineation: String,

    #[arg(long)]
    pub discretization: String,

    #[arg(long)]
    pub parameterization: String,
}

impl KeyArgs {
    pub fn key(&self) -> PartitionKey {
        PartitionKey::new(&self.delineation, &self.discretization, &self.parameterization)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the store and record the lookup table directory
    Init {
        #[arg(long)]
        lookup_dir: PathBuf,
    },

    /// Record the inputs of a parameterization
    Register {
        #[command(flatten)]
        key: KeyArgs,

        #[arg(long, default_value = "Uniform")]
        slope_type: String,

        #[arg(long, default_value = "Geometric Abstraction")]
        flow_length_method: String,

        /// Hydraulic geometry relationship
        #[arg(long, default_value = "")]
        hydraulic_geometry: String,

        #[arg(long, default_value = "Default")]
        channel_type: String,

        /// Hillslope / land-cover intersection fragments (CSV)
        #[arg(long)]
        land_cover: PathBuf,

        /// Land-cover lookup table name in the lookup directory
        #[arg(long)]
        land_cover_lut: String,

        /// Hillslope / soil map unit intersection fragments (CSV)
        #[arg(long)]
        soils: PathBuf,

        /// Directory holding component, chorizon, chtexturegrp and chtexture CSVs
        #[arg(long)]
        soils_db: PathBuf,

        /// Horizons used per component, 0 for all
        #[arg(long, default_value_t = 0)]
        max_horizons: u32,

        /// Ignore horizons starting at or below this depth, 0 for no limit
        #[arg(long, default_value_t = 0.0)]
        max_thickness: f64,
    },

    /// Load hillslope and channel element rows produced by discretization
    ImportElements {
        #[command(flatten)]
        key: KeyArgs,

        #[arg(long)]
        hillslopes: Option<PathBuf>,

        #[arg(long)]
        channels: Option<PathBuf>,
    },

    /// Compute hillslope and channel parameters
    Parameterize {
        #[command(flatten)]
        key: KeyArgs,

        /// Keep the horizon and component soil tables in the store
        #[arg(long)]
        save_intermediate: bool,
    },

    /// Reuse the parameters of an earlier parameterization
    CopyPrevious {
        #[command(flatten)]
        key: KeyArgs,

        #[arg(long = "from")]
        previous: String,
    },

    /// Write a partition's parameter tables to CSV
    Export {
        #[command(flatten)]
        key: KeyArgs,

        #[arg(long)]
        hillslopes: Option<PathBuf>,

        #[arg(long)]
        channels: Option<PathBuf>,
    },
}

pub fn get_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_copy_previous() {
        let args = Args::try_parse_from([
            "param_rs",
            "--db",
            "store.sqlite",
            "copy-previous",
            "--delineation",
            "walnut",
            "--discretization",
            "cs100",
            "--parameterization",
            "p2",
            "--from",
            "p1",
        ])
        .unwrap();
        assert_eq!(args.db, PathBuf::from("store.sqlite"));
        match args.command {
            Command::CopyPrevious { key, previous } => {
                assert_eq!(key.key(), PartitionKey::new("walnut", "cs100", "p2"));
                assert_eq!(previous, "p1");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
