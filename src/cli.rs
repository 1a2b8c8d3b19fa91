use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "homekeep", version, about = "Home maintenance tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config.yaml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override SQLite data directory
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Re-run interactive setup
    Init,
    /// Validate config and test connections
    Check,
    /// Load the bundled template catalog into the store
    Seed,
    /// List registered homes
    Homes,
    /// Register a home
    AddHome {
        /// Display name
        name: String,
        /// single_family, townhouse, condo, apartment, mobile_home, multi_family
        #[arg(long, default_value = "single_family")]
        home_type: String,
        /// Construction year, used for age-based scheduling
        #[arg(long)]
        year_built: Option<i32>,
        /// Latitude for weather optimization
        #[arg(long)]
        latitude: Option<f64>,
        /// Longitude for weather optimization
        #[arg(long)]
        longitude: Option<f64>,
        /// Climate tags (repeatable), e.g. --climate humid --climate coastal
        #[arg(long)]
        climate: Vec<String>,
    },
    /// Register an equipment item on a home
    AddEquipment {
        /// Home id
        home: i64,
        /// Equipment type key matched against template predicates
        equipment_type: String,
        /// Display name
        name: String,
        /// Explicit next service date (YYYY-MM-DD)
        #[arg(long)]
        next_service: Option<chrono::NaiveDate>,
    },
    /// Generate maintenance tasks for a home
    Generate {
        /// Home id
        home: i64,
        /// Restrict to one category and skip the seasonal/equipment passes
        #[arg(long)]
        category: Option<String>,
        /// Per-pass candidate cap
        #[arg(long)]
        max_tasks: Option<usize>,
        /// Skip weather optimization for this run
        #[arg(long)]
        no_weather: bool,
        /// Scheduling horizon in days
        #[arg(long)]
        look_ahead: Option<i64>,
    },
    /// List tasks for a home
    Tasks {
        /// Home id
        home: i64,
    },
    /// Mark a task completed
    Complete {
        /// Task id
        task: i64,
    },
}
