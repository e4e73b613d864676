// file: src/cli/args.rs
// version: 1.0.0
// guid: d4fe7277-82ff-426d-b07a-9e7c1ecccf4f

//! Command line argument definitions

use crate::model::Category;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "coreupdate")]
#[command(about = "List and apply Windows app, update and driver maintenance, one selected item at a time")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Show debug output")]
    pub verbose: bool,

    #[arg(short, long, global = true, conflicts_with = "verbose", help = "Only show errors")]
    pub quiet: bool,

    #[arg(long, global = true, help = "Run queries but only print the actions that would run")]
    pub dry_run: bool,

    #[arg(long, global = true, value_name = "PATH", help = "Configuration file to use")]
    pub config: Option<PathBuf>,
}

/// Output switches shared by the listing commands
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct ListArgs {
    #[arg(long, help = "Print the listing and exit without prompting")]
    pub list_only: bool,

    #[arg(long, requires = "list_only", help = "Print the listing as JSON")]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upgrade apps with winget, or uninstall them with --installed
    Apps {
        #[arg(long, help = "List installed apps for uninstalling instead of upgrades")]
        installed: bool,

        #[command(flatten)]
        list: ListArgs,
    },

    /// Install pending Windows updates
    Updates {
        #[command(flatten)]
        list: ListArgs,
    },

    /// Install driver updates, or remove driver packages with --packages
    Drivers {
        #[arg(long, help = "List installed driver packages for removal instead of updates")]
        packages: bool,

        #[command(flatten)]
        list: ListArgs,
    },

    /// Uninstall installed KB updates
    Rollback {
        #[command(flatten)]
        list: ListArgs,
    },

    /// Count pending app, Windows and driver updates
    Status {
        #[arg(long, help = "Print the summary as JSON")]
        json: bool,
    },

    /// Export all third-party driver packages to a directory
    ExportDrivers {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Create a system restore point
    RestorePoint {
        #[arg(short, long, default_value = "CoreUpdateCLI")]
        description: String,
    },

    /// Install the PSWindowsUpdate PowerShell module
    Setup,

    /// Show system, tool and log information
    Diagnostics {
        #[arg(short = 'n', long, default_value_t = 10, help = "Journal entries to show")]
        lines: usize,
    },
}

impl Commands {
    /// Short name used for the operation span
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Apps { .. } => "apps",
            Commands::Updates { .. } => "updates",
            Commands::Drivers { .. } => "drivers",
            Commands::Rollback { .. } => "rollback",
            Commands::Status { .. } => "status",
            Commands::ExportDrivers { .. } => "export-drivers",
            Commands::RestorePoint { .. } => "restore-point",
            Commands::Setup => "setup",
            Commands::Diagnostics { .. } => "diagnostics",
        }
    }
}

/// Category listed by `apps`
pub fn app_category(installed: bool) -> Category {
    if installed {
        Category::InstalledApps
    } else {
        Category::Apps
    }
}

/// Category listed by `drivers`
pub fn driver_category(packages: bool) -> Category {
    if packages {
        Category::DriverPackages
    } else {
        Category::DriverUpdates
    }
}
