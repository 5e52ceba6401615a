pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ecomguard")]
#[command(about = "Compliance checks for e-commerce product pages", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/ecomguard/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a product or listing page and write the annotated HTML
    Scan {
        /// Page URL (also used to pick the platform)
        url: String,

        /// Read the page from a saved HTML file instead of loading it
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Where to write the annotated HTML
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Load the page in headless Chrome
        #[arg(long)]
        chrome: bool,

        /// Open the annotated HTML in the browser
        #[arg(long)]
        open: bool,
    },
    /// Scan a page, then rescan it every scanInterval seconds until Ctrl-C
    Watch {
        url: String,

        /// Load the page in headless Chrome
        #[arg(long)]
        chrome: bool,

        /// Rewrite this file with the annotated HTML after every scan
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Run the local classifier over a JSON array of listing products
    Classify {
        /// JSON file with [{ id, title, price, image, link }, ...]
        path: PathBuf,
    },
    /// Show scan counters
    Stats {
        /// Zero the counters
        #[arg(long)]
        reset: bool,
    },
    /// Show recent detail-page scans
    History {
        /// Number of scans to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Show or change extension settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print the current settings
    Show,
    /// Change one setting (autoScan, notifications, scanInterval, showWarnings)
    Set { key: String, value: String },
    /// Restore the defaults
    Reset,
}
