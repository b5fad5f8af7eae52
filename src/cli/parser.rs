use crate::export::ExportFormat;
use clap::{Parser, Subcommand};

/// Command-line interface definition for rPhotoPunch
/// Attendance photo ingestion: watch a folder, reconcile photos into daily records
#[derive(Parser)]
#[command(
    name = "rphotopunch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Turns facial-recognition attendance photos into daily attendance records (SQLite + HTTP API)",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Use this configuration file instead of the default one
    #[arg(global = true, long = "config")]
    pub config: Option<String>,

    /// Run in test mode (no config file written)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize configuration, folders and database
    Init,

    /// Show or upgrade the configuration file
    Config {
        #[arg(long = "print", help = "Print the effective configuration")]
        print_config: bool,

        #[arg(long = "migrate", help = "Add missing keys to the configuration file")]
        migrate: bool,
    },

    /// Run the service: directory watcher + HTTP API
    Serve {
        #[arg(long, help = "Listen address (host:port)")]
        bind: Option<String>,

        #[arg(long = "watch-dir", help = "Folder to watch for attendance photos")]
        watch_dir: Option<String>,

        #[arg(long = "no-backlog", help = "Do not ingest files already in the folder at startup")]
        no_backlog: bool,
    },

    /// Ingest every photo currently in a folder, then exit
    Scan {
        #[arg(long, help = "Folder to scan (default: watch_dir from config)")]
        dir: Option<String>,
    },

    /// List attendance records
    List {
        #[arg(long, help = "Single day (YYYY-MM-DD)")]
        date: Option<String>,

        #[arg(long, help = "Exact person name")]
        person: Option<String>,

        #[arg(long, help = "Exact project name")]
        project: Option<String>,

        #[arg(long, short, help = "Filter by year/month/day or a custom range (start:end)")]
        range: Option<String>,
    },

    /// Export attendance records
    Export {
        #[arg(long, value_enum, help = "Output format")]
        format: ExportFormat,

        #[arg(long, value_name = "FILE", help = "Absolute path of the output file")]
        file: String,

        #[arg(long, help = "Year/month/day or range (start:end), or 'all'")]
        range: Option<String>,

        #[arg(long, help = "Overwrite an existing file without asking")]
        force: bool,
    },

    /// Write the PDF report of a project
    Report {
        #[arg(long, help = "Project id")]
        project: i64,

        #[arg(long, value_name = "FILE")]
        file: String,

        #[arg(long, help = "Overwrite an existing file without asking")]
        force: bool,
    },

    /// Manage projects
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Print the internal log table
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Add a project
    Add {
        name: String,

        #[arg(long, default_value = "")]
        company: String,

        #[arg(long, default_value = "")]
        owner: String,

        #[arg(long, help = "Deadline (YYYY-MM-DD)")]
        deadline: Option<String>,

        #[arg(long = "hours", help = "Estimated hours")]
        estimated_hours: Option<String>,

        #[arg(long)]
        layout: Option<String>,
    },

    /// List projects
    List,
}
