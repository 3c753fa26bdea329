use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pagescope")]
#[command(version)]
#[command(about = "Page load analysis from resource timing samples")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory and a default config
    Init,

    /// Analyze a JSONL file of resource timing samples and store the session
    Ingest(IngestArgs),

    /// Score and third-party breakdown for a stored session
    Report {
        /// Session id (latest if omitted)
        id: Option<String>,

        /// Print the stored session as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored sessions
    History {
        /// Match URL, domain, or tag (case-insensitive)
        query: Option<String>,

        /// Earliest timestamp (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Latest timestamp (RFC 3339 or YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: Option<String>,

        /// Only sessions from today
        #[arg(long, conflicts_with_all = ["week", "month"])]
        today: bool,

        /// Only sessions from this week
        #[arg(long, conflicts_with = "month")]
        week: bool,

        /// Only sessions from this month
        #[arg(long)]
        month: bool,

        /// Show statistics summary
        #[arg(long)]
        stats: bool,
    },

    /// Delete a stored session
    Delete { id: String },

    /// Apply the retention policy now
    Cleanup,

    /// Compare two stored sessions
    Compare { baseline: String, candidate: String },

    /// List session files missing from the index
    Orphans,

    /// Trend insights for one URL's history
    Insights {
        url: String,

        /// Skip the external service and summarize locally
        #[arg(long)]
        offline: bool,
    },

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Page URL the samples were captured from
    #[arg(short, long)]
    pub url: String,

    /// Path to samples JSONL
    #[arg(short, long)]
    pub file: String,

    /// Comma-separated tags
    #[arg(short, long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Navigation start (RFC 3339), default now
    #[arg(long)]
    pub start: Option<String>,

    /// Largest contentful paint, ms
    #[arg(long)]
    pub lcp: Option<f64>,

    /// Cumulative layout shift
    #[arg(long)]
    pub cls: Option<f64>,

    /// First input delay, ms
    #[arg(long)]
    pub fid: Option<f64>,

    /// Record the navigation as failed with this reason
    #[arg(long)]
    pub failed: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    Today,
    Week,
    Month,
}
