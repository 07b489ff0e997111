use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "ese")]
#[command(about = "ESE database file analysis toolkit")]
#[command(version)]
pub struct Cli {
    /// Control colored output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse the file header and display a page summary
    Parse {
        /// Path to the ESE database file (.edb)
        #[arg(short, long)]
        file: String,

        /// Display additional information
        #[arg(short, long)]
        verbose: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Detailed page structure analysis
    Pages {
        /// Path to the ESE database file (.edb)
        #[arg(short, long)]
        file: String,

        /// Display a specific page number
        #[arg(short, long)]
        page: Option<u32>,

        /// Compact list mode (one line per page)
        #[arg(short, long)]
        list: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Hex dump of raw page bytes
    Dump {
        /// Path to the ESE database file
        #[arg(short, long)]
        file: String,

        /// Page number to dump (default: 1)
        #[arg(short, long)]
        page: Option<u32>,

        /// Absolute byte offset to start dumping (bypasses page mode)
        #[arg(long)]
        offset: Option<u64>,

        /// Number of bytes to dump (default: page size, or 256 in offset mode)
        #[arg(short, long)]
        length: Option<usize>,

        /// Output raw binary bytes (no formatting)
        #[arg(long)]
        raw: bool,
    },

    /// Validate page checksums (XOR-32 / ECC-32)
    Checksum {
        /// Path to the ESE database file
        #[arg(short, long)]
        file: String,

        /// Check a specific page number
        #[arg(short, long)]
        page: Option<u32>,

        /// Only report pages that fail validation
        #[arg(short = 'b', long = "bad-only")]
        bad_only: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List tables, columns, and indexes from the catalog
    Tables {
        /// Path to the ESE database file
        #[arg(short, long)]
        file: String,

        /// Show column and index detail per table
        #[arg(short, long)]
        verbose: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Decode and display a table's records
    Records {
        /// Path to the ESE database file
        #[arg(short, long)]
        file: String,

        /// Table name
        #[arg(short, long)]
        table: String,

        /// Maximum number of records to display
        #[arg(short, long)]
        limit: Option<u64>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Export table data as JSON or TSV
    Export {
        /// Path to the ESE database file
        #[arg(short, long)]
        file: String,

        /// Table name (default: every table)
        #[arg(short, long)]
        table: Option<String>,

        /// Output JSON instead of tab-separated values
        #[arg(long)]
        json: bool,
    },

    /// Validate checksums, sibling links, and tree structure
    Validate {
        /// Path to the ESE database file
        #[arg(short, long)]
        file: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Search a directory for ESE database files by signature
    Find {
        /// Directory to search
        #[arg(short, long)]
        dir: String,

        /// Open each hit and report its geometry
        #[arg(short, long)]
        verbose: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}
