use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum Commands {
    /// Replicate the source query into the destination table
    Transfer {
        #[arg(long, help = "Transfer config file path")]
        config: String,

        #[command(flatten)]
        overrides: RunOverrides,

        #[arg(
            long,
            help = "If specified, writes the JSON result to this file instead of stdout"
        )]
        output: Option<String>,
    },
    /// Load and validate a transfer config without touching either endpoint
    Validate {
        #[arg(long, help = "Transfer config file path")]
        config: String,

        #[command(flatten)]
        overrides: RunOverrides,
    },
}

/// Run options that take precedence over the values in the config file.
#[derive(Args, Debug, Default)]
pub struct RunOverrides {
    #[arg(long, help = "Records per committed batch")]
    pub batch_size: Option<usize>,

    #[arg(long, help = "Records requested per source page")]
    pub page_size: Option<usize>,

    #[arg(long, help = "Skip this many records, typically a previous run's resume_offset")]
    pub resume_offset: Option<u64>,

    #[arg(long, help = "Fetch the next page while the current batch is written")]
    pub prefetch: bool,
}
