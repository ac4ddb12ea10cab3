use clap::{Args, Parser, Subcommand};

/// Statement execution client for the SQL API.
///
/// Connection settings come from the environment (and `.env`), see
/// `SNOWFLAKE_ACCOUNT`, `SNOWFLAKE_USER` and the key variables.
#[derive(Parser, Debug)]
#[command(name = "flurry", version, about = "Run SQL statements over the statements API")]
pub struct CliArgs {
    /// Configuration profile; keys are read as `{PROFILE}_{KEY}` first.
    #[arg(long, env = "FLURRY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Print results as pretty JSON instead of a table
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit a statement and print the outcome
    Run(RunArgs),

    /// Probe a statement once
    Status {
        handle: String,

        /// Result partition to fetch (0 is the first)
        #[arg(long, default_value_t = 0)]
        partition: u32,
    },

    /// Poll a statement until it finishes
    Wait {
        handle: String,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// Request cancellation of a statement
    Cancel { handle: String },

    /// Issue a key-pair token and print it
    Token,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// SQL text to execute
    pub statement: String,

    /// Return right after submission with the statement handle
    #[arg(long = "async")]
    pub async_exec: bool,

    /// Idempotency key; generated when omitted
    #[arg(long)]
    pub request_id: Option<String>,

    /// Do not mark the submission as a retry-safe resubmission
    #[arg(long)]
    pub no_retry: bool,

    /// Server-side statement timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout: u32,

    /// Keep polling after a synchronous submit that outlived its window
    #[arg(long)]
    pub wait: bool,

    #[command(flatten)]
    pub poll: PollArgs,
}

#[derive(Args, Debug)]
pub struct PollArgs {
    /// Sleep between probes in milliseconds
    #[arg(long, env = "SNOWFLAKE_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub interval_ms: u64,

    /// Maximum number of probes
    #[arg(long, env = "SNOWFLAKE_MAX_POLL_ATTEMPTS", default_value_t = 60)]
    pub max_attempts: u32,
}
