//! CLI argument parsing.

use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments of the receiver.
#[derive(Parser, Debug, Clone)]
#[command(about = "Host metrics receiver", version)]
pub struct ReceiverArgs {
    /// Path to configuration file.
    #[arg(short, long, default_value = "hostmetrics.json5")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl ReceiverArgs {
    /// Parse CLI arguments with a default config path.
    ///
    /// If no `--config` argument is provided, uses the default.
    ///
    /// Exits the process on invalid arguments or `--help`.
    pub fn parse_with_default(default_config: &'static str) -> Self {
        Self::try_parse_from_with_default(std::env::args_os(), default_config)
            .unwrap_or_else(|e| e.exit())
    }

    /// Same as [`parse_with_default`](Self::parse_with_default) over explicit arguments.
    pub fn try_parse_from_with_default<I, T>(
        args: I,
        default_config: &'static str,
    ) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = <Self as clap::CommandFactory>::command()
            .mut_arg("config", |arg| arg.required(false).default_value(default_config))
            .try_get_matches_from(args)?;

        <Self as clap::FromArgMatches>::from_arg_matches(&matches)
    }
}
