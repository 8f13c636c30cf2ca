use clap::{ArgGroup, Parser, Subcommand};

// Display order for log level option (placed at end of help text)
const LOG_LEVEL_DISPLAY_ORDER: usize = 100;

/// CLI arguments
#[derive(Parser)]
#[command(name = "nucheck", version, about = "Validate page markup against the W3C Nu validator", long_about = None)]
pub struct Cli {
    /// Log level (see https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html)
    /// [env: NUCHECK_LOG=] [default: info]
    #[arg(
        long,
        env = "NUCHECK_LOG",
        default_value = "info",
        global = true,
        hide_default_value = true,
        hide_env = true,
        display_order = LOG_LEVEL_DISPLAY_ORDER,
        verbatim_doc_comment
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a page, validate its markup, and print the findings
    Check(CheckArgs),
    /// Run the local relay server (GET /api/proxy?port=<n>)
    Serve(ServeArgs),
}

/// Arguments for the check command
#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["url", "port"])))]
pub struct CheckArgs {
    /// Page URL to fetch and validate
    #[arg(long)]
    pub url: Option<String>,

    /// Local dev server port to fetch and validate (http://localhost:<port>)
    #[arg(long)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, default_value = "nucheck.toml")]
    pub config: String,

    /// Print the aggregated findings as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Exit non-zero when the validator reports any error
    #[arg(long)]
    pub fail_on_error: bool,
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "NUCHECK_LISTEN", default_value = "127.0.0.1:5000")]
    pub listen: String,

    /// Path to config file
    #[arg(long, default_value = "nucheck.toml")]
    pub config: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_requires_a_target() {
        assert!(Cli::try_parse_from(["nucheck", "check"]).is_err());
        assert!(Cli::try_parse_from(["nucheck", "check", "--url", "https://example.com"]).is_ok());
        assert!(Cli::try_parse_from(["nucheck", "check", "--port", "3000"]).is_ok());
    }

    #[test]
    fn test_url_and_port_are_exclusive() {
        let result = Cli::try_parse_from([
            "nucheck",
            "check",
            "--url",
            "https://example.com",
            "--port",
            "3000",
        ]);
        assert!(result.is_err());
    }
}
