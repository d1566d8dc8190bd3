//! Command-line argument parsing

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_CONCURRENCY: usize = 16;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "regman")]
#[command(about = "Snapshot every repository and tag of a Docker registry with its creation time")]
#[command(version, author)]
pub struct Args {
    /// Registry alias or address
    #[arg(
        value_name = "REGISTRY",
        help = "Configured registry alias, or a raw host[:port] / scheme://host[:port] address"
    )]
    pub target: Option<String>,

    /// Alias table path
    #[arg(
        long = "config",
        short = 'c',
        help = "Path to the registry alias file [default: ~/.regman/config.json]"
    )]
    pub config: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(
        long = "timeout",
        short = 't',
        help = "Timeout for each registry request in seconds [default: 10]"
    )]
    pub timeout: Option<u64>,

    /// Connect timeout in seconds
    #[arg(
        long = "connect-timeout",
        help = "Timeout for establishing a connection in seconds [default: 5]"
    )]
    pub connect_timeout: Option<u64>,

    /// Number of requests in flight
    #[arg(
        long = "concurrency",
        short = 'j',
        help = "Maximum number of registry requests in flight [default: 16]"
    )]
    pub concurrency: Option<usize>,

    /// Whole-run deadline in seconds
    #[arg(
        long = "deadline",
        short = 'd',
        help = "Stop after this many seconds and report what was collected"
    )]
    pub deadline: Option<u64>,

    /// Skip TLS verification
    #[arg(
        long = "skip-tls",
        short = 'k',
        help = "Skip TLS certificate verification"
    )]
    pub skip_tls: bool,

    /// Compact output
    #[arg(long = "compact", help = "Print the report on a single line")]
    pub compact: bool,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', help = "Enable verbose output")]
    pub verbose: bool,

    /// Quiet output
    #[arg(
        long = "quiet",
        short = 'q',
        conflicts_with = "verbose",
        help = "Only print errors and the report"
    )]
    pub quiet: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs() == 0 || self.connect_timeout_secs() == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        if self.concurrency() == 0 {
            return Err("Concurrency must be greater than 0".to_string());
        }

        if self.deadline == Some(0) {
            return Err("Deadline must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Load unset options from environment variables
    pub fn from_env(self) -> Self {
        self.with_env(|key| std::env::var(key).ok())
    }

    /// Fill unset options through `lookup`; explicit flags always win
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.target.is_none() {
            self.target = lookup("REGMAN_REGISTRY");
        }

        if self.config.is_none() {
            self.config = lookup("REGMAN_CONFIG").map(PathBuf::from);
        }

        if self.timeout.is_none() {
            self.timeout = lookup("REGMAN_TIMEOUT").and_then(|v| v.parse().ok());
        }

        if self.connect_timeout.is_none() {
            self.connect_timeout = lookup("REGMAN_CONNECT_TIMEOUT").and_then(|v| v.parse().ok());
        }

        if self.concurrency.is_none() {
            self.concurrency = lookup("REGMAN_CONCURRENCY").and_then(|v| v.parse().ok());
        }

        if self.deadline.is_none() {
            self.deadline = lookup("REGMAN_DEADLINE").and_then(|v| v.parse().ok());
        }

        if lookup("REGMAN_VERBOSE").is_some() && !self.quiet {
            self.verbose = true;
        }

        if lookup("REGMAN_SKIP_TLS").is_some() {
            self.skip_tls = true;
        }

        self
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub fn connect_timeout_secs(&self) -> u64 {
        self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(DEFAULT_CONCURRENCY)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("regman").chain(argv.iter().copied())).unwrap()
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["local"]);
        assert_eq!(args.target.as_deref(), Some("local"));
        assert_eq!(args.timeout_secs(), 10);
        assert_eq!(args.connect_timeout_secs(), 5);
        assert_eq!(args.concurrency(), 16);
        assert_eq!(args.deadline(), None);
        assert!(!args.skip_tls);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_target_is_optional_at_parse_time() {
        let args = parse(&[]);
        assert!(args.target.is_none());
    }

    #[test]
    fn test_flags() {
        let args = parse(&["-k", "-j", "4", "--deadline", "30", "--timeout", "3", "10.0.0.1:5000"]);
        assert!(args.skip_tls);
        assert_eq!(args.concurrency(), 4);
        assert_eq!(args.deadline(), Some(Duration::from_secs(30)));
        assert_eq!(args.timeout_secs(), 3);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let argv = ["regman", "-q", "-v", "local"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_validate_rejects_zero() {
        assert!(parse(&["-j", "0", "x"]).validate().is_err());
        assert!(parse(&["--timeout", "0", "x"]).validate().is_err());
        assert!(parse(&["--deadline", "0", "x"]).validate().is_err());
    }

    #[test]
    fn test_env_fills_unset_options() {
        let args = parse(&["--timeout", "7"]).with_env(env(&[
            ("REGMAN_REGISTRY", "prod"),
            ("REGMAN_TIMEOUT", "99"),
            ("REGMAN_CONCURRENCY", "8"),
            ("REGMAN_DEADLINE", "not-a-number"),
            ("REGMAN_SKIP_TLS", "1"),
        ]));

        assert_eq!(args.target.as_deref(), Some("prod"));
        assert_eq!(args.timeout_secs(), 7);
        assert_eq!(args.concurrency(), 8);
        assert_eq!(args.deadline(), None);
        assert!(args.skip_tls);
    }

    #[test]
    fn test_env_verbose_respects_quiet() {
        let args = parse(&["-q", "x"]).with_env(env(&[("REGMAN_VERBOSE", "1")]));
        assert!(args.quiet);
        assert!(!args.verbose);
    }
}
