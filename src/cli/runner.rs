//! Run orchestration: resolve the target, build the client, scan, print

use crate::cli::args::Args;
use crate::concurrency::ConcurrencyConfig;
use crate::config::{AliasTable, RegistryEndpoint, ResolvedTarget};
use crate::error::{RegmanError, Result};
use crate::logging::Logger;
use crate::output::{self, OutputFormat};
use crate::registry::{FetchConfig, RegistryApi, RegistryClient};
use crate::scan::{Completion, Dispatcher, ScanOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything one scan needs, built once from arguments and alias table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanContext {
    pub endpoint: RegistryEndpoint,
    pub alias: Option<String>,
    pub fetch: FetchConfig,
    pub concurrency: ConcurrencyConfig,
}

pub struct Runner {
    args: Args,
    logger: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Self {
        let logger = if args.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(args.verbose)
        };

        Self { args, logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub async fn run(&self) -> Result<ScanOutcome> {
        let context = self.prepare()?;

        let client = RegistryClient::builder()
            .with_config(context.fetch.clone())
            .with_logger(self.logger.clone())
            .build()?;
        let api = RegistryApi::new(Arc::new(client), &context.endpoint);

        let token = CancellationToken::new();
        let interrupt = Self::cancel_on_interrupt(token.clone(), self.logger.clone());

        let dispatcher = Dispatcher::new(api, context.concurrency.clone(), self.logger.clone())
            .with_cancellation(token);
        let outcome = dispatcher.run().await;
        interrupt.abort();

        let format = if self.args.compact {
            OutputFormat::Compact
        } else {
            OutputFormat::Pretty
        };
        output::print_report(&outcome.report, format)?;

        self.print_summary(&outcome);
        Ok(outcome)
    }

    /// Validate arguments and resolve the target into a scan context
    pub fn prepare(&self) -> Result<ScanContext> {
        self.args.validate().map_err(RegmanError::Validation)?;

        let target = self
            .args
            .target
            .as_deref()
            .ok_or(RegmanError::MissingTarget)?;

        let table_path = self.args.config.clone().or_else(AliasTable::default_path);
        let table = AliasTable::load_or_empty(table_path.as_deref(), &self.logger);
        let resolved = ResolvedTarget::resolve(target, &table)?;

        match &resolved.alias {
            Some(alias) => self
                .logger
                .info(&format!("Registry {} -> {}", alias, resolved.endpoint)),
            None => self.logger.info(&format!("Registry {}", resolved.endpoint)),
        }

        let fetch = FetchConfig {
            timeout: Duration::from_secs(self.args.timeout_secs()),
            connect_timeout: Duration::from_secs(self.args.connect_timeout_secs()),
            skip_tls: self.args.skip_tls || resolved.insecure,
            max_in_flight: self.args.concurrency(),
            ..FetchConfig::default()
        };
        fetch.validate()?;

        let concurrency = ConcurrencyConfig::default()
            .with_max_in_flight(self.args.concurrency())
            .with_deadline(self.args.deadline());
        concurrency.validate()?;

        Ok(ScanContext {
            endpoint: resolved.endpoint,
            alias: resolved.alias,
            fetch,
            concurrency,
        })
    }

    fn cancel_on_interrupt(token: CancellationToken, logger: Logger) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                logger.warning("Interrupted, finishing with what has been collected");
                token.cancel();
            }
        })
    }

    fn print_summary(&self, outcome: &ScanOutcome) {
        let stats = &outcome.stats;
        let status = match stats.completion {
            Completion::Finished => "complete".to_string(),
            Completion::DeadlineExceeded { abandoned } => {
                format!("deadline reached, {} units abandoned", abandoned)
            }
            Completion::Cancelled { abandoned } => {
                format!("cancelled, {} units abandoned", abandoned)
            }
        };

        self.logger.summary_kv(
            "Scan Summary",
            &[
                ("Status", status),
                ("Requests", stats.requests.to_string()),
                ("Repositories listed", stats.repositories_listed.to_string()),
                ("Repositories reported", outcome.report.repository_count().to_string()),
                ("Tags reported", outcome.report.tag_count().to_string()),
                ("Tags without history", stats.unavailable_tags.to_string()),
                ("Failed fetches", stats.failed_fetches.to_string()),
                ("Elapsed", self.logger.format_duration(stats.elapsed)),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(target: Option<&str>) -> Args {
        Args {
            target: target.map(str::to_string),
            quiet: true,
            ..Args::default()
        }
    }

    fn alias_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"registries":[{{"alias":"prod","host":"registry.example.com","port":5443,"schema":"https","insecure":true}}]}}"#
        )
        .unwrap();
        file
    }

    #[test]
    fn test_missing_target() {
        let runner = Runner::new(args(None));
        let err = runner.prepare().unwrap_err();
        assert!(matches!(err, RegmanError::MissingTarget));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_raw_target_context() {
        let file = alias_file();
        let mut a = args(Some("10.0.0.5:5000"));
        a.config = Some(file.path().to_path_buf());
        a.concurrency = Some(4);
        a.deadline = Some(30);

        let context = Runner::new(a).prepare().unwrap();
        assert_eq!(context.endpoint.base_url(), "http://10.0.0.5:5000");
        assert_eq!(context.alias, None);
        assert!(!context.fetch.skip_tls);
        assert_eq!(context.fetch.max_in_flight, 4);
        assert_eq!(context.concurrency.max_in_flight, 4);
        assert_eq!(context.concurrency.deadline, Some(Duration::from_secs(30)));
        assert_eq!(context.fetch.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_alias_target_context() {
        let file = alias_file();
        let mut a = args(Some("PROD"));
        a.config = Some(file.path().to_path_buf());

        let context = Runner::new(a).prepare().unwrap();
        assert_eq!(context.endpoint.base_url(), "https://registry.example.com:5443");
        assert_eq!(context.alias.as_deref(), Some("prod"));
        assert!(context.fetch.skip_tls);
    }

    #[test]
    fn test_broken_alias_file_falls_back_to_raw_address() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let mut a = args(Some("prod"));
        a.config = Some(file.path().to_path_buf());

        let context = Runner::new(a).prepare().unwrap();
        assert_eq!(context.endpoint.base_url(), "http://prod:80");
    }

    #[test]
    fn test_invalid_options_are_usage_errors() {
        let mut a = args(Some("local"));
        a.concurrency = Some(0);
        let err = Runner::new(a).prepare().unwrap_err();
        assert!(matches!(err, RegmanError::Validation(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
