mod answers;
mod checks;
mod cli;
mod compile;
mod config;
mod domains;
mod error;
mod executor;
mod oracle;
mod output;
mod proxy;
mod reconcile;
mod runner;
mod scoring;
mod wirediff;

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::anyhow;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::{BuildConfig, GraderConfig, GradingPlan, ToolPaths};
use crate::oracle::UpstreamOracle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	init_logging(cli.log_level.as_deref());

	// Query names from flags, then file, then defaults
	let mut qnames = cli.domains.clone();
	if let Some(path) = &cli.domain_file {
		qnames.extend(domains::read_domain_file(path)?);
	}
	if qnames.is_empty() {
		qnames = domains::default_domains();
	}

	let proxy_ip: IpAddr = cli.proxy_ip.parse()
		.map_err(|e| anyhow!("invalid proxy address '{}': {}", cli.proxy_ip, e))?;
	let config = GraderConfig {
		proxy_ip,
		proxy_port: cli.port,
		timeout: Duration::from_secs(cli.timeout),
		run_timeout: Duration::from_secs(cli.run_timeout),
		upstream: oracle::parse_upstream(&cli.dns_server)?,
		tools: ToolPaths {
			strace: cli.strace.clone(),
			valgrind: cli.valgrind.clone(),
		},
		build: BuildConfig {
			compiler: cli.cc.clone(),
			source: PathBuf::from(&cli.source),
			binary: PathBuf::from(&cli.binary),
			skip: cli.no_compile,
		},
		verbose: cli.verbose,
	};
	let plan = GradingPlan::default();

	output::print_config_summary(&config, &qnames);

	// Compile, keeping warnings for grading
	let build = if config.build.skip {
		None
	} else {
		Some(compile::compile_resolver(&config.build).await?)
	};

	let oracle = UpstreamOracle::new(config.upstream, config.timeout);
	let results = runner::run_tests(&config, &oracle, &qnames).await?;

	let ledger = scoring::score(&plan, &results, build.as_ref());
	output::print_report(&ledger, config.verbose)?;
	println!();
	output::print_summary_table(&ledger);

	if let Some(path) = &cli.output {
		output::write_csv(path, &ledger)?;
	}

	Ok(())
}

/// Log to stderr so the report on stdout stays clean.
fn init_logging(level: Option<&str>) {
	let filter = match level {
		Some(level) => EnvFilter::new(level),
		None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
	};
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}
