use clap::Parser;

/// DNS resolver lab grader
#[derive(Parser, Debug)]
#[command(name = "dns-lab-grader")]
#[command(about = "Grade a DNS stub resolver by proxying its query to a canonical answer")]
pub struct Cli {
	/// Fixed port for the proxy DNS server (random per run when omitted)
	#[arg(short = 'p', long = "port")]
	pub port: Option<u16>,

	/// Address the proxy DNS server listens on
	#[arg(long = "proxy-ip", default_value = "127.0.0.1")]
	pub proxy_ip: String,

	/// Timeout, in seconds, for each test
	#[arg(short = 't', long = "timeout", default_value = "2")]
	pub timeout: u64,

	/// Seconds before a still-running submission is killed
	#[arg(long = "run-timeout", default_value = "30")]
	pub run_timeout: u64,

	/// Upstream DNS server that supplies canonical answers (e.g. 8.8.8.8 or 8.8.8.8:53)
	#[arg(short = 's', long = "dns-server", default_value = "8.8.8.8")]
	pub dns_server: String,

	/// Query name to grade (repeatable). Include a CNAME, a root name,
	/// an NXDOMAIN and a normal name for full coverage
	#[arg(short = 'd', long = "domain")]
	pub domains: Vec<String>,

	/// File containing query names to grade (one per line)
	#[arg(long = "domain-file")]
	pub domain_file: Option<String>,

	/// Submission source file
	#[arg(long = "source", default_value = "resolver.c")]
	pub source: String,

	/// Path of the compiled resolver
	#[arg(long = "binary", default_value = "./resolver")]
	pub binary: String,

	/// C compiler used to build the submission
	#[arg(long = "cc", default_value = "gcc")]
	pub cc: String,

	/// Grade an already-built binary; compiler warnings stay ungraded
	#[arg(long = "no-compile")]
	pub no_compile: bool,

	/// Syscall tracer executable
	#[arg(long = "strace", default_value = "strace")]
	pub strace: String,

	/// Memory checker executable
	#[arg(long = "valgrind", default_value = "valgrind")]
	pub valgrind: String,

	/// Verbose. Show all point assignments, not just failures
	#[arg(short = 'v', long = "verbose")]
	pub verbose: bool,

	/// Output CSV file path for per-test verdicts
	#[arg(short = 'o', long = "output")]
	pub output: Option<String>,

	/// Log filter (trace, debug, info, warn, error); RUST_LOG also works
	#[arg(long = "log-level")]
	pub log_level: Option<String>,
}
