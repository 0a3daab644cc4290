use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::{GraderConfig, ToolPaths};
use crate::error::GraderError;
use crate::proxy::{ListenerSettings, ProxyListener};

/// Instrumentation wrapped around one execution of the submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instrumentation {
	SyscallTrace,
	MemoryCheck,
}

/// How a child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
	Exited(i32),
	Signaled(i32),
	/// Killed by the grader after the run deadline
	TimedOut,
}

impl ExitOutcome {
	pub fn is_success(self) -> bool {
		self == ExitOutcome::Exited(0)
	}
}

impl fmt::Display for ExitOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ExitOutcome::Exited(code) => write!(f, "{}", code),
			ExitOutcome::Signaled(signal) => write!(f, "killed by signal {}", signal),
			ExitOutcome::TimedOut => f.write_str("timed out"),
		}
	}
}

impl From<ExitStatus> for ExitOutcome {
	fn from(status: ExitStatus) -> Self {
		if let Some(code) = status.code() {
			return ExitOutcome::Exited(code);
		}
		#[cfg(unix)]
		{
			use std::os::unix::process::ExitStatusExt;
			if let Some(signal) = status.signal() {
				return ExitOutcome::Signaled(signal);
			}
		}
		ExitOutcome::Exited(-1)
	}
}

/// Raw artifacts of one instrumented execution
#[derive(Debug, Clone)]
pub struct SubmissionRunResult {
	/// Datagram captured by the proxy, empty when none arrived
	pub request: Vec<u8>,
	pub stdout: Vec<u8>,
	pub trace_output: Option<Vec<u8>>,
	pub memcheck_output: Option<Vec<u8>>,
	pub memcheck_exit: Option<ExitOutcome>,
	pub exit: ExitOutcome,
}

/// Build the full argv for one instrumented run.
pub fn invocation(
	mode: Instrumentation,
	tools: &ToolPaths,
	binary: &Path,
	qname: &str,
	proxy: SocketAddr,
) -> Vec<String> {
	let mut argv = match mode {
		Instrumentation::SyscallTrace => vec![tools.strace.clone()],
		Instrumentation::MemoryCheck => vec![
			tools.valgrind.clone(),
			"--tool=memcheck".to_string(),
			"--leak-check=full".to_string(),
			"--error-exitcode=1".to_string(),
		],
	};
	argv.push(binary.display().to_string());
	argv.push(qname.to_string());
	argv.push(proxy.ip().to_string());
	argv.push(proxy.port().to_string());
	argv
}

/// Run the submission once under `mode` against a fresh proxy listener.
///
/// The listener answers with `response_wire`. Submission misbehaviour ends
/// up in the returned artifacts; only environment failures are errors.
pub async fn run_submission(
	config: &GraderConfig,
	qname: &str,
	response_wire: &[u8],
	mode: Instrumentation,
) -> Result<SubmissionRunResult, GraderError> {
	let settings = ListenerSettings {
		ip: config.proxy_ip,
		port: config.proxy_port,
		timeout: config.timeout,
	};
	let listener = ProxyListener::start(settings, response_wire.to_vec()).await?;

	let child = execute(config, qname, listener.addr(), mode).await;
	// Join the listener even when the launch failed, so no task outlives the run
	let request = listener.finish(qname).await;
	let (stdout, stderr, exit) = child?;

	let result = match mode {
		Instrumentation::SyscallTrace => SubmissionRunResult {
			request,
			stdout,
			trace_output: Some(stderr),
			memcheck_output: None,
			memcheck_exit: None,
			exit,
		},
		Instrumentation::MemoryCheck => SubmissionRunResult {
			request,
			stdout,
			trace_output: None,
			memcheck_output: Some(stderr),
			memcheck_exit: Some(exit),
			exit,
		},
	};
	Ok(result)
}

/// Spawn the instrumented child and collect (stdout, stderr, outcome).
async fn execute(
	config: &GraderConfig,
	qname: &str,
	proxy: SocketAddr,
	mode: Instrumentation,
) -> Result<(Vec<u8>, Vec<u8>, ExitOutcome), GraderError> {
	let argv = invocation(mode, &config.tools, &config.build.binary, qname, proxy);
	debug!(command = %argv.join(" "), "launching submission");

	let mut cmd = Command::new(&argv[0]);
	cmd.args(&argv[1..])
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true);
	// Own process group, so a timeout can take down the tracee with its tracer
	#[cfg(unix)]
	cmd.process_group(0);

	let child = cmd.spawn()
		.map_err(|source| GraderError::Spawn { tool: argv[0].clone(), source })?;
	let pid = child.id();

	match tokio::time::timeout(config.run_timeout, child.wait_with_output()).await {
		Ok(Ok(output)) => Ok((output.stdout, output.stderr, output.status.into())),
		Ok(Err(source)) => Err(GraderError::Spawn { tool: argv[0].clone(), source }),
		Err(_) => {
			if let Some(pid) = pid {
				kill_process_group(pid);
			}
			warn!(
				qname,
				?mode,
				"submission still running after {} seconds, killed",
				config.run_timeout.as_secs_f64(),
			);
			Ok((Vec::new(), Vec::new(), ExitOutcome::TimedOut))
		}
	}
}

/// SIGKILL every process in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
	// SAFETY: killpg only sends a signal; the group was created for this child
	let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
	if rc != 0 {
		debug!(pid, error = %std::io::Error::last_os_error(), "killpg failed");
	}
}

// Dropping the wait future kills the direct child through kill_on_drop
#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}
