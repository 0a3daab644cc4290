use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Environment failures that abort the whole grading run.
///
/// Anything the submission does wrong is a failed check, never one of these.
#[derive(Debug, thiserror::Error)]
pub enum GraderError {
	#[error("could not bind a UDP port on {ip} after {attempts} attempt(s): {source}")]
	Bind {
		ip: IpAddr,
		attempts: u32,
		#[source]
		source: std::io::Error,
	},
	#[error("invalid query name '{qname}': {detail}")]
	InvalidName { qname: String, detail: String },
	#[error("upstream resolver {server} failed for '{qname}': {detail}")]
	Oracle {
		qname: String,
		server: SocketAddr,
		detail: String,
	},
	#[error("unable to compile {source_file:?}, run the compiler manually to see the issue\n{stderr}")]
	Compile { source_file: PathBuf, stderr: String },
	#[error("could not remove old resolver executable {path:?}: {source}")]
	RemoveBinary {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to launch '{tool}': {source}")]
	Spawn {
		tool: String,
		#[source]
		source: std::io::Error,
	},
}
