use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use rand::Rng;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::GraderError;

/// No well-formed query comes anywhere near this size.
const MAX_REQUEST_BYTES: usize = 8192;

/// Bind attempts before giving up on a random port.
const MAX_BIND_ATTEMPTS: u32 = 5;

/// Settings for one fake upstream server instance
#[derive(Debug, Clone, Copy)]
pub struct ListenerSettings {
	pub ip: IpAddr,
	pub port: Option<u16>,
	pub timeout: Duration,
}

/// A running single-shot proxy listener.
///
/// The captured request is the task's return value, so it is read exactly
/// once, after the join.
pub struct ProxyListener {
	addr: SocketAddr,
	timeout: Duration,
	task: JoinHandle<Result<Vec<u8>, GraderError>>,
}

impl ProxyListener {
	/// Start a listener that answers one datagram with `response`.
	///
	/// Returns once the socket is bound, so the caller knows the real port
	/// before launching anything that needs it.
	pub async fn start(settings: ListenerSettings, response: Vec<u8>) -> Result<Self, GraderError> {
		let (ready_tx, ready_rx) = oneshot::channel();
		let task = tokio::spawn(serve_once(settings, response, ready_tx));

		match ready_rx.await {
			Ok(addr) => {
				debug!(%addr, "proxy listener ready");
				Ok(ProxyListener { addr, timeout: settings.timeout, task })
			}
			// Sender dropped without signalling, the task ended in a bind error
			Err(_) => match task.await {
				Ok(Err(e)) => Err(e),
				Ok(Ok(_)) | Err(_) => Err(GraderError::Bind {
					ip: settings.ip,
					attempts: 0,
					source: std::io::Error::new(ErrorKind::Other, "listener exited before binding"),
				}),
			},
		}
	}

	pub fn addr(&self) -> SocketAddr {
		self.addr
	}

	/// Wait up to the listener timeout for the task and return whatever it
	/// captured. A listener that is still running is abandoned and counts as
	/// having captured nothing.
	pub async fn finish(self, qname: &str) -> Vec<u8> {
		let abort = self.task.abort_handle();
		match tokio::time::timeout(self.timeout, self.task).await {
			Ok(Ok(Ok(request))) => request,
			Ok(Ok(Err(e))) => {
				warn!(qname, error = %e, "proxy listener failed");
				Vec::new()
			}
			Ok(Err(e)) => {
				warn!(qname, error = %e, "proxy listener task panicked");
				Vec::new()
			}
			Err(_) => {
				warn!(
					qname,
					"Error testing submission: timeout in test {} after {} seconds!",
					qname,
					self.timeout.as_secs_f64(),
				);
				abort.abort();
				Vec::new()
			}
		}
	}
}

/// Bind, signal readiness, capture one datagram, reply, close.
async fn serve_once(
	settings: ListenerSettings,
	response: Vec<u8>,
	ready: oneshot::Sender<SocketAddr>,
) -> Result<Vec<u8>, GraderError> {
	let socket = bind_socket(settings.ip, settings.port).await?;
	let local = socket.local_addr().map_err(|source| GraderError::Bind {
		ip: settings.ip,
		attempts: 1,
		source,
	})?;
	if ready.send(local).is_err() {
		return Ok(Vec::new());
	}

	let mut buf = vec![0u8; MAX_REQUEST_BYTES];
	let (len, peer) = match tokio::time::timeout(settings.timeout, socket.recv_from(&mut buf)).await {
		Ok(Ok(received)) => received,
		Ok(Err(e)) => {
			warn!(%local, error = %e, "proxy receive failed");
			return Ok(Vec::new());
		}
		Err(_) => {
			info!(%local, "test timed out, no query received");
			return Ok(Vec::new());
		}
	};
	buf.truncate(len);
	debug!(%peer, bytes = len, "captured query");

	if let Err(e) = socket.send_to(&response, peer).await {
		warn!(%peer, error = %e, "failed to send canonical response");
	}
	Ok(buf)
}

/// Bind a UDP socket, either on a fixed port or on a random one.
///
/// Random ports are retried on permission and address-in-use failures,
/// up to MAX_BIND_ATTEMPTS.
async fn bind_socket(ip: IpAddr, port: Option<u16>) -> Result<UdpSocket, GraderError> {
	if let Some(port) = port {
		return UdpSocket::bind((ip, port)).await
			.map_err(|source| GraderError::Bind { ip, attempts: 1, source });
	}

	let mut attempts = 0;
	loop {
		let port: u16 = rand::thread_rng().gen_range(1024..=65535);
		attempts += 1;
		match UdpSocket::bind((ip, port)).await {
			Ok(socket) => return Ok(socket),
			Err(e) if matches!(e.kind(), ErrorKind::PermissionDenied | ErrorKind::AddrInUse)
				&& attempts < MAX_BIND_ATTEMPTS => {
				debug!(port, error = %e, "bind failed, picking another port");
			}
			Err(source) => return Err(GraderError::Bind { ip, attempts, source }),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::net::Ipv4Addr;

	fn settings(timeout_ms: u64) -> ListenerSettings {
		ListenerSettings {
			ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
			port: None,
			timeout: Duration::from_millis(timeout_ms),
		}
	}

	#[tokio::test]
	async fn test_captures_query_and_replies() {
		let listener = ProxyListener::start(settings(2000), b"canonical".to_vec()).await.unwrap();
		let addr = listener.addr();
		assert!(addr.port() >= 1024);

		let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
		client.send_to(b"\x12\x34query", addr).await.unwrap();
		let mut buf = [0u8; 64];
		let (len, _) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
			.await.unwrap().unwrap();
		assert_eq!(&buf[..len], b"canonical");

		let request = listener.finish("byu.edu").await;
		assert_eq!(request, b"\x12\x34query");
	}

	#[tokio::test]
	async fn test_timeout_yields_empty_capture() {
		let listener = ProxyListener::start(settings(100), b"canonical".to_vec()).await.unwrap();
		let request = listener.finish("byu.edu").await;
		assert!(request.is_empty());
	}

	#[tokio::test]
	async fn test_fixed_port_in_use_is_bind_error() {
		let taken = UdpSocket::bind("127.0.0.1:0").await.unwrap();
		let port = taken.local_addr().unwrap().port();
		let mut fixed = settings(100);
		fixed.port = Some(port);
		let result = ProxyListener::start(fixed, Vec::new()).await;
		assert!(matches!(result, Err(GraderError::Bind { attempts: 1, .. })));
	}

	#[tokio::test]
	async fn test_fresh_listener_per_run() {
		let first = ProxyListener::start(settings(100), Vec::new()).await.unwrap();
		let second = ProxyListener::start(settings(100), Vec::new()).await.unwrap();
		assert_ne!(first.addr(), second.addr());
		first.finish("a").await;
		second.finish("b").await;
	}
}
