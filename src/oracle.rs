use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use hickory_proto::op::{Message, MessageType, Query};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use tokio::net::UdpSocket;
use tracing::debug;

use crate::error::GraderError;

/// Ground truth for one query name: the query a correct resolver sends
/// and the answer a real upstream gave to it.
#[derive(Debug, Clone)]
pub struct CanonicalExchange {
	pub query_wire: Vec<u8>,
	pub response: Message,
	/// Response bytes exactly as received from the upstream
	pub response_wire: Vec<u8>,
}

impl CanonicalExchange {
	/// Render the answer section to presentation form, sorted.
	pub fn expected_answers(&self) -> Vec<String> {
		let mut answers: Vec<String> = self.response.answers().iter()
			.map(render_record)
			.collect();
		answers.sort();
		answers
	}
}

/// Source of canonical query/response pairs.
pub trait Oracle {
	async fn resolve(&self, qname: &str) -> Result<CanonicalExchange, GraderError>;
}

/// Oracle backed by a real recursive resolver reached over UDP.
#[derive(Debug, Clone)]
pub struct UpstreamOracle {
	server: SocketAddr,
	timeout: Duration,
}

impl UpstreamOracle {
	pub fn new(server: SocketAddr, timeout: Duration) -> Self {
		UpstreamOracle { server, timeout }
	}

	async fn exchange(&self, query: &[u8], txid: u16) -> Result<(Message, Vec<u8>)> {
		let bind_addr = if self.server.is_ipv4() {
			"0.0.0.0:0"
		} else {
			"[::]:0"
		};
		let socket = UdpSocket::bind(bind_addr).await?;
		socket.send_to(query, self.server).await?;

		// Retry recv on txid mismatch or unparsable datagrams
		let start = Instant::now();
		let mut buf = vec![0u8; 4096];
		let max_retries = 3;
		for _ in 0..max_retries {
			let elapsed = start.elapsed();
			if elapsed >= self.timeout {
				break;
			}
			let remaining = self.timeout - elapsed;

			let (len, src) = match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await {
				Ok(received) => received?,
				Err(_) => break,
			};
			let bytes = buf[..len].to_vec();
			match Message::from_vec(&bytes) {
				Ok(message) if message.id() == txid
					&& message.message_type() == MessageType::Response => {
					return Ok((message, bytes));
				}
				Ok(message) => {
					debug!(%src, id = message.id(), "ignoring unrelated datagram from upstream");
				}
				Err(e) => {
					debug!(%src, error = %e, "ignoring unparsable datagram from upstream");
				}
			}
		}
		Err(anyhow!("no response within {} ms", self.timeout.as_millis()))
	}
}

impl Oracle for UpstreamOracle {
	async fn resolve(&self, qname: &str) -> Result<CanonicalExchange, GraderError> {
		let txid: u16 = rand::random();
		let query = build_query(qname, txid)?;
		let query_wire = query.to_vec().map_err(|e| GraderError::InvalidName {
			qname: qname.to_string(),
			detail: e.to_string(),
		})?;

		let (response, response_wire) = self.exchange(&query_wire, txid).await
			.map_err(|e| GraderError::Oracle {
				qname: qname.to_string(),
				server: self.server,
				detail: e.to_string(),
			})?;
		debug!(qname, answers = response.answers().len(), "fetched canonical response");

		Ok(CanonicalExchange { query_wire, response, response_wire })
	}
}

/// Build the canonical query for `qname`: type A, recursion desired, no EDNS.
///
/// The name is lower-cased first, since a correct resolver sends it that way.
pub fn build_query(qname: &str, txid: u16) -> Result<Message, GraderError> {
	let lowered = qname.to_lowercase();
	let name = Name::from_ascii(&lowered).map_err(|e| GraderError::InvalidName {
		qname: qname.to_string(),
		detail: e.to_string(),
	})?;

	let mut message = Message::new();
	message.set_id(txid);
	message.set_message_type(MessageType::Query);
	message.set_recursion_desired(true);
	message.add_query(Query::query(name, RecordType::A));
	Ok(message)
}

/// Presentation form of one answer record's data.
fn render_record(record: &Record) -> String {
	match record.data() {
		RData::A(a) => a.0.to_string(),
		RData::CNAME(cname) => cname.0.to_string(),
		other => other.to_string(),
	}
}

/// Parse an upstream resolver address.
///
/// Supports formats:
///   "8.8.8.8"              -- IPv4, default port 53
///   "8.8.8.8:5353"         -- IPv4 with explicit port
///   "2606:4700::1111"      -- bare IPv6, default port 53
///   "[2606:4700::1111]:53" -- bracketed IPv6 with port
pub fn parse_upstream(input: &str) -> Result<SocketAddr> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err(anyhow!("empty resolver address"));
	}

	let addr: SocketAddr = if trimmed.starts_with('[') {
		// [2606:4700::1111]:53
		trimmed.parse()
			.map_err(|e| anyhow!("invalid bracketed IPv6 address '{}': {}", trimmed, e))?
	} else if trimmed.contains("::") || trimmed.matches(':').count() > 1 {
		// Bare IPv6, no room for a port
		let ip = trimmed.parse()
			.map_err(|e| anyhow!("invalid IPv6 address '{}': {}", trimmed, e))?;
		SocketAddr::new(ip, 53)
	} else if let Ok(addr) = trimmed.parse::<SocketAddr>() {
		// IPv4 with port
		addr
	} else {
		// Plain IPv4, default port
		let ip = trimmed.parse()
			.map_err(|e| anyhow!("invalid IP address '{}': {}", trimmed, e))?;
		SocketAddr::new(ip, 53)
	};
	Ok(addr)
}
