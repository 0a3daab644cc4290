/// Leading bytes holding the transaction ID, chosen freely by each side.
const ID_LEN: usize = 2;

/// Filler XOR byte where only one message has a byte at that offset.
const LENGTH_MISMATCH: u8 = 0xff;

const LABEL_WIDTH: usize = 16;

/// Outcome of comparing a sent query with the canonical one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireDiff {
	pub equal: bool,
	/// Aligned hex/XOR rendering, present only when the queries differ
	pub diagnostic: Option<String>,
}

/// Compare two DNS messages, ignoring the transaction ID.
pub fn diff(actual: &[u8], expected: &[u8]) -> WireDiff {
	let actual_hex = to_hex(actual);
	let expected_hex = to_hex(expected);

	if skip_id(&actual_hex) == skip_id(&expected_hex) {
		return WireDiff { equal: true, diagnostic: None };
	}

	let xor = xor_hex(actual, expected);
	let diagnostic = [
		"The query sent differs from the expected query:".to_string(),
		format!("{:<width$}{}", "Expected query:", expected_hex, width = LABEL_WIDTH),
		format!("{:<width$}{}", "Actual query:", actual_hex, width = LABEL_WIDTH),
		format!("{:<width$}{}", "XOR:", xor, width = LABEL_WIDTH),
	].join("\n");

	WireDiff { equal: false, diagnostic: Some(diagnostic) }
}

/// XOR of the bytes after the ID, with the ID rendered as a placeholder.
fn xor_hex(actual: &[u8], expected: &[u8]) -> String {
	let len = actual.len().max(expected.len());
	let mut out = String::from("-id-");
	for i in ID_LEN..len {
		let byte = match (expected.get(i), actual.get(i)) {
			(Some(e), Some(a)) => e ^ a,
			_ => LENGTH_MISMATCH,
		};
		out.push_str(&format!("{:02x}", byte));
	}
	out
}

fn skip_id(hex: &str) -> &str {
	hex.get(ID_LEN * 2..).unwrap_or("")
}

fn to_hex(bytes: &[u8]) -> String {
	bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
