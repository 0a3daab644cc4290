use crate::answers::{compare, describe_mismatch, has_name_answers};
use crate::config::Category;
use crate::reconcile::TestResult;
use crate::wirediff;

/// Verdict of one category check on one test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
	/// Whether the category is meaningful for this test at all
	pub applies: bool,
	/// None when the check does not apply
	pub passed: Option<bool>,
	pub reason: Option<String>,
}

impl CheckOutcome {
	pub fn not_applicable() -> Self {
		CheckOutcome { applies: false, passed: None, reason: None }
	}

	pub fn pass() -> Self {
		CheckOutcome { applies: true, passed: Some(true), reason: None }
	}

	pub fn fail(reason: impl Into<String>) -> Self {
		CheckOutcome { applies: true, passed: Some(false), reason: Some(reason.into()) }
	}

	pub fn passed(&self) -> bool {
		self.passed == Some(true)
	}
}

/// Run the per-test check for `category`.
///
/// Returns None for categories decided once for the whole submission.
pub fn check(category: Category, result: &TestResult) -> Option<CheckOutcome> {
	let outcome = match category {
		Category::MemoryLeaks => memory_safety(result),
		Category::CompilerWarnings => return None,
		Category::WellFormedQuery => well_formed_query(result),
		Category::SendAndReceive => send_and_receive(result),
		Category::FindsAnswer => finds_answer(result),
		Category::HandlesCname => handles_cname(result),
		Category::HandlesNxdomain => handles_nxdomain(result),
		Category::HandlesRoot => handles_root(result),
	};
	Some(outcome)
}

fn memory_safety(result: &TestResult) -> CheckOutcome {
	match result.memcheck_exit {
		Some(exit) if exit.is_success() => CheckOutcome::pass(),
		Some(exit) => {
			let mut reason = format!(
				"Valgrind exitcode was nonzero ({}), indicating a memory error.",
				exit,
			);
			for line in memcheck_summary(&result.memcheck_output) {
				reason.push_str("\n    ");
				reason.push_str(&line);
			}
			CheckOutcome::fail(reason)
		}
		None => CheckOutcome::fail("Valgrind did not report an exit code."),
	}
}

/// Summary lines worth quoting from memcheck output.
fn memcheck_summary(output: &[u8]) -> Vec<String> {
	const MARKERS: [&str; 4] = ["ERROR SUMMARY", "definitely lost", "Invalid read", "Invalid write"];
	String::from_utf8_lossy(output)
		.lines()
		.filter(|line| MARKERS.iter().any(|m| line.contains(m)))
		.map(|line| line.trim().to_string())
		.collect()
}

fn well_formed_query(result: &TestResult) -> CheckOutcome {
	let diff = wirediff::diff(&result.query, &result.expected_query);
	if diff.equal {
		CheckOutcome::pass()
	} else {
		CheckOutcome::fail(diff.diagnostic.unwrap_or_default())
	}
}

fn send_and_receive(result: &TestResult) -> CheckOutcome {
	if result.query.is_empty() {
		return CheckOutcome::fail("The submission did not send any data");
	}
	let trace = String::from_utf8_lossy(&result.trace_output);
	if observed_socket_then_read(&trace) {
		CheckOutcome::pass()
	} else {
		CheckOutcome::fail("socket() and read() must be called at least once by your program")
	}
}

fn finds_answer(result: &TestResult) -> CheckOutcome {
	let expected = &result.expected_answers;
	if expected.is_empty() || has_name_answers(expected) {
		return CheckOutcome::not_applicable();
	}
	compare_answers(result, "The resolver did not find the correct answers from the response:")
}

fn handles_cname(result: &TestResult) -> CheckOutcome {
	let expected = &result.expected_answers;
	if expected.is_empty() || !has_name_answers(expected) {
		return CheckOutcome::not_applicable();
	}
	compare_answers(result, "The resolver did not find the correct answers from the CNAME response:")
}

fn handles_nxdomain(result: &TestResult) -> CheckOutcome {
	if !result.expected_answers.is_empty() {
		return CheckOutcome::not_applicable();
	}
	compare_answers(result, "The resolver did not correctly handle a name that didn't resolve:")
}

fn handles_root(result: &TestResult) -> CheckOutcome {
	if result.qname != "." {
		return CheckOutcome::not_applicable();
	}
	compare_answers(result, "The resolver did not correctly handle the root name:")
}

/// Shared tail of the answer categories: a crash fails before any comparison.
fn compare_answers(result: &TestResult, headline: &str) -> CheckOutcome {
	if !result.exit.is_success() {
		return CheckOutcome::fail(format!(
			"Exitcode was nonzero ({}), indicating submission likely crashed.",
			result.exit,
		));
	}
	let comparison = compare(&result.answers, &result.expected_answers);
	if comparison.equal {
		CheckOutcome::pass()
	} else {
		CheckOutcome::fail(describe_mismatch(
			headline,
			&result.answers,
			&result.expected_answers,
			&comparison,
		))
	}
}

/// Syscalls that count as reading data back from the socket.
const READ_CALLS: [&str; 4] = ["read", "recvfrom", "recv", "recvmsg"];

/// True when the trace shows `socket(...) = fd` and, on a later line, a
/// read-family call on that same fd.
///
/// This is text matching over strace output, nothing more.
pub fn observed_socket_then_read(trace: &str) -> bool {
	let mut open_fds: Vec<&str> = Vec::new();
	for line in trace.lines() {
		if let Some(fd) = socket_fd(line) {
			open_fds.push(fd);
			continue;
		}
		if open_fds.iter().any(|fd| reads_from(line, fd)) {
			return true;
		}
	}
	false
}

/// The descriptor returned by a successful `socket(...)` line.
fn socket_fd(line: &str) -> Option<&str> {
	if !line.starts_with("socket(") {
		return None;
	}
	let (_, ret) = line.rsplit_once("= ")?;
	let fd = ret.split_whitespace().next()?;
	if !fd.is_empty() && fd.chars().all(|c| c.is_ascii_digit()) {
		Some(fd)
	} else {
		None
	}
}

fn reads_from(line: &str, fd: &str) -> bool {
	READ_CALLS.iter().any(|call| {
		line.strip_prefix(call)
			.and_then(|rest| rest.strip_prefix('('))
			.and_then(|rest| rest.strip_prefix(fd))
			.is_some_and(|rest| rest.starts_with(','))
	})
}
