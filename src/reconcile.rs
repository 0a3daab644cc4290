use crate::executor::{ExitOutcome, SubmissionRunResult};

/// Everything the category checks know about one query name
#[derive(Debug, Clone)]
pub struct TestResult {
	pub qname: String,
	/// Normalized answers printed by the submission, sorted
	pub answers: Vec<String>,
	/// Normalized answers from the canonical response, sorted
	pub expected_answers: Vec<String>,
	pub query: Vec<u8>,
	pub expected_query: Vec<u8>,
	pub trace_output: Vec<u8>,
	pub memcheck_output: Vec<u8>,
	pub memcheck_exit: Option<ExitOutcome>,
	pub exit: ExitOutcome,
}

/// Merge the trace-mode and check-mode runs for one query name.
///
/// The trace run supplies the captured query, stdout and process exit; the
/// check run supplies the memory-checker output and exit.
pub fn reconcile(
	qname: &str,
	traced: SubmissionRunResult,
	checked: SubmissionRunResult,
	expected_query: Vec<u8>,
	expected_answers: Vec<String>,
) -> TestResult {
	let mut answers = parse_submission_output(&traced.stdout);
	normalize_answers(&mut answers);
	answers.sort();

	let mut expected_answers = expected_answers;
	normalize_answers(&mut expected_answers);
	expected_answers.sort();

	TestResult {
		qname: qname.to_string(),
		answers,
		expected_answers,
		query: traced.request,
		expected_query,
		trace_output: traced.trace_output.unwrap_or_default(),
		memcheck_output: checked.memcheck_output.unwrap_or_default(),
		memcheck_exit: checked.memcheck_exit,
		exit: traced.exit,
	}
}

/// Split stdout into non-blank lines, sorted.
pub fn parse_submission_output(stdout: &[u8]) -> Vec<String> {
	let text = String::from_utf8_lossy(stdout);
	let mut lines: Vec<String> = text.split('\n')
		.filter(|line| !line.trim().is_empty())
		.map(String::from)
		.collect();
	lines.sort();
	lines
}

/// Lower-case each answer and give name answers a trailing dot.
///
/// Answers ending in a digit are address literals and stay as they are.
pub fn normalize_answers(answers: &mut [String]) {
	for answer in answers.iter_mut() {
		*answer = normalize_answer(answer);
	}
}

fn normalize_answer(answer: &str) -> String {
	let mut normalized = answer.to_lowercase();
	match normalized.chars().last() {
		Some('.') => {}
		Some(c) if c.is_ascii_digit() => {}
		_ => normalized.push('.'),
	}
	normalized
}
