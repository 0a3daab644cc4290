use std::collections::BTreeSet;

/// Set comparison of normalized answer strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerComparison {
	pub equal: bool,
	/// Expected answers the submission did not print
	pub missing: BTreeSet<String>,
	/// Printed answers that were not expected
	pub extra: BTreeSet<String>,
}

/// Compare answers as sets; order and duplicates do not matter.
pub fn compare(actual: &[String], expected: &[String]) -> AnswerComparison {
	let actual: BTreeSet<String> = actual.iter().cloned().collect();
	let expected: BTreeSet<String> = expected.iter().cloned().collect();

	let missing: BTreeSet<String> = expected.difference(&actual).cloned().collect();
	let extra: BTreeSet<String> = actual.difference(&expected).cloned().collect();

	AnswerComparison {
		equal: missing.is_empty() && extra.is_empty(),
		missing,
		extra,
	}
}

/// Failure diagnostic listing both sets and the difference counts.
pub fn describe_mismatch(
	headline: &str,
	actual: &[String],
	expected: &[String],
	comparison: &AnswerComparison,
) -> String {
	let expected: BTreeSet<&String> = expected.iter().collect();
	let actual: BTreeSet<&String> = actual.iter().collect();
	[
		headline.to_string(),
		format!("{:<16}{:?}", "Expected: ", expected),
		format!("{:<16}{:?}", "Actual: ", actual),
		format!(
			"(There are {} extra and {} missing answers)",
			comparison.extra.len(),
			comparison.missing.len(),
		),
	].join("\n")
}

/// True when an answer is an address literal rather than a name.
pub fn is_numeric_answer(answer: &str) -> bool {
	let digits: String = answer.chars().filter(|c| *c != '.').collect();
	!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// True when any expected answer is a name, i.e. the response has a CNAME.
pub fn has_name_answers(expected: &[String]) -> bool {
	expected.iter().any(|a| !is_numeric_answer(a))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn strings(items: &[&str]) -> Vec<String> {
		items.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn test_equal_ignores_order_and_duplicates() {
		let actual = strings(&["5.6.7.8", "1.2.3.4", "1.2.3.4"]);
		let expected = strings(&["1.2.3.4", "5.6.7.8"]);
		let result = compare(&actual, &expected);
		assert!(result.equal);
		assert!(result.missing.is_empty() && result.extra.is_empty());
	}

	#[test]
	fn test_missing_and_extra() {
		let actual = strings(&["1.2.3.4", "9.9.9.9"]);
		let expected = strings(&["1.2.3.4", "www.byu.edu."]);
		let result = compare(&actual, &expected);
		assert!(!result.equal);
		assert_eq!(result.missing, BTreeSet::from(["www.byu.edu.".to_string()]));
		assert_eq!(result.extra, BTreeSet::from(["9.9.9.9".to_string()]));
	}

	#[test]
	fn test_swapping_inputs_keeps_verdict() {
		let a = strings(&["1.2.3.4"]);
		let b = strings(&["1.2.3.4", "a.b."]);
		let forward = compare(&a, &b);
		let backward = compare(&b, &a);
		assert_eq!(forward.equal, backward.equal);
		assert_eq!(forward.missing, backward.extra);
		assert_eq!(forward.extra, backward.missing);
	}

	#[test]
	fn test_empty_sets_are_equal() {
		assert!(compare(&[], &[]).equal);
		assert!(!compare(&strings(&["1.2.3.4"]), &[]).equal);
	}

	#[test]
	fn test_numeric_detection() {
		assert!(is_numeric_answer("128.187.16.184"));
		assert!(!is_numeric_answer("a.b.c.d."));
		assert!(!is_numeric_answer("."));
		assert!(has_name_answers(&strings(&["1.2.3.4", "byu.edu."])));
		assert!(!has_name_answers(&strings(&["1.2.3.4"])));
	}

	#[test]
	fn test_describe_mismatch_counts() {
		let actual = strings(&["9.9.9.9"]);
		let expected = strings(&["1.2.3.4", "5.6.7.8"]);
		let comparison = compare(&actual, &expected);
		let text = describe_mismatch("Wrong answers:", &actual, &expected, &comparison);
		assert!(text.starts_with("Wrong answers:\nExpected:       {\"1.2.3.4\", \"5.6.7.8\"}"));
		assert!(text.ends_with("(There are 1 extra and 2 missing answers)"));
	}
}
