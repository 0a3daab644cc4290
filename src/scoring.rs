use crate::checks::{check, CheckOutcome};
use crate::compile::BuildReport;
use crate::config::{Category, CategoryWeight, GradingPlan};
use crate::reconcile::TestResult;

/// One applicable check and the points it earned
#[derive(Debug, Clone)]
pub struct Verdict {
	/// Query name, or None for submission-wide checks
	pub qname: Option<String>,
	pub outcome: CheckOutcome,
	pub points: f64,
	pub points_possible: f64,
}

/// Points for a single category
#[derive(Debug, Clone)]
pub struct CategoryScore {
	pub category: Category,
	pub max_points: f64,
	pub awarded: f64,
	/// False when no test applied; such a category awards nothing
	pub graded: bool,
	/// Applicable verdicts only, in test order
	pub verdicts: Vec<Verdict>,
}

/// Final grade across every category in plan order
#[derive(Debug, Clone)]
pub struct ScoreLedger {
	pub categories: Vec<CategoryScore>,
	pub max_score: f64,
}

impl ScoreLedger {
	pub fn total(&self) -> f64 {
		self.categories.iter().map(|c| c.awarded).sum()
	}
}

/// Score every category of `plan` over all test results.
///
/// `build` is None when the compile step was skipped, which leaves the
/// compiler warnings category ungraded.
pub fn score(plan: &GradingPlan, results: &[TestResult], build: Option<&BuildReport>) -> ScoreLedger {
	let categories = plan.weights().iter()
		.map(|weight| match weight.category {
			Category::CompilerWarnings => score_build(weight, build),
			_ => score_tests(weight, results),
		})
		.collect();

	ScoreLedger {
		categories,
		max_score: plan.max_score(),
	}
}

/// Prorate a category's points across the tests it applies to.
fn score_tests(weight: &CategoryWeight, results: &[TestResult]) -> CategoryScore {
	let applicable: Vec<(&TestResult, CheckOutcome)> = results.iter()
		.filter_map(|r| check(weight.category, r).map(|outcome| (r, outcome)))
		.filter(|(_, outcome)| outcome.applies)
		.collect();

	prorate(weight, applicable.into_iter()
		.map(|(r, outcome)| (Some(r.qname.clone()), outcome))
		.collect())
}

fn score_build(weight: &CategoryWeight, build: Option<&BuildReport>) -> CategoryScore {
	let verdicts = match build {
		Some(report) if report.is_clean() => vec![(None, CheckOutcome::pass())],
		Some(report) => vec![(None, CheckOutcome::fail(format!(
			"There were compiler warnings.\n{}",
			report.warnings.trim_end(),
		)))],
		None => Vec::new(),
	};
	prorate(weight, verdicts)
}

fn prorate(weight: &CategoryWeight, outcomes: Vec<(Option<String>, CheckOutcome)>) -> CategoryScore {
	if outcomes.is_empty() {
		return CategoryScore {
			category: weight.category,
			max_points: weight.max_points,
			awarded: 0.0,
			graded: false,
			verdicts: Vec::new(),
		};
	}

	let points_per_test = weight.max_points / outcomes.len() as f64;
	let verdicts: Vec<Verdict> = outcomes.into_iter()
		.map(|(qname, outcome)| {
			let points = if outcome.passed() { points_per_test } else { 0.0 };
			Verdict { qname, outcome, points, points_possible: points_per_test }
		})
		.collect();

	// Sum of full shares lands exactly on the maximum when everything passes
	let awarded = if verdicts.iter().all(|v| v.outcome.passed()) {
		weight.max_points
	} else {
		verdicts.iter().map(|v| v.points).sum::<f64>().min(weight.max_points)
	};

	CategoryScore {
		category: weight.category,
		max_points: weight.max_points,
		awarded,
		graded: true,
		verdicts,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::executor::ExitOutcome;

	fn result(qname: &str, answers: &[&str], expected: &[&str]) -> TestResult {
		TestResult {
			qname: qname.to_string(),
			answers: answers.iter().map(|s| s.to_string()).collect(),
			expected_answers: expected.iter().map(|s| s.to_string()).collect(),
			query: vec![0x00, 0x01, 0x01, 0x00],
			expected_query: vec![0x00, 0x02, 0x01, 0x00],
			trace_output: b"socket(AF_INET, SOCK_DGRAM, IPPROTO_IP) = 3\nread(3, \"\", 1) = 1\n".to_vec(),
			memcheck_output: Vec::new(),
			memcheck_exit: Some(ExitOutcome::Exited(0)),
			exit: ExitOutcome::Exited(0),
		}
	}

	fn category(ledger: &ScoreLedger, category: Category) -> &CategoryScore {
		ledger.categories.iter().find(|c| c.category == category).unwrap()
	}

	#[test]
	fn test_perfect_submission_scores_maximum() {
		let results = vec![
			result("byu.edu", &["1.2.3.4"], &["1.2.3.4"]),
			result("www.byu.edu", &["1.2.3.4", "byu.edu."], &["1.2.3.4", "byu.edu."]),
			result("foobarbaz-not-exist.byu.edu", &[], &[]),
			result(".", &[], &[]),
		];
		let ledger = score(&GradingPlan::default(), &results, Some(&BuildReport::default()));
		assert!(ledger.categories.iter().all(|c| c.graded));
		assert!((ledger.total() - 100.0).abs() < 1e-9);
		assert!((ledger.max_score - 100.0).abs() < 1e-9);
	}

	#[test]
	fn test_points_prorated_over_applicable_tests() {
		let results = vec![
			result("byu.edu", &["1.2.3.4"], &["1.2.3.4"]),
			result("sandia.gov", &["9.9.9.9"], &["1.2.3.4"]),
			result("www.byu.edu", &["byu.edu."], &["byu.edu."]),
		];
		let ledger = score(&GradingPlan::default(), &results, None);
		let finds = category(&ledger, Category::FindsAnswer);
		assert_eq!(finds.verdicts.len(), 2);
		assert!((finds.verdicts[0].points_possible - 12.5).abs() < 1e-9);
		assert!((finds.awarded - 12.5).abs() < 1e-9);
		assert!(finds.awarded < finds.max_points);
	}

	#[test]
	fn test_category_without_applicable_tests_is_ungraded() {
		let results = vec![
			result("byu.edu", &["1.2.3.4"], &["1.2.3.4"]),
			result("foobarbaz-not-exist.byu.edu", &[], &[]),
		];
		let ledger = score(&GradingPlan::default(), &results, Some(&BuildReport::default()));
		let cname = category(&ledger, Category::HandlesCname);
		assert!(!cname.graded);
		assert_eq!(cname.awarded, 0.0);
		assert!(cname.verdicts.is_empty());
		// Maximum is unaffected by ungraded categories
		assert!((ledger.max_score - 100.0).abs() < 1e-9);
	}

	#[test]
	fn test_nxdomain_crash_earns_nothing() {
		let mut crashed = result("foobarbaz-not-exist.byu.edu", &[], &[]);
		crashed.exit = ExitOutcome::Exited(1);
		let ledger = score(&GradingPlan::default(), &[crashed], None);
		let nx = category(&ledger, Category::HandlesNxdomain);
		assert!(nx.graded);
		assert_eq!(nx.awarded, 0.0);
		assert!(nx.verdicts[0].outcome.reason.as_ref().unwrap().contains("nonzero (1)"));
	}

	#[test]
	fn test_compiler_warnings() {
		let warned = BuildReport { warnings: "resolver.c:3: warning: unused variable".to_string() };
		let ledger = score(&GradingPlan::default(), &[], Some(&warned));
		let cw = category(&ledger, Category::CompilerWarnings);
		assert!(cw.graded);
		assert_eq!(cw.awarded, 0.0);
		assert!(cw.verdicts[0].qname.is_none());

		let ledger = score(&GradingPlan::default(), &[], None);
		assert!(!category(&ledger, Category::CompilerWarnings).graded);
	}

	#[test]
	fn test_awarded_never_exceeds_maximum() {
		let results: Vec<TestResult> = (0..7)
			.map(|i| result(&format!("host{}.example", i), &["1.2.3.4"], &["1.2.3.4"]))
			.collect();
		let ledger = score(&GradingPlan::default(), &results, None);
		for c in &ledger.categories {
			assert!(c.awarded <= c.max_points);
		}
		let finds = category(&ledger, Category::FindsAnswer);
		assert_eq!(finds.awarded, finds.max_points);
	}
}
