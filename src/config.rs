use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Grading category, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
	MemoryLeaks,
	CompilerWarnings,
	WellFormedQuery,
	SendAndReceive,
	FindsAnswer,
	HandlesCname,
	HandlesNxdomain,
	HandlesRoot,
}

impl Category {
	pub fn label(self) -> &'static str {
		match self {
			Category::MemoryLeaks => "Memory Leaks",
			Category::CompilerWarnings => "Compiler Warnings",
			Category::WellFormedQuery => "Well-formed DNS query message",
			Category::SendAndReceive => "Sends the query and receives the response",
			Category::FindsAnswer => "Finds the answer in the answer section",
			Category::HandlesCname => "Handles CNAME records properly",
			Category::HandlesNxdomain => "Handles names that don't resolve",
			Category::HandlesRoot => "Handles the root name",
		}
	}
}

impl fmt::Display for Category {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

/// One row of the points table
#[derive(Debug, Clone, Copy)]
pub struct CategoryWeight {
	pub category: Category,
	pub max_points: f64,
}

/// Ordered category table used by the scoring engine.
///
/// Built once at startup and passed by reference; nothing mutates it.
#[derive(Debug, Clone)]
pub struct GradingPlan {
	weights: Vec<CategoryWeight>,
}

impl GradingPlan {
	pub fn new(weights: Vec<CategoryWeight>) -> Self {
		GradingPlan { weights }
	}

	pub fn weights(&self) -> &[CategoryWeight] {
		&self.weights
	}

	/// Sum of every category maximum, graded or not.
	pub fn max_score(&self) -> f64 {
		self.weights.iter().map(|w| w.max_points).sum()
	}
}

impl Default for GradingPlan {
	fn default() -> Self {
		let table = [
			(Category::MemoryLeaks, 2.0),
			(Category::CompilerWarnings, 3.0),
			(Category::WellFormedQuery, 25.0),
			(Category::SendAndReceive, 20.0),
			(Category::FindsAnswer, 25.0),
			(Category::HandlesCname, 10.0),
			(Category::HandlesNxdomain, 10.0),
			(Category::HandlesRoot, 5.0),
		];
		GradingPlan::new(
			table.into_iter()
				.map(|(category, max_points)| CategoryWeight { category, max_points })
				.collect(),
		)
	}
}

/// Paths of the instrumentation tools wrapped around the submission
#[derive(Debug, Clone)]
pub struct ToolPaths {
	pub strace: String,
	pub valgrind: String,
}

impl Default for ToolPaths {
	fn default() -> Self {
		ToolPaths {
			strace: "strace".to_string(),
			valgrind: "valgrind".to_string(),
		}
	}
}

/// How the submission gets built before grading
#[derive(Debug, Clone)]
pub struct BuildConfig {
	pub compiler: String,
	pub source: PathBuf,
	pub binary: PathBuf,
	pub skip: bool,
}

/// Grader configuration
#[derive(Debug, Clone)]
pub struct GraderConfig {
	pub proxy_ip: IpAddr,
	/// Fixed proxy port; a random port is chosen per run when unset
	pub proxy_port: Option<u16>,
	/// Deadline for the listener to capture a query
	pub timeout: Duration,
	/// Deadline for one instrumented run before the child is killed
	pub run_timeout: Duration,
	pub upstream: SocketAddr,
	pub tools: ToolPaths,
	pub build: BuildConfig,
	pub verbose: bool,
}
