use tracing::info;

use crate::config::GraderConfig;
use crate::error::GraderError;
use crate::executor::{run_submission, Instrumentation};
use crate::oracle::Oracle;
use crate::reconcile::{reconcile, TestResult};

/// Grade every query name in turn and collect one TestResult per name.
///
/// Each name is fetched from the oracle once, then the submission runs
/// twice: traced first, then under the memory checker. Runs never overlap.
pub async fn run_tests<O: Oracle>(
	config: &GraderConfig,
	oracle: &O,
	qnames: &[String],
) -> Result<Vec<TestResult>, GraderError> {
	let mut results = Vec::with_capacity(qnames.len());
	for qname in qnames {
		println!("Running submission for query name \"{}\"...", qname);
		results.push(run_test(config, oracle, qname).await?);
	}
	Ok(results)
}

async fn run_test<O: Oracle>(
	config: &GraderConfig,
	oracle: &O,
	qname: &str,
) -> Result<TestResult, GraderError> {
	let canonical = oracle.resolve(qname).await?;

	let traced = run_submission(
		config, qname, &canonical.response_wire, Instrumentation::SyscallTrace,
	).await?;
	let checked = run_submission(
		config, qname, &canonical.response_wire, Instrumentation::MemoryCheck,
	).await?;
	info!(
		qname,
		captured = traced.request.len(),
		exit = %traced.exit,
		"finished instrumented runs",
	);

	Ok(reconcile(
		qname,
		traced,
		checked,
		canonical.query_wire.clone(),
		canonical.expected_answers(),
	))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{BuildConfig, ToolPaths};
	use crate::executor::ExitOutcome;
	use crate::oracle::{build_query, CanonicalExchange};
	use hickory_proto::op::MessageType;
	use hickory_proto::rr::rdata::A;
	use hickory_proto::rr::{Name, RData, Record};
	use std::net::{IpAddr, Ipv4Addr};
	use std::path::PathBuf;
	use std::time::Duration;

	/// Answers every name with one fixed A record
	struct StaticOracle;

	impl Oracle for StaticOracle {
		async fn resolve(&self, qname: &str) -> Result<CanonicalExchange, GraderError> {
			let query = build_query(qname, 0x4242)?;
			let mut response = query.clone();
			response.set_message_type(MessageType::Response);
			let owner = Name::from_ascii("byu.edu.").unwrap();
			response.add_answer(Record::from_rdata(owner, 60, RData::A(A(Ipv4Addr::new(1, 2, 3, 4)))));
			Ok(CanonicalExchange {
				query_wire: query.to_vec().unwrap(),
				response_wire: response.to_vec().unwrap(),
				response,
			})
		}
	}

	#[tokio::test]
	async fn test_run_tests_with_stand_in_tools() {
		// `sh` stands in for the tracer; the checker run only has to report an exit
		let script = std::env::temp_dir()
			.join(format!("dns-lab-grader-runner-{}.sh", std::process::id()));
		std::fs::write(&script, "#!/bin/sh\necho 1.2.3.4\n").unwrap();
		let config = GraderConfig {
			proxy_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
			proxy_port: None,
			timeout: Duration::from_millis(200),
			run_timeout: Duration::from_secs(10),
			upstream: "8.8.8.8:53".parse().unwrap(),
			tools: ToolPaths {
				strace: "sh".to_string(),
				valgrind: "sh".to_string(),
			},
			build: BuildConfig {
				compiler: "gcc".to_string(),
				source: PathBuf::from("resolver.c"),
				binary: script.clone(),
				skip: true,
			},
			verbose: false,
		};

		let qnames = vec!["BYU.edu".to_string()];
		let results = run_tests(&config, &StaticOracle, &qnames).await;
		std::fs::remove_file(&script).ok();
		let results = results.unwrap();

		assert_eq!(results.len(), 1);
		let r = &results[0];
		assert_eq!(r.qname, "BYU.edu");
		assert_eq!(r.answers, vec!["1.2.3.4"]);
		assert_eq!(r.expected_answers, vec!["1.2.3.4"]);
		assert!(r.query.is_empty());
		assert_eq!(r.exit, ExitOutcome::Exited(0));
		assert!(r.memcheck_exit.is_some());
	}
}
