use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::config::BuildConfig;
use crate::error::GraderError;

/// What the compiler said about a successful build
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
	/// Compiler stderr; empty means no warnings
	pub warnings: String,
}

impl BuildReport {
	pub fn is_clean(&self) -> bool {
		self.warnings.is_empty()
	}
}

/// Remove any stale binary and compile the submission with debug info.
///
/// A compiler failure is fatal; warnings are returned for grading.
pub async fn compile_resolver(build: &BuildConfig) -> Result<BuildReport, GraderError> {
	remove_stale_binary(&build.binary)?;

	let args = compile_args(build);
	println!(
		"Compiling resolver with command: \"{} {}\"",
		build.compiler,
		args.join(" "),
	);

	let output = Command::new(&build.compiler)
		.args(&args)
		.stdin(Stdio::null())
		.output()
		.await
		.map_err(|source| GraderError::Spawn { tool: build.compiler.clone(), source })?;

	let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
	debug!(status = %output.status, stderr_bytes = stderr.len(), "compiler finished");
	if !output.status.success() {
		return Err(GraderError::Compile {
			source_file: build.source.clone(),
			stderr,
		});
	}
	Ok(BuildReport { warnings: stderr })
}

fn compile_args(build: &BuildConfig) -> Vec<String> {
	vec![
		"-g".to_string(),
		build.source.display().to_string(),
		"-o".to_string(),
		build.binary.display().to_string(),
	]
}

fn remove_stale_binary(binary: &Path) -> Result<(), GraderError> {
	println!("Removing old resolver executable (if it exists)");
	match std::fs::remove_file(binary) {
		Ok(()) => Ok(()),
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
		Err(source) => Err(GraderError::RemoveBinary {
			path: binary.to_path_buf(),
			source,
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::PathBuf;

	fn build_with(compiler: &str, tag: &str) -> BuildConfig {
		let dir = std::env::temp_dir();
		BuildConfig {
			compiler: compiler.to_string(),
			source: dir.join(format!("dns-lab-grader-{}-{}.c", tag, std::process::id())),
			binary: dir.join(format!("dns-lab-grader-{}-{}", tag, std::process::id())),
			skip: false,
		}
	}

	#[test]
	fn test_compile_args() {
		let build = BuildConfig {
			compiler: "gcc".to_string(),
			source: PathBuf::from("resolver.c"),
			binary: PathBuf::from("resolver"),
			skip: false,
		};
		assert_eq!(compile_args(&build), vec!["-g", "resolver.c", "-o", "resolver"]);
	}

	#[tokio::test]
	async fn test_clean_build_and_stale_binary_removed() {
		// `true` accepts any arguments and prints nothing
		let build = build_with("true", "clean");
		std::fs::write(&build.binary, b"stale").unwrap();
		let report = compile_resolver(&build).await.unwrap();
		assert!(report.is_clean());
		assert!(!build.binary.exists());
	}

	#[tokio::test]
	async fn test_failing_compiler_is_fatal() {
		let build = build_with("false", "fail");
		let result = compile_resolver(&build).await;
		assert!(matches!(result, Err(GraderError::Compile { .. })));
	}

	#[tokio::test]
	async fn test_missing_compiler_is_spawn_error() {
		let build = build_with("/nonexistent/cc", "missing");
		let result = compile_resolver(&build).await;
		assert!(matches!(result, Err(GraderError::Spawn { .. })));
	}

	#[tokio::test]
	async fn test_unremovable_binary_is_fatal() {
		// A directory where the executable should be cannot be unlinked
		let build = build_with("true", "dirbin");
		std::fs::create_dir_all(&build.binary).unwrap();
		let result = compile_resolver(&build).await;
		std::fs::remove_dir(&build.binary).unwrap();
		match result {
			Err(GraderError::RemoveBinary { path, .. }) => assert_eq!(path, build.binary),
			other => panic!("expected RemoveBinary, got {:?}", other),
		}
	}
}
