use anyhow::{anyhow, Result};

/// Return the default set of query names.
///
/// The set covers every grading category: plain A answers, CNAME chains,
/// a name that does not resolve, and the root name.
pub fn default_domains() -> Vec<String> {
	vec![
		"byu.edu",
		"www.byu.edu",
		".",
		"casey.byu.edu",
		// 63-byte label, the longest a label may be
		"www.abcdefghijklmnopqrstuvwxyzabcdefghijklmnopqrstuvwxyzabcdefghijk.com",
		"sandia.gov",
		"www.sandia.gov",
		"foobarbaz-not-exist.byu.edu",
		"www.intel.com",
	].into_iter().map(String::from).collect()
}

/// Read query names from a file, one per line.
///
/// Blank lines and lines starting with '#' are skipped.
pub fn read_domain_file(path: &str) -> Result<Vec<String>> {
	let content = std::fs::read_to_string(path)
		.map_err(|e| anyhow!("failed to read domain file '{}': {}", path, e))?;
	Ok(parse_domain_list(&content))
}

fn parse_domain_list(content: &str) -> Vec<String> {
	content.lines()
		.map(|line| line.trim())
		.filter(|line| !line.is_empty() && !line.starts_with('#'))
		.map(String::from)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_include_root_and_nxdomain() {
		let domains = default_domains();
		assert_eq!(domains.len(), 9);
		assert!(domains.iter().any(|d| d == "."));
		assert!(domains.iter().any(|d| d.contains("not-exist")));
	}

	#[test]
	fn test_long_label_is_63_bytes() {
		let domains = default_domains();
		let long = domains.iter()
			.find(|d| d.starts_with("www.abc"))
			.unwrap();
		let label = long.split('.').nth(1).unwrap();
		assert_eq!(label.len(), 63);
	}

	#[test]
	fn test_parse_skips_comments_and_blanks() {
		let content = "# graded names\nbyu.edu\n\n  www.byu.edu  \n#.\n.\n";
		let domains = parse_domain_list(content);
		assert_eq!(domains, vec!["byu.edu", "www.byu.edu", "."]);
	}

	#[test]
	fn test_missing_file_is_error() {
		let result = read_domain_file("/nonexistent/dns-lab-grader/domains.txt");
		assert!(result.is_err());
	}
}
