use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL};

use std::io::{self, Write};

use anyhow::Result;

use crate::config::GraderConfig;
use crate::scoring::{CategoryScore, ScoreLedger};

/// Print a summary of the grader configuration before running.
pub fn print_config_summary(config: &GraderConfig, qnames: &[String]) {
	println!("DNS Resolver Grader Configuration");
	println!("=================================");
	println!("Resolver:       {}", config.build.binary.display());
	println!("Upstream:       {}", config.upstream);
	let port_label = match config.proxy_port {
		Some(port) => port.to_string(),
		None => "random".to_string(),
	};
	println!("Proxy:          {} (port {})", config.proxy_ip, port_label);
	println!("Timeout:        {} s", config.timeout.as_secs_f64());
	println!("Run timeout:    {} s", config.run_timeout.as_secs_f64());
	println!("Query names:    {}", qnames.len());
	for qname in qnames {
		println!("  - {}", qname);
	}
	println!();
}

/// Print the per-category grading report and the final score to stdout.
pub fn print_report(ledger: &ScoreLedger, verbose: bool) -> Result<()> {
	let stdout = io::stdout();
	let mut out = stdout.lock();
	write_report(&mut out, ledger, verbose)?;
	out.flush()?;
	Ok(())
}

/// Render the grading report.
///
/// Failing checks always print their diagnostic; passing per-test lines
/// are shown only when verbose.
pub fn write_report<W: Write>(out: &mut W, ledger: &ScoreLedger, verbose: bool) -> io::Result<()> {
	writeln!(out)?;
	for category in &ledger.categories {
		write_category(out, category, verbose)?;
	}

	writeln!(out, "Done grading, awarded points:")?;
	for c in &ledger.categories {
		let flag = if c.graded { "" } else { " (ungraded)" };
		writeln!(out, "- {:.2}/{:.2} {}{}", c.awarded, c.max_points, c.category, flag)?;
	}
	writeln!(out, "\nFinal score: {:.2}/{:.2}", ledger.total(), ledger.max_score)
}

fn write_category<W: Write>(out: &mut W, category: &CategoryScore, verbose: bool) -> io::Result<()> {
	writeln!(
		out,
		"Checking and assigning points for \"{}\" (max {:.2} points):",
		category.category, category.max_points,
	)?;

	if !category.graded {
		return writeln!(out, "Unable to grade section {}, no query names apply.\n", category.category);
	}

	for verdict in &category.verdicts {
		let passed = verdict.outcome.passed();
		if passed && !verbose {
			continue;
		}
		let status = if passed { "- PASS" } else { "- FAIL" };
		let subject = match &verdict.qname {
			Some(qname) => format!("\"{}\"", qname),
			None => "submission".to_string(),
		};
		writeln!(
			out,
			"{} ({:.2}/{:.2} pts): {}",
			status, verdict.points, verdict.points_possible, subject,
		)?;
		if let Some(reason) = &verdict.outcome.reason {
			writeln!(out, "    Failure reason: \n{}", reason)?;
		}
	}

	writeln!(
		out,
		"Done checking for \"{}\", awarding {:.2}/{:.2} points\n",
		category.category, category.awarded, category.max_points,
	)
}

/// Print the category scores as a formatted table.
pub fn print_summary_table(ledger: &ScoreLedger) {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(vec!["Category", "Tests", "Passed", "Awarded", "Max"]);

	for c in &ledger.categories {
		let passed = c.verdicts.iter().filter(|v| v.outcome.passed()).count();
		let tests = if c.graded {
			c.verdicts.len().to_string()
		} else {
			"ungraded".to_string()
		};
		table.add_row(vec![
			c.category.to_string(),
			tests,
			passed.to_string(),
			format!("{:.2}", c.awarded),
			format!("{:.2}", c.max_points),
		]);
	}
	table.add_row(vec![
		"Total".to_string(),
		String::new(),
		String::new(),
		format!("{:.2}", ledger.total()),
		format!("{:.2}", ledger.max_score),
	]);

	println!("{table}");
}

/// Write one CSV row per applicable verdict.
pub fn write_csv(path: &str, ledger: &ScoreLedger) -> Result<()> {
	let mut writer = csv::Writer::from_path(path)?;
	write_rows(&mut writer, ledger)?;
	writer.flush()?;
	println!("\nResults written to: {}", path);
	Ok(())
}

fn write_rows<W: Write>(writer: &mut csv::Writer<W>, ledger: &ScoreLedger) -> Result<()> {
	writer.write_record([
		"category", "qname", "passed", "points", "points_possible", "reason",
	])?;

	for c in &ledger.categories {
		for v in &c.verdicts {
			writer.write_record([
				c.category.to_string(),
				v.qname.clone().unwrap_or_default(),
				v.outcome.passed().to_string(),
				format!("{:.2}", v.points),
				format!("{:.2}", v.points_possible),
				v.outcome.reason.clone().unwrap_or_default(),
			])?;
		}
	}
	Ok(())
}
