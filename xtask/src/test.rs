//! xtask test: run the host test suites one stage at a time.

use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// One `cargo test` invocation.
struct Stage {
    name: &'static str,
    args: &'static [&'static str],
    /// A failing stage only warns.
    soft: bool,
}

const UNIT: Stage = Stage {
    name: "Unit tests",
    args: &["test", "--workspace", "--lib", "--exclude", "xtask"],
    soft: false,
};

const SCENARIOS: Stage = Stage {
    name: "Scenario tests",
    args: &["test", "--workspace", "--tests", "--exclude", "xtask"],
    soft: false,
};

const TOOLING: Stage = Stage {
    name: "xtask tests",
    args: &["test", "-p", "xtask"],
    soft: false,
};

const DOC: Stage = Stage {
    name: "Doc tests",
    args: &["test", "--workspace", "--doc"],
    soft: true,
};

pub fn run(unit_only: bool, integration_only: bool) -> Result<()> {
    println!();
    println!("{}", "Running tests...".cyan().bold());
    println!();

    let total_start = Instant::now();
    let mut stages: Vec<&Stage> = Vec::new();
    if !integration_only {
        stages.push(&UNIT);
        stages.push(&TOOLING);
    }
    if !unit_only {
        stages.push(&SCENARIOS);
    }
    if !unit_only && !integration_only {
        stages.push(&DOC);
    }
    for stage in stages {
        run_stage(stage)?;
    }

    println!(
        "{}",
        format!("✓ All tests completed in {:.2}s", total_start.elapsed().as_secs_f64())
            .green()
            .bold()
    );
    println!();
    Ok(())
}

fn run_stage(stage: &Stage) -> Result<()> {
    println!("{}", format!("  Running {}...", stage.name.to_lowercase()).cyan());
    let start = Instant::now();
    let output = Command::new("cargo")
        .args(stage.args)
        .output()
        .with_context(|| format!("Failed to run {}", stage.name.to_lowercase()))?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    if !output.status.success() {
        if stage.soft {
            eprintln!("{}", format!("  ⚠ {} failed", stage.name).yellow().bold());
            println!();
            return Ok(());
        }
        eprintln!("{}", format!("  ✗ {} failed", stage.name).red().bold());
        eprintln!();
        for line in stdout.lines() {
            eprintln!("  {}", line);
        }
        anyhow::bail!("{} failed", stage.name);
    }

    println!(
        "{}",
        format!(
            "  ✓ {} passed {} in {:.2}s",
            stage.name,
            summarize(&stdout),
            start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();
    Ok(())
}

/// Totals over every "test result:" line cargo printed.
fn summarize(output: &str) -> String {
    let mut passed = 0u32;
    let mut failed = 0u32;
    let mut seen = false;
    for line in output.lines() {
        let Some(rest) = line.split("test result:").nth(1) else {
            continue;
        };
        seen = true;
        for part in rest.split(';') {
            let mut words = part.split_whitespace().rev();
            let (Some(label), Some(count)) = (words.next(), words.next()) else {
                continue;
            };
            let count: u32 = count.parse().unwrap_or(0);
            match label {
                "passed" => passed += count,
                "failed" => failed += count,
                _ => {}
            }
        }
    }
    if seen {
        format!("({passed} passed, {failed} failed)")
    } else {
        "(summary not available)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_adds_up_every_binary() {
        let out = "\
test result: ok. 5 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out
test result: ok. 12 passed; 0 failed; 1 ignored; 0 measured; 0 filtered out";
        assert_eq!(summarize(out), "(17 passed, 0 failed)");
    }

    #[test]
    fn summary_missing_when_nothing_ran() {
        assert_eq!(summarize("compiling...\n"), "(summary not available)");
    }
}
