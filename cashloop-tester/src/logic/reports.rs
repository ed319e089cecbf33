use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use super::ScenarioResult;

pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "{}",
        "📊 Cashloop Simulation Summary".bright_cyan().bold()
    )?;
    writeln!(out, "{}", "==============================".cyan())?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();

    writeln!(out, "Total runs: {total}")?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(out, "Failed: {}", (total - passed).to_string().red())?;
    #[allow(clippy::cast_precision_loss)]
    let success_rate = if total == 0 {
        0.0
    } else {
        (passed as f64 / total as f64) * 100.0
    };
    writeln!(out, "Success rate: {success_rate:.1}%")?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(
            out,
            "{} {} (seed {})",
            status,
            result.strategy.bold(),
            result.seed
        )?;
        writeln!(
            out,
            "   Rounds won: {}/{}  wealth {}  town level {}",
            result.rounds_won, result.rounds_played, result.final_wealth, result.town_level
        )?;
        if !result.grades.is_empty() {
            writeln!(out, "   Grades: {}", result.grades.join(" "))?;
        }
        writeln!(
            out,
            "   Quiz stars: {}  events: {}  time: {:?}",
            result.quiz_stars, result.events, result.duration
        )?;

        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    let fastest = results.iter().min_by_key(|r| r.duration);
    let slowest = results.iter().max_by_key(|r| r.duration);
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(out, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        writeln!(
            out,
            "Fastest: {} seed {} ({:?})",
            fastest.strategy.green(),
            fastest.seed,
            fastest.duration
        )?;
        writeln!(
            out,
            "Slowest: {} seed {} ({:?})",
            slowest.strategy.yellow(),
            slowest.seed,
            slowest.duration
        )?;
    }
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# Cashloop Simulation Results\n")?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total runs**: {total}")?;
    writeln!(out, "- **Passed**: {passed}")?;
    writeln!(out, "- **Failed**: {}\n", total - passed)?;

    writeln!(out, "## Runs\n")?;
    writeln!(
        out,
        "| Result | Strategy | Seed | Rounds won | Wealth | Town level | Quiz stars |"
    )?;
    writeln!(out, "|---|---|---|---|---|---|---|")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        writeln!(
            out,
            "| {status} | {} | {} | {}/{} | {} | {} | {} |",
            result.strategy,
            result.seed,
            result.rounds_won,
            result.rounds_played,
            result.final_wealth,
            result.town_level,
            result.quiz_stars
        )?;
    }

    let failing: Vec<_> = results.iter().filter(|r| !r.passed).collect();
    if !failing.is_empty() {
        writeln!(out, "\n## Failures\n")?;
        for result in failing {
            writeln!(out, "### {} seed {}\n", result.strategy, result.seed)?;
            for failure in &result.failures {
                writeln!(out, "- {failure}")?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(passed: bool) -> ScenarioResult {
        ScenarioResult {
            strategy: "Cautious".to_string(),
            seed: 42,
            passed,
            rounds_played: 3,
            rounds_won: 3,
            grades: vec!["A".to_string(), "B".to_string()],
            final_wealth: 640,
            town_level: 2,
            quiz_stars: 9,
            events: 120,
            failures: if passed {
                Vec::new()
            } else {
                vec!["loan repaid 130 exceeds total owed 120".to_string()]
            },
            duration: Duration::from_millis(12),
        }
    }

    #[test]
    fn markdown_lists_failures() {
        let mut buf = Vec::new();
        generate_markdown_report(&mut buf, &[sample(true), sample(false)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("| ✅ | Cautious | 42 | 3/3 | 640 | 2 | 9 |"));
        assert!(text.contains("## Failures"));
        assert!(text.contains("exceeds total owed"));
    }

    #[test]
    fn json_report_round_trips() {
        let mut buf = Vec::new();
        generate_json_report(&mut buf, &[sample(true)]).unwrap();
        let parsed: Vec<ScenarioResult> = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed[0].duration, Duration::from_millis(12));
        assert_eq!(parsed[0].final_wealth, 640);
    }

    #[test]
    fn console_report_handles_no_results() {
        let mut buf = Vec::new();
        generate_console_report(&mut buf, &[], Duration::ZERO).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("Total runs: 0"));
    }
}
