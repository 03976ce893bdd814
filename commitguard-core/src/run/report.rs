//! Hook results and the console report

use std::io::Write;
use std::time::Duration;

use colored::Colorize;

use crate::executor::ExecOutput;
use crate::hook::Hook;

/// Width of a report line, including the status word
const COLS: usize = 80;

/// Width reserved for the status word of a hook that is about to run
const STATUS_LEN: usize = 6;

/// Why a hook did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Listed in `SKIP`
    Requested,
    /// None of the candidate files matched
    NoFiles,
}

/// Outcome of one hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStatus {
    Passed,
    Failed,
    Skipped(SkipReason),
}

/// What happened when a hook was considered
#[derive(Debug, Clone)]
pub struct HookResult {
    pub id: String,
    pub name: String,
    pub status: HookStatus,
    /// Exit code; `0` for skipped hooks
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Files passed to the hook
    pub files: Vec<String>,
    pub elapsed: Duration,
    /// A failure does not fail the run
    pub advisory: bool,
}

impl HookResult {
    /// A hook that did not run
    pub fn skipped(hook: &Hook, reason: SkipReason) -> Self {
        Self {
            id: hook.id.clone(),
            name: hook.name.clone(),
            status: HookStatus::Skipped(reason),
            code: 0,
            stdout: Vec::new(),
            stderr: Vec::new(),
            files: Vec::new(),
            elapsed: Duration::ZERO,
            advisory: hook.advisory,
        }
    }

    /// A hook that ran to completion
    pub fn finished(hook: &Hook, files: Vec<String>, output: ExecOutput, elapsed: Duration) -> Self {
        Self {
            id: hook.id.clone(),
            name: hook.name.clone(),
            status: if output.code == 0 {
                HookStatus::Passed
            } else {
                HookStatus::Failed
            },
            code: output.code,
            stdout: output.stdout,
            stderr: output.stderr,
            files,
            elapsed,
            advisory: hook.advisory,
        }
    }

    /// Whether this result fails the run
    pub fn is_blocking_failure(&self) -> bool {
        self.status == HookStatus::Failed && !self.advisory
    }

    fn has_output(&self) -> bool {
        !self.stdout.is_empty() || !self.stderr.is_empty()
    }
}

/// Results of a completed run, in execution order
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub results: Vec<HookResult>,
}

impl RunSummary {
    /// 0 iff no non-advisory hook failed
    pub fn exit_code(&self) -> i32 {
        if self.results.iter().any(HookResult::is_blocking_failure) {
            1
        } else {
            0
        }
    }
}

fn dots(start: &str, postfix: &str, end_len: usize) -> String {
    let used = start.chars().count() + postfix.chars().count() + end_len + 1;
    ".".repeat(COLS.saturating_sub(used))
}

/// Streams one line per hook to a writer
pub struct Reporter<'w, W: Write> {
    out: &'w mut W,
    verbose: bool,
    color: bool,
}

impl<'w, W: Write> Reporter<'w, W> {
    pub fn new(out: &'w mut W, verbose: bool, color: bool) -> Self {
        Self { out, verbose, color }
    }

    fn label(&self, hook: &Hook) -> String {
        if self.verbose {
            format!("[{}] {}", hook.id, hook.name)
        } else {
            hook.name.clone()
        }
    }

    fn paint(&self, word: &str, status: HookStatus, advisory: bool) -> String {
        if !self.color {
            return word.to_string();
        }
        match status {
            HookStatus::Passed => word.on_green().to_string(),
            HookStatus::Failed if advisory => word.on_yellow().to_string(),
            HookStatus::Failed => word.on_red().to_string(),
            HookStatus::Skipped(SkipReason::NoFiles) => word.on_cyan().to_string(),
            HookStatus::Skipped(SkipReason::Requested) => word.on_yellow().to_string(),
        }
    }

    /// Print the padded label of a hook that is about to run
    pub fn start(&mut self, hook: &Hook) -> std::io::Result<()> {
        let label = self.label(hook);
        write!(self.out, "{}{}", label, dots(&label, "", STATUS_LEN))?;
        self.out.flush()
    }

    /// Print the full line of a hook that did not run
    pub fn skipped(&mut self, hook: &Hook, result: &HookResult) -> std::io::Result<()> {
        let HookStatus::Skipped(reason) = result.status else {
            return self.finish(hook, result);
        };
        let label = self.label(hook);
        let postfix = match reason {
            SkipReason::NoFiles => "(no files to check) ",
            SkipReason::Requested => "",
        };
        let word = "Skipped";
        writeln!(
            self.out,
            "{}{}{}{}",
            label,
            dots(&label, postfix, word.len()),
            postfix,
            self.paint(word, result.status, result.advisory)
        )
    }

    /// Complete the line opened by [`Reporter::start`] and show output if needed
    pub fn finish(&mut self, hook: &Hook, result: &HookResult) -> std::io::Result<()> {
        let word = match result.status {
            HookStatus::Passed => "Passed",
            HookStatus::Failed if result.advisory => "Warned",
            HookStatus::Failed => "Failed",
            HookStatus::Skipped(_) => "Skipped",
        };
        writeln!(self.out, "{}", self.paint(word, result.status, result.advisory))?;

        let failed = result.status == HookStatus::Failed;
        let show_output = (self.verbose || hook.verbose) && result.has_output();
        if !failed && !show_output {
            return Ok(());
        }

        writeln!(self.out, "hookid: {}", result.id)?;
        if self.verbose {
            writeln!(self.out, "duration: {:.2}s", result.elapsed.as_secs_f64())?;
        }
        if failed && result.code != 1 {
            writeln!(self.out, "exit code: {}", result.code)?;
        }
        writeln!(self.out)?;
        for output in [&result.stdout, &result.stderr] {
            let text = String::from_utf8_lossy(output);
            let text = text.trim();
            if !text.is_empty() {
                writeln!(self.out, "{text}")?;
            }
        }
        writeln!(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_hook;

    fn output(code: i32, stdout: &[u8]) -> ExecOutput {
        ExecOutput {
            code,
            stdout: stdout.to_vec(),
            stderr: Vec::new(),
        }
    }

    fn render(verbose: bool, f: impl FnOnce(&mut Reporter<'_, Vec<u8>>)) -> String {
        let mut buf = Vec::new();
        {
            let mut reporter = Reporter::new(&mut buf, verbose, false);
            f(&mut reporter);
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_passed_line_is_padded() {
        let hook = test_hook("system", "true");
        let result = HookResult::finished(&hook, vec![], output(0, b""), Duration::ZERO);

        let text = render(false, |r| {
            r.start(&hook).unwrap();
            r.finish(&hook, &result).unwrap();
        });

        assert_eq!(text.len(), COLS);
        assert!(text.starts_with("Test hook...."));
        assert!(text.ends_with(".Passed\n"));
    }

    #[test]
    fn test_failed_shows_output() {
        let hook = test_hook("fail", "Fail");
        let result = HookResult::finished(
            &hook,
            vec!["foo.py".to_string()],
            output(1, b"Fail\nfoo.py\n"),
            Duration::ZERO,
        );

        let text = render(false, |r| {
            r.start(&hook).unwrap();
            r.finish(&hook, &result).unwrap();
        });

        assert!(text.contains(".Failed\nhookid: test-hook\n\nFail\nfoo.py\n\n"));
        assert!(!text.contains("duration"));
    }

    #[test]
    fn test_exit_code_other_than_one_is_shown() {
        let hook = test_hook("system", "false");
        let result = HookResult::finished(&hook, vec![], output(3, b""), Duration::ZERO);

        let text = render(false, |r| r.finish(&hook, &result).unwrap());
        assert!(text.contains("exit code: 3\n"));
    }

    #[test]
    fn test_verbose_shows_passing_output() {
        let hook = test_hook("system", "echo");
        let result = HookResult::finished(
            &hook,
            vec![],
            output(0, b"Hello World\n"),
            Duration::from_millis(1500),
        );

        let quiet = render(false, |r| r.finish(&hook, &result).unwrap());
        assert_eq!(quiet, "Passed\n");

        let loud = render(true, |r| {
            r.start(&hook).unwrap();
            r.finish(&hook, &result).unwrap();
        });
        assert!(loud.starts_with("[test-hook] Test hook..."));
        assert!(loud.contains("duration: 1.50s\n"));
        assert!(loud.contains("\nHello World\n"));
    }

    #[test]
    fn test_skipped_lines() {
        let hook = test_hook("system", "true");

        let no_files = HookResult::skipped(&hook, SkipReason::NoFiles);
        let text = render(false, |r| r.skipped(&hook, &no_files).unwrap());
        assert!(text.ends_with("(no files to check) Skipped\n"));
        assert_eq!(text.len(), COLS);

        let requested = HookResult::skipped(&hook, SkipReason::Requested);
        let text = render(false, |r| r.skipped(&hook, &requested).unwrap());
        assert!(text.ends_with(".Skipped\n"));
        assert!(!text.contains("no files"));
    }

    #[test]
    fn test_advisory_failure() {
        let mut hook = test_hook("fail", "careful");
        hook.advisory = true;
        let result = HookResult::finished(&hook, vec![], output(1, b"careful\n"), Duration::ZERO);

        assert!(!result.is_blocking_failure());
        let text = render(false, |r| r.finish(&hook, &result).unwrap());
        assert!(text.starts_with("Warned\n"));

        let summary = RunSummary {
            results: vec![result],
        };
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(summary.results[0].status, HookStatus::Failed);
    }

    #[test]
    fn test_exit_code_fold() {
        let hook = test_hook("system", "x");
        let pass = HookResult::finished(&hook, vec![], output(0, b""), Duration::ZERO);
        let fail = HookResult::finished(&hook, vec![], output(2, b""), Duration::ZERO);
        let skip = HookResult::skipped(&hook, SkipReason::Requested);

        assert_eq!(RunSummary::default().exit_code(), 0);
        assert_eq!(
            RunSummary {
                results: vec![pass.clone(), skip.clone()]
            }
            .exit_code(),
            0
        );
        assert_eq!(
            RunSummary {
                results: vec![pass, fail, skip]
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn test_invalid_utf8_output_is_rendered() {
        let hook = test_hook("system", "x");
        let result = HookResult::finished(&hook, vec![], output(1, b"bad \xff byte"), Duration::ZERO);

        let text = render(false, |r| r.finish(&hook, &result).unwrap());
        assert!(text.contains("bad \u{fffd} byte"));
    }
}
