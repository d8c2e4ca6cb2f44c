//! Python test-case runner

use std::io::Write as _;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::{Error, Result};

/// Default interpreter binary
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Default per-case wall-clock limit
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

const TIMEOUT_MESSAGE: &str = "Timeout: Code took too long to execute";

/// One stdin/stdout expectation
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub expected: String,
}

/// Outcome of a single test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResult {
    /// 1-based position in the request
    pub test_num: usize,
    pub input: String,
    pub expected: String,
    pub output: String,
    pub passed: bool,
    pub error: Option<String>,
}

/// Aggregate outcome for a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub success: bool,
    pub all_passed: bool,
    pub results: Vec<TestResult>,
    pub total_tests: usize,
    pub passed_tests: usize,
}

impl ExecutionReport {
    fn from_results(results: Vec<TestResult>) -> Self {
        let passed_tests = results.iter().filter(|r| r.passed).count();
        Self {
            success: true,
            all_passed: passed_tests == results.len(),
            total_tests: results.len(),
            passed_tests,
            results,
        }
    }
}

/// Runs a Python source file once per test case
#[derive(Debug, Clone)]
pub struct CodeRunner {
    interpreter: String,
    timeout: Duration,
}

impl Default for CodeRunner {
    fn default() -> Self {
        Self::new(
            DEFAULT_INTERPRETER.to_string(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }
}

impl CodeRunner {
    #[must_use]
    pub const fn new(interpreter: String, timeout: Duration) -> Self {
        Self {
            interpreter,
            timeout,
        }
    }

    /// Interpreter binary or path
    #[must_use]
    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Whether the interpreter can be found on `PATH`
    #[must_use]
    pub fn interpreter_available(&self) -> bool {
        which::which(&self.interpreter).is_ok()
    }

    /// Run `code` against every case in order
    ///
    /// Per-case failures (timeouts, crashes, spawn errors) are recorded in
    /// the matching [`TestResult`] and never abort the run.
    ///
    /// # Errors
    ///
    /// Returns error if the source file cannot be written
    pub async fn run(&self, code: &str, cases: &[TestCase]) -> Result<ExecutionReport> {
        let mut file = tempfile::Builder::new()
            .prefix("mentor-")
            .suffix(".py")
            .tempfile()?;
        file.write_all(code.as_bytes())?;
        file.flush()?;
        // Removed when dropped at the end of the run
        let source = file.into_temp_path();

        let mut results = Vec::with_capacity(cases.len());
        for (index, case) in cases.iter().enumerate() {
            let test_num = index + 1;
            let result = match self.run_case(&source, &case.input).await {
                Ok(outcome) => {
                    let output = outcome.stdout.trim().to_string();
                    let expected = case.expected.trim().to_string();
                    TestResult {
                        test_num,
                        input: case.input.clone(),
                        passed: output == expected,
                        expected,
                        output,
                        error: (!outcome.stderr.is_empty()).then_some(outcome.stderr),
                    }
                }
                Err(e) => {
                    let error = match e {
                        Error::ExecutionTimeout(_) => TIMEOUT_MESSAGE.to_string(),
                        other => other.to_string(),
                    };
                    TestResult {
                        test_num,
                        input: case.input.clone(),
                        expected: case.expected.trim().to_string(),
                        output: String::new(),
                        passed: false,
                        error: Some(error),
                    }
                }
            };

            tracing::debug!(test_num, passed = result.passed, "test case finished");
            results.push(result);
        }

        Ok(ExecutionReport::from_results(results))
    }

    async fn run_case(&self, source: &Path, input: &str) -> Result<CaseOutput> {
        let mut child = Command::new(&self.interpreter)
            .arg(source)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Input is fed while the child runs, so a program that never reads
        // it still hits the deadline instead of blocking the write
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // The program may exit without reading its input
                if let Err(e) = stdin.write_all(input.as_bytes()).await
                    && e.kind() != std::io::ErrorKind::BrokenPipe
                {
                    return Err(e);
                }
            }
            Ok(())
        };

        // On timeout the child is dropped with the future and killed
        let (fed, output) = timeout(self.timeout, async {
            tokio::join!(feed, child.wait_with_output())
        })
        .await
        .map_err(|_| Error::ExecutionTimeout(self.timeout.as_secs()))?;
        fed?;
        let output = output?;

        Ok(CaseOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

struct CaseOutput {
    stdout: String,
    stderr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts_passes() {
        let pass = TestResult {
            test_num: 1,
            input: String::new(),
            expected: "1".to_string(),
            output: "1".to_string(),
            passed: true,
            error: None,
        };
        let fail = TestResult {
            test_num: 2,
            passed: false,
            output: "2".to_string(),
            ..pass.clone()
        };

        let report = ExecutionReport::from_results(vec![pass, fail]);
        assert!(report.success);
        assert!(!report.all_passed);
        assert_eq!(report.total_tests, 2);
        assert_eq!(report.passed_tests, 1);
    }

    #[test]
    fn empty_run_is_all_passed() {
        let report = ExecutionReport::from_results(Vec::new());
        assert!(report.all_passed);
        assert_eq!(report.total_tests, 0);
    }

    #[tokio::test]
    async fn missing_interpreter_is_reported_per_case() {
        let runner = CodeRunner::new(
            "definitely-not-a-python-interpreter".to_string(),
            Duration::from_secs(1),
        );
        assert!(!runner.interpreter_available());

        let report = runner
            .run("print(1)", &[TestCase { input: String::new(), expected: "1".to_string() }])
            .await
            .unwrap();
        assert!(!report.all_passed);
        assert!(report.results[0].error.is_some());
    }

    #[tokio::test]
    async fn echoes_stdin_when_python_present() {
        let runner = CodeRunner::default();
        if !runner.interpreter_available() {
            return;
        }

        let cases = [
            TestCase { input: "3\n".to_string(), expected: "6".to_string() },
            TestCase { input: "4\n".to_string(), expected: "9".to_string() },
        ];
        let report = runner
            .run("n = int(input())\nprint(n * 2)\n", &cases)
            .await
            .unwrap();

        assert_eq!(report.passed_tests, 1);
        assert!(report.results[0].passed);
        assert_eq!(report.results[1].output, "8");
    }

    #[tokio::test]
    async fn runaway_code_times_out() {
        let runner = CodeRunner::new(DEFAULT_INTERPRETER.to_string(), Duration::from_millis(300));
        if !runner.interpreter_available() {
            return;
        }

        let report = runner
            .run("while True:\n    pass\n", &[TestCase::default()])
            .await
            .unwrap();
        assert_eq!(report.results[0].error.as_deref(), Some(TIMEOUT_MESSAGE));
    }

    #[tokio::test]
    async fn unread_large_input_still_times_out() {
        let runner = CodeRunner::new(DEFAULT_INTERPRETER.to_string(), Duration::from_millis(500));
        if !runner.interpreter_available() {
            return;
        }

        // Larger than any pipe buffer, and never read
        let case = TestCase {
            input: "x".repeat(1 << 20),
            expected: String::new(),
        };
        let report = tokio::time::timeout(
            Duration::from_secs(10),
            runner.run("while True:\n    pass\n", &[case]),
        )
        .await
        .expect("runner ignored its per-case timeout")
        .unwrap();

        assert!(!report.results[0].passed);
        assert_eq!(report.results[0].error.as_deref(), Some(TIMEOUT_MESSAGE));
    }
}
