use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::ProcessError;
use super::runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner};

type ArgsMatcher = Box<dyn Fn(&[String]) -> bool + Send + Sync>;
type SideEffect = Box<dyn Fn(&ProcessCommand) + Send + Sync>;

/// Scriptable `ProcessRunner` for tests.
///
/// Expectations are matched in registration order by program name and an
/// optional argument matcher. A side effect runs before the response is
/// returned, which lets a test play the part of the optimizer and write the
/// output file it was handed.
#[derive(Clone)]
pub struct MockProcessRunner {
    expectations: Arc<Mutex<Vec<MockExpectation>>>,
    call_history: Arc<Mutex<Vec<ProcessCommand>>>,
}

struct MockExpectation {
    program: String,
    args_matcher: Option<ArgsMatcher>,
    side_effect: Option<SideEffect>,
    response: MockResponse,
    times_called: usize,
    expected_times: Option<usize>,
}

enum MockResponse {
    Output(ProcessOutput),
    NotFound,
}

pub struct MockCommandConfig {
    runner: MockProcessRunner,
    expectation: MockExpectation,
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self {
            expectations: Arc::new(Mutex::new(Vec::new())),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn expect_command(&mut self, program: &str) -> MockCommandConfig {
        MockCommandConfig {
            runner: self.clone(),
            expectation: MockExpectation {
                program: program.to_string(),
                args_matcher: None,
                side_effect: None,
                response: MockResponse::Output(ProcessOutput {
                    status: ExitStatus::Success,
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                    duration: Duration::from_millis(10),
                }),
                times_called: 0,
                expected_times: None,
            },
        }
    }

    pub fn verify_called(&self, program: &str, times: usize) -> bool {
        let history = self.call_history.lock().unwrap();
        let count = history.iter().filter(|cmd| cmd.program == program).count();
        count == times
    }

    pub fn get_call_history(&self) -> Vec<ProcessCommand> {
        self.call_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        self.call_history.lock().unwrap().push(command.clone());

        let mut expectations = self.expectations.lock().unwrap();

        for expectation in expectations.iter_mut() {
            if expectation.program != command.program {
                continue;
            }

            if let Some(ref args_matcher) = expectation.args_matcher {
                if !(args_matcher)(&command.args) {
                    continue;
                }
            }

            expectation.times_called += 1;

            if let Some(expected) = expectation.expected_times {
                if expectation.times_called > expected {
                    return Err(ProcessError::MockExpectationNotMet(format!(
                        "Command '{}' called {} times, expected {}",
                        command.program, expectation.times_called, expected
                    )));
                }
            }

            return match &expectation.response {
                MockResponse::NotFound => Err(ProcessError::CommandNotFound(command.program)),
                MockResponse::Output(output) => {
                    if let Some(ref effect) = expectation.side_effect {
                        (effect)(&command);
                    }
                    Ok(output.clone())
                }
            };
        }

        Err(ProcessError::MockExpectationNotMet(format!(
            "No expectation found for command: {} {:?}",
            command.program, command.args
        )))
    }
}

impl MockCommandConfig {
    pub fn with_args<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&[String]) -> bool + Send + Sync + 'static,
    {
        self.expectation.args_matcher = Some(Box::new(matcher));
        self
    }

    /// Run `effect` each time the expectation matches, before responding
    pub fn with_side_effect<F>(mut self, effect: F) -> Self
    where
        F: Fn(&ProcessCommand) + Send + Sync + 'static,
    {
        self.expectation.side_effect = Some(Box::new(effect));
        self
    }

    /// Write `contents` to the last argument, the way a rewriting optimizer
    /// produces its output file
    pub fn writes_last_arg(self, contents: &[u8]) -> Self {
        let contents = contents.to_vec();
        self.with_side_effect(move |command| {
            if let Some(path) = command.args.last() {
                std::fs::write(path, &contents).unwrap();
            }
        })
    }

    pub fn returns_stdout(mut self, stdout: &str) -> Self {
        if let MockResponse::Output(ref mut output) = self.expectation.response {
            output.stdout = stdout.as_bytes().to_vec();
        }
        self
    }

    pub fn returns_stderr(mut self, stderr: &str) -> Self {
        if let MockResponse::Output(ref mut output) = self.expectation.response {
            output.stderr = stderr.as_bytes().to_vec();
        }
        self
    }

    pub fn returns_exit_code(mut self, code: i32) -> Self {
        self.set_status(if code == 0 {
            ExitStatus::Success
        } else {
            ExitStatus::Error(code)
        });
        self
    }

    pub fn returns_signal(mut self, signal: i32) -> Self {
        self.set_status(ExitStatus::Signal(signal));
        self
    }

    pub fn returns_success(mut self) -> Self {
        self.set_status(ExitStatus::Success);
        self
    }

    /// Fail as if the program were missing from PATH
    pub fn returns_not_found(mut self) -> Self {
        self.expectation.response = MockResponse::NotFound;
        self
    }

    pub fn times(mut self, n: usize) -> Self {
        self.expectation.expected_times = Some(n);
        self
    }

    pub fn finish(self) {
        self.runner
            .expectations
            .lock()
            .unwrap()
            .push(self.expectation);
    }

    fn set_status(&mut self, status: ExitStatus) {
        if let MockResponse::Output(ref mut output) = self.expectation.response {
            output.status = status;
        }
    }
}

impl Default for MockProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}
