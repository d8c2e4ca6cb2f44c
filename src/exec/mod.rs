//! Execution of learner code against test cases
//!
//! Only Python is supported. Each case runs the interpreter as a child
//! process with a hard wall-clock limit.

mod runner;

pub use runner::{
    CodeRunner, DEFAULT_INTERPRETER, DEFAULT_TIMEOUT_SECS, ExecutionReport, TestCase, TestResult,
};
