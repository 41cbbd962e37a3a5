//! Interfaces to the external programs a reaction workflow drives: the
//! quantum-chemistry packages that produce log files and the batch queue that
//! runs them.

pub mod program;
pub mod queue;

pub use program::{
    Calculation, ErrorClass, LogSummary, Procedure, Program, ProgramError,
    ProgramKind, Termination,
};
pub use queue::{JobStatus, Queue, Resources, SubmitError};

/// time the duration of `$body` and store the resulting Duration in `$elapsed`
#[macro_export]
macro_rules! time {
    ($elapsed:ident, $body:block) => {
        let now = std::time::Instant::now();
        $body;
        let $elapsed = now.elapsed();
    };
}

/// call `rayon::ThreadPoolBuilder` to set `num_threads` to `n`. Discards the
/// error returned by `build_global` if the thread pool has already been
/// initialized
pub fn max_threads(n: usize) {
    let _ = rayon::ThreadPoolBuilder::new()
        .num_threads(n)
        .build_global();
}
