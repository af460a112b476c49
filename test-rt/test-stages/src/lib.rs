//! Runs the subgraph suite under the stage named by `STAGEDIFF_STAGE_NAME`.
//! See `tests/stages.rs`. The same entry point is built as the
//! `stages-corpus` binary so that `tests/try_run.rs` can start it.
use std::process::ExitCode;

pub fn run_corpus() -> ExitCode {
    match suite_subgraph::suite() {
        Ok(suite) => infra::main(suite),
        Err(e) => {
            eprintln!("error: {e:?}");
            ExitCode::from(101)
        }
    }
}
