use std::process::ExitCode;

fn main() -> ExitCode {
    test_stages::run_corpus()
}
