use std::process::ExitCode;

fn main() -> ExitCode {
    gearmatch_cli::run()
}
