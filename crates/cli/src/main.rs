use std::process::ExitCode;

fn main() -> ExitCode {
    tuhfa_cli::run()
}
