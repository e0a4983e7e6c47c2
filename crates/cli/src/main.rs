use std::process::ExitCode;

fn main() -> ExitCode {
    curio_cli::run()
}
