use std::process::ExitCode;

fn main() -> ExitCode {
    deskhub_cli::run()
}
