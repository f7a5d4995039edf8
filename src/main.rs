use std::process::ExitCode;

fn main() -> ExitCode {
    let command_line_interface = tileconf::cli::CommandLineInterface::load();
    match command_line_interface.run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("tileconf: {error:#}");
            ExitCode::FAILURE
        }
    }
}
