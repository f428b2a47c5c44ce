use std::path::Path;
use std::process::ExitCode;

use mftp::orchestrator;

const SERVER_LIST_FILE: &str = "server-info.txt";

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let (filename, conn_count) = match &args[1..] {
        [filename, conn_count] => match conn_count.parse::<u32>() {
            Ok(n) if n > 0 => (filename, n),
            _ => {
                eprintln!("invalid connection count: {conn_count:?}");
                return ExitCode::from(1);
            }
        },
        _ => {
            eprintln!("usage: client <filename> <num-connections>");
            return ExitCode::from(1);
        }
    };

    match orchestrator::retrieve(filename, conn_count, Path::new(SERVER_LIST_FILE)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(mftp::Error::Io(io_err)) => {
            eprintln!("client: {io_err}");
            ExitCode::from(io_err.raw_os_error().unwrap_or(1) as u8)
        }
        Err(e) => {
            eprintln!("client: {e}");
            ExitCode::from(1)
        }
    }
}
