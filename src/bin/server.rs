use std::path::Path;
use std::process::ExitCode;

use mftp::listener;

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let port = match &args[1..] {
        [port] => match port.parse::<u16>() {
            Ok(p) => p,
            Err(_) => {
                eprintln!("invalid port: {port:?}");
                return ExitCode::from(1);
            }
        },
        _ => {
            eprintln!("usage: server <port>");
            return ExitCode::from(1);
        }
    };

    match listener::serve(port, Path::new(".")) {
        Ok(()) => unreachable!("serve only returns on bind failure"),
        Err(mftp::Error::BindFailed { source, .. }) => {
            eprintln!("server: bind failure: {source}");
            ExitCode::from(source.raw_os_error().unwrap_or(1) as u8)
        }
        Err(e) => {
            eprintln!("server: {e}");
            ExitCode::from(1)
        }
    }
}
