//! `tesserac`: a thin client for the command socket. The grammar itself
//! lives server-side in `ipc::protocol::parse`, so this binary just frames
//! argv and prints whatever comes back.

use std::io::Write;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("usage: tesserac <domain> <command> [args...]");
        std::process::exit(1);
    }

    match tessera::ipc::send_request(&args) {
        Ok(Ok(bytes)) => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            let _ = handle.write_all(&bytes);
            if !bytes.ends_with(b"\n") {
                let _ = handle.write_all(b"\n");
            }
        }
        Ok(Err(message)) => {
            eprintln!("{message}");
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("tesserac: {err}");
            std::process::exit(1);
        }
    }
}
