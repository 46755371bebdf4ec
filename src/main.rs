//! quillmark CLI: Markdown on stdin, HTML on stdout.

use std::io::{self, Read, Write};
use std::process;

fn main() -> io::Result<()> {
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            "--version" => {
                println!("quillmark {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            // Raw HTML passthrough is already the default; accepted
            // for compatibility with other CommonMark tools.
            "--unsafe" => {}
            other => {
                eprintln!("unexpected argument: {}", other);
                print_usage();
                process::exit(2);
            }
        }
    }

    let mut input = Vec::new();
    io::stdin().read_to_end(&mut input)?;
    // Invalid UTF-8 is replaced rather than rejected.
    let text = String::from_utf8_lossy(&input);

    let html = quillmark::to_html(&text);
    io::stdout().write_all(html.as_bytes())?;

    Ok(())
}

fn print_usage() {
    eprintln!("Usage: quillmark [--unsafe] [--help] [--version] < input.md > output.html");
}
