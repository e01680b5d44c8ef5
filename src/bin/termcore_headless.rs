//! termcore headless runner
//!
//! Feeds a captured byte stream (a file or stdin) through the engine and
//! prints the resulting screen, as text or as a JSON snapshot. Useful for
//! checking what an application's output looks like without a renderer.

use std::io::{self, Read};
use std::process::ExitCode;

use termcore::Terminal;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

struct Options {
    rows: usize,
    cols: usize,
    input_file: Option<String>,
    output_format: OutputFormat,
    chunk_size: Option<usize>,
    show_help: bool,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        rows: 24,
        cols: 80,
        input_file: None,
        output_format: OutputFormat::Text,
        chunk_size: None,
        show_help: false,
    };

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .ok_or_else(|| format!("missing value for {}", name))
        };
        let number = |name: &str, text: &str| {
            text.parse::<usize>()
                .map_err(|_| format!("invalid value for {}: {}", name, text))
        };

        match arg.as_str() {
            "-r" | "--rows" => options.rows = number(arg, value(arg)?)?,
            "-c" | "--cols" => options.cols = number(arg, value(arg)?)?,
            "-f" | "--file" => options.input_file = Some(value(arg)?.clone()),
            "--chunk" => options.chunk_size = Some(number(arg, value(arg)?)?.max(1)),
            "-j" | "--json" => options.output_format = OutputFormat::Json,
            "-t" | "--text" => options.output_format = OutputFormat::Text,
            "-h" | "--help" => options.show_help = true,
            other if !other.starts_with('-') && options.input_file.is_none() => {
                options.input_file = Some(other.to_string());
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
    }

    Ok(options)
}

fn read_input(path: Option<&str>) -> io::Result<Vec<u8>> {
    match path {
        Some(path) => std::fs::read(path),
        None => {
            let mut data = Vec::new();
            io::stdin().read_to_end(&mut data)?;
            Ok(data)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            print_help();
            return ExitCode::FAILURE;
        }
    };

    if options.show_help {
        print_help();
        return ExitCode::SUCCESS;
    }

    let input = match read_input(options.input_file.as_deref()) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error reading input: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut terminal = Terminal::new(options.rows, options.cols);
    match options.chunk_size {
        Some(size) => input
            .chunks(size)
            .for_each(|chunk| terminal.process_bytes(chunk)),
        None => terminal.process_bytes(&input),
    }
    tracing::debug!(bytes = input.len(), "input processed");

    let snapshot = terminal.snapshot();
    match options.output_format {
        OutputFormat::Text => {
            println!("Terminal State ({}x{}):", snapshot.cols, snapshot.rows);
            println!("Cursor: ({}, {})", snapshot.cursor.row, snapshot.cursor.col);
            if !snapshot.title.is_empty() {
                println!("Title: {}", snapshot.title);
            }
            println!("---");
            print!("{}", snapshot.to_text());
            println!("---");
        }
        OutputFormat::Json => match snapshot.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing snapshot: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    ExitCode::SUCCESS
}

fn print_help() {
    println!("termcore headless runner");
    println!();
    println!("Usage: termcore-headless [OPTIONS] [INPUT_FILE]");
    println!();
    println!("Options:");
    println!("  -r, --rows <N>     Set terminal height (default: 24)");
    println!("  -c, --cols <N>     Set terminal width (default: 80)");
    println!("  -f, --file <PATH>  Read input from file (default: stdin)");
    println!("      --chunk <N>    Feed the input N bytes at a time");
    println!("  -j, --json         Output snapshot as JSON");
    println!("  -t, --text         Output snapshot as text (default)");
    println!("  -h, --help         Show this help message");
    println!();
    println!("Set RUST_LOG (e.g. RUST_LOG=debug) to see ignored sequences on stderr.");
}
