//! Decode a captured event stream and print what a session would see.
//!
//! Usage: sse-inspect [--normalized] [FILE]
//! Reads stdin when no file is given. Upstream provider format is assumed
//! unless `--normalized` is passed.

use pagesmith_proto::{EventReader, GenerationEvent, NormalizedSchema, PayloadSchema, UpstreamSchema};
use std::fs::File;
use std::io::{self, Read};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut normalized = false;
    let mut path: Option<String> = None;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--normalized" => normalized = true,
            "-h" | "--help" => {
                println!("usage: sse-inspect [--normalized] [FILE]");
                return ExitCode::SUCCESS;
            }
            other => path = Some(other.to_string()),
        }
    }

    let input: Box<dyn Read> = match &path {
        Some(path) => match File::open(path) {
            Ok(file) => Box::new(file),
            Err(e) => {
                eprintln!("Failed to open {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(io::stdin()),
    };

    let result = if normalized {
        inspect(EventReader::new(input, NormalizedSchema))
    } else {
        inspect(EventReader::new(input, UpstreamSchema))
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Read error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn inspect<R: Read, S: PayloadSchema>(mut reader: EventReader<R, S>) -> io::Result<()> {
    let mut count = 0;
    while let Some(event) = reader.read_event()? {
        count += 1;
        match &event {
            GenerationEvent::Content { text } => println!("[{:>4}] content  {:?}", count, text),
            GenerationEvent::Thinking { text } => println!("[{:>4}] thinking {:?}", count, text),
            GenerationEvent::Done => println!("[{:>4}] done", count),
            GenerationEvent::Error { message } => println!("[{:>4}] error    {}", count, message),
        }
    }

    let decoder = reader.decoder();
    println!("---");
    println!("bytes read:      {}", reader.position());
    println!("events:          {}", count);
    println!("discarded lines: {}", decoder.discarded_lines());
    println!("content chars:   {}", decoder.content().chars().count());
    println!("reasoning chars: {}", decoder.reasoning().chars().count());
    Ok(())
}
