//! Example: Parse a JPEG file using streaming I/O.
//!
//! Usage: `cargo run --example parse_from_file -- photo.jpg`
//!
//! Payloads and scan data larger than 4 KiB stay in the file and are only
//! read when written out or explicitly loaded.

use std::{cell::RefCell, env, fs::File, io::BufReader, rc::Rc};

use jpeg_segments::{segment::Segment, Document, Item, ParseOptions};

fn main() {
    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: parse_from_file <file.jpg>");
        std::process::exit(2);
    };

    println!("Parsing JPEG from file: {path}");

    let file = File::open(&path).expect("Failed to open file");
    let reader = Rc::new(RefCell::new(BufReader::new(file)));

    // Malformed files are common in the wild; parse leniently and report.
    let options = ParseOptions::lax().with_defer_threshold(4096);
    let doc = Document::from_reader_with_options(reader, &options).expect("Failed to parse JPEG");

    println!("Parsed {} items ({} bytes)", doc.len(), doc.disk_size());

    for segment in doc.segments() {
        match segment {
            Segment::App(app) => {
                let id = app
                    .identifier()
                    .map(|id| String::from_utf8_lossy(id).into_owned());
                println!("  {} ({} bytes) {:?}", segment.code(), segment.disk_size(), id);
            }
            Segment::Frame(sof) => {
                let header = sof.payload();
                println!(
                    "  {} {}x{} at {} bits, {} component(s)",
                    sof.code(),
                    header.samples_per_line,
                    header.lines,
                    header.precision,
                    header.components.len()
                );
            }
            _ => println!("  {} ({} bytes)", segment.name(), segment.disk_size()),
        }
    }

    let scan_bytes: usize = doc
        .iter()
        .filter_map(Item::as_entropy_data)
        .map(|data| data.data().len())
        .sum();
    println!("  {scan_bytes} byte(s) of scan data");

    let problems = doc.validate();
    if problems.is_empty() {
        println!("No problems found");
    } else {
        for problem in problems {
            println!("  problem: {problem}");
        }
    }
}
