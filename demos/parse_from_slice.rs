//! Example: Parse a JPEG from an in-memory byte slice.
//!
//! Walks the items of a small baseline JPEG and prints each one with the
//! frame mode it was validated against.

use hex_literal::hex;
use jpeg_segments::{segment::Segment, Document, Item};

fn main() {
    let jpeg = hex!(
        "ffd8" // SOI
        "fffe" "0007" "68656c6c6f" // COM "hello"
        "ffc0" "000b" "08" "0010" "0010" "01" "011100" // SOF0, 16x16, one component
        "ffdd" "0004" "0020" // DRI
        "ffda" "0008" "01" "0100" "00" "3f" "00" // SOS
        "1234ff0056" // entropy-coded data
        "ffd9" // EOI
    );

    let doc = Document::from_slice(&jpeg).unwrap();

    println!("Parsed {} items ({} bytes):", doc.len(), doc.disk_size());

    for (i, item) in doc.iter().enumerate() {
        let mode = item.frame_mode();
        match item {
            Item::Marker(m) => println!("  {i}: marker {} ({mode:?})", m.code()),
            Item::Segment(Segment::Comment(com)) => {
                println!("  {i}: COM {:?} ({mode:?})", com.text());
            }
            Item::Segment(Segment::Frame(sof)) => {
                let header = sof.payload();
                println!(
                    "  {i}: {} {}x{}, {} component(s) ({mode:?})",
                    sof.code(),
                    header.samples_per_line,
                    header.lines,
                    header.components.len()
                );
            }
            Item::Segment(s) => println!("  {i}: {} segment ({mode:?})", s.name()),
            Item::EntropyData(data) => {
                println!("  {i}: {} byte(s) of scan data", data.data().len());
            }
            Item::Padding(p) => println!("  {i}: {} fill byte(s)", p.count()),
        }
    }

    assert_eq!(doc.to_vec().unwrap(), jpeg.to_vec());
    println!("Round trip OK");
}
