use std::{cell::RefCell, io::Cursor, rc::Rc};

use codspeed_criterion_compat::{black_box, criterion_group, criterion_main, Criterion};
use hex_literal::hex;
use jpeg_segments::{Document, ParseOptions};

/// A baseline JPEG with 64 KiB of scan data split by restart markers.
fn baseline_jpeg() -> Vec<u8> {
    let mut jpeg = hex!(
        "ffd8"
        "ffe0" "0010" "4a46494600" "0101" "00" "0001" "0001" "00" "00"
        "ffdb" "0043" "00"
        "10101010101010101010101010101010"
        "10101010101010101010101010101010"
        "10101010101010101010101010101010"
        "10101010101010101010101010101010"
        "ffc0" "000b" "08" "0100" "0100" "01" "011100"
        "ffc4" "001f" "00"
        "00010501010101010100000000000000"
        "000102030405060708090a0b"
        "ffdd" "0004" "0010"
        "ffda" "0008" "01" "0100" "00" "3f" "00"
    )
    .to_vec();

    for interval in 0..16u8 {
        for i in 0..4096u32 {
            jpeg.push(if i % 97 == 0 { 0xFF } else { (i % 251) as u8 });
            if i % 97 == 0 {
                jpeg.push(0x00);
            }
        }
        jpeg.extend_from_slice(&[0xFF, 0xD0 | (interval % 8)]);
    }

    jpeg.extend_from_slice(&hex!("ffd9"));
    jpeg
}

pub fn parse_document(c: &mut Criterion) {
    let jpeg = baseline_jpeg();

    c.bench_function("parse JPEG from slice", |b| {
        b.iter(|| Document::from_slice(black_box(&jpeg)).unwrap());
    });

    c.bench_function("parse JPEG from cursor with deferral", |b| {
        let options = ParseOptions::strict().with_defer_threshold(1024);
        b.iter(|| {
            let reader = Rc::new(RefCell::new(Cursor::new(jpeg.clone())));
            Document::from_reader_with_options(black_box(reader), &options).unwrap()
        });
    });

    let doc = Document::from_slice(&jpeg).unwrap();
    c.bench_function("write JPEG", |b| {
        b.iter(|| black_box(&doc).to_vec().unwrap());
    });
}

criterion_group!(benches, parse_document);
criterion_main!(benches);
