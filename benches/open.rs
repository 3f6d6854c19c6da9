//! Benchmarks for the load pipeline.
//!
//! Run with: cargo bench

use std::collections::HashMap;
use std::io::{Cursor, Write};

use criterion::{Criterion, criterion_group, criterion_main};
use tokio::runtime::Runtime;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use epub_model::inline::inline_resources;
use epub_model::{Book, epub};

const CHAPTERS: usize = 40;
const IMAGES: usize = 60;

/// A synthetic book: `CHAPTERS` chapters, each referencing a few of
/// `IMAGES` 16 KiB images, with an EPUB 3 navigation document.
fn synthetic_epub() -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();

    zip.start_file("META-INF/container.xml", deflated).unwrap();
    zip.write_all(
        br#"<container version="1.0"><rootfiles><rootfile full-path="OEBPS/content.opf"/></rootfiles></container>"#,
    )
    .unwrap();

    zip.start_file("OEBPS/content.opf", deflated).unwrap();
    zip.write_all(package_document().as_bytes()).unwrap();

    let nav: String = (0..CHAPTERS)
        .map(|i| format!(r#"<li><a href="text/c{i}.xhtml">Chapter {i}</a></li>"#))
        .collect();
    zip.start_file("OEBPS/nav.xhtml", deflated).unwrap();
    write!(
        zip,
        r#"<html xmlns:epub="http://www.idpf.org/2007/ops"><body><nav epub:type="toc"><ol>{nav}</ol></nav></body></html>"#
    )
    .unwrap();

    for i in 0..CHAPTERS {
        zip.start_file(format!("OEBPS/text/c{i}.xhtml"), deflated).unwrap();
        zip.write_all(chapter(i).as_bytes()).unwrap();
    }

    for i in 0..IMAGES {
        let image: Vec<u8> = (0..16 * 1024).map(|b| (b * (i + 7)) as u8).collect();
        zip.start_file(format!("OEBPS/images/i{i}.png"), stored).unwrap();
        zip.write_all(&image).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

fn package_document() -> String {
    let mut manifest = String::from(
        r#"<item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>"#,
    );
    let mut spine = String::new();
    for i in 0..CHAPTERS {
        manifest.push_str(&format!(
            r#"<item id="c{i}" href="text/c{i}.xhtml" media-type="application/xhtml+xml"/>"#
        ));
        spine.push_str(&format!(r#"<itemref idref="c{i}"/>"#));
    }
    for i in 0..IMAGES {
        manifest.push_str(&format!(
            r#"<item id="i{i}" href="images/i{i}.png" media-type="image/png"/>"#
        ));
    }
    format!(
        r#"<package><metadata><title>Bench</title></metadata><manifest>{manifest}</manifest><spine>{spine}</spine></package>"#
    )
}

fn chapter(i: usize) -> String {
    let mut body = String::new();
    for p in 0..50 {
        body.push_str(&format!("<p>Paragraph {p} of chapter {i}, with some &amp; text.</p>"));
        if p % 10 == 0 {
            body.push_str(&format!(r#"<img src="../images/i{}.png" alt=""/>"#, (i + p) % IMAGES));
        }
    }
    format!(r#"<html xmlns="http://www.w3.org/1999/xhtml"><head><title>{i}</title></head><body>{body}</body></html>"#)
}

fn bench_open(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let bytes = synthetic_epub();

    c.bench_function("open", |b| {
        b.iter(|| runtime.block_on(Book::open(bytes.clone())).unwrap());
    });
}

fn bench_component(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let book = runtime.block_on(Book::open(synthetic_epub())).unwrap();
    let path = book.components()[0].clone();

    c.bench_function("component", |b| {
        b.iter(|| runtime.block_on(book.component(&path)).unwrap());
    });
}

fn bench_parse_package(c: &mut Criterion) {
    let opf = package_document();

    c.bench_function("parse_package", |b| {
        b.iter(|| epub::parse_package(&opf, "OEBPS").unwrap());
    });
}

fn bench_inline(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let book = runtime.block_on(Book::open(synthetic_epub())).unwrap();
    let payloads: HashMap<String, String> = (0..IMAGES)
        .map(|i| {
            let path = format!("OEBPS/images/i{i}.png");
            let payload = book.payload(&path).unwrap().to_string();
            (path, payload)
        })
        .collect();
    let html = chapter(3);

    c.bench_function("inline_resources", |b| {
        b.iter(|| inline_resources(&html, "OEBPS/text", &payloads).unwrap());
    });
}

criterion_group!(
    benches,
    bench_open,
    bench_component,
    bench_parse_package,
    bench_inline
);
criterion_main!(benches);
