// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_article(paragraphs: usize) -> String {
    let base = "# Saved Article\n\nA paragraph with *styled* text, a [link](https://example.com) and some `inline code` to keep the tree honest.\n\n- point one\n- point two\n\n```rust\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n";
    base.repeat(paragraphs)
}

/// Evenly spaced non-overlapping `(start, end)` byte ranges over a
/// projection of the given length.
#[allow(dead_code)]
pub fn generate_spans(text_len: usize, count: usize, width: usize) -> Vec<(usize, usize)> {
    let stride = (text_len / (count + 1)).max(width + 1);
    (0..count)
        .map(|i| {
            let start = (i + 1) * stride;
            (start, start + width)
        })
        .filter(|(_, end)| *end <= text_len)
        .collect()
}
