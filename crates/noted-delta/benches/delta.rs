use noted_delta::{apply, delta};

fn make_note(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("- item {i}: pick up {} from the shop\n", i * 7 % 13))
        .collect()
}

fn edited(note: &str) -> String {
    note.replacen("shop", "market", 3) + "- one more thing\n"
}

#[divan::bench(args = [10, 100, 1000])]
fn diff_and_encode(bencher: divan::Bencher, lines: usize) {
    let old = make_note(lines);
    let new = edited(&old);
    bencher
        .counter(divan::counter::BytesCount::new(new.len()))
        .bench(|| delta(divan::black_box(&old), divan::black_box(&new)));
}

#[divan::bench(args = [10, 100, 1000])]
fn decode_and_apply(bencher: divan::Bencher, lines: usize) {
    let old = make_note(lines);
    let d = delta(&old, &edited(&old));
    bencher
        .counter(divan::counter::BytesCount::new(old.len()))
        .bench(|| apply(divan::black_box(&old), divan::black_box(&d)).unwrap());
}

fn main() {
    divan::main();
}
