use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use hil_test_runner::monitor::classify_line;
use hil_test_runner::TestCase;
use std::time::Duration;

pub fn bench_classify_line(c: &mut Criterion) {
    let lines = [
        "tests/cases/01_timers.c:40:timers:PASS\r\n",
        "tests/cases/04_wifi.c:33:wifi:FAIL: Expected TRUE Was FALSE\r\n",
        "I (1234) wifi: station connected, rssi -61, channel 6\r\n",
        "esp-open-rtos test runner.\n",
    ];
    c.bench_function("classify_line", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(classify_line(black_box(line)));
            }
        })
    });
}

pub fn bench_parse_record(c: &mut Criterion) {
    let record = "CASE 12 = uart_loopback_dual DUAL";
    c.bench_function("parse_case_record", |b| {
        b.iter(|| black_box(TestCase::parse_record(black_box(record))))
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(300))
        .measurement_time(Duration::from_secs(2));
    targets = bench_classify_line, bench_parse_record
}
criterion_main!(benches);
