//! 분류기 벤치마크
//!
//! 룰 수에 따른 분류 성능과 디코딩 포함 처리량을 측정합니다.

use std::net::SocketAddr;

use chrono::Utc;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use syslog_relay_core::event::SyslogLine;
use syslog_relay_pipeline::collector::Datagram;
use syslog_relay_pipeline::decoder::decode;
use syslog_relay_pipeline::rule::{EventClassifier, MatchRule};
use syslog_relay_pipeline::MatchPolicy;

const MATCHING: &str =
    "<189>42: *Mar  1 00:10:24.123: %SYS-5-CONFIG_I: Configured from console by admin on vty0";
const NON_MATCHING: &str =
    "<187>43: *Mar  1 00:11:02.001: %LINK-3-UPDOWN: Interface GigabitEthernet0/1, changed state to up";

fn classifier(rule_count: usize, policy: MatchPolicy) -> EventClassifier {
    let mut rules: Vec<MatchRule> = (0..rule_count.saturating_sub(1))
        .map(|i| MatchRule::new(format!("filler-{i}"), format!("%FAC{i}-\\d-[A-Z_]+")))
        .collect();
    rules.push(MatchRule::new("config-change", "%SYS-5-CONFIG_I"));
    EventClassifier::new(rules, policy).unwrap()
}

fn line(text: &str) -> SyslogLine {
    SyslogLine::new(text, "10.0.0.5".parse().unwrap(), Utc::now())
}

fn bench_rule_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_rule_scaling");
    group.throughput(Throughput::Elements(1));

    for count in [1, 10, 100] {
        let matching = line(MATCHING);
        let non_matching = line(NON_MATCHING);
        let all = classifier(count, MatchPolicy::All);

        group.bench_with_input(BenchmarkId::new("matching", count), &count, |b, _| {
            b.iter(|| all.classify(black_box(&matching)))
        });
        group.bench_with_input(BenchmarkId::new("non_matching", count), &count, |b, _| {
            b.iter(|| all.classify(black_box(&non_matching)))
        });
    }

    group.finish();
}

fn bench_decode_and_classify(c: &mut Criterion) {
    let sender: SocketAddr = "10.0.0.5:514".parse().unwrap();
    let datagram = Datagram::new(MATCHING.as_bytes().to_vec(), sender, false);
    let first = classifier(10, MatchPolicy::First);

    let mut group = c.benchmark_group("decode_and_classify");
    group.throughput(Throughput::Bytes(MATCHING.len() as u64));
    group.bench_function("datagram_to_events", |b| {
        b.iter(|| match decode(black_box(&datagram)) {
            syslog_relay_pipeline::DecodeOutcome::Line(l) => first.classify(&l).len(),
            _ => 0,
        })
    });
    group.finish();
}

criterion_group!(benches, bench_rule_scaling, bench_decode_and_classify);
criterion_main!(benches);
