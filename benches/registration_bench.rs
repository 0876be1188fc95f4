use chrono::{DateTime, TimeZone, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal_macros::dec;

use trzba::core::*;
use trzba::soap::{EnvelopeOptions, ParseOptions, build_envelope, parse_envelope};

const OPERATOR_KEY_PEM: &str = include_str!("../tests/fixtures/operator_key.pem");
const PLAYGROUND_CERT_PEM: &str = include_str!("../tests/fixtures/playground_cert.pem");

fn bench_config() -> Config {
    Config::new(
        Certificate::from_pem(PLAYGROUND_CERT_PEM).unwrap(),
        private_key_from_pem(OPERATOR_KEY_PEM).unwrap(),
        TaxpayerId::new("CZ00000019").unwrap(),
        PremisesId::new(273).unwrap(),
        RegisterId::new("/5546/RO24").unwrap(),
    )
}

fn bench_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2027, 3, 1, 12, 0, 0).unwrap()
}

fn bench_record(config: &Config) -> SaleRecord {
    config
        .sale("0/6460/ZQ42", dec!(236.00))
        .recorded_at(DateTime::parse_from_rfc3339("2019-01-04T16:41:24+02:00").unwrap())
        .standard_rate(dec!(195.04), dec!(40.96))
        .build()
        .unwrap()
}

fn fiscal_codes(c: &mut Criterion) {
    let config = bench_config();
    let record = bench_record(&config);
    c.bench_function("compute_fiscal_codes", |b| {
        b.iter(|| codes::compute(black_box(&record.data), config.private_key()).unwrap());
    });
}

fn envelope_build(c: &mut Criterion) {
    let config = bench_config();
    c.bench_function("build_envelope", |b| {
        b.iter(|| {
            let mut record = bench_record(&config);
            build_envelope(
                black_box(&mut record),
                &config,
                bench_now(),
                &EnvelopeOptions::default(),
            )
            .unwrap()
        });
    });
}

fn envelope_parse(c: &mut Criterion) {
    let config = bench_config();
    let mut record = bench_record(&config);
    let bytes = build_envelope(&mut record, &config, bench_now(), &EnvelopeOptions::default())
        .unwrap();
    let options = ParseOptions {
        ignore_invalid_cert: false,
        now: Some(bench_now()),
    };
    c.bench_function("parse_and_verify_envelope", |b| {
        b.iter(|| parse_envelope(black_box(&bytes), &options).unwrap());
    });
}

criterion_group!(benches, fiscal_codes, envelope_build, envelope_parse);
criterion_main!(benches);
