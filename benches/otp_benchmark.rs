use atkans_med::services::OtpService;
use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn benchmark_otp(c: &mut Criterion) {
    let service = OtpService::new(b"bench_jwt_key_32_bytes_minimum!!", 6, 10)
        .expect("Failed to build OTP service");
    let contact = "+911234567890";

    let (code, challenge) = service
        .issue(contact, Utc::now())
        .expect("Failed to issue challenge");
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let mut group = c.benchmark_group("otp");

    group.bench_function("issue", |b| {
        b.iter(|| service.issue(black_box(contact), Utc::now()))
    });

    group.bench_function("verify_valid", |b| {
        b.iter(|| service.verify(Some(&challenge), black_box(contact), black_box(&code), Utc::now()))
    });

    group.bench_function("verify_wrong_code", |b| {
        b.iter(|| service.verify(Some(&challenge), black_box(contact), black_box(wrong), Utc::now()))
    });

    group.finish();
}

criterion_group!(benches, benchmark_otp);
criterion_main!(benches);
