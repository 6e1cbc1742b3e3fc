use criterion::{Criterion, criterion_group, criterion_main};
use domain::{ItemStatus, Money, OrderStatus, aggregate_order_status};

fn bench_commission_share(c: &mut Criterion) {
    let totals: Vec<Money> = (1..1000).map(Money::from_cents).collect();

    c.bench_function("domain/commission_share", |b| {
        b.iter(|| {
            let mut acc = Money::zero();
            for total in &totals {
                acc += total.share(500);
            }
            acc
        });
    });
}

fn bench_aggregate_order_status(c: &mut Criterion) {
    let statuses: Vec<ItemStatus> = (0..64)
        .map(|i| match i % 4 {
            0 => ItemStatus::Paid,
            1 => ItemStatus::Sent,
            2 => ItemStatus::Received,
            _ => ItemStatus::Cancelled,
        })
        .collect();

    c.bench_function("domain/aggregate_order_status", |b| {
        b.iter(|| aggregate_order_status(&statuses, OrderStatus::Paid));
    });
}

criterion_group!(benches, bench_commission_share, bench_aggregate_order_status);
criterion_main!(benches);
