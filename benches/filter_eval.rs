use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;

use rulegate::{Actor, Collection, EntitySet, Filter, FilterEvaluator, Predicate, Record, Rules};

fn gen_foods(n: usize, seed: u64) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let allergic: Vec<Arc<Record>> = (0..rng.gen_range(0..4))
                .map(|_| Arc::new(Record::new("user", format!("u{}", rng.gen_range(0..64)))))
                .collect();
            Record::new("food", i as i64)
                .with("name", format!("food-{:05}", rng.gen::<u32>() % 100_000))
                .with("calories", rng.gen_range(10..900i64))
                .with_many("allergic_users", allergic)
        })
        .collect()
}

fn bench_evaluate(c: &mut Criterion) {
    let ns = [1_000usize, 10_000usize];
    let mut group = c.benchmark_group("filter_eval");
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(20);

    let filter = (Filter::q("calories__lt", 300) | Filter::q("name__istartswith", "FOOD-0"))
        & !Filter::q("allergic_users", "u7");

    for &n in &ns {
        let foods = gen_foods(n, 0xF00D_CAFE);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("evaluate", n.to_string()), &n, |b, _| {
            b.iter(|| {
                let mut hits = 0usize;
                for f in foods.iter() {
                    if FilterEvaluator::evaluate(f, &filter).unwrap_or(false) { hits += 1; }
                }
                criterion::black_box(hits);
            });
        });

        let set = EntitySet::from_items("food", foods.iter().map(|f| f.clone().into_ref()));
        group.bench_with_input(BenchmarkId::new("entity_set_filter", n.to_string()), &n, |b, _| {
            b.iter(|| {
                let kept = set.clone().filter(&filter).map(|s| s.len()).unwrap_or(0);
                criterion::black_box(kept);
            });
        });

        let mut rules = Rules::new();
        let _ = rules.allow("eat", "food", !Predicate::filter(|u| Filter::q("allergic_users", u)));
        let _ = rules.deny("eat", "food", Predicate::filter(|_| Filter::q("calories__gt", 800)));
        let actor = Actor::new("u7");
        group.bench_with_input(BenchmarkId::new("rules_decide", n.to_string()), &n, |b, _| {
            b.iter(|| {
                let mut granted = 0usize;
                for f in foods.iter() {
                    if rules.decide(&actor, "eat", Some(f)).unwrap_or(false) { granted += 1; }
                }
                criterion::black_box(granted);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
