use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use holocron::api::*;
use std::hint::black_box;
use std::sync::Arc;

struct StarWarsData;

struct StarWarsQuery {
    data: Arc<StarWarsData>,
}

impl Injectable for StarWarsQuery {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::builder()
            .service::<StarWarsData>()
            .build(|args| Ok(StarWarsQuery { data: args.take()? }))]
    }
}

fn benchmark_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    // Setup registry
    let registry = ServiceRegistry::new();
    registry.register_singleton(Arc::new(StarWarsData)).unwrap();
    registry.register_transient::<StarWarsQuery>().unwrap();
    for i in 0..50u32 {
        let binding = if i % 2 == 0 {
            Binding::singleton_factory(move || Arc::new(format!("instance_{}", i)))
        } else {
            Binding::factory(move || Arc::new(format!("instance_{}", i)))
        };
        registry
            .bind(ServiceKey::named(format!("service_{}", i)), binding)
            .unwrap();
    }

    group.bench_function("resolve_singleton_instance", |b| {
        b.iter(|| black_box(registry.resolve::<StarWarsData>()));
    });

    let memoized = ServiceKey::named("service_0");
    group.bench_function("resolve_singleton_factory", |b| {
        b.iter(|| black_box(registry.resolve_key::<String>(black_box(&memoized))));
    });

    let fresh = ServiceKey::named("service_1");
    group.bench_function("resolve_factory", |b| {
        b.iter(|| black_box(registry.resolve_key::<String>(black_box(&fresh))));
    });

    group.bench_function("resolve_transient_with_dependency", |b| {
        b.iter(|| {
            let query = registry.resolve::<StarWarsQuery>().unwrap();
            black_box(query.data.clone())
        });
    });

    group.finish();
}

fn benchmark_adapter(c: &mut Criterion) {
    let mut group = c.benchmark_group("adapter");

    for size in [1usize, 10, 100].iter() {
        let registry = Arc::new(ServiceRegistry::new());
        for i in 0..*size {
            registry
                .bind(
                    ServiceKey::named(format!("service_{}", i)),
                    Binding::instance(Arc::new(i)),
                )
                .unwrap();
        }
        let resolver = RegistryResolver::new(registry);
        let hit = ServiceKey::named("service_0");
        let miss = ServiceKey::named("missing");

        group.bench_with_input(BenchmarkId::new("get_service_hit", size), &hit, |b, key| {
            b.iter(|| black_box(resolver.get_service(key)));
        });
        group.bench_with_input(BenchmarkId::new("get_service_miss", size), &miss, |b, key| {
            b.iter(|| black_box(resolver.get_service(key)));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_resolution, benchmark_adapter);
criterion_main!(benches);
