//! Benchmarks for the selector pipeline
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use eventsel::columns::ColumnType;
use eventsel::stream::RecordFile;
use eventsel::{
    example_tree, AnalysisManager, BindMode, ColumnRegistry, Log, LogLevel, MemoryBackend,
    SelectorRegistry, Service, Store,
};

const STEERING: &str = "\
sequence<string> inputFileNames = ExampleTree.json
string inputTreeName = tree
int nEventsMax = -1
bool fillOutputTree = true
string loglevel = error
sequence<string> selectors = ExampleSelector
float ExampleSelector::my_float_min = 30.
int ExampleSelector::my_int_min = 2
";

fn example_backend(entries: usize) -> MemoryBackend {
    let backend = MemoryBackend::new();
    let tree = example_tree::generate("tree", entries, 7).expect("example tree");
    backend.insert("ExampleTree.json", RecordFile::with_tree(tree));
    backend
}

fn bench_steering_parse(c: &mut Criterion) {
    let text = STEERING.repeat(50);
    c.bench_function("steering_parse", |b| {
        b.iter(|| Store::parse(black_box(&text)).expect("parse"))
    });
}

fn bench_bind_release(c: &mut Criterion) {
    let backend = example_backend(10);
    let mut service = Service::new("tree", Box::new(backend), Log::new("bench"));
    service
        .configure_input(&["ExampleTree.json".to_string()])
        .expect("inputs");
    service.create_output_stream().expect("output");
    service.advance_to_next_input().expect("advance");

    let descriptors: Vec<(String, String)> = ColumnType::all()
        .map(|t| (format!("bench_{}", t.tag()), t.tag()))
        .collect();

    c.bench_function("bind_release_all_types", |b| {
        let mut registry = ColumnRegistry::new(Log::new("bench").with_level(LogLevel::Error));
        b.iter(|| {
            for (name, descriptor) in &descriptors {
                registry
                    .bind_dynamic(&mut service, name, descriptor, BindMode::Auto)
                    .expect("bind");
            }
            black_box(registry.release(&mut service).expect("release"))
        })
    });
}

fn bench_example_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("example_run");
    group.sample_size(10);

    for entries in [1_000usize, 10_000].iter() {
        group.throughput(Throughput::Elements(*entries as u64));
        group.bench_with_input(BenchmarkId::from_parameter(entries), entries, |b, &n| {
            b.iter(|| {
                let store = Store::parse(STEERING).expect("parse");
                let manager = AnalysisManager::new(
                    store,
                    Box::new(example_backend(n)),
                    &SelectorRegistry::with_builtin(),
                )
                .expect("prepare");
                black_box(manager.run().expect("run"))
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_steering_parse,
    bench_bind_release,
    bench_example_run
);
criterion_main!(benches);
