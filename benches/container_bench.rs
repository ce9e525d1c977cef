//! Benchmarks for the runtime and the compiled container

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use service_container::{
    Argument, Binding, ClassInfo, CompiledContainer, Compiler, Container, Param, Value, argument,
};
use std::hint::black_box;

#[allow(dead_code)]
struct Logger {
    level: i64,
}

#[allow(dead_code)]
struct Mailer {
    host: String,
    logger: Value,
}

fn classes(container: &Container) {
    container.register_class(
        ClassInfo::new("Logger")
            .param(Param::of::<i64>("level").with_default(1))
            .constructor(|args| {
                let level = argument(args, 0).as_int().unwrap_or_default();
                Ok(Value::object("Logger", Logger { level }))
            }),
    );
    container.register_class(
        ClassInfo::new("Mailer")
            .param(Param::of::<String>("host"))
            .param(Param::class("logger", "Logger"))
            .constructor(|args| {
                let host = argument(args, 0).as_str().unwrap_or_default().to_string();
                Ok(Value::object("Mailer", Mailer { host, logger: argument(args, 1).clone() }))
            }),
    );
}

/// Container with one binding of every kind
fn app() -> Container {
    let container = Container::new();
    classes(&container);
    container.set_parameter("host", "smtp.local");
    container.bind("port", Binding::value(25));
    container.bind(
        "config",
        Binding::array([
            ("host", Argument::parameter("host")),
            ("port", Argument::service("port")),
        ]),
    );
    container.singleton("logger", Binding::object("Logger"));
    container.singleton("mailer", Binding::object("Mailer"));
    container.bind("mailer.transient", Binding::object("Mailer"));
    container.alias("mail", "mailer");
    container.factory("request_id", |_| Ok(Value::Int(7)));
    container
}

fn compiled() -> CompiledContainer {
    match Compiler::new().build(&app()) {
        Ok(compiled) => compiled,
        Err(err) => panic!("benchmark container failed to compile: {err}"),
    }
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("value", |b| {
        b.iter(|| {
            let container = Container::new();
            container.bind("port", Binding::value(25));
            black_box(container)
        })
    });

    group.bench_function("object_with_arguments", |b| {
        b.iter(|| {
            let container = Container::new();
            container.singleton("mailer", Binding::object("Mailer").with_argument("host", "smtp.local"));
            black_box(container)
        })
    });

    group.bench_function("full_app", |b| b.iter(|| black_box(app())));

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    group.throughput(Throughput::Elements(1));

    let runtime = app();
    let compiled = compiled();

    for id in ["mailer", "mail", "config", "mailer.transient", "request_id"] {
        group.bench_with_input(BenchmarkId::new("runtime", id), id, |b, id| {
            b.iter(|| black_box(runtime.get(id)))
        });
        group.bench_with_input(BenchmarkId::new("compiled", id), id, |b, id| {
            b.iter(|| black_box(compiled.get(id)))
        });
    }

    group.bench_function("runtime_autowire", |b| b.iter(|| black_box(runtime.get("Mailer"))));
    group.bench_function("runtime_has", |b| b.iter(|| black_box(runtime.has("mailer"))));
    group.bench_function("compiled_has", |b| b.iter(|| black_box(compiled.has("mailer"))));

    group.finish();
}

fn bench_compiler(c: &mut Criterion) {
    let mut group = c.benchmark_group("compiler");

    for services in [10usize, 100] {
        let container = Container::new();
        classes(&container);
        container.set_parameter("host", "smtp.local");
        for i in 0..services {
            container.bind(format!("mailer.{i}"), Binding::object("Mailer"));
        }

        group.throughput(Throughput::Elements(services as u64));
        group.bench_with_input(BenchmarkId::new("compile", services), &container, |b, container| {
            let compiler = Compiler::new();
            b.iter(|| black_box(compiler.compile(container)))
        });

        if let Ok(artifact) = Compiler::new().compile(&container) {
            group.bench_with_input(BenchmarkId::new("render", services), &artifact, |b, artifact| {
                let compiler = Compiler::new();
                b.iter(|| black_box(compiler.dump(artifact)))
            });
        }
    }

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");

    group.bench_function("compiled_reads_4", |b| {
        let compiled = compiled();

        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let c = compiled.clone();
                    thread::spawn(move || {
                        for _ in 0..100 {
                            let _ = black_box(c.get("mailer"));
                        }
                    })
                })
                .collect();

            for h in handles {
                let _ = h.join();
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_registration,
    bench_resolution,
    bench_compiler,
    bench_concurrent,
);

criterion_main!(benches);
