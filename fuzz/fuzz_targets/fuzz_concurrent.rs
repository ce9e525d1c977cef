#![no_main]

//! Fuzz target for concurrent resolution
//!
//! Threads racing on the same shared service must all observe one instance,
//! in the runtime container and in the compiled one.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use service_container::{Binding, Compiler, Container, Value};
use std::thread;

#[derive(Debug, Clone, Arbitrary)]
enum ThreadOp {
    GetShared,
    GetFresh,
    GetAlias,
    Has,
}

#[derive(Debug, Arbitrary)]
struct ConcurrentScenario {
    // Number of threads (clamped to 1-8)
    thread_count: u8,
    ops_per_thread: Vec<ThreadOp>,
    compiled: bool,
}

fuzz_target!(|scenario: ConcurrentScenario| {
    let container = Container::new();
    container.singleton("shared", Binding::closure(|_| Ok(Value::object("Shared", ()))));
    container.bind("fresh", Binding::closure(|_| Ok(Value::object("Fresh", ()))));
    container.alias("alias", "shared");

    let compiled = match Compiler::new().build(&container) {
        Ok(compiled) => compiled,
        Err(err) => panic!("compile failed: {err}"),
    };

    let thread_count = (scenario.thread_count % 8).max(1) as usize;
    let ops: Vec<ThreadOp> = scenario.ops_per_thread.into_iter().take(50).collect();

    let handles: Vec<_> = (0..thread_count)
        .map(|_| {
            let container = container.clone();
            let compiled = compiled.clone();
            let use_compiled = scenario.compiled;
            let ops = ops.clone();

            thread::spawn(move || {
                let get = |id: &str| if use_compiled { compiled.get(id) } else { container.get(id) };
                let mut seen = Vec::new();
                for op in ops {
                    match op {
                        ThreadOp::GetShared => seen.extend(get("shared").ok()),
                        ThreadOp::GetAlias => seen.extend(get("alias").ok()),
                        ThreadOp::GetFresh => {
                            let _ = get("fresh");
                        }
                        ThreadOp::Has => assert!(compiled.has("shared") && container.has("shared")),
                    }
                }
                seen
            })
        })
        .collect();

    let mut instances = Vec::new();
    for handle in handles {
        if let Ok(seen) = handle.join() {
            instances.extend(seen);
        }
    }

    if let Some(first) = instances.first() {
        assert!(instances.iter().all(|v| v == first));
    }
});
