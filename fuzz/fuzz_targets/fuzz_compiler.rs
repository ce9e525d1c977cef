#![no_main]

//! Fuzz target for compiler equivalence
//!
//! Every service a compiled container resolves must equal what the runtime
//! container resolves for the same bindings, errors included.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use service_container::{Argument, Binding, Compiler, CompilerOptions, Container, Value};

const IDS: usize = 6;

fn id(slot: u8) -> String {
    format!("svc{}", slot as usize % IDS)
}

#[derive(Debug, Arbitrary)]
enum Definition {
    Int { value: i64, shared: bool },
    Float(f64),
    Text(String),
    Array { refs: Vec<u8>, params: Vec<u8> },
    Alias(u8),
    Factory(i64),
}

#[derive(Debug, Arbitrary)]
struct Scenario {
    definitions: Vec<(u8, Definition)>,
    extenders: Vec<(u8, i64)>,
    parameters: Vec<(u8, i64)>,
    removed: Option<u8>,
    hash_length: u8,
}

fuzz_target!(|scenario: Scenario| {
    let container = Container::new();

    for (slot, definition) in scenario.definitions.into_iter().take(16) {
        let binding = match definition {
            Definition::Int { value, shared } => Binding::value(value).set_shared(shared),
            Definition::Float(value) => Binding::value(value),
            Definition::Text(value) => Binding::value(value),
            Definition::Array { refs, params } => {
                let mut entries: Vec<(String, Argument)> = refs
                    .into_iter()
                    .take(3)
                    .map(|r| (format!("s{r}"), Argument::service(id(r))))
                    .collect();
                entries.extend(
                    params
                        .into_iter()
                        .take(2)
                        .map(|p| (format!("p{p}"), Argument::parameter(format!("param{}", p % 3)))),
                );
                Binding::array(entries)
            }
            Definition::Alias(target) => Binding::reference(id(target)),
            Definition::Factory(value) => Binding::closure(move |_| Ok(Value::Int(value))),
        };
        container.bind(id(slot), binding);
    }

    for (slot, add) in scenario.extenders.into_iter().take(4) {
        let _ = container.extend(&id(slot), move |v, _| {
            Ok(match v {
                Value::Int(i) => Value::Int(i.wrapping_add(add)),
                other => Value::list([other]),
            })
        });
    }

    for (name, value) in scenario.parameters.into_iter().take(3) {
        container.set_parameter(format!("param{}", name % 3), value);
    }

    let mut options = CompilerOptions::new().hash_length(scenario.hash_length as usize);
    let removed = scenario.removed.map(id);
    if let Some(removed) = &removed {
        options = options.remove_id(removed.clone());
    }

    let compiler = Compiler::with_options(options);
    let Ok(artifact) = compiler.compile(&container) else {
        return;
    };
    assert_eq!(compiler.dump(&artifact), compiler.dump(&artifact.clone()));

    let Ok(compiled) = compiler.build(&container) else {
        return;
    };

    for slot in 0..IDS as u8 {
        let id = id(slot);
        // References to a removed id diverge from the runtime container
        if let Some(removed) = &removed {
            if *removed == id {
                assert!(!compiled.has(&id));
            }
            continue;
        }

        match (container.get(&id), compiled.get(&id)) {
            (Ok(a), Ok(b)) => assert!(a == b || (a != a && b != b), "{id}: {a:?} != {b:?}"),
            (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string()),
            (a, b) => panic!("{id}: runtime {a:?}, compiled {b:?}"),
        }
    }
});
