#![no_main]

//! Fuzz target for runtime container operations
//!
//! Registers random bindings over a small id space, so aliases and array
//! references form arbitrary graphs (cycles included), then resolves them.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use service_container::{Argument, Binding, Container, ContainerError, Value};

const IDS: usize = 6;

fn id(slot: u8) -> String {
    format!("svc{}", slot as usize % IDS)
}

#[derive(Debug, Arbitrary)]
enum ContainerOp {
    BindInt { slot: u8, value: i64, shared: bool },
    BindString { slot: u8, value: String },
    BindArray { slot: u8, refs: Vec<u8> },
    Alias { slot: u8, target: u8 },
    Factory { slot: u8, value: i64 },
    Extend { slot: u8, add: i64 },
    SetParameter { name: u8, value: i64 },
    Get(u8),
    Has(u8),
    Reset,
}

fuzz_target!(|ops: Vec<ContainerOp>| {
    let container = Container::new();

    for op in ops.into_iter().take(64) {
        match op {
            ContainerOp::BindInt { slot, value, shared } => {
                container.bind(id(slot), Binding::value(value).set_shared(shared));
            }
            ContainerOp::BindString { slot, value } => {
                container.bind(id(slot), Binding::value(value));
            }
            ContainerOp::BindArray { slot, refs } => {
                let entries: Vec<(String, Argument)> = refs
                    .into_iter()
                    .take(4)
                    .map(|r| (format!("k{r}"), Argument::service(id(r))))
                    .collect();
                container.bind(id(slot), Binding::array(entries));
            }
            ContainerOp::Alias { slot, target } => container.alias(id(slot), id(target)),
            ContainerOp::Factory { slot, value } => {
                container.factory(id(slot), move |_| Ok(Value::Int(value)));
            }
            ContainerOp::Extend { slot, add } => {
                let _ = container.extend(&id(slot), move |v, _| {
                    Ok(match v {
                        Value::Int(i) => Value::Int(i.wrapping_add(add)),
                        other => other,
                    })
                });
            }
            ContainerOp::SetParameter { name, value } => container.set_parameter(id(name), value),
            ContainerOp::Get(slot) => {
                let id = id(slot);
                match container.get(&id) {
                    Ok(_) => assert!(container.has(&id)),
                    Err(ContainerError::NotFound { .. }) => {}
                    Err(ContainerError::CyclicDependency { path }) => {
                        assert!(path.len() >= 2);
                        assert_eq!(path.first(), path.last());
                    }
                    Err(_) => {}
                }
            }
            ContainerOp::Has(slot) => {
                let id = id(slot);
                if !container.has(&id) {
                    assert!(matches!(container.get(&id), Err(ContainerError::NotFound { .. })));
                }
            }
            ContainerOp::Reset => container.reset(),
        }
    }
});
