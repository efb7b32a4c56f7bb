#![no_main]

use arbitrary::Arbitrary;
use cellbind_core::{Binder, Value};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Set(String, i64),
    Get(String),
    Invalidate(String),
    Destruct(String),
}

// Arbitrary path strings through every resolution entry point must never
// panic; malformed paths are errors or no-ops.
fuzz_target!(|ops: Vec<Op>| {
    let binder = Binder::new();
    let _ = binder.set("seed", Value::object([("leaf", 1)]));
    for op in ops {
        match op {
            Op::Set(path, value) => {
                let _ = binder.set(&path, value);
            }
            Op::Get(path) => {
                let _ = binder.get(&path);
            }
            Op::Invalidate(path) => binder.invalidate(&path),
            Op::Destruct(name) => binder.destruct(&name),
        }
    }
});
