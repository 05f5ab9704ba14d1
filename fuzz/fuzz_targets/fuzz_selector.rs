#![no_main]

//! Selector parsing must never panic, whatever the input.

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let _ = wirework_tree::selector::parse(data);
});
