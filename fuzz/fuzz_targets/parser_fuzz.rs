//! Schema fuzz target: arbitrary text through the parser, then validation and rendering.
//! Neither step may panic; anything that validates must also render.
//! Build with: cargo fuzz run parser_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    let Ok(protocol) = lcsfgen::parse(s) else {
        return;
    };
    if let Ok(ctx) = lcsfgen::prepare(&protocol) {
        let _ = lcsfgen::render(&ctx, [None, None], true);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parser_fuzz");
}
