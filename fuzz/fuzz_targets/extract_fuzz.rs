//! Extractor fuzz target: arbitrary bytes as a previous main module.
//! Extraction must return Ok or Err without panicking, and whatever it recovers must
//! regenerate without panicking.
//! Build with: cargo fuzz run extract_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    use lcsfgen::{Attribute, Command, DataType, Direction, Protocol, Role};

    let protocol = Protocol::new("Test", 1)
        .with_command(Command::new("SC3", 2, Direction::Bidirectional))
        .with_command(
            Command::new("CC1", 3, Direction::AToB)
                .with_attribute(Attribute::new("SA6", 5, DataType::Uint8).optional(true)),
        );
    let source = lcsfgen::extract::decode_source(data);
    let Ok(code) = lcsfgen::extract::extract(&protocol.name, &source, &protocol.commands) else {
        return;
    };
    if let Ok(ctx) = lcsfgen::prepare(&protocol) {
        let _ = lcsfgen::cgen::main_file::generate_main_source(&ctx, Role::B, Some(&code));
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run extract_fuzz");
}
