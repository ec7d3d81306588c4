//! Benchmark: validate + render a protocol of 64 commands, each with a nested attribute
//! tree, and the extract -> regenerate pass over one of its main modules.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lcsfgen::cgen::main_file;
use lcsfgen::extract::extract;
use lcsfgen::{prepare, render, Attribute, Command, DataType, Direction, Protocol, Role};

const TYPES: [DataType; 8] = [
    DataType::Uint8,
    DataType::Uint16,
    DataType::Uint32,
    DataType::Uint64,
    DataType::Float32,
    DataType::Float64,
    DataType::ByteArray,
    DataType::String,
];

fn big_protocol() -> Protocol {
    let directions = [Direction::AToB, Direction::BToA, Direction::Bidirectional];
    let mut proto = Protocol::new("Bench", 0x42);
    for c in 0..64i16 {
        let mut group = Attribute::new(format!("GRP{}", c), 100, DataType::SubAttributes).optional(c % 2 == 0);
        for (i, dt) in TYPES.iter().enumerate() {
            group = group.with_child(Attribute::new(format!("G{}_{}", c, i), i as i16, *dt).optional(i % 3 == 0));
        }
        let mut cmd = Command::new(format!("CMD{}", c), c, directions[c as usize % 3]);
        for (i, dt) in TYPES.iter().enumerate() {
            cmd = cmd.with_attribute(Attribute::new(format!("A{}", i), i as i16, *dt).optional(i % 2 == 1));
        }
        proto.commands.push(cmd.with_attribute(group));
    }
    proto
}

fn bench_generate(c: &mut Criterion) {
    let proto = big_protocol();

    c.bench_function("prepare_render_c", |b| {
        b.iter(|| {
            let ctx = prepare(black_box(&proto)).expect("valid");
            black_box(render(&ctx, [None, None], false))
        })
    });

    c.bench_function("prepare_render_c_and_rust", |b| {
        b.iter(|| {
            let ctx = prepare(black_box(&proto)).expect("valid");
            black_box(render(&ctx, [None, None], true))
        })
    });

    let ctx = prepare(&proto).expect("valid");
    let main_a = main_file::generate_main_source(&ctx, Role::A, None);
    c.bench_function("extract_regenerate_main", |b| {
        b.iter(|| {
            let code = extract(&proto.name, black_box(&main_a), &proto.commands).expect("extract");
            black_box(main_file::generate_main_source(&ctx, Role::A, Some(&code)))
        })
    });
}

criterion_group!(benches, bench_generate);
criterion_main!(benches);
