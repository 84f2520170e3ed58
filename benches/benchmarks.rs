use criterion::{black_box, criterion_main, criterion_group, Criterion};
use rand::{Rng, SeedableRng, rngs::StdRng};
use ton_msg_hash::{BuilderData, Cell, IBitstring, MsgAddressInt, UInt256};

// wide random tree with shared subtrees
fn random_tree(rng: &mut StdRng, depth: usize) -> Cell {
    let mut builder = BuilderData::new();
    let bits = rng.gen_range(0..=1023);
    let data: Vec<u8> = (0..128).map(|_| rng.gen()).collect();
    builder.append_raw(&data, bits).unwrap();
    if depth > 0 {
        let shared = random_tree(rng, depth - 1);
        for _ in 0..rng.gen_range(1..=4) {
            if rng.gen_bool(0.5) {
                builder.checked_append_reference(shared.clone()).unwrap();
            } else {
                builder.checked_append_reference(random_tree(rng, depth - 1)).unwrap();
            }
        }
    }
    builder.into_cell().unwrap()
}

fn bench_boc(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(467);
    let cell = random_tree(&mut rng, 6);
    let bytes = ton_msg_hash::write_boc(&cell).unwrap();
    let mut g = c.benchmark_group("bench");
    g.measurement_time(std::time::Duration::new(15, 0));
    g.bench_function("boc-write", |b| b.iter( || {
        black_box(ton_msg_hash::write_boc(&cell).unwrap());
    }));
    g.bench_function("boc-read", |b| b.iter( || {
        black_box(ton_msg_hash::read_single_root_boc(&bytes).unwrap());
    }));
}

fn bench_normalize(c: &mut Criterion) {
    let dst = MsgAddressInt::with_standart(0, UInt256::calc_file_hash(b"destination"));
    let body = ton_msg_hash::comment_body("Hello TON!").unwrap();
    let mut builder = BuilderData::new();
    builder.append_bits(0b10, 2).unwrap().append_bits(0b00, 2).unwrap();
    dst.write_to(&mut builder).unwrap();
    builder.append_coins(1_000_000).unwrap().append_bit_zero().unwrap().append_bit_one().unwrap();
    builder.checked_append_reference(body.clone()).unwrap();
    let message = builder.into_cell().unwrap();
    let boc = ton_msg_hash::write_boc(&message).unwrap();

    let mut g = c.benchmark_group("bench");
    g.bench_function("normalize", |b| b.iter( || {
        black_box(ton_msg_hash::normalize(&dst, &body).unwrap());
    }));
    g.bench_function("normalize-boc", |b| b.iter( || {
        black_box(ton_msg_hash::normalized_hash_of_boc(&boc).unwrap());
    }));
}

criterion_group!(
    benches,
    bench_boc,
    bench_normalize,
);
criterion_main!(benches);
