use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wisp_server::codec::{decode, encode, PacketType};

fn encode_data_frame(c: &mut Criterion) {
    let payload = vec![0u8; 4096];
    c.bench_function("encode data frame (4KiB)", |b| {
        b.iter(|| encode(PacketType::Data, black_box(7), black_box(&payload)))
    });
}

fn decode_data_frame(c: &mut Criterion) {
    let frame = encode(PacketType::Data, 7, &vec![0u8; 4096]);
    c.bench_function("decode data frame (4KiB)", |b| {
        b.iter(|| decode(black_box(&frame)).unwrap())
    });
}

criterion_group!(benches, encode_data_frame, decode_data_frame);
criterion_main!(benches);
