use criterion::{Criterion, criterion_group, criterion_main};
use librqbit_merkle_tree::{Id32, MerkleTree, hash_block};

pub fn criterion_benchmark(c: &mut Criterion) {
    // A 1 GiB file: 65536 blocks of 16 KiB.
    let leafs: Vec<Id32> = (0..65536u32)
        .map(|i| hash_block(&i.to_be_bytes()))
        .collect();
    let full = MerkleTree::build(leafs.len(), &leafs).unwrap();

    c.bench_function("MerkleTree::fill 64k leafs", |b| {
        b.iter(|| {
            let mut t = MerkleTree::new(leafs.len(), full.root()).unwrap();
            t.set_leafs(&leafs);
            t.fill(leafs.len());
            std::hint::black_box(t.root())
        })
    });

    c.bench_function("MerkleTree::load_tree 64k leafs", |b| {
        let nodes = full.export_nodes();
        b.iter(|| {
            let mut t = MerkleTree::new(leafs.len(), full.root()).unwrap();
            std::hint::black_box(t.load_tree(&nodes))
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
