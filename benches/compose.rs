use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sourcemap_compose::{compose, ParsedMap};

fn flat_map_json(prefix: &str, lines: usize) -> String {
    let mut mappings = String::new();
    for i in 0..lines {
        if i > 0 {
            mappings.push(';');
        }
        mappings.push_str("AAAA,GAAIA,GAAI,EACR,IAAIA,GAAK,EAAG,CACVC,MAAM");
    }
    format!(
        r#"{{"version":3,"sources":["{prefix}.js"],"names":["x","alert"],"mappings":"{mappings}"}}"#
    )
}

fn bench_compose_two_stage(c: &mut Criterion) {
    let stage1 = flat_map_json("original", 200);
    let stage2 = flat_map_json("stage1-out", 200);

    c.bench_function("compose_two_stage_200_lines", |b| {
        b.iter(|| {
            let m1 = ParsedMap::from_json_str(black_box(&stage1)).unwrap();
            let m2 = ParsedMap::from_json_str(black_box(&stage2)).unwrap();
            black_box(compose(vec![m1, m2]).unwrap())
        });
    });
}

fn bench_compose_four_stage(c: &mut Criterion) {
    let stages: Vec<String> =
        (0..4).map(|i| flat_map_json(&format!("stage{i}"), 200)).collect();

    c.bench_function("compose_four_stage_200_lines", |b| {
        b.iter(|| {
            let maps: Vec<ParsedMap> =
                stages.iter().map(|s| ParsedMap::from_json_str(black_box(s)).unwrap()).collect();
            black_box(compose(maps).unwrap())
        });
    });
}

criterion_group!(compose_benches, bench_compose_two_stage, bench_compose_four_stage);
criterion_main!(compose_benches);
