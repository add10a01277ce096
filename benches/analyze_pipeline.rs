use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use criterion::{Criterion, criterion_group, criterion_main};
use sales_lens::config::EngineSettings;
use sales_lens::dataset::RawTable;
use sales_lens::dimension::Dimension;
use sales_lens::engine::{self, AnalysisRequest};
use sales_lens::io_utils::SheetSource;
use tempfile::TempDir;

fn generate_sales(rows: usize) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv_path = temp_dir.path().join("sales.csv");
    let mut file = File::create(&csv_path).expect("create csv");
    writeln!(file, "产品名称,客户名称,区域,数量,毛利,金额,成本,海运费,代理费").expect("header");
    for i in 0..rows {
        let product = i % 120;
        let customer = (i * 7) % 400;
        let region = i % 31;
        let quantity = 1.0 + (i % 50) as f64 * 0.5;
        let profit = ((i % 17) as f64 - 4.0) * 0.3;
        let amount = quantity * 0.6;
        let cost = amount * 0.7;
        writeln!(
            file,
            "P{product:03},C{customer:03},R{region:02},{quantity},{profit},{amount},{cost},0.05,0.01"
        )
        .expect("row");
    }
    (temp_dir, csv_path)
}

fn bench_pipeline(c: &mut Criterion) {
    let (_dir, csv_path) = generate_sales(50_000);
    let source = SheetSource::new(&csv_path, None, None).expect("source");
    let table = RawTable::load(&source).expect("load table");
    let settings = EngineSettings::default();

    c.bench_function("load_csv_50k", |b| {
        b.iter(|| RawTable::load(&source).expect("load table"))
    });

    let mut group = c.benchmark_group("analyze_50k");
    for dimension in Dimension::ALL {
        let request = AnalysisRequest::new(dimension);
        group.bench_function(dimension.as_str(), |b| {
            b.iter(|| engine::analyze(&table, &request, &settings).expect("analysis"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
