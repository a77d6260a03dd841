use criterion::{black_box, criterion_group, criterion_main, Criterion};
use queryplay::data::table_loader::TableLoader;
use queryplay::session::Session;

fn create_orders_csv(rows: usize) -> String {
    let regions = ["North", "South", "East", "West", "Central"];
    let mut text = String::from("Order ID,Customer,Region,Amount,Order Date\n");
    for i in 0..rows {
        text.push_str(&format!(
            "{},{},{},{:.2},2024-{:02}-{:02}\n",
            i,
            i % 500,
            regions[i % regions.len()],
            (i % 1000) as f64 * 1.25,
            i % 12 + 1,
            i % 28 + 1
        ));
    }
    text
}

fn create_customers_csv(rows: usize) -> String {
    let mut text = String::from("id,name\n");
    for i in 0..rows {
        text.push_str(&format!("{},Customer {}\n", i, i));
    }
    text
}

fn benchmark_load(c: &mut Criterion) {
    let csv_10k = create_orders_csv(10_000);
    let csv_50k = create_orders_csv(50_000);

    let mut group = c.benchmark_group("load");
    group.sample_size(20);

    group.bench_function("10k_rows", |b| {
        let loader = TableLoader::default();
        b.iter(|| {
            let result = loader.load_reader("orders.csv", black_box(csv_10k.as_bytes()));
            assert!(result.is_ok());
        });
    });

    group.bench_function("50k_rows", |b| {
        let loader = TableLoader::default();
        b.iter(|| {
            let result = loader.load_reader("orders.csv", black_box(csv_50k.as_bytes()));
            assert!(result.is_ok());
        });
    });

    group.finish();
}

fn benchmark_query(c: &mut Criterion) {
    let mut session = Session::with_defaults();
    session
        .load_reader("orders.csv", create_orders_csv(50_000).as_bytes())
        .unwrap();
    session
        .load_reader("customers.csv", create_customers_csv(500).as_bytes())
        .unwrap();

    let mut group = c.benchmark_group("query");

    group.bench_function("aggregate_50k", |b| {
        let query = "SELECT Region, COUNT(*), SUM(Amount) FROM orders GROUP BY Region";
        b.iter(|| {
            let result = session.query(black_box(query));
            assert!(result.is_ok());
        });
    });

    group.bench_function("join_50k", |b| {
        let query = "SELECT c.name, SUM(o.Amount) AS total FROM orders o \
                     JOIN customers c ON c.id = o.Customer \
                     WHERE o.Order_Date >= '2024-06-01' GROUP BY c.name ORDER BY total DESC LIMIT 20";
        b.iter(|| {
            let result = session.query(black_box(query));
            assert!(result.is_ok());
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_load, benchmark_query);
criterion_main!(benches);
