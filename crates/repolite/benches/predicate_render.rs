use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use repolite::{Comparison, Expr, Value, WhereClause, XRef, format_list, translate_predicate};

/// `[col0] = 0 AND ([col1] > 1 OR [col2] > 2) AND ...`
fn build_clause(n: usize) -> WhereClause {
    let mut w = WhereClause::new();
    w.start("col0", Comparison::Equals, 0);
    for i in 1..n {
        let column = format!("col{i}");
        if i % 3 == 1 {
            w.and_begin_group(&column, Comparison::GreaterThan, i as i64);
        } else if i % 3 == 2 {
            w.or(&column, Comparison::GreaterThan, i as i64).end_group();
        } else {
            w.and(&column, Comparison::Like, format!("v{i}"));
        }
    }
    if w.open_groups() > 0 {
        w.end_group();
    }
    w
}

fn bench_where_clause(c: &mut Criterion) {
    let mut group = c.benchmark_group("predicate_render/where_clause");

    for n in [1, 5, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(build_clause(n).to_clause()));
        });
    }

    group.finish();
}

fn bench_in_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("predicate_render/in_list");

    for n in [10, 500, 2000, 10_000] {
        let values: Vec<Value> = (0..n).map(Value::Int).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| black_box(format_list(values)));
        });
    }

    group.finish();
}

fn bench_translate(c: &mut Criterion) {
    let mut group = c.benchmark_group("predicate_render/translate");
    let xref: XRef = [("p0".to_string(), "c0".to_string())].into_iter().collect();

    for depth in [1, 8, 32] {
        let mut expr = Expr::column("Id").gt(0);
        for i in 0..depth {
            let term = Expr::column(format!("Name{i}")).starts_with(format!("n{i}"));
            expr = if i % 2 == 0 { expr.and(term) } else { expr.or(term) };
        }
        group.bench_with_input(BenchmarkId::from_parameter(depth), &expr, |b, expr| {
            b.iter(|| black_box(translate_predicate(expr, &xref)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_where_clause, bench_in_list, bench_translate);
criterion_main!(benches);
