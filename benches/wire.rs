//! Benchmarks for request parsing and response rendering.

use std::hint::black_box;

use chrono::NaiveDate;
use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;

use maquinas_service::domain::{Machine, MachineView, Maintenance, NewMachine, NewMaintenance};

fn bench_parse(c: &mut Criterion) {
    let machine = json!({
        "nombre": "Press-1",
        "estado": "activa",
        "ultima_fecha_mantenimiento": "2024-01-10"
    });
    let maintenance = json!({ "maquina": 1, "fecha": "2024-02-01", "tipo": "lubrication" });
    let invalid = json!({ "nombre": "", "estado": 3, "ultima_fecha_mantenimiento": "01/10" });

    let mut group = c.benchmark_group("parse");
    group.bench_function("machine", |b| {
        b.iter(|| NewMachine::from_json(black_box(&machine)));
    });
    group.bench_function("maintenance", |b| {
        b.iter(|| NewMaintenance::from_json(black_box(&maintenance)));
    });
    group.bench_function("machine_invalid", |b| {
        b.iter(|| NewMachine::from_json(black_box(&invalid)));
    });
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let maintenances: Vec<Maintenance> = (1..=50)
        .map(|id| Maintenance {
            id,
            machine_id: 1,
            date,
            kind: format!("inspection-{id}"),
        })
        .collect();
    let view = MachineView::new(
        Machine {
            id: 1,
            name: "Press-1".to_string(),
            status: "activa".to_string(),
            last_maintenance_date: date,
        },
        maintenances,
    );

    c.bench_function("render_machine_view_50", |b| {
        b.iter(|| serde_json::to_vec(black_box(&view)));
    });
}

criterion_group!(benches, bench_parse, bench_render);
criterion_main!(benches);
