// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;
use std::sync::mpsc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use erdsketch::model::EntityKind;
use erdsketch::persist::PersistenceAdapter;
use erdsketch::store::{FolderTransport, PersistFolder};
use erdsketch::{DiagramConfig, DiagramSession, ScopeKey};

mod fixtures;
mod profiler;

fn scope(value: &str) -> ScopeKey {
    ScopeKey::new(value).expect("scope")
}

// Group and case ids are compared across runs; keep them stable.
fn benches_switch_scope(c: &mut Criterion) {
    let mut group = c.benchmark_group("session.switch_scope");

    for case in fixtures::Case::ALL {
        let schema = fixtures::schema(case);
        let adapter = PersistenceAdapter::default()
            .with_snapshot(BTreeMap::new())
            .into_shared();
        let mut session = DiagramSession::create(DiagramConfig::default(), adapter);
        session.switch_scope(scope("a"), schema.clone());
        session.switch_scope(scope("b"), schema.clone());

        let mut flip = false;
        group.bench_function(format!("warm_{}", case.id()), |b| {
            b.iter(|| {
                flip = !flip;
                let next = if flip { "a" } else { "b" };
                session.switch_scope(scope(next), black_box(schema.clone()));
                black_box(fixtures::checksum_positions(
                    session.positions(EntityKind::Table),
                ))
            })
        });
    }
    group.finish();
}

fn benches_folder_open(c: &mut Criterion) {
    let mut group = c.benchmark_group("session.folder_open");

    for case in [fixtures::Case::Small, fixtures::Case::Medium] {
        let schema = fixtures::schema(case);
        group.bench_function(format!("io_{}", case.id()), |b| {
            b.iter_batched(
                || tempfile::tempdir().expect("tempdir"),
                |tmp| {
                    let folder = PersistFolder::new(tmp.path());
                    let (tx, rx) = mpsc::channel();
                    let transport = FolderTransport::spawn(folder, tx).expect("spawn");
                    let adapter = PersistenceAdapter::default()
                        .with_snapshot(BTreeMap::new())
                        .with_durable_store(Box::new(transport.clone()))
                        .into_shared();
                    let mut session = DiagramSession::create(DiagramConfig::default(), adapter);
                    session.switch_scope(scope("doc"), schema.clone());
                    session.save_all();
                    transport.flush();
                    black_box(rx.try_iter().count())
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = profiler::criterion();
    targets = benches_switch_scope, benches_folder_open
}
criterion_main!(benches);
