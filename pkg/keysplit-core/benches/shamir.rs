/*
 * keysplit: split-key encryption with threshold share recovery
 * Copyright (C) 2023-2024 Aleksa Sarai <cyphar@cyphar.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use keysplit_core::shamir;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::RngCore;

fn benchmark_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("shamir split");
    for &(threshold, shares_count) in &[(2u16, 3u16), (3, 5), (10, 20), (20, 20)] {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        group.throughput(Throughput::Bytes(key.len() as u64));
        group.bench_with_input(
            format!("t={:02} n={:02}", threshold, shares_count),
            &key,
            |b, key| b.iter(|| shamir::split(black_box(key), shares_count, threshold).unwrap()),
        );
    }
    group.finish()
}

fn benchmark_reconstruct(c: &mut Criterion) {
    let mut group = c.benchmark_group("shamir reconstruct");
    for &(threshold, shares_count) in &[(2u16, 3u16), (3, 5), (10, 20), (20, 20)] {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        let shares = shamir::split(&key, shares_count, threshold).unwrap();
        let quorum = shares[..threshold as usize].to_vec();
        group.throughput(Throughput::Bytes(key.len() as u64));
        group.bench_with_input(
            format!("t={:02} n={:02}", threshold, shares_count),
            &quorum,
            |b, quorum| b.iter(|| shamir::reconstruct(black_box(quorum), key.len()).unwrap()),
        );
    }
    group.finish()
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(250);
    targets = benchmark_split, benchmark_reconstruct
}
criterion_main!(benches);
