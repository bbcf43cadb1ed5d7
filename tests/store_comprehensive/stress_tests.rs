//! Tier 4: randomized mixed workloads from several threads
//!
//! Each worker owns its own tag and keeps a model of what it wrote, so the
//! store can be checked against the model while other workers interleave.

use crate::test_utils::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;
use smartstore::{IndexSpec, QuerySpec, SmartStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

const WORKERS: u64 = 6;
const OPS: usize = 150;

#[derive(Clone, Copy)]
enum Op {
    Insert,
    Update,
    Remove,
    Check,
}

fn worker(store: Arc<SmartStore>, tag: u64) {
    let mut rng = StdRng::seed_from_u64(0x5eed + tag);
    let mut model: BTreeMap<i64, i64> = BTreeMap::new();
    let ops = [Op::Insert, Op::Insert, Op::Update, Op::Remove, Op::Check];

    for _ in 0..OPS {
        match *ops.choose(&mut rng).unwrap() {
            Op::Insert => {
                let n = rng.gen_range(1..5);
                let batch = (0..n)
                    .map(|_| json!({"tag": tag, "value": rng.gen_range(0..1000)}))
                    .collect();
                for saved in store.upsert_entries(batch, "work").unwrap() {
                    model.insert(entry_id(&saved), saved["value"].as_i64().unwrap());
                }
            }
            Op::Update => {
                let ids: Vec<i64> = model.keys().copied().collect();
                if let Some(&id) = ids.choose(&mut rng) {
                    let value = rng.gen_range(0..1000);
                    store
                        .upsert_entries(
                            vec![json!({"_soupEntryId": id, "tag": tag, "value": value})],
                            "work",
                        )
                        .unwrap();
                    model.insert(id, value);
                }
            }
            Op::Remove => {
                let mut ids: Vec<i64> = model.keys().copied().collect();
                ids.shuffle(&mut rng);
                ids.truncate(rng.gen_range(0..3));
                store.remove_entries(&ids, "work").unwrap();
                for id in ids {
                    model.remove(&id);
                }
            }
            Op::Check => {
                let spec = QuerySpec::exact("work", "tag", tag as i64, 1);
                assert_eq!(store.count_with_query_spec(&spec).unwrap(), model.len());
            }
        }
    }

    let ids: Vec<i64> = model.keys().copied().collect();
    let stored = store.retrieve_entries(&ids, "work").unwrap();
    assert_eq!(stored.len(), model.len());
    for entry in stored {
        assert_eq!(entry["value"].as_i64(), model.get(&entry_id(&entry)).copied());
    }
}

#[test]
fn mixed_workload_matches_per_worker_models() {
    let t = TestRegistry::new();
    let store = t.store("stress");
    store
        .register_soup("work", &[IndexSpec::number("tag"), IndexSpec::number("value")])
        .unwrap();

    let handles: Vec<_> = (0..WORKERS)
        .map(|tag| {
            let store = Arc::clone(&store);
            thread::spawn(move || worker(store, tag))
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let stats = store.queue_stats();
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.in_flight, 0);
}

#[test]
fn paging_stays_consistent_under_writes() {
    let t = TestRegistry::new();
    let store = t.store("paging");
    store
        .register_soup("log", &[IndexSpec::number("seq")])
        .unwrap();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for seq in 0..200 {
                store
                    .upsert_entries(vec![json!({"seq": seq})], "log")
                    .unwrap();
            }
        })
    };

    let spec = QuerySpec::all("log", 7).order_by("seq", smartstore::SortOrder::Ascending);
    for _ in 0..30 {
        let page = store.query_with_query_spec(&spec, 0).unwrap();
        let seqs: Vec<i64> = page.iter().map(|e| e["seq"].as_i64().unwrap()).collect();
        let expected: Vec<i64> = (0..seqs.len() as i64).collect();
        assert_eq!(seqs, expected);
    }
    writer.join().unwrap();
    assert_eq!(store.count_with_query_spec(&spec).unwrap(), 200);
}
