#![feature(test)]

extern crate test;

use ppe_compliance::config::PpeConfig;
use ppe_compliance::examples::WorkerGen;
use ppe_compliance::pipeline::batch::{BatchRecords, MonitorPool};
use ppe_compliance::trackers::iou::TrackerOptions;
use test::Bencher;

#[bench]
fn bench_pool_streams_0004_workers_0010(b: &mut Bencher) {
    bench_pool(4, 10, b);
}

#[bench]
fn bench_pool_streams_0016_workers_0010(b: &mut Bencher) {
    bench_pool(16, 10, b);
}

#[bench]
fn bench_pool_streams_0016_workers_0100(b: &mut Bencher) {
    bench_pool(16, 100, b);
}

fn bench_pool(streams: u64, workers: usize, b: &mut Bencher) {
    let ncores = match streams {
        4 => 2,
        _ => num_cpus::get(),
    };

    let config = PpeConfig {
        tracker: TrackerOptions::default().min_hits(1),
        ..Default::default()
    };
    let mut pool = MonitorPool::with_threads(config, ncores).unwrap();

    let mut scenes = (0..streams)
        .map(|s| {
            let gens = (0..workers)
                .map(|i| {
                    WorkerGen::new(500.0 * i as f32, 500.0 * s as f32, 80.0, 200.0, 1.0)
                        .helmet(Some(i % 3 != 0))
                        .vest(if i % 5 == 0 { None } else { Some(true) })
                })
                .collect::<Vec<_>>();
            (s, gens)
        })
        .collect::<Vec<_>>();

    b.iter(|| {
        let batch = scenes
            .iter_mut()
            .map(|(s, gens)| {
                let detections = gens.iter_mut().flat_map(|g| g.next().unwrap());
                (*s, detections.collect())
            })
            .collect::<BatchRecords>();
        let reports = pool.process_batch(&batch);
        assert_eq!(reports.len(), streams as usize);
        for r in reports.values() {
            assert_eq!(r.persons.len(), workers);
        }
    });
}
