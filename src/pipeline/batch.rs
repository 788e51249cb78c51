use crate::config::PpeConfig;
use crate::detection::Detection;
use crate::pipeline::{ComplianceMonitor, FrameReport};
use anyhow::Result;
use log::debug;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::HashMap;

/// Detections of one frame per stream, keyed by the stream id
pub type BatchRecords = HashMap<u64, Vec<Detection>>;

/// Reports of one batch, keyed by the stream id
pub type BatchReports = HashMap<u64, FrameReport>;

/// Independent monitors for several video streams.
///
/// Every stream owns its own [`ComplianceMonitor`]; a batch carries at most one frame per
/// stream, so each monitor still receives its frames strictly in order while different
/// streams are processed in parallel.
///
pub struct MonitorPool {
    config: PpeConfig,
    monitors: HashMap<u64, ComplianceMonitor>,
    pool: ThreadPool,
}

impl MonitorPool {
    /// Creates the pool with one worker thread per CPU core
    ///
    pub fn new(config: PpeConfig) -> Result<Self> {
        Self::with_threads(config, num_cpus::get())
    }

    /// Creates the pool
    ///
    /// # Parameters
    /// * `config` - configuration applied to every new stream
    /// * `threads` - amount of worker threads, keep 1 for a handful of streams
    ///
    pub fn with_threads(config: PpeConfig, threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("ppe-monitor-{}", i))
            .build()?;
        Ok(Self {
            config,
            monitors: HashMap::default(),
            pool,
        })
    }

    /// Ids of the known streams
    ///
    pub fn streams(&self) -> Vec<u64> {
        let mut ids = self.monitors.keys().copied().collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    pub fn monitor(&self, stream_id: u64) -> Option<&ComplianceMonitor> {
        self.monitors.get(&stream_id)
    }

    /// Forgets the stream with all its tracks
    ///
    pub fn remove_stream(&mut self, stream_id: u64) -> Option<ComplianceMonitor> {
        self.monitors.remove(&stream_id)
    }

    /// Processes the next frame of every stream present in the batch.
    ///
    /// Unknown streams get a fresh monitor. Streams absent from the batch are left untouched,
    /// their tracks do not age.
    ///
    pub fn process_batch(&mut self, batch: &BatchRecords) -> BatchReports {
        for stream_id in batch.keys() {
            if !self.monitors.contains_key(stream_id) {
                debug!("New stream {}", stream_id);
                self.monitors
                    .insert(*stream_id, ComplianceMonitor::new(self.config.clone()));
            }
        }

        let monitors = &mut self.monitors;
        self.pool.install(|| {
            monitors
                .par_iter_mut()
                .filter_map(|(stream_id, monitor)| {
                    batch
                        .get(stream_id)
                        .map(|detections| (*stream_id, monitor.process(detections)))
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::PpeConfig;
    use crate::detection::{Detection, ObjectClass};
    use crate::pipeline::batch::{BatchRecords, MonitorPool};
    use crate::trackers::iou::TrackerOptions;
    use crate::utils::bbox::BoundingBox;

    fn person(x: f32) -> Detection {
        Detection::new(
            BoundingBox::new(x, 0.0, x + 50.0, 100.0),
            0.9,
            ObjectClass::Person,
        )
        .unwrap()
    }

    fn pool() -> MonitorPool {
        let config = PpeConfig {
            tracker: TrackerOptions::default().min_hits(1).max_age(1),
            ..Default::default()
        };
        MonitorPool::with_threads(config, 2).unwrap()
    }

    #[test]
    fn streams_are_independent() {
        let mut p = pool();
        let batch = BatchRecords::from([
            (1, vec![person(0.0)]),
            (2, vec![person(0.0), person(200.0)]),
        ]);
        let reports = p.process_batch(&batch);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[&1].persons.len(), 1);
        assert_eq!(reports[&2].persons.len(), 2);
        // ids are issued per stream
        assert_eq!(reports[&1].persons[0].id, 1);
        assert_eq!(reports[&2].persons[0].id, 1);
        assert_eq!(reports[&2].persons[1].id, 2);
        assert_eq!(p.streams(), vec![1, 2]);

        // stream 1 is idle for two batches while stream 2 keeps going
        let batch = BatchRecords::from([(2, vec![person(0.0), person(200.0)])]);
        for _ in 0..3 {
            let reports = p.process_batch(&batch);
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[&2].persons.len(), 2);
        }
        assert_eq!(p.monitor(1).unwrap().tracker().current_frame(), 1);
        assert_eq!(p.monitor(2).unwrap().tracker().current_frame(), 4);
        assert_eq!(p.monitor(1).unwrap().tracker().tracks().len(), 1);
    }

    #[test]
    fn empty_detections_age_the_stream() {
        let mut p = pool();
        p.process_batch(&BatchRecords::from([(5, vec![person(0.0)])]));
        let idle = BatchRecords::from([(5, Vec::new())]);
        assert_eq!(p.process_batch(&idle)[&5].persons.len(), 1);
        assert!(p.process_batch(&idle)[&5].persons.is_empty());
        assert!(p.remove_stream(5).is_some());
        assert!(p.streams().is_empty());
    }
}
