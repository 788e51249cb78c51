use anyhow::Result;
use ppe_compliance::examples::WorkerGen;
use ppe_compliance::prelude::*;
use std::path::Path;

/// Stands in for a neural network: every "frame" is just its index, the detections come
/// from the synthetic workers.
struct SyntheticDetector {
    workers: Vec<WorkerGen>,
}

impl Detector<usize> for SyntheticDetector {
    fn detect(&mut self, _frame: &usize) -> Result<Vec<RawDetection>> {
        Ok(self
            .workers
            .iter_mut()
            .flat_map(|w| w.next().unwrap_or_default())
            .map(|d| RawDetection::new(d.bbox().as_array(), d.confidence(), d.class().as_str()))
            .collect())
    }
}

struct ConsoleRenderer;

impl Renderer<usize> for ConsoleRenderer {
    fn render(&mut self, _frame: usize, report: &FrameReport) -> Result<()> {
        for p in &report.persons {
            let status = &report.status[&p.id];
            let verdict = match report.compliance.get(p.id) {
                Some(v) => v
                    .reasons
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                None => "OK".to_string(),
            };
            println!(
                "frame {:>3} person {:>2} {:?} helmet={} vest={} -> {}",
                report.frame,
                p.id,
                p.bbox.as_array(),
                status.helmet,
                status.vest,
                verdict
            );
        }
        Ok(())
    }
}

fn workers() -> Vec<WorkerGen> {
    vec![
        WorkerGen::new(100.0, 100.0, 80.0, 200.0, 1.0),
        WorkerGen::new(400.0, 120.0, 80.0, 200.0, 1.0)
            .helmet(Some(false)),
        WorkerGen::new(700.0, 90.0, 80.0, 200.0, 1.0).vest(None),
    ]
}

fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => PpeConfig::load(Path::new(&path))?,
        None => PpeConfig::default(),
    };

    let mut monitor = ComplianceMonitor::new(config.clone());
    let mut detector = SyntheticDetector { workers: workers() };
    let processed = monitor.run(0..10, &mut detector, &mut ConsoleRenderer)?;
    println!("Single stream: {} frames processed", processed);

    let mut pool = MonitorPool::new(config)?;
    let mut streams = (0..4u64).map(|s| (s, workers())).collect::<Vec<_>>();
    for _ in 0..10 {
        let batch = streams
            .iter_mut()
            .map(|(s, w)| {
                let detections = w.iter_mut().flat_map(|g| g.next().unwrap_or_default());
                (*s, detections.collect())
            })
            .collect::<BatchRecords>();
        let reports = pool.process_batch(&batch);
        for s in pool.streams() {
            if let Some(r) = reports.get(&s) {
                println!(
                    "stream {} frame {:>3}: {} of {} persons violate the policy",
                    s,
                    r.frame,
                    r.compliance.violating_persons(),
                    r.persons.len()
                );
            }
        }
    }
    Ok(())
}
