use crate::association::{PpeAssociator, PpeStatusMap};
use crate::compliance::{ComplianceChecker, ComplianceReport};
use crate::config::PpeConfig;
use crate::detection::{sanitize_detections, Detection, ObjectClass, RawDetection};
use crate::trackers::iou::tracker::IoUTracker;
use crate::trackers::iou::TrackedObject;
use anyhow::{Context, Result};
use log::debug;

/// Multi-stream processing on a thread pool
pub mod batch;

/// Object detector producing raw records for a frame.
///
/// An empty result is a normal frame. Errors are returned to the caller of
/// [`ComplianceMonitor::run`] as-is.
///
pub trait Detector<F> {
    fn detect(&mut self, frame: &F) -> Result<Vec<RawDetection>>;
}

/// Consumer of the processed frames, e.g. a box painter followed by a video writer.
///
pub trait Renderer<F> {
    fn render(&mut self, frame: F, report: &FrameReport) -> Result<()>;
}

/// Everything computed for one frame
///
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    /// 1-based index of the frame within the stream
    pub frame: usize,
    /// all confirmed tracks of the frame
    pub objects: Vec<TrackedObject>,
    /// confirmed person tracks
    pub persons: Vec<TrackedObject>,
    pub status: PpeStatusMap,
    pub compliance: ComplianceReport,
}

/// Tracking, association and compliance evaluation for a single video stream.
///
/// Frames must be passed in their arrival order; the monitor is not meant to be shared
/// between streams.
///
#[derive(Debug, Default)]
pub struct ComplianceMonitor {
    min_confidence: f32,
    tracker: IoUTracker,
    associator: PpeAssociator,
    checker: ComplianceChecker,
}

impl ComplianceMonitor {
    pub fn new(config: PpeConfig) -> Self {
        Self {
            min_confidence: config.min_confidence,
            tracker: IoUTracker::new(config.tracker),
            associator: PpeAssociator::new(config.association),
            checker: ComplianceChecker::new(config.policy),
        }
    }

    pub fn tracker(&self) -> &IoUTracker {
        &self.tracker
    }

    /// Processes validated detections of the next frame.
    ///
    /// Detections below the configured minimal confidence are dropped before tracking.
    ///
    pub fn process(&mut self, detections: &[Detection]) -> FrameReport {
        let confident = detections
            .iter()
            .filter(|d| d.confidence() >= self.min_confidence)
            .cloned()
            .collect::<Vec<_>>();
        if confident.len() < detections.len() {
            debug!(
                "Frame {}: {} detections below confidence {} dropped",
                self.tracker.current_frame() + 1,
                detections.len() - confident.len(),
                self.min_confidence
            );
        }

        let objects = self.tracker.update(&confident);
        let frame = self.tracker.current_frame();
        for t in self.tracker.wasted() {
            debug!(
                "Frame {}: {} track {} is gone (length {})",
                frame, t.class, t.id, t.length
            );
        }

        let persons = objects
            .iter()
            .filter(|o| o.class == ObjectClass::Person)
            .cloned()
            .collect::<Vec<_>>();
        let status = self.associator.associate(&persons, &objects);
        let compliance = self.checker.check(&status);

        FrameReport {
            frame,
            objects,
            persons,
            status,
            compliance,
        }
    }

    /// Processes detector records of the next frame, malformed records are skipped
    ///
    pub fn process_raw<I>(&mut self, raw: I) -> FrameReport
    where
        I: IntoIterator<Item = RawDetection>,
    {
        let detections = sanitize_detections(raw);
        self.process(&detections)
    }

    /// Drives the whole stream: detection, processing and rendering of every frame.
    ///
    /// Frames without detections still go through the tracker so the tracks keep aging.
    /// Returns the number of processed frames.
    ///
    pub fn run<F, I, D, R>(
        &mut self,
        frames: I,
        detector: &mut D,
        renderer: &mut R,
    ) -> Result<usize>
    where
        I: IntoIterator<Item = F>,
        D: Detector<F>,
        R: Renderer<F>,
    {
        let mut processed = 0;
        for frame in frames {
            let raw = detector
                .detect(&frame)
                .with_context(|| format!("Detector failed on frame {}", processed + 1))?;
            let report = self.process_raw(raw);
            renderer
                .render(frame, &report)
                .with_context(|| format!("Renderer failed on frame {}", report.frame))?;
            processed += 1;
        }
        debug!("Stream finished after {} frames", processed);
        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use crate::association::{HelmetStatus, VestStatus};
    use crate::compliance::ViolationReason;
    use crate::config::PpeConfig;
    use crate::detection::RawDetection;
    use crate::pipeline::{ComplianceMonitor, Detector, FrameReport, Renderer};
    use crate::trackers::iou::TrackerOptions;
    use anyhow::{bail, Result};

    fn config() -> PpeConfig {
        PpeConfig {
            tracker: TrackerOptions::default().min_hits(2).max_age(2),
            ..Default::default()
        }
    }

    fn worker(helmet: bool) -> Vec<RawDetection> {
        let mut frame = vec![
            RawDetection::new([0.0, 0.0, 100.0, 200.0], 0.9, "person"),
            RawDetection::new([5.0, 30.0, 95.0, 150.0], 0.8, "vest"),
        ];
        if helmet {
            frame.push(RawDetection::new([10.0, -10.0, 90.0, 30.0], 0.8, "helmet"));
        } else {
            frame.push(RawDetection::new([0.0, 0.0, 100.0, 70.0], 0.8, "no-helmet"));
        }
        frame
    }

    #[test]
    fn confirmed_worker_with_ppe() {
        let mut m = ComplianceMonitor::new(config());
        let r = m.process_raw(worker(true));
        assert_eq!(r.frame, 1);
        assert!(r.objects.is_empty());
        assert!(r.status.is_empty());

        let r = m.process_raw(worker(true));
        assert_eq!(r.frame, 2);
        assert_eq!(r.objects.len(), 3);
        assert_eq!(r.persons.len(), 1);
        let person = r.persons[0].id;
        assert_eq!(r.status[&person].helmet, HelmetStatus::Helmet);
        assert_eq!(r.status[&person].vest, VestStatus::Vest);
        assert!(r.compliance.is_compliant());
    }

    #[test]
    fn missing_helmet_reported() {
        let mut m = ComplianceMonitor::new(config());
        m.process_raw(worker(false));
        let r = m.process_raw(worker(false));
        let person = r.persons[0].id;
        assert_eq!(
            r.compliance.get(person).unwrap().reasons,
            vec![ViolationReason::MissingHelmet]
        );
    }

    #[test]
    fn empty_frames_keep_tracks_aging() {
        let mut m = ComplianceMonitor::new(config());
        m.process_raw(worker(true));
        m.process_raw(worker(true));
        assert_eq!(m.process_raw(Vec::new()).persons.len(), 1);
        assert_eq!(m.process_raw(Vec::new()).persons.len(), 1);
        let r = m.process_raw(Vec::new());
        assert!(r.persons.is_empty());
        assert!(r.objects.is_empty());
        assert!(m.tracker().tracks().is_empty());
    }

    #[test]
    fn malformed_records_are_skipped() {
        let mut m = ComplianceMonitor::new(config());
        let mut frame = worker(true);
        frame.push(RawDetection::new([f32::NAN, 0.0, 1.0, 1.0], 0.9, "person"));
        frame.push(RawDetection::default());
        m.process_raw(frame.clone());
        let r = m.process_raw(frame);
        assert_eq!(r.objects.len(), 3);
    }

    #[test]
    fn low_confidence_detections_are_dropped() {
        let mut m = ComplianceMonitor::new(PpeConfig {
            min_confidence: 0.5,
            ..config()
        });
        let frame = || {
            let mut f = worker(true);
            f.push(RawDetection::new([300.0, 0.0, 400.0, 200.0], 0.3, "person"));
            f
        };
        m.process_raw(frame());
        let r = m.process_raw(frame());
        assert_eq!(r.objects.len(), 3);
        assert_eq!(r.persons.len(), 1);
        assert_eq!(m.tracker().tracks().len(), 3);
    }

    struct ScriptedDetector {
        frames: Vec<Vec<RawDetection>>,
        fail_at: Option<usize>,
    }

    impl Detector<usize> for ScriptedDetector {
        fn detect(&mut self, frame: &usize) -> Result<Vec<RawDetection>> {
            if Some(*frame) == self.fail_at {
                bail!("camera is gone");
            }
            Ok(self.frames.get(*frame).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct CollectingRenderer {
        reports: Vec<(usize, FrameReport)>,
    }

    impl Renderer<usize> for CollectingRenderer {
        fn render(&mut self, frame: usize, report: &FrameReport) -> Result<()> {
            self.reports.push((frame, report.clone()));
            Ok(())
        }
    }

    #[test]
    fn run_stream() {
        let mut detector = ScriptedDetector {
            frames: vec![worker(false), Vec::new(), worker(false), worker(false)],
            fail_at: None,
        };
        let mut renderer = CollectingRenderer::default();
        let mut m = ComplianceMonitor::new(config());
        let processed = m.run(0..4, &mut detector, &mut renderer).unwrap();
        assert_eq!(processed, 4);
        assert_eq!(renderer.reports.len(), 4);
        assert_eq!(renderer.reports[3].0, 3);
        let last = &renderer.reports[3].1;
        assert_eq!(last.frame, 4);
        assert_eq!(last.compliance.violating_persons(), 1);
    }

    #[test]
    fn detector_failure_stops_the_stream() {
        let mut detector = ScriptedDetector {
            frames: vec![worker(true); 5],
            fail_at: Some(2),
        };
        let mut renderer = CollectingRenderer::default();
        let mut m = ComplianceMonitor::new(config());
        let err = m.run(0..5, &mut detector, &mut renderer).unwrap_err();
        assert!(err.to_string().contains("frame 3"));
        assert_eq!(renderer.reports.len(), 2);
    }
}
