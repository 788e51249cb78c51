pub use crate::association::{
    AssociatorOptions, HelmetStatus, PersonPpeStatus, PpeAssociator, PpeStatusMap, VestStatus,
};
pub use crate::compliance::{
    ComplianceChecker, CompliancePolicy, ComplianceReport, Severity, ViolationReason,
    ViolationRecord,
};
pub use crate::config::PpeConfig;
pub use crate::detection::{sanitize_detections, Detection, ObjectClass, RawDetection};
pub use crate::pipeline::batch::{BatchRecords, BatchReports, MonitorPool};
pub use crate::pipeline::{ComplianceMonitor, Detector, FrameReport, Renderer};
pub use crate::trackers::iou::tracker::IoUTracker;
pub use crate::trackers::iou::{MatchingPolicy, TrackState, TrackedObject, TrackerOptions};
pub use crate::utils::bbox::{iou, BoundingBox};
pub use crate::EstimateClose;
