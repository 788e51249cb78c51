use crate::detection::ObjectClass;
use crate::utils::bbox::BoundingBox;

/// Voting engines selecting the track for every detection
///
pub mod voting;

/// Tracker implementation
pub mod tracker;

/// Default IoU threshold for merging a detection into a track, as in SORT
pub const DEFAULT_TRACK_IOU_THRESHOLD: f32 = 0.3;

/// Default number of consecutive matches that confirms a track
pub const DEFAULT_MIN_HITS: usize = 3;

/// Default number of frames a track survives without a match
pub const DEFAULT_MAX_AGE: usize = 30;

/// Track lifecycle state
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// Newly created, not yet matched `min_hits` times
    Tentative,
    /// Matched `min_hits` times; reported every frame until retired
    Confirmed,
    /// Retired after staying unmatched longer than `max_age` frames
    Dead,
}

/// How detections are assigned to tracks
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchingPolicy {
    /// Detections claim the best free track in their input order
    #[default]
    Greedy,
    /// Maximum-weight bipartite matching (Hungarian algorithm) over the IoU matrix
    Optimal,
}

/// Track kept by the tracker
///
#[derive(Debug, Clone)]
pub struct Track {
    /// id of the track, unique within the tracker
    ///
    pub id: u64,
    /// the box of the last matched detection
    ///
    pub bbox: BoundingBox,
    /// class of the detection that created the track
    ///
    pub class: ObjectClass,
    /// frames passed since the last successful match
    ///
    pub age: usize,
    /// successful matches, capped at `min_hits`
    ///
    pub hit_streak: usize,
    /// total number of matched detections, including the one that created the track
    ///
    pub length: usize,
    pub state: TrackState,
}

impl Track {
    fn new(id: u64, bbox: BoundingBox, class: ObjectClass, min_hits: usize) -> Self {
        let mut track = Self {
            id,
            bbox,
            class,
            age: 0,
            hit_streak: 1,
            length: 1,
            state: TrackState::Tentative,
        };
        track.confirm_if_ready(min_hits);
        track
    }

    fn observe(&mut self, bbox: &BoundingBox, min_hits: usize) {
        self.bbox = *bbox;
        self.age = 0;
        self.length += 1;
        self.hit_streak = (self.hit_streak + 1).min(min_hits);
        self.confirm_if_ready(min_hits);
    }

    fn confirm_if_ready(&mut self, min_hits: usize) {
        if self.state == TrackState::Tentative && self.hit_streak >= min_hits {
            self.state = TrackState::Confirmed;
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == TrackState::Confirmed
    }
}

/// Online track structure returned by the tracker for the current frame
///
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedObject {
    pub id: u64,
    pub bbox: BoundingBox,
    pub class: ObjectClass,
}

impl From<&Track> for TrackedObject {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id,
            bbox: track.bbox,
            class: track.class.clone(),
        }
    }
}

/// Class that is used to configure the tracker
///
#[derive(Debug, Clone)]
pub struct TrackerOptions {
    iou_threshold: f32,
    min_hits: usize,
    max_age: usize,
    matching: MatchingPolicy,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            iou_threshold: DEFAULT_TRACK_IOU_THRESHOLD,
            min_hits: DEFAULT_MIN_HITS,
            max_age: DEFAULT_MAX_AGE,
            matching: MatchingPolicy::default(),
        }
    }
}

impl TrackerOptions {
    /// The minimal IoU between a detection and a track's last box required to merge them.
    ///
    pub fn iou_threshold(mut self, threshold: f32) -> Self {
        assert!(
            (0.0..=1.0).contains(&threshold),
            "Threshold must lay between (0.0 and 1.0)"
        );
        self.iou_threshold = threshold;
        self
    }

    /// The number of matches after which the track is confirmed and reported.
    ///
    pub fn min_hits(mut self, n: usize) -> Self {
        assert!(n > 0, "Min hits must be a positive number");
        self.min_hits = n;
        self
    }

    /// The number of frames the track remains alive without matches.
    ///
    /// Lets the frame rate is `30`, setting `max_age` to `30` keeps a track for one second after
    /// the object was seen last time. The track is retired on the frame its age becomes
    /// greater than `max_age`.
    ///
    pub fn max_age(mut self, n: usize) -> Self {
        self.max_age = n;
        self
    }

    pub fn matching(mut self, policy: MatchingPolicy) -> Self {
        self.matching = policy;
        self
    }

    pub fn get_iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    pub fn get_min_hits(&self) -> usize {
        self.min_hits
    }

    pub fn get_max_age(&self) -> usize {
        self.max_age
    }

    pub fn get_matching(&self) -> MatchingPolicy {
        self.matching
    }
}
