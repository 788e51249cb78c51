use crate::detection::Detection;
use crate::trackers::iou::voting::{GreedyVoting, OptimalVoting, Voting};
use crate::trackers::iou::{MatchingPolicy, Track, TrackState, TrackedObject, TrackerOptions};
use crate::utils::bbox::iou;
use log::debug;

/// Easy to use IoU tracker implementation.
///
/// One instance serves exactly one video stream: frames must be passed to [`IoUTracker::update`]
/// in their arrival order. Tracks do not predict motion, an unmatched track keeps the box of its
/// last matched detection until it is retired.
///
#[derive(Debug)]
pub struct IoUTracker {
    opts: TrackerOptions,
    tracks: Vec<Track>,
    wasted: Vec<Track>,
    last_track_id: u64,
    frame: usize,
}

impl Default for IoUTracker {
    fn default() -> Self {
        Self::new(TrackerOptions::default())
    }
}

impl IoUTracker {
    /// Creates new tracker
    ///
    /// # Parameters
    /// * `opts` - IoU threshold, confirmation and retirement settings, voting policy
    ///
    pub fn new(opts: TrackerOptions) -> Self {
        Self {
            opts,
            tracks: Vec::default(),
            wasted: Vec::default(),
            last_track_id: 0,
            frame: 0,
        }
    }

    pub fn options(&self) -> &TrackerOptions {
        &self.opts
    }

    /// Number of frames passed to the tracker
    ///
    pub fn current_frame(&self) -> usize {
        self.frame
    }

    /// Alive tracks (tentative and confirmed) in the creation order
    ///
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Alive track by id
    ///
    pub fn track(&self, id: u64) -> Option<&Track> {
        self.tracks
            .binary_search_by_key(&id, |t| t.id)
            .ok()
            .map(|index| &self.tracks[index])
    }

    /// Receive all the tracks retired since the previous call.
    ///
    /// Retired tracks are buffered until this call; a long-running caller must drain them
    /// regularly (the stream monitor does it every frame).
    ///
    pub fn wasted(&mut self) -> Vec<Track> {
        std::mem::take(&mut self.wasted)
    }

    fn voting(&self) -> Box<dyn Voting> {
        match self.opts.get_matching() {
            MatchingPolicy::Greedy => Box::new(GreedyVoting::new(self.opts.get_iou_threshold())),
            MatchingPolicy::Optimal => {
                Box::new(OptimalVoting::new(self.opts.get_iou_threshold()))
            }
        }
    }

    /// Receive tracking information for the detections of the next frame.
    ///
    /// Returns confirmed tracks in the creation order. An empty slice is a normal frame: the
    /// tracks are aged and the confirmed survivors are returned. Tracks retired by the call go
    /// to the buffer drained with [`IoUTracker::wasted`].
    ///
    /// # Parameters
    /// * `detections` - detections received from a detector for the frame
    ///
    pub fn update(&mut self, detections: &[Detection]) -> Vec<TrackedObject> {
        self.frame += 1;
        let min_hits = self.opts.get_min_hits();
        let max_age = self.opts.get_max_age();

        let distances = detections
            .iter()
            .map(|d| {
                self.tracks
                    .iter()
                    .map(|t| iou(d.bbox(), &t.bbox))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let existing = self.tracks.len();
        let winners = self.voting().winners(&distances, existing);
        let mut matched = vec![false; existing];

        for (detection, winner) in detections.iter().zip(winners) {
            match winner {
                Some(index) => {
                    matched[index] = true;
                    let track = &mut self.tracks[index];
                    track.observe(detection.bbox(), min_hits);
                    debug!(
                        "Frame {}: detection {:?} merged into track {}",
                        self.frame,
                        detection.bbox(),
                        track.id
                    );
                }
                None => {
                    self.last_track_id += 1;
                    let track = Track::new(
                        self.last_track_id,
                        *detection.bbox(),
                        detection.class().clone(),
                        min_hits,
                    );
                    debug!(
                        "Frame {}: new {} track {}",
                        self.frame, track.class, track.id
                    );
                    self.tracks.push(track);
                }
            }
        }

        for (track, _) in self
            .tracks
            .iter_mut()
            .zip(matched)
            .filter(|(_, matched)| !matched)
        {
            track.age += 1;
        }

        let (alive, dead): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tracks)
            .into_iter()
            .partition(|t| t.age <= max_age);
        self.tracks = alive;
        for mut track in dead {
            debug!(
                "Frame {}: track {} retired after {} idle frames",
                self.frame, track.id, track.age
            );
            track.state = TrackState::Dead;
            self.wasted.push(track);
        }

        self.tracks
            .iter()
            .filter(|t| t.is_confirmed())
            .map(TrackedObject::from)
            .collect()
    }
}
