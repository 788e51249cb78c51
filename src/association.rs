use crate::detection::ObjectClass;
use crate::trackers::iou::TrackedObject;
use crate::utils::bbox::{iou, BoundingBox};
use log::debug;
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_IOU_THRESHOLD_PERSON_PPE: f32 = 0.1;
pub const DEFAULT_HELMET_Y_OFFSET_FACTOR: f32 = 0.1;
pub const DEFAULT_VEST_OVERLAP_FACTOR: f32 = 0.4;
pub const DEFAULT_NO_HELMET_MIN_IOU: f32 = 0.3;
pub const DEFAULT_HEAD_BAND_FACTOR: f32 = 0.35;
pub const DEFAULT_NO_VEST_MIN_IOU: f32 = 0.4;
pub const DEFAULT_TORSO_BAND_FACTOR: f32 = 0.2;
pub const DEFAULT_VEST_BAND_FACTOR: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HelmetStatus {
    Helmet,
    NoHelmet,
    #[default]
    Unknown,
}

impl fmt::Display for HelmetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HelmetStatus::Helmet => "helmet",
            HelmetStatus::NoHelmet => "no-helmet",
            HelmetStatus::Unknown => "unknown",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VestStatus {
    Vest,
    NoVest,
    #[default]
    Unknown,
}

impl fmt::Display for VestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VestStatus::Vest => "vest",
            VestStatus::NoVest => "no-vest",
            VestStatus::Unknown => "unknown",
        })
    }
}

/// PPE state of a single person for the current frame
///
#[derive(Debug, Clone, PartialEq)]
pub struct PersonPpeStatus {
    pub helmet: HelmetStatus,
    pub vest: VestStatus,
    /// box of the person track
    pub bbox: BoundingBox,
    /// track which decided the helmet status (`helmet` or `no-helmet` object)
    pub helmet_track: Option<u64>,
    /// track which decided the vest status (`vest` or `no-vest` object)
    pub vest_track: Option<u64>,
}

impl PersonPpeStatus {
    pub fn unknown(bbox: BoundingBox) -> Self {
        Self {
            helmet: HelmetStatus::Unknown,
            vest: VestStatus::Unknown,
            bbox,
            helmet_track: None,
            vest_track: None,
        }
    }
}

/// Per-person PPE state, keyed by the person track id
pub type PpeStatusMap = BTreeMap<u64, PersonPpeStatus>;

/// Geometric settings of the associator.
///
/// The bands describe where a PPE item is expected relative to the person box, as a fraction
/// of the person height. They depend on the camera angle and are meant to be retuned per
/// deployment.
///
#[derive(Debug, Clone)]
pub struct AssociatorOptions {
    iou_threshold_person_ppe: f32,
    helmet_y_offset_factor: f32,
    vest_overlap_factor: f32,
    no_helmet_min_iou: f32,
    head_band_factor: f32,
    no_vest_min_iou: f32,
    torso_band_factor: f32,
    vest_band_factor: f32,
}

impl Default for AssociatorOptions {
    fn default() -> Self {
        Self {
            iou_threshold_person_ppe: DEFAULT_IOU_THRESHOLD_PERSON_PPE,
            helmet_y_offset_factor: DEFAULT_HELMET_Y_OFFSET_FACTOR,
            vest_overlap_factor: DEFAULT_VEST_OVERLAP_FACTOR,
            no_helmet_min_iou: DEFAULT_NO_HELMET_MIN_IOU,
            head_band_factor: DEFAULT_HEAD_BAND_FACTOR,
            no_vest_min_iou: DEFAULT_NO_VEST_MIN_IOU,
            torso_band_factor: DEFAULT_TORSO_BAND_FACTOR,
            vest_band_factor: DEFAULT_VEST_BAND_FACTOR,
        }
    }
}

impl AssociatorOptions {
    /// IoU between the person and a `helmet` box that must be exceeded.
    ///
    pub fn iou_threshold_person_ppe(mut self, v: f32) -> Self {
        self.iou_threshold_person_ppe = v;
        self
    }

    /// The helmet center must lay within `[y1 - h * f, y1 + 2 * h * f]` of the person box.
    ///
    pub fn helmet_y_offset_factor(mut self, v: f32) -> Self {
        self.helmet_y_offset_factor = v;
        self
    }

    /// IoU between the person and a `vest` box that must be exceeded.
    ///
    pub fn vest_overlap_factor(mut self, v: f32) -> Self {
        self.vest_overlap_factor = v;
        self
    }

    /// IoU between the person and a `no-helmet` box that must be exceeded.
    ///
    pub fn no_helmet_min_iou(mut self, v: f32) -> Self {
        self.no_helmet_min_iou = v;
        self
    }

    /// Top part of the person box where a `no-helmet` center is accepted.
    ///
    pub fn head_band_factor(mut self, v: f32) -> Self {
        self.head_band_factor = v;
        self
    }

    /// IoU between the person and a `no-vest` box that must be exceeded.
    ///
    pub fn no_vest_min_iou(mut self, v: f32) -> Self {
        self.no_vest_min_iou = v;
        self
    }

    /// Margin cut from the top and the bottom of the person box where a `no-vest` center is
    /// not accepted.
    ///
    pub fn torso_band_factor(mut self, v: f32) -> Self {
        self.torso_band_factor = v;
        self
    }

    /// Margin cut from the top and the bottom of the person box where a `vest` center is not
    /// accepted.
    ///
    pub fn vest_band_factor(mut self, v: f32) -> Self {
        self.vest_band_factor = v;
        self
    }

    pub fn get_iou_threshold_person_ppe(&self) -> f32 {
        self.iou_threshold_person_ppe
    }

    pub fn get_helmet_y_offset_factor(&self) -> f32 {
        self.helmet_y_offset_factor
    }

    pub fn get_vest_overlap_factor(&self) -> f32 {
        self.vest_overlap_factor
    }

    pub fn get_no_helmet_min_iou(&self) -> f32 {
        self.no_helmet_min_iou
    }

    pub fn get_head_band_factor(&self) -> f32 {
        self.head_band_factor
    }

    pub fn get_no_vest_min_iou(&self) -> f32 {
        self.no_vest_min_iou
    }

    pub fn get_torso_band_factor(&self) -> f32 {
        self.torso_band_factor
    }

    pub fn get_vest_band_factor(&self) -> f32 {
        self.vest_band_factor
    }
}

#[derive(Default)]
struct PpeCandidates<'a> {
    helmets: Vec<&'a TrackedObject>,
    no_helmets: Vec<&'a TrackedObject>,
    vests: Vec<&'a TrackedObject>,
    no_vests: Vec<&'a TrackedObject>,
}

impl<'a> PpeCandidates<'a> {
    fn partition<I>(objects: I) -> Self
    where
        I: IntoIterator<Item = &'a TrackedObject>,
    {
        let mut candidates = Self::default();
        for o in objects {
            match o.class {
                ObjectClass::Helmet => candidates.helmets.push(o),
                ObjectClass::NoHelmet => candidates.no_helmets.push(o),
                ObjectClass::Vest => candidates.vests.push(o),
                ObjectClass::NoVest => candidates.no_vests.push(o),
                ObjectClass::Person | ObjectClass::Other(_) => {}
            }
        }
        candidates
    }
}

fn strictly_within(v: f32, low: f32, high: f32) -> bool {
    low < v && v < high
}

/// Links tracked PPE objects to tracked persons by their relative geometry.
///
/// Every person is evaluated independently, so a single PPE object may be credited to several
/// overlapping persons.
///
#[derive(Debug, Clone, Default)]
pub struct PpeAssociator {
    opts: AssociatorOptions,
}

impl PpeAssociator {
    pub fn new(opts: AssociatorOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &AssociatorOptions {
        &self.opts
    }

    /// Computes PPE status for every person.
    ///
    /// # Parameters
    /// * `persons` - confirmed person tracks
    /// * `objects` - all confirmed tracks of the frame, only PPE classes are considered
    ///
    pub fn associate(&self, persons: &[TrackedObject], objects: &[TrackedObject]) -> PpeStatusMap {
        let candidates = PpeCandidates::partition(objects);
        persons
            .iter()
            .map(|p| {
                let mut status = PersonPpeStatus::unknown(p.bbox);
                (status.helmet, status.helmet_track) = self.helmet(&p.bbox, &candidates);
                (status.vest, status.vest_track) = self.vest(&p.bbox, &candidates);
                debug!(
                    "Person {}: helmet={} ({:?}), vest={} ({:?})",
                    p.id, status.helmet, status.helmet_track, status.vest, status.vest_track
                );
                (p.id, status)
            })
            .collect()
    }

    fn helmet(
        &self,
        person: &BoundingBox,
        candidates: &PpeCandidates<'_>,
    ) -> (HelmetStatus, Option<u64>) {
        let h = person.height();
        let y1 = person.y1();

        // direct negative evidence outranks a detected helmet
        let no_helmet = candidates.no_helmets.iter().find(|c| {
            let (_, cy) = c.bbox.center();
            iou(person, &c.bbox) > self.opts.no_helmet_min_iou
                && strictly_within(cy, y1, y1 + h * self.opts.head_band_factor)
        });
        if let Some(c) = no_helmet {
            return (HelmetStatus::NoHelmet, Some(c.id));
        }

        let offset = h * self.opts.helmet_y_offset_factor;
        let best = best_by_iou(person, &candidates.helmets, |c, overlap| {
            let (cx, cy) = c.bbox.center();
            overlap > self.opts.iou_threshold_person_ppe
                && strictly_within(cy, y1 - offset, y1 + 2.0 * offset)
                && strictly_within(cx, person.x1(), person.x2())
        });
        match best {
            Some(id) => (HelmetStatus::Helmet, Some(id)),
            None => (HelmetStatus::Unknown, None),
        }
    }

    fn vest(
        &self,
        person: &BoundingBox,
        candidates: &PpeCandidates<'_>,
    ) -> (VestStatus, Option<u64>) {
        let h = person.height();
        let (y1, y2) = (person.y1(), person.y2());

        let torso = h * self.opts.torso_band_factor;
        let no_vest = candidates.no_vests.iter().find(|c| {
            let (_, cy) = c.bbox.center();
            iou(person, &c.bbox) > self.opts.no_vest_min_iou
                && strictly_within(cy, y1 + torso, y2 - torso)
        });
        if let Some(c) = no_vest {
            return (VestStatus::NoVest, Some(c.id));
        }

        let margin = h * self.opts.vest_band_factor;
        let best = best_by_iou(person, &candidates.vests, |c, overlap| {
            let (cx, cy) = c.bbox.center();
            overlap > self.opts.vest_overlap_factor
                && strictly_within(cx, person.x1(), person.x2())
                && strictly_within(cy, y1 + margin, y2 - margin)
        });
        match best {
            Some(id) => (VestStatus::Vest, Some(id)),
            None => (VestStatus::Unknown, None),
        }
    }
}

/// Id of the qualifying candidate with the largest IoU against the person, the earliest wins a tie
///
fn best_by_iou<F>(person: &BoundingBox, candidates: &[&TrackedObject], qualifies: F) -> Option<u64>
where
    F: Fn(&TrackedObject, f32) -> bool,
{
    candidates
        .iter()
        .map(|c| (c, iou(person, &c.bbox)))
        .filter(|(c, overlap)| qualifies(c, *overlap))
        .fold(None, |best: Option<(u64, f32)>, (c, overlap)| match best {
            Some((_, best_overlap)) if best_overlap >= overlap => best,
            _ => Some((c.id, overlap)),
        })
        .map(|(id, _)| id)
}
