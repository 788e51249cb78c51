use crate::detection::{Detection, ObjectClass};
use crate::utils::bbox::BoundingBox;
use rand::distributions::Uniform;
use rand::prelude::ThreadRng;
use rand::Rng;

/// Synthetic worker walking around the scene, with the detections a PPE detector would
/// produce for them.
///
/// The worker keeps a velocity that is damped and jittered every frame, so the person box moves
/// smoothly instead of jumping. `Some(true)` emits the item (`helmet`, `vest`), `Some(false)`
/// emits the negative class (`no-helmet`, `no-vest`) and `None` emits nothing, so the status
/// stays unresolved.
///
pub struct WorkerGen {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    width: f32,
    height: f32,
    gen: ThreadRng,
    jitter: Uniform<f32>,
    helmet: Option<bool>,
    vest: Option<bool>,
}

const VELOCITY_DAMPING: f32 = 0.9;

impl WorkerGen {
    /// Creates the worker
    ///
    /// # Parameters
    /// * `x`, `y` - top-left corner of the person box
    /// * `width`, `height` - person box size, kept for the whole walk
    /// * `pos_drift` - max velocity change per frame
    ///
    pub fn new(x: f32, y: f32, width: f32, height: f32, pos_drift: f32) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            width: width.max(1.0),
            height: height.max(1.0),
            gen: rand::thread_rng(),
            jitter: Uniform::new_inclusive(-pos_drift, pos_drift),
            helmet: Some(true),
            vest: Some(true),
        }
    }

    pub fn helmet(mut self, v: Option<bool>) -> Self {
        self.helmet = v;
        self
    }

    pub fn vest(mut self, v: Option<bool>) -> Self {
        self.vest = v;
        self
    }

    fn step(&mut self) -> BoundingBox {
        self.vx = self.vx * VELOCITY_DAMPING + self.gen.sample(self.jitter);
        self.vy = self.vy * VELOCITY_DAMPING + self.gen.sample(self.jitter);
        self.x += self.vx;
        self.y += self.vy;
        BoundingBox::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

fn relative(p: &BoundingBox, x1: f32, y1: f32, x2: f32, y2: f32) -> BoundingBox {
    let (w, h) = (p.width(), p.height());
    BoundingBox::new(
        p.x1() + w * x1,
        p.y1() + h * y1,
        p.x1() + w * x2,
        p.y1() + h * y2,
    )
}

impl Iterator for WorkerGen {
    type Item = Vec<Detection>;

    fn next(&mut self) -> Option<Self::Item> {
        let p = self.step();
        let mut boxes = vec![(p, ObjectClass::Person)];

        if let Some(wears) = self.helmet {
            boxes.push(if wears {
                (relative(&p, 0.2, -0.05, 0.8, 0.2), ObjectClass::Helmet)
            } else {
                (relative(&p, 0.0, 0.0, 1.0, 0.33), ObjectClass::NoHelmet)
            });
        }
        if let Some(wears) = self.vest {
            let torso = relative(&p, 0.05, 0.15, 0.95, 0.75);
            boxes.push(if wears {
                (torso, ObjectClass::Vest)
            } else {
                (torso, ObjectClass::NoVest)
            });
        }

        Some(
            boxes
                .into_iter()
                .filter_map(|(bbox, class)| Detection::new(bbox, 0.9, class).ok())
                .collect(),
        )
    }
}
