use crate::utils::bbox::BoundingBox;
use crate::Errors;
use log::warn;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Object classes produced by the detector.
///
/// The association logic interprets only the five named classes; everything else is
/// carried through the tracker as [`ObjectClass::Other`].
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    Person,
    Helmet,
    NoHelmet,
    Vest,
    NoVest,
    Other(String),
}

impl ObjectClass {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectClass::Person => "person",
            ObjectClass::Helmet => "helmet",
            ObjectClass::NoHelmet => "no-helmet",
            ObjectClass::Vest => "vest",
            ObjectClass::NoVest => "no-vest",
            ObjectClass::Other(label) => label,
        }
    }
}

impl FromStr for ObjectClass {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "person" => ObjectClass::Person,
            "helmet" => ObjectClass::Helmet,
            "no-helmet" => ObjectClass::NoHelmet,
            "vest" => ObjectClass::Vest,
            "no-vest" => ObjectClass::NoVest,
            other => ObjectClass::Other(other.to_string()),
        })
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated detection. Instances can only be built with [`Detection::new`] or from a
/// [`RawDetection`], so the box is always finite and non-inverted.
///
#[derive(Debug, Clone)]
pub struct Detection {
    bbox: BoundingBox,
    confidence: f32,
    class: ObjectClass,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f32, class: ObjectClass) -> Result<Self, Errors> {
        bbox.validate()?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Errors::ConfidenceOutOfRange(confidence));
        }
        Ok(Self {
            bbox,
            confidence,
            class,
        })
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn class(&self) -> &ObjectClass {
        &self.class
    }
}

/// Detector record as it arrives from an external detector, every field may be absent.
///
#[derive(Debug, Clone, Default)]
pub struct RawDetection {
    pub bbox: Option<[f32; 4]>,
    pub confidence: Option<f32>,
    pub class: Option<String>,
}

impl RawDetection {
    pub fn new(bbox: [f32; 4], confidence: f32, class: &str) -> Self {
        Self {
            bbox: Some(bbox),
            confidence: Some(confidence),
            class: Some(class.to_string()),
        }
    }
}

impl TryFrom<RawDetection> for Detection {
    type Error = Errors;

    fn try_from(raw: RawDetection) -> Result<Self, Self::Error> {
        let bbox = raw.bbox.ok_or(Errors::MissingField("bbox"))?;
        let confidence = raw.confidence.ok_or(Errors::MissingField("confidence"))?;
        let class = raw.class.ok_or(Errors::MissingField("class"))?;
        let class = class.parse::<ObjectClass>().unwrap_or_else(|e| match e {});
        Detection::new(BoundingBox::from(bbox), confidence, class)
    }
}

/// Converts detector records to detections, skipping the malformed ones.
///
/// The order of the well-formed records is kept. Every skipped record is reported with `warn!`.
///
pub fn sanitize_detections<I>(raw: I) -> Vec<Detection>
where
    I: IntoIterator<Item = RawDetection>,
{
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, r)| match Detection::try_from(r) {
            Ok(d) => Some(d),
            Err(e) => {
                warn!("Skipping malformed detection #{}: {}", index, e);
                None
            }
        })
        .collect()
}
