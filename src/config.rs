use crate::association::AssociatorOptions;
use crate::compliance::CompliancePolicy;
use crate::trackers::iou::{MatchingPolicy, TrackerOptions};
use crate::Errors;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PpeConfigFile {
    detection: Option<DetectionConfigFile>,
    tracker: Option<TrackerConfigFile>,
    association: Option<AssociationConfigFile>,
    policy: Option<PolicyConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectionConfigFile {
    min_confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TrackerConfigFile {
    iou_threshold: Option<f32>,
    min_hits: Option<usize>,
    max_age: Option<usize>,
    matching: Option<MatchingConfigFile>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum MatchingConfigFile {
    Greedy,
    Optimal,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AssociationConfigFile {
    iou_threshold_person_ppe: Option<f32>,
    helmet_y_offset_factor: Option<f32>,
    vest_overlap_factor: Option<f32>,
    no_helmet_min_iou: Option<f32>,
    head_band_factor: Option<f32>,
    no_vest_min_iou: Option<f32>,
    torso_band_factor: Option<f32>,
    vest_band_factor: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PolicyConfigFile {
    require_helmet: Option<bool>,
    require_vest: Option<bool>,
    report_unknown: Option<bool>,
}

/// Complete configuration of a stream monitor
///
#[derive(Debug, Clone, Default)]
pub struct PpeConfig {
    /// detections below this confidence are dropped before tracking
    pub min_confidence: f32,
    pub tracker: TrackerOptions,
    pub association: AssociatorOptions,
    pub policy: CompliancePolicy,
}

impl PpeConfig {
    /// Reads the TOML file; absent keys keep their defaults.
    ///
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: PpeConfigFile = toml::from_str(raw)?;
        Ok(Self::from_file(file)?)
    }

    fn from_file(file: PpeConfigFile) -> Result<Self, Errors> {
        let mut cfg = Self::default();

        let detection = file.detection.unwrap_or_default();
        if let Some(v) = detection.min_confidence {
            cfg.min_confidence = fraction("detection.min_confidence", v)?;
        }

        let tracker = file.tracker.unwrap_or_default();
        if let Some(v) = tracker.iou_threshold {
            let v = fraction("tracker.iou_threshold", v)?;
            cfg.tracker = cfg.tracker.iou_threshold(v);
        }
        if let Some(v) = tracker.min_hits {
            if v == 0 {
                return Err(invalid("tracker.min_hits", "must be a positive number"));
            }
            cfg.tracker = cfg.tracker.min_hits(v);
        }
        if let Some(v) = tracker.max_age {
            cfg.tracker = cfg.tracker.max_age(v);
        }
        if let Some(v) = tracker.matching {
            cfg.tracker = cfg.tracker.matching(match v {
                MatchingConfigFile::Greedy => MatchingPolicy::Greedy,
                MatchingConfigFile::Optimal => MatchingPolicy::Optimal,
            });
        }

        let a = file.association.unwrap_or_default();
        let mut opts = cfg.association;
        if let Some(v) = a.iou_threshold_person_ppe {
            let v = fraction("association.iou_threshold_person_ppe", v)?;
            opts = opts.iou_threshold_person_ppe(v);
        }
        if let Some(v) = a.helmet_y_offset_factor {
            let v = factor("association.helmet_y_offset_factor", v)?;
            opts = opts.helmet_y_offset_factor(v);
        }
        if let Some(v) = a.vest_overlap_factor {
            let v = fraction("association.vest_overlap_factor", v)?;
            opts = opts.vest_overlap_factor(v);
        }
        if let Some(v) = a.no_helmet_min_iou {
            let v = fraction("association.no_helmet_min_iou", v)?;
            opts = opts.no_helmet_min_iou(v);
        }
        if let Some(v) = a.head_band_factor {
            let v = fraction("association.head_band_factor", v)?;
            opts = opts.head_band_factor(v);
        }
        if let Some(v) = a.no_vest_min_iou {
            let v = fraction("association.no_vest_min_iou", v)?;
            opts = opts.no_vest_min_iou(v);
        }
        if let Some(v) = a.torso_band_factor {
            let v = fraction("association.torso_band_factor", v)?;
            opts = opts.torso_band_factor(v);
        }
        if let Some(v) = a.vest_band_factor {
            let v = fraction("association.vest_band_factor", v)?;
            opts = opts.vest_band_factor(v);
        }
        cfg.association = opts;

        let p = file.policy.unwrap_or_default();
        if let Some(v) = p.require_helmet {
            cfg.policy = cfg.policy.require_helmet(v);
        }
        if let Some(v) = p.require_vest {
            cfg.policy = cfg.policy.require_vest(v);
        }
        if let Some(v) = p.report_unknown {
            cfg.policy = cfg.policy.report_unknown(v);
        }

        Ok(cfg)
    }
}

fn invalid(name: &'static str, reason: &str) -> Errors {
    Errors::InvalidOption {
        name,
        reason: reason.to_string(),
    }
}

fn fraction(name: &'static str, v: f32) -> Result<f32, Errors> {
    if v.is_finite() && (0.0..=1.0).contains(&v) {
        Ok(v)
    } else {
        Err(invalid(name, &format!("{} is not within [0.0, 1.0]", v)))
    }
}

fn factor(name: &'static str, v: f32) -> Result<f32, Errors> {
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(invalid(name, &format!("{} is not a non-negative number", v)))
    }
}
