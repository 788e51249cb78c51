use crate::association::{HelmetStatus, PpeStatusMap, VestStatus};
use crate::utils::bbox::BoundingBox;
use itertools::Itertools;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt;

/// Reason why a person is reported
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationReason {
    MissingHelmet,
    HelmetStatusUnknown,
    MissingVest,
    VestStatusUnknown,
}

/// Hard violations are backed by a negative detection; soft ones only lack evidence and
/// are meant for review.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Hard,
    Soft,
}

impl ViolationReason {
    pub fn severity(&self) -> Severity {
        match self {
            ViolationReason::MissingHelmet | ViolationReason::MissingVest => Severity::Hard,
            ViolationReason::HelmetStatusUnknown | ViolationReason::VestStatusUnknown => {
                Severity::Soft
            }
        }
    }
}

impl fmt::Display for ViolationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViolationReason::MissingHelmet => "missing helmet",
            ViolationReason::HelmetStatusUnknown => "helmet status unknown",
            ViolationReason::MissingVest => "missing vest",
            ViolationReason::VestStatusUnknown => "vest status unknown",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViolationRecord {
    /// helmet reasons go before vest reasons
    pub reasons: Vec<ViolationReason>,
    pub bbox: BoundingBox,
}

impl ViolationRecord {
    pub fn is_hard(&self) -> bool {
        self.reasons.iter().any(|r| r.severity() == Severity::Hard)
    }
}

/// Violations of one frame keyed by the person track id. Compliant persons are absent.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplianceReport {
    pub violations: BTreeMap<u64, ViolationRecord>,
}

impl ComplianceReport {
    /// Number of persons with at least one reason
    ///
    pub fn violating_persons(&self) -> usize {
        self.violations.len()
    }

    pub fn is_compliant(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn get(&self, person_id: u64) -> Option<&ViolationRecord> {
        self.violations.get(&person_id)
    }
}

/// Required PPE items
///
#[derive(Debug, Clone)]
pub struct CompliancePolicy {
    require_helmet: bool,
    require_vest: bool,
    report_unknown: bool,
}

impl Default for CompliancePolicy {
    fn default() -> Self {
        Self {
            require_helmet: true,
            require_vest: true,
            report_unknown: true,
        }
    }
}

impl CompliancePolicy {
    pub fn require_helmet(mut self, v: bool) -> Self {
        self.require_helmet = v;
        self
    }

    pub fn require_vest(mut self, v: bool) -> Self {
        self.require_vest = v;
        self
    }

    /// Whether a required item with unresolved status is reported as a (soft) violation.
    ///
    pub fn report_unknown(mut self, v: bool) -> Self {
        self.report_unknown = v;
        self
    }

    pub fn get_require_helmet(&self) -> bool {
        self.require_helmet
    }

    pub fn get_require_vest(&self) -> bool {
        self.require_vest
    }

    pub fn get_report_unknown(&self) -> bool {
        self.report_unknown
    }

    fn reasons(&self, helmet: HelmetStatus, vest: VestStatus) -> Vec<ViolationReason> {
        let mut reasons = Vec::new();
        if self.require_helmet {
            match helmet {
                HelmetStatus::NoHelmet => reasons.push(ViolationReason::MissingHelmet),
                HelmetStatus::Unknown if self.report_unknown => {
                    reasons.push(ViolationReason::HelmetStatusUnknown)
                }
                _ => {}
            }
        }
        if self.require_vest {
            match vest {
                VestStatus::NoVest => reasons.push(ViolationReason::MissingVest),
                VestStatus::Unknown if self.report_unknown => {
                    reasons.push(ViolationReason::VestStatusUnknown)
                }
                _ => {}
            }
        }
        reasons
    }
}

/// Evaluates per-person PPE status against the policy
///
#[derive(Debug, Clone, Default)]
pub struct ComplianceChecker {
    policy: CompliancePolicy,
}

impl ComplianceChecker {
    pub fn new(policy: CompliancePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CompliancePolicy {
        &self.policy
    }

    pub fn check(&self, status: &PpeStatusMap) -> ComplianceReport {
        let violations = status
            .iter()
            .filter_map(|(id, s)| {
                let reasons = self.policy.reasons(s.helmet, s.vest);
                if reasons.is_empty() {
                    None
                } else {
                    Some((
                        *id,
                        ViolationRecord {
                            reasons,
                            bbox: s.bbox,
                        },
                    ))
                }
            })
            .collect::<BTreeMap<_, _>>();

        for (id, record) in &violations {
            let reasons = record.reasons.iter().join(", ");
            if record.is_hard() {
                warn!("Person {}: {}", id, reasons);
            } else {
                debug!("Person {}: {}", id, reasons);
            }
        }

        let report = ComplianceReport { violations };
        if report.is_compliant() {
            debug!("No PPE violations among {} persons", status.len());
        } else {
            info!(
                "PPE violations for {} of {} persons",
                report.violating_persons(),
                status.len()
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use crate::association::{HelmetStatus, PersonPpeStatus, PpeStatusMap, VestStatus};
    use crate::compliance::{
        ComplianceChecker, CompliancePolicy, ComplianceReport, Severity, ViolationReason,
    };
    use crate::utils::bbox::BoundingBox;

    fn status(helmet: HelmetStatus, vest: VestStatus) -> PpeStatusMap {
        let mut s = PersonPpeStatus::unknown(BoundingBox::new(0.0, 0.0, 100.0, 200.0));
        s.helmet = helmet;
        s.vest = vest;
        PpeStatusMap::from([(7, s)])
    }

    fn check(helmet: HelmetStatus, vest: VestStatus) -> ComplianceReport {
        ComplianceChecker::default().check(&status(helmet, vest))
    }

    #[test]
    fn unknown_helmet() {
        let report = check(HelmetStatus::Unknown, VestStatus::Vest);
        assert_eq!(report.violating_persons(), 1);
        let record = report.get(7).unwrap();
        assert_eq!(record.reasons, vec![ViolationReason::HelmetStatusUnknown]);
        assert_eq!(record.reasons[0].to_string(), "helmet status unknown");
        assert_eq!(record.bbox, BoundingBox::new(0.0, 0.0, 100.0, 200.0));
        assert!(!record.is_hard());
    }

    #[test]
    fn compliant_person_is_omitted() {
        let report = check(HelmetStatus::Helmet, VestStatus::Vest);
        assert!(report.is_compliant());
        assert!(report.get(7).is_none());
        assert_eq!(report.violating_persons(), 0);
    }

    #[test]
    fn reasons_order() {
        let report = check(HelmetStatus::NoHelmet, VestStatus::Unknown);
        let record = report.get(7).unwrap();
        assert_eq!(
            record
                .reasons
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>(),
            vec!["missing helmet", "vest status unknown"]
        );
        assert!(record.is_hard());

        let report = check(HelmetStatus::Unknown, VestStatus::NoVest);
        assert_eq!(
            report.get(7).unwrap().reasons,
            vec![
                ViolationReason::HelmetStatusUnknown,
                ViolationReason::MissingVest,
            ]
        );
    }

    #[test]
    fn policy_switches() {
        let s = status(HelmetStatus::NoHelmet, VestStatus::NoVest);
        let helmet_only = ComplianceChecker::new(CompliancePolicy::default().require_vest(false));
        assert_eq!(
            helmet_only.check(&s).get(7).unwrap().reasons,
            vec![ViolationReason::MissingHelmet]
        );

        let nothing = ComplianceChecker::new(
            CompliancePolicy::default()
                .require_vest(false)
                .require_helmet(false),
        );
        assert!(nothing.check(&s).is_compliant());

        let s = status(HelmetStatus::Unknown, VestStatus::NoVest);
        let strict_only = ComplianceChecker::new(CompliancePolicy::default().report_unknown(false));
        assert_eq!(
            strict_only.check(&s).get(7).unwrap().reasons,
            vec![ViolationReason::MissingVest]
        );
        let s = status(HelmetStatus::Unknown, VestStatus::Unknown);
        assert!(strict_only.check(&s).is_compliant());
    }

    #[test]
    fn empty_status() {
        assert!(ComplianceChecker::default()
            .check(&PpeStatusMap::new())
            .is_compliant());
    }

    #[test]
    fn severity() {
        assert_eq!(ViolationReason::MissingVest.severity(), Severity::Hard);
        assert_eq!(ViolationReason::VestStatusUnknown.severity(), Severity::Soft);
    }
}
