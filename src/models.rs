use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Person-identifying fields. Assignment copies this block wholesale from
/// an applicant onto a position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonInfo {
    pub national_id: Option<String>,
    pub full_name: Option<String>,
    pub rank: Option<String>,
    pub seniority: Option<String>,
    pub age: Option<String>,
    pub birth_date: Option<String>,
    pub appointment_date: Option<String>,
    pub rank_since: Option<String>,
    pub enrollment_date: Option<String>,
    pub retirement_date: Option<String>,
    pub years_of_service: Option<String>,
    pub training_location: Option<String>,
    pub training_course: Option<String>,
    pub supporter_name: Option<String>,
    pub support_reason: Option<String>,
    pub notes: Option<String>,
}

/// Position descriptors of a slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PositionInfo {
    pub pos_code_id: Option<i64>,
    pub position: Option<String>,
    pub position_number: Option<String>,
    pub unit: Option<String>,
    pub acting_as: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonnelRecord {
    pub id: String,
    pub year: i64,
    #[serde(flatten)]
    pub person: PersonInfo,
    #[serde(flatten)]
    pub slot: PositionInfo,
    pub is_active: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A row of `vacant_positions`: either a vacancy copied from personnel, or
/// an applicant request when `nominator`/`requested_position_id` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VacantPositionSnapshot {
    pub id: String,
    pub year: i64,
    #[serde(flatten)]
    pub person: PersonInfo,
    #[serde(flatten)]
    pub slot: PositionInfo,
    pub is_assigned: bool,
    pub display_order: i64,
    pub requested_position_id: Option<i64>,
    pub nominator: Option<String>,
    pub assigned_at: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl VacantPositionSnapshot {
    pub fn is_applicant(&self) -> bool {
        self.nominator.is_some() || self.requested_position_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuccessionKind {
    #[serde(rename = "two-way")]
    TwoWay,
    #[serde(rename = "three-way")]
    ThreeWay,
    #[serde(rename = "promotion-chain")]
    PromotionChain,
    #[serde(rename = "vacant-assignment")]
    VacantAssignment,
}

impl SuccessionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TwoWay => "two-way",
            Self::ThreeWay => "three-way",
            Self::PromotionChain => "promotion-chain",
            Self::VacantAssignment => "vacant-assignment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "two-way" => Some(Self::TwoWay),
            "three-way" => Some(Self::ThreeWay),
            "promotion-chain" => Some(Self::PromotionChain),
            "vacant-assignment" => Some(Self::VacantAssignment),
            _ => None,
        }
    }

    /// Checks participant cardinality and placeholder shape for this kind.
    pub fn validate(self, details: &[NewDetail]) -> EngineResult<()> {
        for d in details {
            if d.is_placeholder && (d.personnel_id.is_some() || d.national_id.is_some()) {
                return Err(EngineError::Validation(format!(
                    "placeholder participant at sequence {} must not carry an identity",
                    d.sequence
                )));
            }
        }

        let mut seqs: Vec<i64> = details.iter().map(|d| d.sequence).collect();
        seqs.sort_unstable();
        if seqs.windows(2).any(|w| w[0] == w[1]) {
            return Err(EngineError::Validation("duplicate participant sequence".into()));
        }
        if seqs.first().map(|s| *s < 0).unwrap_or(false) {
            return Err(EngineError::Validation("sequence must not be negative".into()));
        }

        let n = details.len();
        match self {
            Self::TwoWay | Self::ThreeWay | Self::VacantAssignment => {
                let expected = match self {
                    Self::TwoWay => 2,
                    Self::ThreeWay => 3,
                    _ => 1,
                };
                if n != expected {
                    return Err(EngineError::Validation(format!(
                        "{} requires exactly {} participants, got {}",
                        self.as_str(),
                        expected,
                        n
                    )));
                }
                if seqs.contains(&0) {
                    return Err(EngineError::Validation(format!(
                        "sequence 0 is reserved for promotion-chain origin, not {}",
                        self.as_str()
                    )));
                }
            }
            Self::PromotionChain => {
                let steps = details.iter().filter(|d| d.sequence > 0).count();
                if steps < 1 {
                    return Err(EngineError::Validation(
                        "promotion-chain requires at least one step after the origin".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Completed,
    Cancelled,
}

impl TxStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Participant step as supplied by a caller, before it is persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewDetail {
    pub sequence: i64,
    pub personnel_id: Option<String>,
    pub applicant_id: Option<String>,
    pub national_id: Option<String>,
    pub full_name: Option<String>,
    pub rank: Option<String>,
    pub from_pos_code_id: Option<i64>,
    pub from_position: Option<String>,
    pub from_position_number: Option<String>,
    pub from_unit: Option<String>,
    pub to_pos_code_id: Option<i64>,
    pub to_position: Option<String>,
    pub to_position_number: Option<String>,
    pub to_unit: Option<String>,
    pub is_placeholder: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessionDetail {
    pub id: String,
    pub transaction_id: String,
    #[serde(flatten)]
    pub step: NewDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessionTransaction {
    pub id: String,
    pub year: i64,
    pub swap_date: Option<String>,
    pub swap_type: SuccessionKind,
    pub status: TxStatus,
    pub group_name: Option<String>,
    pub is_completed: bool,
    pub notes: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub details: Vec<SuccessionDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosCode {
    pub pos_code_id: i64,
    pub pos_code_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(seq: i64) -> NewDetail {
        NewDetail {
            sequence: seq,
            personnel_id: Some(format!("p{}", seq)),
            national_id: Some(format!("n{}", seq)),
            ..NewDetail::default()
        }
    }

    #[test]
    fn two_and_three_way_cardinality() {
        assert!(SuccessionKind::TwoWay.validate(&[step(1), step(2)]).is_ok());
        assert!(SuccessionKind::TwoWay.validate(&[step(1)]).is_err());
        assert!(SuccessionKind::ThreeWay
            .validate(&[step(1), step(2), step(3)])
            .is_ok());
        let e = SuccessionKind::ThreeWay
            .validate(&[step(1), step(2)])
            .expect_err("two participants");
        assert_eq!(e.code(), "validation_failed");
    }

    #[test]
    fn promotion_chain_allows_origin_row() {
        assert!(SuccessionKind::PromotionChain.validate(&[step(1)]).is_ok());
        assert!(SuccessionKind::PromotionChain
            .validate(&[step(0), step(1), step(2)])
            .is_ok());
        assert!(SuccessionKind::PromotionChain.validate(&[step(0)]).is_err());
        assert!(SuccessionKind::PromotionChain
            .validate(&[step(0), step(0), step(1)])
            .is_err());
        assert!(SuccessionKind::TwoWay.validate(&[step(0), step(1)]).is_err());
    }

    #[test]
    fn placeholder_must_not_carry_identity() {
        let mut p = step(2);
        p.is_placeholder = true;
        assert!(SuccessionKind::TwoWay.validate(&[step(1), p.clone()]).is_err());
        p.personnel_id = None;
        p.national_id = None;
        assert!(SuccessionKind::TwoWay.validate(&[step(1), p]).is_ok());
    }

    #[test]
    fn enum_round_trip_strings() {
        for k in [
            SuccessionKind::TwoWay,
            SuccessionKind::ThreeWay,
            SuccessionKind::PromotionChain,
            SuccessionKind::VacantAssignment,
        ] {
            assert_eq!(SuccessionKind::parse(k.as_str()), Some(k));
        }
        assert_eq!(TxStatus::parse("cancelled"), Some(TxStatus::Cancelled));
        assert_eq!(TxStatus::parse("active"), None);
    }
}
