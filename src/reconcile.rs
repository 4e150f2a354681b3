use crate::models::{
    PersonInfo, PersonnelRecord, PositionInfo, SuccessionKind, TxStatus, VacantPositionSnapshot,
};
use crate::placeholder::{classify, Occupancy};
use crate::succession_index::{IndexAmbiguity, IndexedDetail, SuccessionIndex};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Anything that occupies (or used to occupy) a slot: a personnel row or a
/// vacancy snapshot row.
pub trait PositionHolder {
    fn record_id(&self) -> &str;
    fn year(&self) -> i64;
    fn person(&self) -> &PersonInfo;
    fn slot(&self) -> &PositionInfo;
}

impl PositionHolder for PersonnelRecord {
    fn record_id(&self) -> &str {
        &self.id
    }
    fn year(&self) -> i64 {
        self.year
    }
    fn person(&self) -> &PersonInfo {
        &self.person
    }
    fn slot(&self) -> &PositionInfo {
        &self.slot
    }
}

impl PositionHolder for VacantPositionSnapshot {
    fn record_id(&self) -> &str {
        &self.id
    }
    fn year(&self) -> i64 {
        self.year
    }
    fn person(&self) -> &PersonInfo {
        &self.person
    }
    fn slot(&self) -> &PositionInfo {
        &self.slot
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Filled,
    Vacant,
    Reserved,
    Swap,
    Promotion,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonProjection {
    pub national_id: Option<String>,
    pub name: Option<String>,
    pub rank: Option<String>,
    pub seniority: Option<String>,
    pub age: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingPerson {
    pub transaction_id: String,
    pub swap_type: SuccessionKind,
    pub transaction_status: TxStatus,
    pub personnel_id: Option<String>,
    pub national_id: Option<String>,
    pub name: Option<String>,
    pub rank: Option<String>,
    pub from_position: Option<String>,
    pub from_position_number: Option<String>,
    pub from_unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingPerson {
    pub transaction_id: String,
    pub swap_type: SuccessionKind,
    pub transaction_status: TxStatus,
    pub to_pos_code_id: Option<i64>,
    pub to_position: Option<String>,
    pub to_position_number: Option<String>,
    pub to_unit: Option<String>,
    pub supporter_name: Option<String>,
    pub support_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VacantPositionInfo {
    pub occupancy: Occupancy,
    /// Marker text as stored, e.g. the reserved phrase.
    pub placeholder_name: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView {
    pub record_id: String,
    pub year: i64,
    pub pos_code_id: Option<i64>,
    pub pos_code_name: Option<String>,
    pub position: Option<String>,
    pub position_number: Option<String>,
    pub unit: Option<String>,
    pub acting_as: Option<String>,
    pub status: PositionStatus,
    pub current_holder: Option<PersonProjection>,
    pub incoming_person: Option<IncomingPerson>,
    pub outgoing_person: Option<OutgoingPerson>,
    pub vacant_position_info: Option<VacantPositionInfo>,
}

fn status_for_outbound(outbound: &IndexedDetail) -> PositionStatus {
    if outbound.status == TxStatus::Pending {
        return PositionStatus::Pending;
    }
    match outbound.kind {
        SuccessionKind::TwoWay | SuccessionKind::ThreeWay => PositionStatus::Swap,
        SuccessionKind::PromotionChain => PositionStatus::Promotion,
        SuccessionKind::VacantAssignment => PositionStatus::Filled,
    }
}

fn incoming_from(e: &IndexedDetail) -> Option<IncomingPerson> {
    if e.is_placeholder() {
        return None;
    }
    let s = &e.detail.step;
    Some(IncomingPerson {
        transaction_id: e.detail.transaction_id.clone(),
        swap_type: e.kind,
        transaction_status: e.status,
        personnel_id: s.personnel_id.clone(),
        national_id: s.national_id.clone(),
        name: s.full_name.clone(),
        rank: s.rank.clone(),
        from_position: s.from_position.clone(),
        from_position_number: s.from_position_number.clone(),
        from_unit: s.from_unit.clone(),
    })
}

pub fn reconcile<H: PositionHolder>(holder: &H, index: &SuccessionIndex) -> PositionView {
    let person = holder.person();
    let slot = holder.slot();

    let occupancy = classify(person.full_name.as_deref(), person.rank.as_deref());
    let outbound = index.outbound(person.national_id.as_deref());
    let incoming_person = index
        .inbound(slot.position_number.as_deref())
        .and_then(incoming_from);

    let status = match occupancy {
        Occupancy::Reserved => PositionStatus::Reserved,
        Occupancy::Vacant => PositionStatus::Vacant,
        Occupancy::Occupied => outbound.map(status_for_outbound).unwrap_or(PositionStatus::Filled),
    };

    let current_holder = (occupancy == Occupancy::Occupied).then(|| PersonProjection {
        national_id: person.national_id.clone(),
        name: person.full_name.clone(),
        rank: person.rank.clone(),
        seniority: person.seniority.clone(),
        age: person.age.clone(),
    });

    let vacant_position_info = occupancy.is_open().then(|| VacantPositionInfo {
        occupancy,
        placeholder_name: person.full_name.clone(),
        notes: person.notes.clone(),
    });

    let outgoing_person = outbound.map(|o| OutgoingPerson {
        transaction_id: o.detail.transaction_id.clone(),
        swap_type: o.kind,
        transaction_status: o.status,
        to_pos_code_id: o.detail.step.to_pos_code_id,
        to_position: o.detail.step.to_position.clone(),
        to_position_number: o.detail.step.to_position_number.clone(),
        to_unit: o.detail.step.to_unit.clone(),
        supporter_name: person.supporter_name.clone(),
        support_reason: person.support_reason.clone(),
    });

    PositionView {
        record_id: holder.record_id().to_string(),
        year: holder.year(),
        pos_code_id: slot.pos_code_id,
        pos_code_name: None,
        position: slot.position.clone(),
        position_number: slot.position_number.clone(),
        unit: slot.unit.clone(),
        acting_as: slot.acting_as.clone(),
        status,
        current_holder,
        incoming_person,
        outgoing_person,
        vacant_position_info,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub positions: Vec<PositionView>,
    pub by_status: BTreeMap<PositionStatus, usize>,
    pub with_incoming: usize,
    pub ambiguity: IndexAmbiguity,
}

pub fn reconcile_all<H: PositionHolder>(
    holders: &[H],
    index: &SuccessionIndex,
    pos_codes: &HashMap<i64, String>,
) -> ReconcileReport {
    let mut by_status = BTreeMap::new();
    let mut with_incoming = 0;
    let positions = holders
        .iter()
        .map(|h| {
            let mut v = reconcile(h, index);
            v.pos_code_name = v.pos_code_id.and_then(|c| pos_codes.get(&c).cloned());
            *by_status.entry(v.status).or_insert(0) += 1;
            if v.incoming_person.is_some() {
                with_incoming += 1;
            }
            v
        })
        .collect();
    ReconcileReport {
        positions,
        by_status,
        with_incoming,
        ambiguity: index.ambiguity(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::succession_index::tests::entry;

    fn personnel(num: &str, name: Option<&str>, rank: Option<&str>, nid: Option<&str>) -> PersonnelRecord {
        PersonnelRecord {
            id: format!("p-{}", num),
            year: 2568,
            person: PersonInfo {
                national_id: nid.map(str::to_string),
                full_name: name.map(str::to_string),
                rank: rank.map(str::to_string),
                supporter_name: Some("ผกก.".to_string()),
                support_reason: Some("เหมาะสม".to_string()),
                ..PersonInfo::default()
            },
            slot: PositionInfo {
                pos_code_id: Some(5),
                position: Some("สว.".to_string()),
                position_number: Some(num.to_string()),
                unit: Some("X".to_string()),
                acting_as: None,
            },
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn vacant_slot_with_incoming_person() {
        let idx = SuccessionIndex::build(vec![entry(
            "t1",
            SuccessionKind::TwoWay,
            Some("1100"),
            "สมชาย",
            "010507443 0257",
        )]);
        let p = personnel("0105 07443 0257", Some(""), None, None);
        let v = reconcile(&p, &idx);
        assert_eq!(v.status, PositionStatus::Vacant);
        assert_eq!(
            v.incoming_person.as_ref().and_then(|i| i.name.as_deref()),
            Some("สมชาย")
        );
        assert!(v.current_holder.is_none());
        assert_eq!(
            v.vacant_position_info.as_ref().map(|i| i.occupancy),
            Some(Occupancy::Vacant)
        );
    }

    #[test]
    fn placeholder_is_never_incoming() {
        let mut placeholder = entry("t1", SuccessionKind::ThreeWay, None, "ว่าง (กันตำแหน่ง)", "B2");
        placeholder.detail.step.is_placeholder = false;
        let idx = SuccessionIndex::build(vec![placeholder]);
        let v = reconcile(&personnel("B2", None, None, None), &idx);
        assert!(v.incoming_person.is_none());

        let mut flagged = entry("t2", SuccessionKind::ThreeWay, None, "ชื่อชั่วคราว", "C3");
        flagged.detail.step.is_placeholder = true;
        let idx = SuccessionIndex::build(vec![flagged]);
        let v = reconcile(&personnel("C3", Some("สมหญิง"), Some("ร.ต.อ."), Some("9")), &idx);
        assert!(v.incoming_person.is_none());
    }

    #[test]
    fn outbound_kind_maps_to_status() {
        let idx = SuccessionIndex::build(vec![
            entry("t1", SuccessionKind::TwoWay, Some("1"), "ก", "Z1"),
            entry("t2", SuccessionKind::PromotionChain, Some("2"), "ข", "Z2"),
            entry("t3", SuccessionKind::VacantAssignment, Some("3"), "ค", "Z3"),
        ]);
        let swap = reconcile(&personnel("A1", Some("ก"), Some("พ.ต.ท."), Some("1")), &idx);
        assert_eq!(swap.status, PositionStatus::Swap);
        let out = swap.outgoing_person.expect("outgoing");
        assert_eq!(out.to_position_number.as_deref(), Some("Z1"));
        assert_eq!(out.supporter_name.as_deref(), Some("ผกก."));

        let promo = reconcile(&personnel("A2", Some("ข"), Some("พ.ต.ท."), Some("2")), &idx);
        assert_eq!(promo.status, PositionStatus::Promotion);
        let assigned = reconcile(&personnel("A3", Some("ค"), Some("พ.ต.ท."), Some("3")), &idx);
        assert_eq!(assigned.status, PositionStatus::Filled);
        let plain = reconcile(&personnel("A4", Some("ง"), Some("พ.ต.ท."), Some("4")), &idx);
        assert_eq!(plain.status, PositionStatus::Filled);
        assert!(plain.outgoing_person.is_none());
    }

    #[test]
    fn pending_outbound_reports_pending() {
        let mut e = entry("t1", SuccessionKind::TwoWay, Some("1"), "ก", "Z1");
        e.status = TxStatus::Pending;
        let idx = SuccessionIndex::build(vec![e]);
        let v = reconcile(&personnel("A1", Some("ก"), Some("พ.ต.ท."), Some("1")), &idx);
        assert_eq!(v.status, PositionStatus::Pending);
    }

    #[test]
    fn reserved_beats_outbound_and_report_counts() {
        let idx = SuccessionIndex::build(vec![entry("t1", SuccessionKind::TwoWay, Some("1"), "ก", "R1")]);
        let rows = vec![
            personnel("R1", Some("ว่าง(กันตำแหน่ง)"), None, None),
            personnel("R2", None, None, None),
            personnel("R3", Some("ข"), Some("ด.ต."), Some("7")),
        ];
        let mut codes = HashMap::new();
        codes.insert(5, "สารวัตร".to_string());
        let report = reconcile_all(&rows, &idx, &codes);
        assert_eq!(report.positions[0].status, PositionStatus::Reserved);
        assert!(report.positions[0].incoming_person.is_some());
        assert_eq!(report.by_status.get(&PositionStatus::Reserved), Some(&1));
        assert_eq!(report.by_status.get(&PositionStatus::Vacant), Some(&1));
        assert_eq!(report.by_status.get(&PositionStatus::Filled), Some(&1));
        assert_eq!(report.with_incoming, 1);
        assert_eq!(report.positions[2].pos_code_name.as_deref(), Some("สารวัตร"));
    }
}
