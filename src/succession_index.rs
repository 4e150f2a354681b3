use crate::models::{SuccessionDetail, SuccessionKind, TxStatus};
use crate::placeholder::is_placeholder_name;
use crate::position_key::normalize;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// A participant step together with the parent transaction fields the
/// reconciler needs.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedDetail {
    pub detail: SuccessionDetail,
    pub kind: SuccessionKind,
    pub status: TxStatus,
    pub year: i64,
}

impl IndexedDetail {
    /// True when this step does not name a real person yet.
    pub fn is_placeholder(&self) -> bool {
        self.detail.step.is_placeholder || is_placeholder_name(self.detail.step.full_name.as_deref())
    }
}

/// Lookup maps over an already-filtered batch of succession details.
///
/// When the same national ID or destination slot shows up more than once,
/// the first entry in input order is kept and the key is recorded as
/// ambiguous. The loader orders input by transaction creation, so "first"
/// means the earliest-created transaction.
#[derive(Debug, Default)]
pub struct SuccessionIndex {
    entries: Vec<IndexedDetail>,
    by_participant_id: HashMap<String, usize>,
    by_destination_key: HashMap<String, usize>,
    ambiguous_participants: BTreeSet<String>,
    ambiguous_destinations: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexAmbiguity {
    pub participants: Vec<String>,
    pub destinations: Vec<String>,
}

impl SuccessionIndex {
    pub fn build(entries: Vec<IndexedDetail>) -> Self {
        let mut idx = SuccessionIndex {
            entries,
            ..SuccessionIndex::default()
        };

        for (i, e) in idx.entries.iter().enumerate() {
            if let Some(nid) = e.detail.step.national_id.as_deref().map(str::trim) {
                if !nid.is_empty() && !e.detail.step.is_placeholder {
                    if idx.by_participant_id.contains_key(nid) {
                        idx.ambiguous_participants.insert(nid.to_string());
                    } else {
                        idx.by_participant_id.insert(nid.to_string(), i);
                    }
                }
            }

            let key = normalize(e.detail.step.to_position_number.as_deref());
            if !key.is_empty() {
                if idx.by_destination_key.contains_key(&key) {
                    idx.ambiguous_destinations.insert(key);
                } else {
                    idx.by_destination_key.insert(key, i);
                }
            }
        }
        idx
    }

    /// The step describing this person's outbound move, if any.
    pub fn outbound(&self, national_id: Option<&str>) -> Option<&IndexedDetail> {
        let nid = national_id?.trim();
        if nid.is_empty() {
            return None;
        }
        self.by_participant_id.get(nid).map(|&i| &self.entries[i])
    }

    /// The step moving someone into this slot, if any. The raw position
    /// number is normalized here so callers cannot skip it.
    ///
    /// Matches on the position number alone; `to_unit` and `to_pos_code_id`
    /// are ignored because position numbers are unique within a year.
    /// Stats match snapshot rows on the full composite key instead.
    pub fn inbound(&self, position_number: Option<&str>) -> Option<&IndexedDetail> {
        let key = normalize(position_number);
        if key.is_empty() {
            return None;
        }
        self.by_destination_key.get(&key).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ambiguity(&self) -> IndexAmbiguity {
        IndexAmbiguity {
            participants: self.ambiguous_participants.iter().cloned().collect(),
            destinations: self.ambiguous_destinations.iter().cloned().collect(),
        }
    }
}
