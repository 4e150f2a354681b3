use serde::Serialize;

/// Plain vacancy marker used as a holder name.
pub const VACANT_MARKER: &str = "ว่าง";

/// Both spellings of "vacant (held open)" found in imported rosters.
pub const RESERVED_MARKERS: [&str; 2] = ["ว่าง (กันตำแหน่ง)", "ว่าง(กันตำแหน่ง)"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Occupancy {
    Occupied,
    Vacant,
    /// Vacant, but held open for a specific appointment. Excluded from plain
    /// vacancy counts.
    Reserved,
}

impl Occupancy {
    pub fn is_open(self) -> bool {
        matches!(self, Occupancy::Vacant | Occupancy::Reserved)
    }
}

fn is_blank(v: Option<&str>) -> bool {
    v.map(|s| s.trim().is_empty()).unwrap_or(true)
}

pub fn is_reserved_name(full_name: Option<&str>) -> bool {
    let Some(name) = full_name else {
        return false;
    };
    let name = name.trim();
    RESERVED_MARKERS.iter().any(|m| name.contains(m))
}

/// Names that stand in for "nobody": blank, the vacant marker, or a
/// reserved marker. Such names must never be shown as a real person.
pub fn is_placeholder_name(full_name: Option<&str>) -> bool {
    if is_blank(full_name) {
        return true;
    }
    let name = full_name.unwrap_or_default().trim();
    name == VACANT_MARKER || is_reserved_name(Some(name))
}

pub fn classify(full_name: Option<&str>, rank: Option<&str>) -> Occupancy {
    if is_reserved_name(full_name) {
        Occupancy::Reserved
    } else if is_blank(rank) {
        Occupancy::Vacant
    } else {
        Occupancy::Occupied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_cases() {
        assert_eq!(classify(None, None), Occupancy::Vacant);
        assert_eq!(classify(Some("ว่าง (กันตำแหน่ง)"), None), Occupancy::Reserved);
        assert_eq!(classify(Some("ว่าง(กันตำแหน่ง)"), None), Occupancy::Reserved);
        assert_eq!(
            classify(Some("สมชาย ใจดี"), Some("พ.ต.ท.")),
            Occupancy::Occupied
        );
        assert_eq!(classify(Some("ว่าง"), Some("  ")), Occupancy::Vacant);
        assert_eq!(classify(Some(""), None), Occupancy::Vacant);
    }

    #[test]
    fn reserved_wins_over_rank() {
        assert_eq!(
            classify(Some("  ว่าง (กันตำแหน่ง) "), Some("พ.ต.อ.")),
            Occupancy::Reserved
        );
    }

    #[test]
    fn classify_is_exhaustive_over_samples() {
        let names = [None, Some(""), Some("ว่าง"), Some("ว่าง (กันตำแหน่ง)"), Some("สมหญิง")];
        let ranks = [None, Some(""), Some("ร.ต.อ.")];
        for n in names {
            for r in ranks {
                let c = classify(n, r);
                let hits = [Occupancy::Occupied, Occupancy::Vacant, Occupancy::Reserved]
                    .iter()
                    .filter(|o| **o == c)
                    .count();
                assert_eq!(hits, 1);
            }
        }
    }

    #[test]
    fn placeholder_names() {
        assert!(is_placeholder_name(None));
        assert!(is_placeholder_name(Some("  ")));
        assert!(is_placeholder_name(Some("ว่าง")));
        assert!(is_placeholder_name(Some(" ว่าง(กันตำแหน่ง)")));
        assert!(!is_placeholder_name(Some("สมชาย")));
        assert!(Occupancy::Reserved.is_open());
        assert!(!Occupancy::Occupied.is_open());
    }
}
