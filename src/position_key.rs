use serde::Serialize;

/// Canonical comparison key for a position number.
///
/// Every whitespace character is dropped, so `"0105 07443 0257"`,
/// `"010507443 0257"` and `" 0105 07443 0257 "` all collapse to the same
/// slot. Both sides of a position comparison must go through this.
pub fn normalize(raw: Option<&str>) -> String {
    match raw {
        Some(s) => s.chars().filter(|c| !c.is_whitespace()).collect(),
        None => String::new(),
    }
}

/// True when both raw position numbers name the same slot.
pub fn same_slot(a: Option<&str>, b: Option<&str>) -> bool {
    let ka = normalize(a);
    !ka.is_empty() && ka == normalize(b)
}

/// Identity of a vacancy row: (year, positionNumber, unit, posCodeId).
///
/// Succession details only carry copied position text, so vacancy rows and
/// assignment details are joined through this key instead of row ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeKey {
    pub year: i64,
    pub position_number: String,
    pub unit: String,
    pub pos_code_id: Option<i64>,
}

impl CompositeKey {
    pub fn new(
        year: i64,
        position_number: Option<&str>,
        unit: Option<&str>,
        pos_code_id: Option<i64>,
    ) -> Self {
        Self {
            year,
            position_number: normalize(position_number),
            unit: normalize(unit),
            pos_code_id,
        }
    }

    /// Rows without any position number cannot be matched across tables.
    pub fn is_matchable(&self) -> bool {
        !self.position_number.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_inner_and_outer_whitespace() {
        assert_eq!(normalize(Some("0105 07443 0257")), "0105074430257");
        assert_eq!(
            normalize(Some(" 0105 07443 0257 ")),
            normalize(Some("0105 07443 0257"))
        );
        assert_eq!(normalize(Some("0105\t07443\u{00a0}0257\n")), "0105074430257");
    }

    #[test]
    fn normalize_none_is_empty() {
        assert_eq!(normalize(None), "");
        assert_eq!(normalize(Some("   ")), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["", "  a b ", "0105 07443 0257", "ว่าง (กันตำแหน่ง)", "x\u{3000}y"] {
            let once = normalize(Some(raw));
            assert_eq!(normalize(Some(&once)), once, "input {:?}", raw);
        }
    }

    #[test]
    fn same_slot_requires_both_sides_normalized() {
        assert!(same_slot(Some("0105 07443 0257"), Some("010507443 0257")));
        // Raw equality on one side only would miss this pair.
        assert_ne!("0105 07443 0257", normalize(Some("010507443 0257")));
        assert!(!same_slot(None, None));
        assert!(!same_slot(Some(" "), Some("")));
    }

    #[test]
    fn composite_key_normalizes_text_parts() {
        let a = CompositeKey::new(2568, Some("0105 07443 0257"), Some(" กก.1 "), Some(3));
        let b = CompositeKey::new(2568, Some("010507443 0257"), Some("กก.1"), Some(3));
        assert_eq!(a, b);
        assert_ne!(a, CompositeKey::new(2567, Some("0105074430257"), Some("กก.1"), Some(3)));
        assert_ne!(a, CompositeKey::new(2568, Some("0105074430257"), Some("กก.1"), None));
        assert!(a.is_matchable());
        assert!(!CompositeKey::new(2568, None, Some("x"), None).is_matchable());
    }
}
