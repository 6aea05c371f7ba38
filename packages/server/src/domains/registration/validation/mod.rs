//! Cross-entity validation of a staged bundle.
//!
//! A fixed, ordered set of independent checks runs over the bundle; each
//! check is a pure function of its slice(s) and returns zero or more
//! violations. The validator collects everything — callers present all
//! problems at once, never one-at-a-time.

pub mod checks;

use serde::{Deserialize, Serialize};

use crate::domains::registration::models::StagedBundle;

/// One validation failure, addressed to a bundle field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted path into the bundle, e.g. `address.postal_code`
    pub field: String,
    /// Stable machine code, e.g. `REQUIRED`, `INVALID_FORMAT`, `MISMATCH`
    pub code: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: &str, code: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn required(field: &str) -> Self {
        Self::new(field, codes::REQUIRED, format!("{field} is required"))
    }
}

/// Stable violation codes.
pub mod codes {
    pub const REQUIRED: &str = "REQUIRED";
    pub const INVALID_FORMAT: &str = "INVALID_FORMAT";
    pub const MISMATCH: &str = "MISMATCH";
    pub const INCONSISTENT: &str = "INCONSISTENT";
}

type Check = fn(&StagedBundle) -> Vec<Violation>;

/// The fixed check order. Checks are independent: a slot one check flags as
/// missing does not stop the others from inspecting the slots they cover.
const CHECKS: &[Check] = &[
    checks::required_slots,
    checks::declaration,
    checks::address_geography,
    checks::contact_consistency,
    checks::identity_consistency,
    checks::education_category,
];

/// Run every check and collect the complete violation list. An empty result
/// means the bundle is eligible to advance past the validation gate.
pub fn validate_bundle(bundle: &StagedBundle) -> Vec<Violation> {
    CHECKS.iter().flat_map(|check| check(bundle)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::registration::models::{
        AddressPayload, ChannelKind, ContactChannel, ContactChannelsPayload, MembershipCategory,
        MembershipPayload, PersonPayload,
    };

    fn valid_bundle() -> StagedBundle {
        StagedBundle {
            person: Some(PersonPayload {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.org".into(),
                birth_date: chrono::NaiveDate::from_ymd_opt(1990, 12, 10),
                salutation: None,
            }),
            address: Some(AddressPayload {
                line1: "1 Main St".into(),
                line2: None,
                city: "Utrecht".into(),
                region: None,
                postal_code: "3511 AB".into(),
                country: "NL".into(),
            }),
            contact_channels: Some(ContactChannelsPayload {
                channels: vec![ContactChannel {
                    kind: ChannelKind::Email,
                    value: "ada@example.org".into(),
                }],
                preferred: ChannelKind::Email,
            }),
            identity: None,
            education: None,
            membership: Some(MembershipPayload {
                category: MembershipCategory::Professional,
                declaration_accepted: true,
                auto_renew: false,
            }),
        }
    }

    #[test]
    fn valid_bundle_passes_cleanly() {
        assert!(validate_bundle(&valid_bundle()).is_empty());
    }

    #[test]
    fn missing_declaration_yields_exactly_one_violation() {
        let mut bundle = valid_bundle();
        bundle.membership.as_mut().unwrap().declaration_accepted = false;

        let violations = validate_bundle(&bundle);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "membership.declaration_accepted");
        assert_eq!(violations[0].code, codes::REQUIRED);
    }

    #[test]
    fn independent_violations_are_all_collected_in_one_pass() {
        let mut bundle = valid_bundle();
        // Three independent problems: bad postal code, missing declaration,
        // student category without an education record.
        bundle.address.as_mut().unwrap().postal_code = "not-a-code".into();
        bundle.membership.as_mut().unwrap().declaration_accepted = false;
        bundle.membership.as_mut().unwrap().category = MembershipCategory::Student;

        let violations = validate_bundle(&bundle);

        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert!(fields.contains(&"address.postal_code"), "{fields:?}");
        assert!(fields.contains(&"membership.declaration_accepted"), "{fields:?}");
        assert!(fields.contains(&"education"), "{fields:?}");
        assert_eq!(violations.len(), 3, "{violations:?}");
    }
}
