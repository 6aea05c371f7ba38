//! The individual cross-entity checks.
//!
//! Every check is a pure function over the slots it covers and stays silent
//! about slots other checks own (a missing slot is `required_slots`'
//! business alone).

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use super::{codes, Violation};
use crate::domains::registration::models::{
    ChannelKind, EducationPayload, MembershipCategory, StagedBundle,
};

lazy_static! {
    /// Postal code formats by ISO 3166-1 alpha-2 country. Countries absent
    /// from the table get no format check.
    static ref POSTAL_FORMATS: HashMap<&'static str, Regex> = {
        let mut m = HashMap::new();
        m.insert("US", Regex::new(r"^\d{5}(-\d{4})?$").unwrap());
        m.insert("CA", Regex::new(r"^[A-Za-z]\d[A-Za-z] ?\d[A-Za-z]\d$").unwrap());
        m.insert("GB", Regex::new(r"^[A-Za-z]{1,2}\d[A-Za-z\d]? ?\d[A-Za-z]{2}$").unwrap());
        m.insert("NL", Regex::new(r"^\d{4} ?[A-Za-z]{2}$").unwrap());
        m.insert("DE", Regex::new(r"^\d{5}$").unwrap());
        m.insert("FR", Regex::new(r"^\d{5}$").unwrap());
        m.insert("AU", Regex::new(r"^\d{4}$").unwrap());
        m
    };
}

/// Countries whose addresses need a region/state/province.
const REGION_REQUIRED: &[&str] = &["US", "CA", "AU"];

fn is_alpha2(country: &str) -> bool {
    country.len() == 2 && country.chars().all(|c| c.is_ascii_uppercase())
}

/// Slots every registration needs, regardless of flow.
pub fn required_slots(bundle: &StagedBundle) -> Vec<Violation> {
    let mut violations = Vec::new();

    match &bundle.person {
        None => violations.push(Violation::required("person")),
        Some(person) if person.email.trim().is_empty() => {
            violations.push(Violation::required("person.email"));
        }
        Some(_) => {}
    }
    if bundle.address.is_none() {
        violations.push(Violation::required("address"));
    }
    if bundle.contact_channels.is_none() {
        violations.push(Violation::required("contact_channels"));
    }
    if bundle.membership.is_none() {
        violations.push(Violation::required("membership"));
    }

    violations
}

/// The membership declaration must be accepted.
pub fn declaration(bundle: &StagedBundle) -> Vec<Violation> {
    match &bundle.membership {
        Some(membership) if !membership.declaration_accepted => vec![Violation::new(
            "membership.declaration_accepted",
            codes::REQUIRED,
            "the membership declaration must be accepted",
        )],
        _ => Vec::new(),
    }
}

/// Postal code format and region presence, per country.
pub fn address_geography(bundle: &StagedBundle) -> Vec<Violation> {
    let Some(address) = &bundle.address else {
        return Vec::new();
    };
    let mut violations = Vec::new();

    if !is_alpha2(&address.country) {
        violations.push(Violation::new(
            "address.country",
            codes::INVALID_FORMAT,
            "country must be an ISO 3166-1 alpha-2 code",
        ));
        // Without a country there is nothing to check the rest against.
        return violations;
    }

    if let Some(format) = POSTAL_FORMATS.get(address.country.as_str()) {
        if !format.is_match(address.postal_code.trim()) {
            violations.push(Violation::new(
                "address.postal_code",
                codes::INVALID_FORMAT,
                format!(
                    "'{}' is not a valid postal code for {}",
                    address.postal_code, address.country
                ),
            ));
        }
    }

    if REGION_REQUIRED.contains(&address.country.as_str())
        && address.region.as_deref().map_or(true, |r| r.trim().is_empty())
    {
        violations.push(Violation::new(
            "address.region",
            codes::REQUIRED,
            format!("addresses in {} need a region", address.country),
        ));
    }

    violations
}

/// The preferred channel must be staged, and a staged email channel must
/// agree with the root record's email.
pub fn contact_consistency(bundle: &StagedBundle) -> Vec<Violation> {
    let Some(contact) = &bundle.contact_channels else {
        return Vec::new();
    };
    let mut violations = Vec::new();

    if contact.channels.is_empty() {
        violations.push(Violation::new(
            "contact_channels.channels",
            codes::REQUIRED,
            "at least one contact channel is required",
        ));
    } else if !contact.channels.iter().any(|c| c.kind == contact.preferred) {
        violations.push(Violation::new(
            "contact_channels.preferred",
            codes::INCONSISTENT,
            format!("preferred channel '{}' is not staged", contact.preferred),
        ));
    }

    if let Some(person) = &bundle.person {
        let mismatched = contact
            .channels
            .iter()
            .filter(|c| c.kind == ChannelKind::Email)
            .any(|c| !c.value.eq_ignore_ascii_case(person.email.trim()));
        if mismatched {
            violations.push(Violation::new(
                "contact_channels.channels",
                codes::MISMATCH,
                "email channel does not match the applicant's primary email",
            ));
        }
    }

    violations
}

/// Birth date sanity and identity document coherence.
pub fn identity_consistency(bundle: &StagedBundle) -> Vec<Violation> {
    let mut violations = Vec::new();
    let today = Utc::now().date_naive();

    if let Some(person) = &bundle.person {
        if let Some(birth_date) = person.birth_date {
            if birth_date >= today {
                violations.push(Violation::new(
                    "person.birth_date",
                    codes::INCONSISTENT,
                    "birth date must lie in the past",
                ));
            }
        }
    }

    if let Some(identity) = &bundle.identity {
        if identity.document_number.trim().is_empty() {
            violations.push(Violation::required("identity.document_number"));
        }
        if !is_alpha2(&identity.issuing_country) {
            violations.push(Violation::new(
                "identity.issuing_country",
                codes::INVALID_FORMAT,
                "issuing country must be an ISO 3166-1 alpha-2 code",
            ));
        }
    }

    violations
}

/// Membership category and education variant must agree: student members
/// prove a current enrollment; professional categories may carry a
/// qualification but never a student enrollment.
pub fn education_category(bundle: &StagedBundle) -> Vec<Violation> {
    let Some(membership) = &bundle.membership else {
        return Vec::new();
    };
    let mut violations = Vec::new();
    let today = Utc::now().date_naive();
    let birth_date = bundle.person.as_ref().and_then(|p| p.birth_date);

    match (membership.category, &bundle.education) {
        (MembershipCategory::Student, None) => {
            violations.push(Violation::new(
                "education",
                codes::REQUIRED,
                "student membership needs an enrollment record",
            ));
        }
        (MembershipCategory::Student, Some(EducationPayload::Qualified { .. })) => {
            violations.push(Violation::new(
                "education",
                codes::MISMATCH,
                "student membership needs an enrollment, not a completed qualification",
            ));
        }
        (MembershipCategory::Student, Some(EducationPayload::Student { enrolled_since, .. })) => {
            if *enrolled_since > today {
                violations.push(Violation::new(
                    "education.enrolled_since",
                    codes::INCONSISTENT,
                    "enrollment cannot start in the future",
                ));
            }
            if let Some(birth) = birth_date {
                if *enrolled_since <= birth {
                    violations.push(Violation::new(
                        "education.enrolled_since",
                        codes::INCONSISTENT,
                        "enrollment predates the applicant's birth date",
                    ));
                }
            }
        }
        (
            MembershipCategory::Professional | MembershipCategory::Fellow,
            Some(EducationPayload::Student { .. }),
        ) => {
            violations.push(Violation::new(
                "education",
                codes::MISMATCH,
                "a student enrollment cannot support a professional category",
            ));
        }
        (
            MembershipCategory::Professional | MembershipCategory::Fellow,
            Some(EducationPayload::Qualified { awarded_on, .. }),
        ) => {
            if *awarded_on > today {
                violations.push(Violation::new(
                    "education.awarded_on",
                    codes::INCONSISTENT,
                    "qualification cannot be awarded in the future",
                ));
            }
            if let Some(birth) = birth_date {
                if *awarded_on <= birth {
                    violations.push(Violation::new(
                        "education.awarded_on",
                        codes::INCONSISTENT,
                        "qualification predates the applicant's birth date",
                    ));
                }
            }
        }
        // Qualification records are optional for professional categories.
        (MembershipCategory::Professional | MembershipCategory::Fellow, None) => {}
    }

    violations
}
