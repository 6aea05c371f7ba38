//! Test fixtures for staged bundles.

use chrono::NaiveDate;
use server_core::domains::registration::models::{
    AddressPayload, ChannelKind, ContactChannel, ContactChannelsPayload, EducationPayload,
    IdentityDocumentType, IdentityPayload, MembershipCategory, MembershipPayload, PersonPayload,
    StagedBundle,
};

/// A complete, valid professional-category bundle.
pub fn complete_bundle(email: &str) -> StagedBundle {
    StagedBundle {
        person: Some(PersonPayload {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            birth_date: NaiveDate::from_ymd_opt(1990, 12, 10),
            salutation: Some("Ms".into()),
        }),
        address: Some(AddressPayload {
            line1: "Oudegracht 1".into(),
            line2: None,
            city: "Utrecht".into(),
            region: None,
            postal_code: "3511 AB".into(),
            country: "NL".into(),
        }),
        contact_channels: Some(ContactChannelsPayload {
            channels: vec![
                ContactChannel {
                    kind: ChannelKind::Email,
                    value: email.into(),
                },
                ContactChannel {
                    kind: ChannelKind::Phone,
                    value: "+31 30 555 0100".into(),
                },
            ],
            preferred: ChannelKind::Email,
        }),
        identity: Some(IdentityPayload {
            document_type: IdentityDocumentType::Passport,
            document_number: "NXK912874".into(),
            issuing_country: "NL".into(),
        }),
        education: None,
        membership: Some(MembershipPayload {
            category: MembershipCategory::Professional,
            declaration_accepted: true,
            auto_renew: true,
        }),
    }
}

/// A valid student-category bundle (education record present).
pub fn student_bundle(email: &str) -> StagedBundle {
    let mut bundle = complete_bundle(email);
    bundle.membership = Some(MembershipPayload {
        category: MembershipCategory::Student,
        declaration_accepted: true,
        auto_renew: false,
    });
    bundle.education = Some(EducationPayload::Student {
        institution: "Utrecht University".into(),
        program: "Computing Science".into(),
        enrolled_since: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
        expected_graduation: NaiveDate::from_ymd_opt(2027, 7, 1),
    });
    bundle
}

/// Valid except for the unaccepted membership declaration.
pub fn bundle_missing_declaration(email: &str) -> StagedBundle {
    let mut bundle = complete_bundle(email);
    bundle.membership.as_mut().unwrap().declaration_accepted = false;
    bundle
}
