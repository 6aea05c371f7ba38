//! Staged entity bundle - the not-yet-persisted payload covering every
//! record a registration will create in the system of record.
//!
//! Slots stay mutable while the session is pre-validation and are frozen by
//! the state machine once the validation gate passes (merging is only
//! offered in pre-validation states).

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Entity types
// ============================================================================

/// The business-entity domains a registration materializes, in no particular
/// order (the creation order lives in the sequencer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Root person record; every other entity references its id
    Person,
    Address,
    ContactChannels,
    Identity,
    Education,
    Membership,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "person",
            EntityType::Address => "address",
            EntityType::ContactChannels => "contact_channels",
            EntityType::Identity => "identity",
            EntityType::Education => "education",
            EntityType::Membership => "membership",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Per-entity payloads
// ============================================================================

/// Root person record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonPayload {
    pub first_name: String,
    pub last_name: String,
    /// Primary email; doubles as the natural key for duplicate detection.
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub salutation: Option<String>,
}

/// Postal address. `country` is ISO 3166-1 alpha-2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressPayload {
    pub line1: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Email,
    Phone,
    Post,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelKind::Email => "email",
            ChannelKind::Phone => "phone",
            ChannelKind::Post => "post",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactChannel {
    pub kind: ChannelKind,
    pub value: String,
}

/// Communication channels plus the member's preferred one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactChannelsPayload {
    pub channels: Vec<ContactChannel>,
    pub preferred: ChannelKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityDocumentType {
    Passport,
    NationalId,
    DriversLicense,
}

/// Identity attributes (document held by the applicant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityPayload {
    pub document_type: IdentityDocumentType,
    pub document_number: String,
    /// ISO 3166-1 alpha-2 of the issuing country
    pub issuing_country: String,
}

/// Education variant. Student enrollments and completed qualifications carry
/// different fields, so this is a tagged enum rather than one struct with
/// many optionals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EducationPayload {
    Student {
        institution: String,
        program: String,
        enrolled_since: NaiveDate,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        expected_graduation: Option<NaiveDate>,
    },
    Qualified {
        institution: String,
        qualification: String,
        awarded_on: NaiveDate,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipCategory {
    Student,
    Professional,
    Fellow,
}

/// Membership/management attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipPayload {
    pub category: MembershipCategory,
    /// The applicant's acceptance of the membership declaration. Must be
    /// true before the bundle can pass validation.
    #[serde(default)]
    pub declaration_accepted: bool,
    #[serde(default)]
    pub auto_renew: bool,
}

// ============================================================================
// The bundle
// ============================================================================

/// One payload slot per entity domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StagedBundle {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub person: Option<PersonPayload>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub address: Option<AddressPayload>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub contact_channels: Option<ContactChannelsPayload>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub identity: Option<IdentityPayload>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub education: Option<EducationPayload>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub membership: Option<MembershipPayload>,
}

impl StagedBundle {
    /// Merge a partial bundle into this one, slot-wise. A slot present in
    /// `update` replaces the existing slot wholesale.
    pub fn merge(&mut self, update: StagedBundle) {
        if update.person.is_some() {
            self.person = update.person;
        }
        if update.address.is_some() {
            self.address = update.address;
        }
        if update.contact_channels.is_some() {
            self.contact_channels = update.contact_channels;
        }
        if update.identity.is_some() {
            self.identity = update.identity;
        }
        if update.education.is_some() {
            self.education = update.education;
        }
        if update.membership.is_some() {
            self.membership = update.membership;
        }
    }

    pub fn has(&self, entity: EntityType) -> bool {
        match entity {
            EntityType::Person => self.person.is_some(),
            EntityType::Address => self.address.is_some(),
            EntityType::ContactChannels => self.contact_channels.is_some(),
            EntityType::Identity => self.identity.is_some(),
            EntityType::Education => self.education.is_some(),
            EntityType::Membership => self.membership.is_some(),
        }
    }

    /// Serialize one slot into the creation payload handed to the entity's
    /// client. Per-entity field mapping onto remote attribute names is the
    /// client's concern, not the bundle's.
    pub fn payload_for(
        &self,
        entity: EntityType,
    ) -> Result<Option<serde_json::Value>, serde_json::Error> {
        Ok(match entity {
            EntityType::Person => self.person.as_ref().map(serde_json::to_value).transpose()?,
            EntityType::Address => self.address.as_ref().map(serde_json::to_value).transpose()?,
            EntityType::ContactChannels => self
                .contact_channels
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?,
            EntityType::Identity => self
                .identity
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?,
            EntityType::Education => self
                .education
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?,
            EntityType::Membership => self
                .membership
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?,
        })
    }
}

// ============================================================================
// Foreign keys between creation steps
// ============================================================================

/// Ids generated by earlier creation steps, keyed by entity type. Handed to
/// each creation client so it can bind foreign keys at creation time.
#[derive(Debug, Default, Clone)]
pub struct ParentKeys {
    keys: HashMap<EntityType, Uuid>,
}

impl ParentKeys {
    pub fn insert(&mut self, entity: EntityType, id: Uuid) {
        self.keys.insert(entity, id);
    }

    pub fn get(&self, entity: EntityType) -> Option<Uuid> {
        self.keys.get(&entity).copied()
    }

    /// Look up a parent id that the creation order guarantees to exist.
    pub fn require(&self, entity: EntityType) -> Result<Uuid> {
        self.get(entity)
            .with_context(|| format!("no id recorded for parent entity '{entity}'"))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_replaces_only_present_slots() {
        let mut bundle = StagedBundle {
            person: Some(PersonPayload {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.org".into(),
                birth_date: None,
                salutation: None,
            }),
            ..Default::default()
        };

        bundle.merge(StagedBundle {
            address: Some(AddressPayload {
                line1: "1 Main St".into(),
                line2: None,
                city: "Utrecht".into(),
                region: None,
                postal_code: "3511 AB".into(),
                country: "NL".into(),
            }),
            ..Default::default()
        });

        assert!(bundle.person.is_some());
        assert!(bundle.address.is_some());
        assert!(!bundle.has(EntityType::Membership));
    }

    #[test]
    fn education_variant_round_trips_with_tag() {
        let education = EducationPayload::Student {
            institution: "TU Delft".into(),
            program: "Applied Physics".into(),
            enrolled_since: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            expected_graduation: None,
        };
        let json = serde_json::to_value(&education).unwrap();
        assert_eq!(json["kind"], "student");
        let back: EducationPayload = serde_json::from_value(json).unwrap();
        assert!(matches!(back, EducationPayload::Student { .. }));
    }

    #[test]
    fn parent_keys_require_names_the_missing_entity() {
        let keys = ParentKeys::default();
        let err = keys.require(EntityType::Person).unwrap_err();
        assert!(err.to_string().contains("person"));
    }
}
