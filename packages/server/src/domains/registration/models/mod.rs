pub mod bundle;
pub mod session;

pub use bundle::{
    AddressPayload, ChannelKind, ContactChannel, ContactChannelsPayload, EducationPayload,
    EntityType, IdentityDocumentType, IdentityPayload, MembershipCategory, MembershipPayload,
    ParentKeys, PersonPayload, StagedBundle,
};
pub use session::{
    Decision, PricingLine, PricingQuote, RegistrationFlow, RegistrationSession, SessionSnapshot,
    SessionState, StepOutcome, StepRecord,
};
