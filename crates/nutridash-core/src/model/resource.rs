use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// One of the manageable collections.
///
/// The Clinical screen switches between `Conditions` and `Allergies`;
/// Ingredients and Meals (`Foods`) are single-kind screens.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Conditions,
    Allergies,
    Ingredients,
    #[strum(to_string = "foods", serialize = "meals")]
    Foods,
}

impl ResourceKind {
    /// Backend path segment.
    pub fn path(self) -> &'static str {
        self.into()
    }

    /// Path segments of the create endpoint.
    pub fn create_segments(self) -> &'static [&'static str] {
        match self {
            Self::Conditions => &["conditions"],
            Self::Allergies => &["allergies"],
            Self::Ingredients => &["ingredients", "save"],
            Self::Foods => &["foods", "save"],
        }
    }

    /// Singular noun for messages.
    pub fn singular(self) -> &'static str {
        match self {
            Self::Conditions => "condition",
            Self::Allergies => "allergy",
            Self::Ingredients => "ingredient",
            Self::Foods => "food",
        }
    }

    /// `true` for the kinds grouped on the Clinical screen.
    pub fn is_clinical(self) -> bool {
        matches!(self, Self::Conditions | Self::Allergies)
    }
}
