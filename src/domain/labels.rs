//! Fixed label sets for the two diagnostic tiers.
//!
//! These label sets (and their serialized names) are part of the
//! compatibility contract with the report layer and the vision
//! collaborator, and must not be reordered.

use serde::{Deserialize, Serialize};

/// Coarse 5-way category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tier1Label {
    Fungal,
    Inflammatory,
    Normal,
    Malignant,
    Benign,
}

impl Tier1Label {
    /// All tier-1 labels, in contract order.
    pub const ALL: [Tier1Label; 5] = [
        Tier1Label::Fungal,
        Tier1Label::Inflammatory,
        Tier1Label::Normal,
        Tier1Label::Malignant,
        Tier1Label::Benign,
    ];

    /// The serialized name of this label.
    pub fn as_str(self) -> &'static str {
        match self {
            Tier1Label::Fungal => "fungal",
            Tier1Label::Inflammatory => "inflammatory",
            Tier1Label::Normal => "normal",
            Tier1Label::Malignant => "malignant",
            Tier1Label::Benign => "benign",
        }
    }
}

/// Fine-grained 10-way disease label.
///
/// The declaration order doubles as the class-index order of a 10-class
/// lesion classifier: class index `i` maps to `Tier2Label::ALL[i]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tier2Label {
    Melanoma,
    /// Basal cell carcinoma.
    Bcc,
    Eczema,
    AtopicDermatitis,
    MelanocyticNevi,
    /// Benign keratosis-like lesions.
    Bkl,
    Psoriasis,
    SeborrheicKeratoses,
    Tinea,
    Warts,
}

impl Tier2Label {
    /// All tier-2 labels, in contract order.
    pub const ALL: [Tier2Label; 10] = [
        Tier2Label::Melanoma,
        Tier2Label::Bcc,
        Tier2Label::Eczema,
        Tier2Label::AtopicDermatitis,
        Tier2Label::MelanocyticNevi,
        Tier2Label::Bkl,
        Tier2Label::Psoriasis,
        Tier2Label::SeborrheicKeratoses,
        Tier2Label::Tinea,
        Tier2Label::Warts,
    ];

    /// The serialized name of this label.
    pub fn as_str(self) -> &'static str {
        match self {
            Tier2Label::Melanoma => "melanoma",
            Tier2Label::Bcc => "bcc",
            Tier2Label::Eczema => "eczema",
            Tier2Label::AtopicDermatitis => "atopicDermatitis",
            Tier2Label::MelanocyticNevi => "melanocyticNevi",
            Tier2Label::Bkl => "bkl",
            Tier2Label::Psoriasis => "psoriasis",
            Tier2Label::SeborrheicKeratoses => "seborrheicKeratoses",
            Tier2Label::Tinea => "tinea",
            Tier2Label::Warts => "warts",
        }
    }

    /// The coarse category this disease aggregates into.
    pub fn tier1(self) -> Tier1Label {
        match self {
            Tier2Label::Melanoma | Tier2Label::Bcc => Tier1Label::Malignant,
            Tier2Label::Eczema | Tier2Label::AtopicDermatitis | Tier2Label::Psoriasis => {
                Tier1Label::Inflammatory
            }
            Tier2Label::MelanocyticNevi
            | Tier2Label::Bkl
            | Tier2Label::SeborrheicKeratoses
            | Tier2Label::Warts => Tier1Label::Benign,
            Tier2Label::Tinea => Tier1Label::Fungal,
        }
    }
}
