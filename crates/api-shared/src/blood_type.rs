//! Canonical blood-type labels.
//!
//! The RPC wire carries blood type as the `BloodType` enum ordinal; REST JSON and stored
//! documents carry the label. Both directions go through this module so the two can never drift.

use crate::pb::BloodType;

/// Label used for [`BloodType::Unspecified`].
pub const UNSPECIFIED_LABEL: &str = "unspecified";

/// All labels in ordinal order, `unspecified` first.
pub const LABELS: [&str; 9] = [
    UNSPECIFIED_LABEL,
    "A+",
    "A-",
    "B+",
    "B-",
    "AB+",
    "AB-",
    "O+",
    "O-",
];

impl BloodType {
    /// Returns the canonical label for this blood type.
    pub fn label(self) -> &'static str {
        match self {
            BloodType::Unspecified => UNSPECIFIED_LABEL,
            BloodType::APositive => "A+",
            BloodType::ANegative => "A-",
            BloodType::BPositive => "B+",
            BloodType::BNegative => "B-",
            BloodType::AbPositive => "AB+",
            BloodType::AbNegative => "AB-",
            BloodType::OPositive => "O+",
            BloodType::ONegative => "O-",
        }
    }

    /// Parses a canonical label. Returns `None` for anything else.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            UNSPECIFIED_LABEL => Some(BloodType::Unspecified),
            "A+" => Some(BloodType::APositive),
            "A-" => Some(BloodType::ANegative),
            "B+" => Some(BloodType::BPositive),
            "B-" => Some(BloodType::BNegative),
            "AB+" => Some(BloodType::AbPositive),
            "AB-" => Some(BloodType::AbNegative),
            "O+" => Some(BloodType::OPositive),
            "O-" => Some(BloodType::ONegative),
            _ => None,
        }
    }

    /// Parses a label, falling back to `Unspecified` for unrecognised input.
    pub fn from_label_or_unspecified(label: &str) -> Self {
        Self::from_label(label).unwrap_or(BloodType::Unspecified)
    }

    /// Decodes a raw wire ordinal, falling back to `Unspecified` for unknown values.
    pub fn from_ordinal(ordinal: i32) -> Self {
        BloodType::try_from(ordinal).unwrap_or(BloodType::Unspecified)
    }
}
