//! Closed set of disease/health categories the classifier can emit.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Disease or health state of a cotton plant.
///
/// The label strings returned by [`Category::label`] are the exact labels the
/// trained classifier was exported with (`class_names.json`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Category {
    Aphids,
    ArmyWorm,
    BacterialBlight,
    CottonBollRot,
    GreenCottonBoll,
    Healthy,
    PowderyMildew,
    TargetSpot,
}

impl Category {
    /// Every category, in classifier index order.
    pub const ALL: [Category; 8] = [
        Category::Aphids,
        Category::ArmyWorm,
        Category::BacterialBlight,
        Category::CottonBollRot,
        Category::GreenCottonBoll,
        Category::Healthy,
        Category::PowderyMildew,
        Category::TargetSpot,
    ];

    /// Classifier label for this category.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Aphids => "Aphids",
            Category::ArmyWorm => "Army worm",
            Category::BacterialBlight => "Bacterial blight",
            Category::CottonBollRot => "Cotton Boll Rot",
            Category::GreenCottonBoll => "Green Cotton Boll",
            Category::Healthy => "Healthy",
            Category::PowderyMildew => "Powdery mildew",
            Category::TargetSpot => "Target spot",
        }
    }

    /// Parse a classifier label. Returns `None` for labels outside the set.
    pub fn from_label(label: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.label() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a label does not name a known category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category label: {0:?}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::from_label(s).ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl TryFrom<String> for Category {
    type Error = UnknownCategory;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.label().to_string()
    }
}
