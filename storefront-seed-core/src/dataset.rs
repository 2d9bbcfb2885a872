//! Source dataset: the categories, customizations and menu items a run seeds.
//!
//! The dataset is plain JSON with three top-level arrays. A sample food menu is
//! compiled into the crate and available through [`Dataset::bundled`].
//!
//! [`Dataset::validate`] checks every cross-entity reference up front, so a
//! dataset that could never seed cleanly is rejected before anything is purged.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

const BUNDLED_DATASET: &str = include_str!("../data/menu.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub description: String,
}

/// What a customization changes about a menu item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomizationKind {
    Topping,
    Side,
    Size,
    Crust,
    /// Anything the storefront has no dedicated grouping for.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customization {
    pub name: String,
    pub price: f64,
    #[serde(rename = "type")]
    pub kind: CustomizationKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub description: String,
    /// Source reference of the image; re-hosted in the blob store during seeding.
    pub image_url: String,
    pub price: f64,
    pub rating: f64,
    pub calories: u32,
    pub protein: f64,
    pub category_name: String,
    /// Names of the customizations this item offers, in display order.
    #[serde(default)]
    pub customizations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub categories: Vec<Category>,
    pub customizations: Vec<Customization>,
    pub menu: Vec<MenuItem>,
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("dataset is invalid:\n{}", format_problems(.0))]
    Invalid(Vec<Problem>),
}

/// A single integrity problem found by [`Dataset::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Problem {
    DuplicateName { entity: &'static str, name: String },
    UnknownCategory { item: String, category: String },
    UnknownCustomization { item: String, customization: String },
    RepeatedCustomization { item: String, customization: String },
    NegativeValue { entity: &'static str, name: String, field: &'static str },
    RatingOutOfRange { item: String, rating: f64 },
    MissingImage { item: String },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::DuplicateName { entity, name } => {
                write!(f, "duplicate {entity} name {name:?}")
            }
            Problem::UnknownCategory { item, category } => {
                write!(f, "menu item {item:?} references unresolved category {category:?}")
            }
            Problem::UnknownCustomization {
                item,
                customization,
            } => write!(
                f,
                "menu item {item:?} references unresolved customization {customization:?}"
            ),
            Problem::RepeatedCustomization {
                item,
                customization,
            } => write!(
                f,
                "menu item {item:?} lists customization {customization:?} more than once"
            ),
            Problem::NegativeValue {
                entity,
                name,
                field,
            } => write!(f, "{entity} {name:?} has a negative {field}"),
            Problem::RatingOutOfRange { item, rating } => {
                write!(f, "menu item {item:?} has rating {rating} outside 1..=5")
            }
            Problem::MissingImage { item } => write!(f, "menu item {item:?} has no image_url"),
        }
    }
}

fn format_problems(problems: &[Problem]) -> String {
    problems
        .iter()
        .map(|p| format!("  - {p}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Dataset {
    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        info!(dataset_path = ?path, "Loading dataset from file");
        let content = std::fs::read_to_string(path).map_err(|e| {
            error!(error = ?e, dataset_path = ?path, "Failed to read dataset file");
            DatasetError::Io {
                path: path.display().to_string(),
                source: e,
            }
        })?;
        let dataset = Self::from_json(&content)?;
        dataset.trace_loaded();
        Ok(dataset)
    }

    /// The sample storefront menu shipped with the crate.
    pub fn bundled() -> Result<Self, DatasetError> {
        let dataset = Self::from_json(BUNDLED_DATASET)?;
        dataset.trace_loaded();
        Ok(dataset)
    }

    pub fn trace_loaded(&self) {
        info!(
            categories = self.categories.len(),
            customizations = self.customizations.len(),
            menu_items = self.menu.len(),
            links = self.link_count(),
            "Loaded Dataset"
        );
    }

    /// Number of menu item → customization links a run creates.
    pub fn link_count(&self) -> usize {
        self.menu.iter().map(|m| m.customizations.len()).sum()
    }

    /// Checks names, references and value ranges. Collects every problem instead of stopping at the first.
    pub fn validate(&self) -> Result<(), DatasetError> {
        let mut problems = Vec::new();

        let categories = unique_names(
            "category",
            self.categories.iter().map(|c| c.name.as_str()),
            &mut problems,
        );
        let customizations = unique_names(
            "customization",
            self.customizations.iter().map(|c| c.name.as_str()),
            &mut problems,
        );
        unique_names(
            "menu item",
            self.menu.iter().map(|m| m.name.as_str()),
            &mut problems,
        );

        for cus in &self.customizations {
            if cus.price < 0.0 {
                problems.push(Problem::NegativeValue {
                    entity: "customization",
                    name: cus.name.clone(),
                    field: "price",
                });
            }
        }

        for item in &self.menu {
            if !categories.contains(item.category_name.as_str()) {
                problems.push(Problem::UnknownCategory {
                    item: item.name.clone(),
                    category: item.category_name.clone(),
                });
            }

            let mut seen = HashSet::new();
            for cus_name in &item.customizations {
                if !customizations.contains(cus_name.as_str()) {
                    problems.push(Problem::UnknownCustomization {
                        item: item.name.clone(),
                        customization: cus_name.clone(),
                    });
                }
                if !seen.insert(cus_name.as_str()) {
                    problems.push(Problem::RepeatedCustomization {
                        item: item.name.clone(),
                        customization: cus_name.clone(),
                    });
                }
            }

            for (field, value) in [("price", item.price), ("protein", item.protein)] {
                if value < 0.0 {
                    problems.push(Problem::NegativeValue {
                        entity: "menu item",
                        name: item.name.clone(),
                        field,
                    });
                }
            }
            if !(1.0..=5.0).contains(&item.rating) {
                problems.push(Problem::RatingOutOfRange {
                    item: item.name.clone(),
                    rating: item.rating,
                });
            }
            if item.image_url.trim().is_empty() {
                problems.push(Problem::MissingImage {
                    item: item.name.clone(),
                });
            }
        }

        if problems.is_empty() {
            debug!("Dataset validated without problems");
            Ok(())
        } else {
            error!(problems = problems.len(), "Dataset failed validation");
            Err(DatasetError::Invalid(problems))
        }
    }
}

fn unique_names<'a>(
    entity: &'static str,
    names: impl Iterator<Item = &'a str>,
    problems: &mut Vec<Problem>,
) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            problems.push(Problem::DuplicateName {
                entity,
                name: name.to_string(),
            });
        }
    }
    seen
}
