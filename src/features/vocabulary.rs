//! Fixed category vocabularies for one-hot encoding
//!
//! Derived once from training data and stored with the model so that live
//! rows are encoded against exactly the categories the model was fit on.

use crate::features::columns::ColumnKey;
use crate::features::table::FightTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A one-hot encoded categorical column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryFamily {
    Referee,
    WeightClass,
    StanceMatchup,
}

impl CategoryFamily {
    pub const ALL: [CategoryFamily; 3] = [
        CategoryFamily::Referee,
        CategoryFamily::WeightClass,
        CategoryFamily::StanceMatchup,
    ];

    /// Source column name, also the one-hot column prefix
    pub fn column(&self) -> &'static str {
        match self {
            CategoryFamily::Referee => "referee",
            CategoryFamily::WeightClass => "weight_class",
            CategoryFamily::StanceMatchup => "stance_matchup",
        }
    }
}

/// Sorted distinct categories per family
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryVocabulary {
    pub referee: Vec<String>,
    pub weight_class: Vec<String>,
    pub stance_matchup: Vec<String>,
}

impl CategoryVocabulary {
    /// Collect categories from the table's categorical shared columns
    pub fn from_table(table: &FightTable) -> Self {
        let collect = |family: CategoryFamily| -> Vec<String> {
            table
                .categorical(&ColumnKey::shared(family.column()))
                .map(|values| {
                    values
                        .iter()
                        .flatten()
                        .cloned()
                        .collect::<BTreeSet<String>>()
                        .into_iter()
                        .collect()
                })
                .unwrap_or_default()
        };

        CategoryVocabulary {
            referee: collect(CategoryFamily::Referee),
            weight_class: collect(CategoryFamily::WeightClass),
            stance_matchup: collect(CategoryFamily::StanceMatchup),
        }
    }

    pub fn categories(&self, family: CategoryFamily) -> &[String] {
        match family {
            CategoryFamily::Referee => &self.referee,
            CategoryFamily::WeightClass => &self.weight_class,
            CategoryFamily::StanceMatchup => &self.stance_matchup,
        }
    }

    /// Encoded categories: all but the first, which is the implicit baseline
    fn encoded(&self, family: CategoryFamily) -> &[String] {
        let categories = self.categories(family);
        if categories.is_empty() {
            categories
        } else {
            &categories[1..]
        }
    }

    /// One-hot column names for a family, in encoding order
    pub fn column_names(&self, family: CategoryFamily) -> Vec<String> {
        self.encoded(family)
            .iter()
            .map(|category| format!("{}_{}", family.column(), category))
            .collect()
    }

    /// Encode one value; unknown or missing values are all zeros
    pub fn encode(&self, family: CategoryFamily, value: Option<&str>) -> Vec<(String, f64)> {
        self.encoded(family)
            .iter()
            .map(|category| {
                let hot = value == Some(category.as_str());
                (
                    format!("{}_{}", family.column(), category),
                    if hot { 1.0 } else { 0.0 },
                )
            })
            .collect()
    }
}

/// Joint stance category for a pairing
pub fn stance_matchup(stance_a: Option<&str>, stance_b: Option<&str>) -> String {
    format!(
        "{}_vs_{}",
        stance_a.unwrap_or("Unknown"),
        stance_b.unwrap_or("Unknown")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_vocabulary() -> CategoryVocabulary {
        CategoryVocabulary {
            referee: vec!["Herb Dean".into(), "Marc Goddard".into()],
            weight_class: vec!["Bantamweight Bout".into()],
            stance_matchup: vec![
                "Orthodox_vs_Orthodox".into(),
                "Orthodox_vs_Southpaw".into(),
                "Southpaw_vs_Orthodox".into(),
            ],
        }
    }

    #[test]
    fn test_first_category_dropped() {
        let vocab = make_vocabulary();
        assert_eq!(vocab.column_names(CategoryFamily::Referee), vec!["referee_Marc Goddard"]);
        assert!(vocab.column_names(CategoryFamily::WeightClass).is_empty());
        assert_eq!(vocab.column_names(CategoryFamily::StanceMatchup).len(), 2);
    }

    #[test]
    fn test_encode_known_baseline_and_unseen() {
        let vocab = make_vocabulary();
        let hot = vocab.encode(CategoryFamily::Referee, Some("Marc Goddard"));
        assert_eq!(hot, vec![("referee_Marc Goddard".to_string(), 1.0)]);

        let baseline = vocab.encode(CategoryFamily::Referee, Some("Herb Dean"));
        assert_eq!(baseline[0].1, 0.0);

        let unseen = vocab.encode(CategoryFamily::StanceMatchup, Some("Switch_vs_Switch"));
        assert!(unseen.iter().all(|(_, v)| *v == 0.0));

        let missing = vocab.encode(CategoryFamily::Referee, None);
        assert!(missing.iter().all(|(_, v)| *v == 0.0));
    }

    #[test]
    fn test_stance_matchup_defaults_unknown() {
        assert_eq!(stance_matchup(Some("Orthodox"), None), "Orthodox_vs_Unknown");
        assert_eq!(stance_matchup(None, None), "Unknown_vs_Unknown");
    }
}
