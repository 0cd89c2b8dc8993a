use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::Difficulty;

/// Tiered vocabulary with per-word forbidden-word hints.
///
/// Pure data; the board generator does all the sampling. Words without an
/// entry in `forbidden` simply have no hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordCatalog {
    pub easy: Vec<String>,
    pub medium: Vec<String>,
    pub hard: Vec<String>,
    pub insane: Vec<String>,
    #[serde(default)]
    pub forbidden: HashMap<String, Vec<String>>,
}

impl WordCatalog {
    pub fn tier(&self, difficulty: Difficulty) -> &[String] {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
            Difficulty::Insane => &self.insane,
        }
    }

    /// Every word in the catalog, tagged with its tier.
    pub fn all_words(&self) -> Vec<(String, Difficulty)> {
        Difficulty::ALL
            .iter()
            .flat_map(|&d| self.tier(d).iter().map(move |w| (w.clone(), d)))
            .collect()
    }

    pub fn forbidden_for(&self, word: &str) -> &[String] {
        self.forbidden.get(word).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        Difficulty::ALL.iter().map(|&d| self.tier(d).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

/// The built-in catalog, used when no `words.json` override exists.
pub fn default_catalog() -> WordCatalog {
    let forbidden: HashMap<String, Vec<String>> = [
        ("Apple", vec!["Fruit", "Red", "Tree", "Pie", "Juice"]),
        ("Car", vec!["Drive", "Road", "Engine", "Wheel", "Vehicle"]),
        ("Book", vec!["Read", "Pages", "Library", "Story", "Author"]),
        ("Dog", vec!["Bark", "Pet", "Tail", "Puppy", "Animal"]),
        ("Phone", vec!["Call", "Ring", "Mobile", "Screen", "Text"]),
        ("Sun", vec!["Sky", "Hot", "Light", "Star", "Day"]),
        ("Moon", vec!["Night", "Sky", "Full", "Crater", "Orbit"]),
        ("Tree", vec!["Leaf", "Branch", "Wood", "Forest", "Root"]),
        ("House", vec!["Home", "Roof", "Door", "Live", "Building"]),
        ("Cat", vec!["Meow", "Pet", "Whiskers", "Kitten", "Animal"]),
        ("River", vec!["Water", "Flow", "Bank", "Stream", "Fish"]),
        ("King", vec!["Crown", "Queen", "Royal", "Throne", "Rule"]),
        ("Fire", vec!["Burn", "Hot", "Flame", "Smoke", "Heat"]),
        ("Galaxy", vec!["Stars", "Space", "Milky", "Universe", "Spiral"]),
        ("Quantum", vec!["Physics", "Particle", "Mechanics", "Atom", "Wave"]),
        ("Eclipse", vec!["Sun", "Moon", "Shadow", "Block", "Total"]),
    ]
    .into_iter()
    .map(|(w, hints)| (w.to_string(), words(&hints)))
    .collect();

    WordCatalog {
        easy: words(&[
            "Apple", "Car", "Book", "Dog", "Phone", "Chair", "Table", "Sun", "Moon", "Star",
            "Tree", "House", "Road", "Water", "Cat", "Mouse",
        ]),
        medium: words(&[
            "River", "Cloud", "Bird", "Fish", "Flower", "Grass", "Window", "Door", "Light",
            "Shadow", "Ring", "King", "Queen",
        ]),
        hard: words(&[
            "Fire", "Mountain", "Galaxy", "Engine", "Library", "Author", "Puppy", "Vehicle",
            "Story", "Tail",
        ]),
        insane: words(&[
            "Quantum", "Algorithm", "Paradox", "Nebula", "Symbiosis", "Eclipse", "Entropy",
            "Singularity",
        ]),
        forbidden,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_all_tiers() {
        let catalog = default_catalog();
        for d in Difficulty::ALL {
            assert!(catalog.tier(d).len() >= 2, "tier {d:?} too small");
        }
        assert_eq!(catalog.len(), catalog.all_words().len());
    }

    #[test]
    fn forbidden_falls_back_to_empty() {
        let catalog = default_catalog();
        assert_eq!(catalog.forbidden_for("Apple").len(), 5);
        assert!(catalog.forbidden_for("Mouse").is_empty());
    }
}
