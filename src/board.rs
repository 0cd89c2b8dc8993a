use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::catalog::WordCatalog;
use crate::types::{Card, CardRole, Difficulty};

/// Words drawn per tier for the taboo board.
pub const TIER_DRAW: usize = 2;

/// Cards on the team-affiliation grid.
pub const TEAM_BOARD_SIZE: usize = 25;

/// Revealed-card count at which the board gets topped up.
pub const REPLENISH_THRESHOLD: usize = 7;

/// Fresh cards appended per replenishment.
pub const REPLENISH_BATCH: usize = 3;

fn tier_points<R: Rng>(difficulty: Difficulty, rng: &mut R) -> u32 {
    match difficulty {
        Difficulty::Easy => rng.random_range(6..=8),
        Difficulty::Medium => rng.random_range(10..=14),
        Difficulty::Hard => rng.random_range(20..=30),
        Difficulty::Insane => rng.random_range(40..=64),
    }
}

/// Flat range used for replenished and team-affiliation cards.
fn default_points<R: Rng>(rng: &mut R) -> u32 {
    rng.random_range(5..=44)
}

fn new_card(word: String, difficulty: Difficulty, points: u32, catalog: &WordCatalog) -> Card {
    Card {
        forbidden: catalog.forbidden_for(&word).to_vec(),
        word,
        revealed: false,
        points,
        difficulty,
        role: None,
        team: None,
    }
}

/// Taboo board: two words per tier, tier-scaled points, shuffled order.
pub fn generate_taboo_board<R: Rng>(catalog: &WordCatalog, rng: &mut R) -> Vec<Card> {
    let mut cards = Vec::with_capacity(Difficulty::ALL.len() * TIER_DRAW);

    for difficulty in Difficulty::ALL {
        let mut tier: Vec<&String> = catalog.tier(difficulty).iter().collect();
        tier.shuffle(rng);
        for word in tier.into_iter().take(TIER_DRAW) {
            let points = tier_points(difficulty, rng);
            cards.push(new_card(word.clone(), difficulty, points, catalog));
        }
    }

    cards.shuffle(rng);
    cards
}

/// Team-affiliation board: 25 distinct words with the fixed role multiset
/// {9 red, 8 blue, 7 neutral, 1 elimination}, roles shuffled independently
/// of word order.
pub fn generate_team_board<R: Rng>(catalog: &WordCatalog, rng: &mut R) -> Vec<Card> {
    let mut pool = catalog.all_words();
    pool.shuffle(rng);
    pool.truncate(TEAM_BOARD_SIZE);

    let mut roles = Vec::with_capacity(TEAM_BOARD_SIZE);
    roles.extend(std::iter::repeat_n(CardRole::Red, 9));
    roles.extend(std::iter::repeat_n(CardRole::Blue, 8));
    roles.extend(std::iter::repeat_n(CardRole::Neutral, 7));
    roles.push(CardRole::Elimination);
    roles.shuffle(rng);

    pool.into_iter()
        .zip(roles)
        .map(|((word, difficulty), role)| {
            let points = default_points(rng);
            let mut card = new_card(word, difficulty, points, catalog);
            card.role = Some(role);
            card
        })
        .collect()
}

/// Checks that a catalog can fill every board shape: each tier must cover
/// the taboo draw and the catalog as a whole must cover the
/// team-affiliation grid.
pub fn validate_catalog(catalog: &WordCatalog) -> Result<(), String> {
    for difficulty in Difficulty::ALL {
        let have = catalog.tier(difficulty).len();
        if have < TIER_DRAW {
            return Err(format!(
                "{difficulty:?} tier has {have} words, needs at least {TIER_DRAW}"
            ));
        }
    }
    let total = catalog.len();
    if total < TEAM_BOARD_SIZE {
        return Err(format!(
            "catalog has {total} words, needs at least {TEAM_BOARD_SIZE}"
        ));
    }
    Ok(())
}

/// Tops up a board that is running out of playable words: once the revealed
/// count reaches the threshold, appends fresh unrevealed cards drawn
/// catalog-wide, leaving existing cards untouched. Returns whether anything
/// was appended.
pub fn replenish<R: Rng>(board: &mut Vec<Card>, catalog: &WordCatalog, rng: &mut R) -> bool {
    let revealed = board.iter().filter(|c| c.revealed).count();
    if revealed < REPLENISH_THRESHOLD {
        return false;
    }

    let on_board: HashSet<&str> = board.iter().map(|c| c.word.as_str()).collect();
    let mut pool: Vec<(String, Difficulty)> = catalog
        .all_words()
        .into_iter()
        .filter(|(word, _)| !on_board.contains(word.as_str()))
        .collect();
    pool.shuffle(rng);

    let mut appended = false;
    for (word, difficulty) in pool.into_iter().take(REPLENISH_BATCH) {
        let points = default_points(rng);
        board.push(new_card(word, difficulty, points, catalog));
        appended = true;
    }
    appended
}
