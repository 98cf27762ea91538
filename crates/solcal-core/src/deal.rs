//! Deal records recovered from board dumps, and the fixture format the
//! solver reads them back in.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A card token: a rank (`A`, `2`..`10`, `J`, `Q`, `K`) optionally followed
/// by a suit letter. The single-character rank `T` is stored as `10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Card(String);

impl Card {
    /// Build a card from a raw token, normalizing the rank.
    pub fn parse(token: &str) -> Self {
        Card(normalize_rank(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rank part of the token.
    pub fn rank(&self) -> &str {
        match self.suit() {
            Some(suit) => &self.0[..self.0.len() - suit.len_utf8()],
            None => &self.0,
        }
    }

    /// Suit letter, when the token carries one.
    pub fn suit(&self) -> Option<char> {
        let last = self.0.chars().last()?;
        let is_suit = matches!(last.to_ascii_lowercase(), 'c' | 'd' | 'h' | 's');
        (is_suit && self.0.len() > 1).then_some(last)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rewrite a leading `T` rank as `10`. Every other token is returned as is.
pub fn normalize_rank(token: &str) -> String {
    match token.strip_prefix('T') {
        Some(rest) => format!("10{}", rest),
        None => token.to_string(),
    }
}

/// Structured board state.
///
/// Zones keep the order the cards had in the dump: left to right within
/// a line, and top to bottom across lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealRecord {
    pub foundations: Vec<Vec<Card>>,
    pub reserve: Vec<Card>,
    pub tableau_piles: Vec<Vec<Card>>,
    pub stock: Vec<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waste: Option<Vec<Card>>,
}

impl DealRecord {
    /// Cards across every zone.
    pub fn card_count(&self) -> usize {
        let piles: usize = self
            .foundations
            .iter()
            .chain(self.tableau_piles.iter())
            .map(Vec::len)
            .sum();
        piles
            + self.reserve.len()
            + self.stock.len()
            + self.waste.as_ref().map_or(0, Vec::len)
    }

    /// Check the record holds exactly `4 * max_rank` cards.
    pub fn check_deck_size(&self, max_rank: u32) -> Result<()> {
        let expected = max_rank as usize * 4;
        let found = self.card_count();
        if found == expected {
            Ok(())
        } else {
            Err(CoreError::DeckSizeMismatch { expected, found })
        }
    }

    /// Convert to the solver's fixture layout.
    pub fn to_fixture(&self, order: PileOrder) -> DealFixture {
        let orient = |cards: &Vec<Card>| -> Vec<Card> {
            match order {
                PileOrder::AsPrinted => cards.clone(),
                PileOrder::Reversed => cards.iter().rev().cloned().collect(),
            }
        };

        DealFixture {
            foundations: self.foundations.iter().flatten().cloned().collect(),
            reserve: orient(&self.reserve),
            tableau_piles: self.tableau_piles.iter().map(orient).collect(),
            stock: orient(&self.stock),
            waste: self.waste.as_ref().map(orient),
        }
    }
}

/// How printed order maps onto the solver's bottom-first pile order.
///
/// The solver places the first card of each JSON list at the bottom of
/// its pile. `AsPrinted` treats the leftmost (or topmost) printed card as
/// the bottom card; `Reversed` treats it as the top card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PileOrder {
    #[default]
    AsPrinted,
    Reversed,
}

/// Deal file accepted by the solver's deal parser.
///
/// Foundations are a flat list; the solver files each card by its suit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealFixture {
    pub foundations: Vec<Card>,
    pub reserve: Vec<Card>,
    #[serde(rename = "tableau piles")]
    pub tableau_piles: Vec<Vec<Card>>,
    pub stock: Vec<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waste: Option<Vec<Card>>,
}

impl DealFixture {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(tokens: &[&str]) -> Vec<Card> {
        tokens.iter().map(|t| Card::parse(t)).collect()
    }

    #[test]
    fn test_t_rank_normalized() {
        assert_eq!(Card::parse("Th").as_str(), "10h");
        assert_eq!(Card::parse("T").as_str(), "10");
        assert_eq!(Card::parse("10s").as_str(), "10s");
        assert_eq!(Card::parse("Kd").as_str(), "Kd");
        assert_eq!(Card::parse("AS").as_str(), "AS");
    }

    #[test]
    fn test_rank_and_suit() {
        let ten = Card::parse("Tc");
        assert_eq!(ten.rank(), "10");
        assert_eq!(ten.suit(), Some('c'));

        let bare = Card::parse("7");
        assert_eq!(bare.rank(), "7");
        assert_eq!(bare.suit(), None);

        let upper = Card::parse("QH");
        assert_eq!(upper.rank(), "Q");
        assert_eq!(upper.suit(), Some('H'));
    }

    #[test]
    fn test_card_count_spans_all_zones() {
        let record = DealRecord {
            foundations: vec![cards(&["Ah"])],
            reserve: cards(&["2h", "3h"]),
            tableau_piles: vec![cards(&["4h"]), vec![]],
            stock: cards(&["5h"]),
            waste: Some(cards(&["6h"])),
        };
        assert_eq!(record.card_count(), 6);
        assert!(record.check_deck_size(2).is_err());

        let mut eight = record.clone();
        eight.stock.extend(cards(&["7h", "8h"]));
        assert!(eight.check_deck_size(2).is_ok());
    }

    #[test]
    fn test_fixture_flattens_foundations_and_renames_tableau() {
        let record = DealRecord {
            foundations: vec![cards(&["Ah"]), cards(&["As", "2s"])],
            reserve: cards(&["5c"]),
            tableau_piles: vec![cards(&["9d", "8c"])],
            stock: cards(&["Kh", "Qh"]),
            waste: None,
        };

        let fixture = record.to_fixture(PileOrder::AsPrinted);
        let json: serde_json::Value = serde_json::from_str(&fixture.to_json().unwrap()).unwrap();
        assert_eq!(json["foundations"], serde_json::json!(["Ah", "As", "2s"]));
        assert_eq!(json["tableau piles"], serde_json::json!([["9d", "8c"]]));
        assert!(json.get("waste").is_none());
    }

    #[test]
    fn test_fixture_reversed_order() {
        let record = DealRecord {
            tableau_piles: vec![cards(&["9d", "8c", "7h"])],
            stock: cards(&["Kh", "Qh"]),
            ..DealRecord::default()
        };
        let fixture = record.to_fixture(PileOrder::Reversed);
        assert_eq!(fixture.tableau_piles[0], cards(&["7h", "8c", "9d"]));
        assert_eq!(fixture.stock, cards(&["Qh", "Kh"]));
    }
}
