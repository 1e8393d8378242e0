//! Card Records - the data bound into templates at render time

use serde::{Deserialize, Serialize};
use std::fmt;

pub type CardId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CardType {
    Slayer,
    Errant,
    Action,
    Ploy,
    Intervention,
    Chamber,
    Relic,
    Dungeon,
    Phase,
}

impl CardType {
    pub const ALL: [CardType; 9] = [
        CardType::Slayer,
        CardType::Errant,
        CardType::Action,
        CardType::Ploy,
        CardType::Intervention,
        CardType::Chamber,
        CardType::Relic,
        CardType::Dungeon,
        CardType::Phase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Slayer => "Slayer",
            CardType::Errant => "Errant",
            CardType::Action => "Action",
            CardType::Ploy => "Ploy",
            CardType::Intervention => "Intervention",
            CardType::Chamber => "Chamber",
            CardType::Relic => "Relic",
            CardType::Dungeon => "Dungeon",
            CardType::Phase => "Phase",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Mythic,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Mythic => "mythic",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names a field of [`CardData`]. Layers bind to cards through these keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardField {
    Id,
    Name,
    Class,
    Type,
    Rarity,
    Cost,
    Power,
    Hp,
    Vp,
    Effect,
}

impl CardField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardField::Id => "id",
            CardField::Name => "name",
            CardField::Class => "class",
            CardField::Type => "type",
            CardField::Rarity => "rarity",
            CardField::Cost => "cost",
            CardField::Power => "power",
            CardField::Hp => "hp",
            CardField::Vp => "vp",
            CardField::Effect => "effect",
        }
    }
}

/// A field value read off a card. `Missing` covers both unset and null.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Missing,
    Text(&'a str),
    Number(i32),
}

impl FieldValue<'_> {
    /// Empty strings and zero count as unset.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Missing => false,
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::Number(n) => *n != 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardData {
    pub id: CardId,
    pub name: String,
    #[serde(rename = "class")]
    pub class_name: String,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub rarity: Rarity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vp: Option<i32>,
    #[serde(default)]
    pub effect: String,
}

impl CardData {
    pub fn new(
        id: impl Into<CardId>,
        name: impl Into<String>,
        class_name: impl Into<String>,
        card_type: CardType,
        rarity: Rarity,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            class_name: class_name.into(),
            card_type,
            rarity,
            cost: None,
            power: None,
            hp: None,
            vp: None,
            effect: String::new(),
        }
    }

    pub fn value(&self, field: CardField) -> FieldValue<'_> {
        let number = |v: Option<i32>| v.map_or(FieldValue::Missing, FieldValue::Number);
        match field {
            CardField::Id => FieldValue::Text(&self.id),
            CardField::Name => FieldValue::Text(&self.name),
            CardField::Class => FieldValue::Text(&self.class_name),
            CardField::Type => FieldValue::Text(self.card_type.as_str()),
            CardField::Rarity => FieldValue::Text(self.rarity.as_str()),
            CardField::Cost => number(self.cost),
            CardField::Power => number(self.power),
            CardField::Hp => number(self.hp),
            CardField::Vp => number(self.vp),
            CardField::Effect => FieldValue::Text(&self.effect),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_json_uses_record_keys() {
        let json = r#"{"id":"c1","name":"Axehand","class":"Warrior","type":"Slayer","rarity":"common","power":4}"#;
        let card: CardData = serde_json::from_str(json).unwrap();
        assert_eq!(card.class_name, "Warrior");
        assert_eq!(card.card_type, CardType::Slayer);
        assert_eq!(card.power, Some(4));
        assert_eq!(card.hp, None);
        assert_eq!(card.effect, "");
    }

    #[test]
    fn test_zero_and_empty_are_not_truthy() {
        let mut card = CardData::new("c1", "", "Mage", CardType::Action, Rarity::Rare);
        card.cost = Some(0);
        card.power = Some(-1);
        assert!(!card.value(CardField::Name).is_truthy());
        assert!(!card.value(CardField::Cost).is_truthy());
        assert!(card.value(CardField::Power).is_truthy());
        assert!(!card.value(CardField::Hp).is_truthy());
    }
}
