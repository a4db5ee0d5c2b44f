//! Add-on line items and their text codec.
//!
//! A collection renders as `"<qty> x <name> - $<price>, ..."`, with the
//! quantity prefix omitted when it is 1, and parses back to an equivalent
//! collection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Money, ValidationError};

/// One add-on line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOn {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl AddOn {
    /// Build an add-on, collapsing runs of whitespace in the name.
    pub fn new(name: &str, quantity: u32, unit_price: Money) -> Result<Self, ValidationError> {
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
        if name.is_empty() {
            return Err(ValidationError::AddOn("add-on name is empty".into()));
        }
        // Commas separate entries; a quantity-shaped prefix would be misread.
        if name.contains(',') || split_quantity(&name).is_some() {
            return Err(ValidationError::AddOn(format!(
                "add-on name cannot be encoded: {name:?}"
            )));
        }
        if quantity == 0 {
            return Err(ValidationError::AddOn(format!(
                "add-on {name:?} has zero quantity"
            )));
        }
        Ok(Self {
            name,
            quantity,
            unit_price,
        })
    }

    /// Merge key: lowercase, whitespace-normalized name.
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }
}

impl fmt::Display for AddOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quantity != 1 {
            write!(f, "{} x ", self.quantity)?;
        }
        write!(f, "{} - ${}", self.name, self.unit_price)
    }
}

/// An ordered add-on collection with case-insensitively unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddOns(Vec<AddOn>);

impl AddOns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AddOn> {
        self.0.iter()
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&AddOn> {
        let key = normalize_name(name);
        self.0.iter().find(|a| a.key() == key)
    }

    /// Insert or replace one add-on by name.
    ///
    /// An existing entry keeps its position and spelling; its quantity and
    /// price are replaced. A new name is appended.
    pub fn upsert(&mut self, addon: AddOn) {
        let key = addon.key();
        match self.0.iter_mut().find(|a| a.key() == key) {
            Some(existing) => {
                existing.quantity = addon.quantity;
                existing.unit_price = addon.unit_price;
            }
            None => self.0.push(addon),
        }
    }

    /// Merge `incoming` into `self`: last writer wins per name, and names
    /// absent from `incoming` are retained.
    pub fn merge(&mut self, incoming: &Self) {
        for addon in incoming.iter() {
            self.upsert(addon.clone());
        }
    }
}

impl FromIterator<AddOn> for AddOns {
    fn from_iter<I: IntoIterator<Item = AddOn>>(iter: I) -> Self {
        let mut addons = Self::new();
        for addon in iter {
            addons.upsert(addon);
        }
        addons
    }
}

impl fmt::Display for AddOns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, addon) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{addon}")?;
        }
        Ok(())
    }
}

impl FromStr for AddOns {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(parse_entry)
            .collect()
    }
}

fn parse_entry(entry: &str) -> Result<AddOn, ValidationError> {
    let (left, price) = entry
        .rsplit_once(" - ")
        .ok_or_else(|| ValidationError::AddOn(format!("missing price in {entry:?}")))?;
    let price = price.trim();
    if !price.starts_with('$') {
        return Err(ValidationError::AddOn(format!(
            "price must start with '$' in {entry:?}"
        )));
    }
    let unit_price: Money = price.parse()?;

    let (quantity, name) = split_quantity(left).unwrap_or((1, left));
    AddOn::new(name, quantity, unit_price)
}

/// Split a leading `"<n> x "` off a name, if present.
fn split_quantity(s: &str) -> Option<(u32, &str)> {
    let (count, rest) = s.trim_start().split_once(' ')?;
    let rest = rest.trim_start().strip_prefix("x ")?;
    let quantity = count.parse().ok()?;
    Some((quantity, rest))
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn addon(name: &str, quantity: u32, cents: i64) -> AddOn {
        AddOn::new(name, quantity, Money::from_cents(cents)).unwrap()
    }

    #[test]
    fn formats_with_and_without_quantity() {
        let addons: AddOns = [addon("Kayak", 2, 1500), addon("Life vest", 1, 500)]
            .into_iter()
            .collect();
        assert_eq!(addons.to_string(), "2 x Kayak - $15.00, Life vest - $5.00");
    }

    #[test]
    fn parses_formatted_collection() {
        let addons: AddOns = "2 x Kayak - $15.00, Life vest - $5.00".parse().unwrap();
        assert_eq!(addons.len(), 2);
        assert_eq!(addons.get("kayak").unwrap().quantity, 2);
        assert_eq!(addons.get("LIFE  VEST").unwrap().unit_price.cents(), 500);
    }

    #[test]
    fn empty_string_is_empty_collection() {
        let addons: AddOns = "  ".parse().unwrap();
        assert!(addons.is_empty());
    }

    #[test]
    fn rejects_entries_without_price() {
        assert!("Kayak".parse::<AddOns>().is_err());
        assert!("Kayak - 15".parse::<AddOns>().is_err());
        assert!("0 x Kayak - $15".parse::<AddOns>().is_err());
    }

    #[test]
    fn merge_is_last_writer_wins_per_name() {
        let mut stored = AddOns::new();
        stored.merge(&[addon("A", 1, 500)].into_iter().collect());
        stored.merge(&[addon("B", 1, 300)].into_iter().collect());
        stored.merge(&[addon("a", 1, 700)].into_iter().collect());

        assert_eq!(stored.len(), 2);
        assert_eq!(stored.get("A").unwrap().unit_price.cents(), 700);
        assert_eq!(stored.get("B").unwrap().unit_price.cents(), 300);
        // The stored spelling wins over the incoming one.
        assert_eq!(stored.iter().next().unwrap().name, "A");
    }

    #[test]
    fn merge_replaces_quantity_rather_than_adding() {
        let mut stored: AddOns = "2 x Kayak - $15.00".parse().unwrap();
        let incoming: AddOns = "3 x kayak - $15.00".parse().unwrap();
        stored.merge(&incoming);
        stored.merge(&incoming);
        assert_eq!(stored.get("Kayak").unwrap().quantity, 3);
    }

    fn arb_addon() -> impl Strategy<Value = AddOn> {
        ("[A-Za-z]{1,8}( [A-Za-z]{1,8})?", 1u32..20, 0i64..100_000)
            .prop_map(|(name, qty, cents)| addon(&name, qty, cents))
    }

    proptest! {
        #[test]
        fn text_codec_round_trips(items in prop::collection::vec(arb_addon(), 0..6)) {
            let addons: AddOns = items.into_iter().collect();
            let parsed: AddOns = addons.to_string().parse().unwrap();
            prop_assert_eq!(parsed, addons);
        }

        #[test]
        fn merge_is_idempotent(
            stored in prop::collection::vec(arb_addon(), 0..6),
            incoming in prop::collection::vec(arb_addon(), 0..6),
        ) {
            let incoming: AddOns = incoming.into_iter().collect();
            let mut once: AddOns = stored.into_iter().collect();
            once.merge(&incoming);
            let mut twice = once.clone();
            twice.merge(&incoming);
            prop_assert_eq!(once, twice);
        }
    }
}
