//! Trade price records.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tradeable resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Food,
    Coal,
    Oil,
    Uranium,
    Lead,
    Iron,
    Bauxite,
    Gasoline,
    Munitions,
    Steel,
    Aluminum,
    Credits,
}

impl Resource {
    pub const ALL: [Self; 12] = [
        Self::Food,
        Self::Coal,
        Self::Oil,
        Self::Uranium,
        Self::Lead,
        Self::Iron,
        Self::Bauxite,
        Self::Gasoline,
        Self::Munitions,
        Self::Steel,
        Self::Aluminum,
        Self::Credits,
    ];

    /// Field name used by the `tradeprices` query.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Coal => "coal",
            Self::Oil => "oil",
            Self::Uranium => "uranium",
            Self::Lead => "lead",
            Self::Iron => "iron",
            Self::Bauxite => "bauxite",
            Self::Gasoline => "gasoline",
            Self::Munitions => "munitions",
            Self::Steel => "steel",
            Self::Aluminum => "aluminum",
            Self::Credits => "credits",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.field() == wanted)
            .ok_or_else(|| format!("unknown resource {s:?}"))
    }
}

/// Average market price of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePrice {
    pub resource: Resource,
    pub average_price: Decimal,
    #[serde(default)]
    pub date: Option<String>,
}

/// One `tradeprices` row as the API returns it: one column per resource.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradePriceRow {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub food: Option<Decimal>,
    #[serde(default)]
    pub coal: Option<Decimal>,
    #[serde(default)]
    pub oil: Option<Decimal>,
    #[serde(default)]
    pub uranium: Option<Decimal>,
    #[serde(default)]
    pub lead: Option<Decimal>,
    #[serde(default)]
    pub iron: Option<Decimal>,
    #[serde(default)]
    pub bauxite: Option<Decimal>,
    #[serde(default)]
    pub gasoline: Option<Decimal>,
    #[serde(default)]
    pub munitions: Option<Decimal>,
    #[serde(default)]
    pub steel: Option<Decimal>,
    #[serde(default)]
    pub aluminum: Option<Decimal>,
    #[serde(default)]
    pub credits: Option<Decimal>,
}

impl TradePriceRow {
    fn price(&self, resource: Resource) -> Option<Decimal> {
        match resource {
            Resource::Food => self.food,
            Resource::Coal => self.coal,
            Resource::Oil => self.oil,
            Resource::Uranium => self.uranium,
            Resource::Lead => self.lead,
            Resource::Iron => self.iron,
            Resource::Bauxite => self.bauxite,
            Resource::Gasoline => self.gasoline,
            Resource::Munitions => self.munitions,
            Resource::Steel => self.steel,
            Resource::Aluminum => self.aluminum,
            Resource::Credits => self.credits,
        }
    }

    /// Flatten the row into one price per resource, skipping absent columns.
    #[must_use]
    pub fn into_prices(self) -> Vec<TradePrice> {
        Resource::ALL
            .into_iter()
            .filter_map(|resource| {
                self.price(resource).map(|average_price| TradePrice {
                    resource,
                    average_price,
                    date: self.date.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn row_flattens_present_columns_only() {
        let row: TradePriceRow = serde_json::from_value(serde_json::json!({
            "date": "2024-05-01",
            "coal": 3120,
            "steel": 4100.5,
            "food": null
        }))
        .unwrap();
        let prices = row.into_prices();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].resource, Resource::Coal);
        assert_eq!(prices[0].average_price, dec!(3120));
        assert_eq!(prices[1].resource, Resource::Steel);
        assert_eq!(prices[1].average_price, dec!(4100.5));
    }

    #[test]
    fn resource_parses_case_insensitively() {
        assert_eq!("Munitions".parse::<Resource>().unwrap(), Resource::Munitions);
        assert!("gold".parse::<Resource>().is_err());
    }
}
