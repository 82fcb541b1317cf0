use super::money::Amount;
use super::party::PartyId;
use super::serde_pairs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// An ordered pair of booths. `(A, B)` and `(B, A)` are different routes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub entry: PartyId,
    pub exit: PartyId,
}

impl Route {
    pub fn new(entry: impl Into<PartyId>, exit: impl Into<PartyId>) -> Self {
        Self {
            entry: entry.into(),
            exit: exit.into(),
        }
    }

    pub fn reversed(&self) -> Self {
        Self {
            entry: self.exit.clone(),
            exit: self.entry.clone(),
        }
    }

    pub fn is_loop(&self) -> bool {
        self.entry == self.exit
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.entry, self.exit)
    }
}

/// Base prices per route. A missing key means "unset", which is not the same
/// thing as a price of zero.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RoutePriceTable {
    #[serde(with = "serde_pairs")]
    prices: HashMap<Route, Amount>,
}

impl RoutePriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, route: &Route) -> Option<Amount> {
        self.prices.get(route).copied()
    }

    /// Overwrites the price and returns the previous one.
    pub fn set(&mut self, route: Route, price: Amount) -> Option<Amount> {
        self.prices.insert(route, price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_is_distinct_from_zero() {
        let mut table = RoutePriceTable::new();
        let route = Route::new("b1", "b2");
        assert_eq!(table.get(&route), None);

        table.set(route.clone(), Amount::ZERO);
        assert_eq!(table.get(&route), Some(Amount::ZERO));
    }

    #[test]
    fn test_direction_matters() {
        let mut table = RoutePriceTable::new();
        let route = Route::new("b1", "b2");
        table.set(route.clone(), Amount::new(10));

        assert_eq!(table.get(&route), Some(Amount::new(10)));
        assert_eq!(table.get(&route.reversed()), None);
    }

    #[test]
    fn test_set_overwrites_and_returns_previous() {
        let mut table = RoutePriceTable::new();
        let route = Route::new("b1", "b2");
        assert_eq!(table.set(route.clone(), Amount::new(10)), None);
        assert_eq!(table.set(route.clone(), Amount::new(10)), Some(Amount::new(10)));
        assert_eq!(table.set(route.clone(), Amount::new(7)), Some(Amount::new(10)));
        assert_eq!(table.get(&route), Some(Amount::new(7)));
    }

    #[test]
    fn test_table_survives_json() {
        let mut table = RoutePriceTable::new();
        table.set(Route::new("b1", "b2"), Amount::new(10));
        let json = serde_json::to_string(&table).unwrap();
        let restored: RoutePriceTable = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.get(&Route::new("b1", "b2")), Some(Amount::new(10)));
    }
}
