//! `SeaORM` Entity for the currencies table.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Rate mapping stored as JSONB on the currency row: target symbol -> rate.
///
/// The self edge (`symbol -> 1`) is written at creation and never removed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct RateMap(pub BTreeMap<String, Decimal>);

impl RateMap {
    /// A fresh map holding only the self edge at 1.
    #[must_use]
    pub fn self_edge(symbol: &str) -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(symbol.to_string(), Decimal::ONE);
        Self(rates)
    }

    /// Looks up the direct edge to `target`.
    #[must_use]
    pub fn get(&self, target: &str) -> Option<Decimal> {
        self.0.get(target).copied()
    }

    /// Returns true if a direct edge to `target` exists.
    #[must_use]
    pub fn contains(&self, target: &str) -> bool {
        self.0.contains_key(target)
    }

    /// Sets the edge to `target`, returning the previous value if any.
    pub fn insert(&mut self, target: String, rate: Decimal) -> Option<Decimal> {
        self.0.insert(target, rate)
    }

    /// Removes the edge to `target`, returning the removed value if any.
    pub fn remove(&mut self, target: &str) -> Option<Decimal> {
        self.0.remove(target)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "currencies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub symbol: String,
    pub name: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub rates: RateMap,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
