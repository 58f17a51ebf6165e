//! Currency repository: the rate graph store.
//!
//! Each currency owns a mapping of target symbol -> rate. The store keeps
//! two invariants across every mutation:
//!
//! - the self edge `A.rates[A] == 1`, written at creation, never removed;
//! - the reciprocal invariant: whenever `A.rates[B]` exists, `B` exists and
//!   `B.rates[A] == 1 / A.rates[B]`.
//!
//! Paired writes run in one transaction with both rows locked `FOR UPDATE`
//! in lexicographic symbol order; the cascade delete locks the full table
//! for its sweep. Any other operation observes a pair either fully applied
//! or not at all.

use fxgate_core::rates::{self, RateError};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, QuerySelect,
    Set, TransactionTrait,
};

use crate::entities::currencies::{self, RateMap};

/// Error types for rate graph operations.
#[derive(Debug, thiserror::Error)]
pub enum CurrencyError {
    /// Symbol is already taken.
    #[error("currency '{0}' already exists")]
    AlreadyExists(String),

    /// Currency not found.
    #[error("currency '{0}' not found")]
    CurrencyNotFound(String),

    /// No direct edge between the pair.
    #[error("no rate from '{0}' to '{1}'")]
    RateNotFound(String, String),

    /// Currencies must be different.
    #[error("base and target must be different")]
    SameCurrency,

    /// Rate must be positive.
    #[error("rate must be positive")]
    NonPositiveRate,

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl From<RateError> for CurrencyError {
    fn from(e: RateError) -> Self {
        match e {
            RateError::SameCurrency => Self::SameCurrency,
            RateError::NonPositiveRate => Self::NonPositiveRate,
        }
    }
}

/// Currency repository for rate graph operations.
#[derive(Debug, Clone)]
pub struct CurrencyRepository {
    db: DatabaseConnection,
}

impl CurrencyRepository {
    /// Creates a new currency repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a currency with `rates = {symbol: 1}`.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyError::AlreadyExists` if the symbol is taken.
    pub async fn create(
        &self,
        symbol: &str,
        name: &str,
    ) -> Result<currencies::Model, CurrencyError> {
        let existing = currencies::Entity::find_by_id(symbol).one(&self.db).await?;
        if existing.is_some() {
            return Err(CurrencyError::AlreadyExists(symbol.to_string()));
        }

        let now = chrono::Utc::now().into();
        let currency = currencies::ActiveModel {
            symbol: Set(symbol.to_string()),
            name: Set(name.to_string()),
            rates: Set(RateMap::self_edge(symbol)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(currency.insert(&self.db).await?)
    }

    /// Deletes a currency and cascades: every other currency's edge keyed by
    /// `symbol` is removed in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyError::CurrencyNotFound` if the symbol is absent.
    pub async fn delete(&self, symbol: &str) -> Result<(), CurrencyError> {
        let txn = self.db.begin().await?;

        // Coarse sweep: hold every row for the duration of the cascade.
        let all = currencies::Entity::find()
            .lock_exclusive()
            .all(&txn)
            .await?;

        if !all.iter().any(|c| c.symbol == symbol) {
            return Err(CurrencyError::CurrencyNotFound(symbol.to_string()));
        }

        currencies::Entity::delete_by_id(symbol).exec(&txn).await?;

        let now = chrono::Utc::now().into();
        for other in all {
            if other.symbol == symbol || !other.rates.contains(symbol) {
                continue;
            }
            let mut rates = other.rates.clone();
            rates.remove(symbol);

            let mut active: currencies::ActiveModel = other.into();
            active.rates = Set(rates);
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    /// Sets the rate for a pair, writing both directions atomically:
    /// `base.rates[target] = rate` and `target.rates[base] = 1/rate`,
    /// overwriting any prior values.
    ///
    /// # Errors
    ///
    /// Returns `SameCurrency`/`NonPositiveRate` on invalid input and
    /// `CurrencyNotFound` if either side is absent.
    pub async fn set_rate(
        &self,
        base: &str,
        target: &str,
        rate: Decimal,
    ) -> Result<(), CurrencyError> {
        rates::validate_pair(base, target, rate)?;

        let txn = self.db.begin().await?;
        let (base_row, target_row) = Self::lock_pair(&txn, base, target).await?;

        let now = chrono::Utc::now().into();

        let mut base_rates = base_row.rates.clone();
        base_rates.insert(target.to_string(), rate);
        let mut active: currencies::ActiveModel = base_row.into();
        active.rates = Set(base_rates);
        active.updated_at = Set(now);
        active.update(&txn).await?;

        let mut target_rates = target_row.rates.clone();
        target_rates.insert(base.to_string(), rates::reciprocal(rate));
        let mut active: currencies::ActiveModel = target_row.into();
        active.rates = Set(target_rates);
        active.updated_at = Set(now);
        active.update(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    /// Deletes the edge pair between `base` and `target`.
    ///
    /// The base side decides whether the edge exists: if `base.rates[target]`
    /// is absent the whole operation fails before the target row is touched,
    /// so a not-found condition can never leave an asymmetric pair behind.
    ///
    /// # Errors
    ///
    /// Returns `SameCurrency` when `base == target`, `CurrencyNotFound` if
    /// either currency is absent, and `RateNotFound` if no edge exists.
    pub async fn delete_rate(&self, base: &str, target: &str) -> Result<(), CurrencyError> {
        if base == target {
            return Err(CurrencyError::SameCurrency);
        }

        let txn = self.db.begin().await?;
        let (base_row, target_row) = Self::lock_pair(&txn, base, target).await?;

        let mut base_rates = base_row.rates.clone();
        if base_rates.remove(target).is_none() {
            return Err(CurrencyError::RateNotFound(
                base.to_string(),
                target.to_string(),
            ));
        }

        let now = chrono::Utc::now().into();

        let mut active: currencies::ActiveModel = base_row.into();
        active.rates = Set(base_rates);
        active.updated_at = Set(now);
        active.update(&txn).await?;

        let mut target_rates = target_row.rates.clone();
        // Absence on the reverse side is not an error here.
        target_rates.remove(base);
        let mut active: currencies::ActiveModel = target_row.into();
        active.rates = Set(target_rates);
        active.updated_at = Set(now);
        active.update(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    /// Looks up the direct edge `base -> target`.
    ///
    /// Direct only: the reverse edge is never consulted and no multi-hop
    /// path search is performed.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyNotFound` if either currency is absent and
    /// `RateNotFound` if no direct edge exists.
    pub async fn get_rate(&self, base: &str, target: &str) -> Result<Decimal, CurrencyError> {
        let base_row = currencies::Entity::find_by_id(base)
            .one(&self.db)
            .await?
            .ok_or_else(|| CurrencyError::CurrencyNotFound(base.to_string()))?;

        let target_exists = currencies::Entity::find_by_id(target)
            .one(&self.db)
            .await?
            .is_some();
        if !target_exists {
            return Err(CurrencyError::CurrencyNotFound(target.to_string()));
        }

        base_row
            .rates
            .get(target)
            .ok_or_else(|| CurrencyError::RateNotFound(base.to_string(), target.to_string()))
    }

    /// Lists all currencies in datastore order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<currencies::Model>, CurrencyError> {
        Ok(currencies::Entity::find().all(&self.db).await?)
    }

    /// Finds a currency by symbol.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_symbol(
        &self,
        symbol: &str,
    ) -> Result<Option<currencies::Model>, CurrencyError> {
        Ok(currencies::Entity::find_by_id(symbol).one(&self.db).await?)
    }

    /// Locks both rows of a pair `FOR UPDATE`, always acquiring in
    /// lexicographic symbol order so concurrent paired writes on
    /// overlapping pairs cannot deadlock.
    async fn lock_pair(
        txn: &DatabaseTransaction,
        base: &str,
        target: &str,
    ) -> Result<(currencies::Model, currencies::Model), CurrencyError> {
        let (first, second) = if base <= target {
            (base, target)
        } else {
            (target, base)
        };

        let first_row = Self::lock_row(txn, first).await?;
        let second_row = Self::lock_row(txn, second).await?;

        let (base_row, target_row) = if first == base {
            (first_row, second_row)
        } else {
            (second_row, first_row)
        };

        // Report the base side first when both are missing.
        let base_row = base_row.ok_or_else(|| CurrencyError::CurrencyNotFound(base.to_string()))?;
        let target_row =
            target_row.ok_or_else(|| CurrencyError::CurrencyNotFound(target.to_string()))?;

        Ok((base_row, target_row))
    }

    async fn lock_row(
        txn: &DatabaseTransaction,
        symbol: &str,
    ) -> Result<Option<currencies::Model>, CurrencyError> {
        Ok(currencies::Entity::find_by_id(symbol)
            .lock_exclusive()
            .one(txn)
            .await?)
    }
}

// ============================================================================
// Pure graph semantics for property testing
// ============================================================================

/// In-memory model of the rate graph, mirroring the repository semantics
/// one operation to one, used by the property tests below.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    currencies: std::collections::BTreeMap<String, std::collections::BTreeMap<String, Decimal>>,
}

impl GraphModel {
    /// Creates a currency with only its self edge. False if it exists.
    pub fn create(&mut self, symbol: &str) -> bool {
        if self.currencies.contains_key(symbol) {
            return false;
        }
        let mut rates = std::collections::BTreeMap::new();
        rates.insert(symbol.to_string(), Decimal::ONE);
        self.currencies.insert(symbol.to_string(), rates);
        true
    }

    /// Deletes a currency and cascades over every other rate map.
    pub fn delete(&mut self, symbol: &str) -> bool {
        if self.currencies.remove(symbol).is_none() {
            return false;
        }
        for rates in self.currencies.values_mut() {
            rates.remove(symbol);
        }
        true
    }

    /// Sets both directions of a pair. False on invalid input or a missing
    /// currency.
    pub fn set_rate(&mut self, base: &str, target: &str, rate: Decimal) -> bool {
        if rates::validate_pair(base, target, rate).is_err()
            || !self.currencies.contains_key(target)
        {
            return false;
        }
        let Some(base_rates) = self.currencies.get_mut(base) else {
            return false;
        };
        base_rates.insert(target.to_string(), rate);
        if let Some(target_rates) = self.currencies.get_mut(target) {
            target_rates.insert(base.to_string(), rates::reciprocal(rate));
        }
        true
    }

    /// Removes both directions of a pair; the base side is checked first.
    pub fn delete_rate(&mut self, base: &str, target: &str) -> bool {
        if base == target || !self.currencies.contains_key(target) {
            return false;
        }
        let Some(base_rates) = self.currencies.get_mut(base) else {
            return false;
        };
        if base_rates.remove(target).is_none() {
            return false;
        }
        if let Some(target_rates) = self.currencies.get_mut(target) {
            target_rates.remove(base);
        }
        true
    }

    /// Direct edge lookup; never inverts.
    #[must_use]
    pub fn rate(&self, base: &str, target: &str) -> Option<Decimal> {
        self.currencies.get(base)?.get(target).copied()
    }

    /// Returns true if the currency exists.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.currencies.contains_key(symbol)
    }

    /// Iterates over currency symbols.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.currencies.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn symbol_strategy() -> impl Strategy<Value = String> {
        prop::sample::select(vec![
            "USD".to_string(),
            "EUR".to_string(),
            "GBP".to_string(),
            "JPY".to_string(),
            "IDR".to_string(),
            "CHF".to_string(),
        ])
    }

    fn rate_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 4))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// After a paired write, the reverse edge holds the exact reciprocal.
        #[test]
        fn prop_paired_write_keeps_reciprocal(
            base in symbol_strategy(),
            target in symbol_strategy(),
            rate in rate_strategy(),
        ) {
            prop_assume!(base != target);

            let mut graph = GraphModel::default();
            graph.create(&base);
            graph.create(&target);

            prop_assert!(graph.set_rate(&base, &target, rate));
            prop_assert_eq!(graph.rate(&base, &target), Some(rate));
            prop_assert_eq!(graph.rate(&target, &base), Some(Decimal::ONE / rate));
        }

        /// Overwriting a pair replaces both directions.
        #[test]
        fn prop_overwrite_replaces_both_sides(
            base in symbol_strategy(),
            target in symbol_strategy(),
            first in rate_strategy(),
            second in rate_strategy(),
        ) {
            prop_assume!(base != target);

            let mut graph = GraphModel::default();
            graph.create(&base);
            graph.create(&target);

            graph.set_rate(&base, &target, first);
            graph.set_rate(&base, &target, second);

            prop_assert_eq!(graph.rate(&base, &target), Some(second));
            prop_assert_eq!(graph.rate(&target, &base), Some(Decimal::ONE / second));
        }

        /// The self edge stays at 1 through arbitrary paired writes.
        #[test]
        fn prop_self_edge_stays_one(
            edges in prop::collection::vec(
                (symbol_strategy(), symbol_strategy(), rate_strategy()),
                0..20,
            ),
        ) {
            let mut graph = GraphModel::default();
            for symbol in ["USD", "EUR", "GBP", "JPY", "IDR", "CHF"] {
                graph.create(symbol);
            }
            for (base, target, rate) in edges {
                graph.set_rate(&base, &target, rate);
            }
            for symbol in graph.symbols() {
                prop_assert_eq!(graph.rate(symbol, symbol), Some(Decimal::ONE));
            }
        }

        /// Cascade delete removes the currency and every edge pointing at it.
        #[test]
        fn prop_cascade_delete_removes_all_edges(
            edges in prop::collection::vec(
                (symbol_strategy(), symbol_strategy(), rate_strategy()),
                0..20,
            ),
            victim in symbol_strategy(),
        ) {
            let mut graph = GraphModel::default();
            for symbol in ["USD", "EUR", "GBP", "JPY", "IDR", "CHF"] {
                graph.create(symbol);
            }
            for (base, target, rate) in edges {
                graph.set_rate(&base, &target, rate);
            }

            prop_assert!(graph.delete(&victim));
            prop_assert!(!graph.contains(&victim));
            let victim_ref = victim.as_str();
            for symbol in graph.symbols() {
                prop_assert_eq!(graph.rate(symbol, victim_ref), None);
            }
        }
    }

    #[test]
    fn duplicate_create_is_rejected() {
        let mut graph = GraphModel::default();
        assert!(graph.create("USD"));
        assert!(!graph.create("USD"));
    }

    #[test]
    fn self_rate_cannot_be_written_or_deleted() {
        let mut graph = GraphModel::default();
        graph.create("USD");
        assert!(!graph.set_rate("USD", "USD", dec!(2)));
        assert!(!graph.delete_rate("USD", "USD"));
        assert_eq!(graph.rate("USD", "USD"), Some(Decimal::ONE));
    }

    #[test]
    fn delete_rate_is_symmetric_and_not_repeatable() {
        let mut graph = GraphModel::default();
        graph.create("USD");
        graph.create("EUR");
        graph.set_rate("USD", "EUR", dec!(0.9));

        assert!(graph.delete_rate("EUR", "USD"));
        assert_eq!(graph.rate("USD", "EUR"), None);
        assert_eq!(graph.rate("EUR", "USD"), None);

        // Second attempt fails: nothing left to remove.
        assert!(!graph.delete_rate("EUR", "USD"));
        assert!(!graph.delete_rate("USD", "EUR"));
    }

    #[test]
    fn lookup_never_inverts() {
        // A one-way edge cannot be produced through the public operations;
        // build it by hand to pin down that lookup does no inversion.
        let mut graph = GraphModel::default();
        graph.create("USD");
        graph.create("EUR");
        graph
            .currencies
            .get_mut("EUR")
            .unwrap()
            .insert("USD".to_string(), dec!(1.1));

        assert_eq!(graph.rate("EUR", "USD"), Some(dec!(1.1)));
        assert_eq!(graph.rate("USD", "EUR"), None);
    }

    #[test]
    fn usd_eur_scenario() {
        let mut graph = GraphModel::default();
        graph.create("USD");
        graph.create("EUR");
        graph.set_rate("USD", "EUR", dec!(0.9));

        assert_eq!(graph.rate("EUR", "USD"), Some(Decimal::ONE / dec!(0.9)));
        assert_eq!(
            fxgate_core::rates::convert_amount(dec!(100), graph.rate("USD", "EUR").unwrap()),
            dec!(90)
        );

        graph.delete("EUR");
        assert_eq!(graph.rate("USD", "EUR"), None);
        assert!(!graph.contains("EUR"));
    }

    #[test]
    fn rates_of_missing_currencies_are_rejected() {
        let mut graph = GraphModel::default();
        graph.create("USD");
        assert!(!graph.set_rate("USD", "XXX", dec!(2)));
        assert!(!graph.set_rate("XXX", "USD", dec!(2)));
        assert!(!graph.delete_rate("USD", "XXX"));
    }
}
