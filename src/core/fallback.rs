//! Static approximate rates used when the provider is unavailable

use crate::core::currency::is_valid_rate;
use anyhow::{Result, bail};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

pub type RateTable = HashMap<String, HashMap<String, f64>>;

pub const DEFAULT_HUB: &str = "USD";

const DEFAULT_RATES: &[(&str, &[(&str, f64)])] = &[
    (
        "USD",
        &[
            ("EUR", 0.85),
            ("GBP", 0.73),
            ("JPY", 110.0),
            ("CAD", 1.25),
            ("AUD", 1.35),
            ("CHF", 0.92),
            ("CNY", 6.45),
            ("TRY", 27.5),
            ("AZN", 1.7),
        ],
    ),
    (
        "EUR",
        &[
            ("USD", 1.18),
            ("GBP", 0.86),
            ("JPY", 129.0),
            ("CAD", 1.47),
            ("AUD", 1.59),
            ("CHF", 1.08),
            ("CNY", 7.59),
            ("TRY", 32.4),
            ("AZN", 2.0),
        ],
    ),
    ("AZN", &[("USD", 0.59), ("EUR", 0.50), ("GBP", 0.43), ("TRY", 16.2)]),
];

pub fn default_rate_table() -> RateTable {
    DEFAULT_RATES
        .iter()
        .map(|(from, edges)| {
            let targets = edges
                .iter()
                .map(|(to, rate)| (to.to_string(), *rate))
                .collect();
            (from.to_string(), targets)
        })
        .collect()
}

/// Directed graph of approximate rates with a hub currency for two-hop
/// derivation. Immutable once built.
#[derive(Debug, Clone)]
pub struct FallbackGraph {
    hub: String,
    edges: RateTable,
}

impl FallbackGraph {
    pub fn new(hub: &str, edges: RateTable) -> Result<Self> {
        if hub.is_empty() {
            bail!("Fallback hub currency must not be empty");
        }
        for (from, targets) in &edges {
            for (to, rate) in targets {
                if !is_valid_rate(*rate) {
                    bail!("Invalid fallback rate {} for {}-{}", rate, from, to);
                }
            }
        }
        Ok(Self {
            hub: hub.to_string(),
            edges,
        })
    }

    pub fn hub(&self) -> &str {
        &self.hub
    }

    /// All currency codes mentioned by any edge, sorted.
    pub fn currencies(&self) -> Vec<String> {
        let mut codes = BTreeSet::new();
        for (from, targets) in &self.edges {
            codes.insert(from.clone());
            codes.extend(targets.keys().cloned());
        }
        codes.into_iter().collect()
    }

    /// Direct edge only.
    pub fn edge(&self, from: &str, to: &str) -> Option<f64> {
        self.edges.get(from).and_then(|t| t.get(to)).copied()
    }

    /// Direct edge, else reciprocal of the reverse edge.
    pub fn lookup(&self, from: &str, to: &str) -> Option<f64> {
        self.edge(from, to)
            .or_else(|| self.edge(to, from).map(|rate| 1.0 / rate))
    }

    /// Derives a rate for `base -> target`, or `None` when no path exists.
    ///
    /// The hub route composes as `(1 / rate(base, hub)) * rate(hub, target)`,
    /// with a missing leg counted as `1`. Both legs missing is treated as
    /// no path.
    pub fn derive(&self, base: &str, target: &str) -> Option<f64> {
        if base == target {
            return Some(1.0);
        }

        if let Some(rate) = self.edge(base, target) {
            debug!(base, target, rate, "Fallback direct rate");
            return Some(rate);
        }

        if let Some(rate) = self.edge(target, base) {
            debug!(base, target, rate, "Fallback reverse rate");
            return Some(1.0 / rate);
        }

        if base == self.hub || target == self.hub {
            return None;
        }

        let base_to_hub = self.lookup(base, &self.hub);
        let hub_to_target = self.lookup(&self.hub, target);
        if base_to_hub.is_none() && hub_to_target.is_none() {
            return None;
        }

        let rate = (1.0 / base_to_hub.unwrap_or(1.0)) * hub_to_target.unwrap_or(1.0);
        debug!(base, target, hub = %self.hub, rate, "Fallback rate via hub");
        Some(rate)
    }
}

impl Default for FallbackGraph {
    fn default() -> Self {
        Self {
            hub: DEFAULT_HUB.to_string(),
            edges: default_rate_table(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(edges: &[(&str, &str, f64)]) -> RateTable {
        let mut table = RateTable::new();
        for (from, to, rate) in edges {
            table
                .entry(from.to_string())
                .or_default()
                .insert(to.to_string(), *rate);
        }
        table
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_direct_lookup() {
        let graph = FallbackGraph::default();
        assert_eq!(graph.derive("USD", "EUR"), Some(0.85));
        assert_eq!(graph.derive("AZN", "TRY"), Some(16.2));
    }

    #[test]
    fn test_reverse_uses_reciprocal() {
        let graph = FallbackGraph::new("USD", table(&[("USD", "EUR", 0.85)])).unwrap();
        assert_close(graph.derive("EUR", "USD").unwrap(), 1.0 / 0.85);
    }

    #[test]
    fn test_direct_edge_wins_over_reverse() {
        let graph = FallbackGraph::default();
        // Both USD->EUR and EUR->USD exist and are not reciprocal
        assert_eq!(graph.derive("EUR", "USD"), Some(1.18));
    }

    #[test]
    fn test_hub_composition_inverts_base_leg() {
        let graph = FallbackGraph::new(
            "USD",
            table(&[("AZN", "USD", 0.59), ("USD", "TRY", 27.5)]),
        )
        .unwrap();

        let rate = graph.derive("AZN", "TRY").unwrap();
        assert_close(rate, (1.0 / 0.59) * 27.5);
        assert!((rate - 0.59 * 27.5).abs() > 1.0);
    }

    #[test]
    fn test_hub_legs_use_reverse_edges() {
        let graph = FallbackGraph::new(
            "USD",
            table(&[("USD", "GBP", 0.73), ("JPY", "USD", 0.009)]),
        )
        .unwrap();

        // GBP->USD is the reciprocal of USD->GBP; USD->JPY of JPY->USD
        let rate = graph.derive("GBP", "JPY").unwrap();
        assert_close(rate, (1.0 / (1.0 / 0.73)) * (1.0 / 0.009));
    }

    #[test]
    fn test_hub_missing_leg_defaults_to_one() {
        let graph = FallbackGraph::new("USD", table(&[("USD", "TRY", 27.5)])).unwrap();
        assert_close(graph.derive("XYZ", "TRY").unwrap(), 27.5);

        let graph = FallbackGraph::new("USD", table(&[("AZN", "USD", 0.59)])).unwrap();
        assert_close(graph.derive("AZN", "XYZ").unwrap(), 1.0 / 0.59);
    }

    #[test]
    fn test_unresolvable() {
        let graph = FallbackGraph::default();
        // Hub involved with no edge
        assert_eq!(graph.derive("USD", "XYZ"), None);
        assert_eq!(graph.derive("XYZ", "USD"), None);
        // Neither side known to the hub
        assert_eq!(graph.derive("ABC", "XYZ"), None);
    }

    #[test]
    fn test_same_currency() {
        let graph = FallbackGraph::default();
        assert_eq!(graph.derive("EUR", "EUR"), Some(1.0));
    }

    #[test]
    fn test_rejects_invalid_rates() {
        assert!(FallbackGraph::new("USD", table(&[("USD", "EUR", 0.0)])).is_err());
        assert!(FallbackGraph::new("USD", table(&[("USD", "EUR", -2.0)])).is_err());
        assert!(FallbackGraph::new("", table(&[("USD", "EUR", 0.85)])).is_err());
    }

    #[test]
    fn test_currencies() {
        let graph = FallbackGraph::new(
            "USD",
            table(&[("USD", "EUR", 0.85), ("AZN", "TRY", 16.2)]),
        )
        .unwrap();
        assert_eq!(graph.currencies(), vec!["AZN", "EUR", "TRY", "USD"]);
    }
}
