//! Amendment rules: which protocol features are active for a ledger

use crate::view::ReadView;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Protocol features gated by amendment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Feature {
    /// Signer lists and multi-signed transactions
    MultiSign,
    /// Configured token (WLT) amounts in payments and offers
    WltTokens,
}

impl Feature {
    pub const ALL: [Feature; 2] = [Feature::MultiSign, Feature::WltTokens];

    pub fn name(self) -> &'static str {
        match self {
            Feature::MultiSign => "MultiSign",
            Feature::WltTokens => "WLTTokens",
        }
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable snapshot of enabled features
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    enabled: BTreeSet<Feature>,
}

impl Rules {
    pub fn new<I: IntoIterator<Item = Feature>>(features: I) -> Self {
        Self {
            enabled: features.into_iter().collect(),
        }
    }

    /// Every known feature enabled
    pub fn all() -> Self {
        Self::new(Feature::ALL)
    }

    /// Rules in force for the given ledger
    pub fn from_view(view: &dyn ReadView) -> Self {
        Self::new(view.info().amendments.iter().copied())
    }

    pub fn enabled(&self, feature: Feature) -> bool {
        self.enabled.contains(&feature)
    }

    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.enabled.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_names() {
        assert_eq!(Feature::from_name("multisign"), Some(Feature::MultiSign));
        assert_eq!(Feature::from_name("WLTTokens"), Some(Feature::WltTokens));
        assert_eq!(Feature::from_name("Escrow"), None);
    }

    #[test]
    fn test_rules_enabled() {
        let rules = Rules::new([Feature::MultiSign]);
        assert!(rules.enabled(Feature::MultiSign));
        assert!(!rules.enabled(Feature::WltTokens));
        assert!(Rules::all().enabled(Feature::WltTokens));
        assert!(!Rules::default().enabled(Feature::MultiSign));
    }
}
