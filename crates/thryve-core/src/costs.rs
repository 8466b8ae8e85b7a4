//! Credit cost table.
//!
//! Each metered [`Operation`] has a fixed positive cost. Defaults are
//! compiled in; a JSON file mapping operation keys to costs may override
//! individual entries:
//!
//! ```json
//! { "THUMBNAIL_GENERATE": 12, "REEL_GENERATE": 25 }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, ThryveError};

/// A metered operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    /// Competitor channel discovery.
    SimilarChannelsDiscover,
    /// Thumbnail generation.
    ThumbnailGenerate,
    /// Click-through-rate prediction.
    CtrPredict,
    /// Voice-over generation.
    AudioGenerate,
    /// Reel generation.
    ReelGenerate,
    /// Content gap analysis for one competitor.
    GapsAnalysis,
    /// Content gap analysis across all competitors.
    GapsOverall,
    /// Next-video idea generation.
    IdeasGenerateNext,
    /// Production plan for an idea.
    IdeasGeneratePlan,
    /// SEO suggestions for an idea.
    IdeasGenerateSeo,
}

impl Operation {
    /// Every operation, in table order.
    pub const ALL: [Self; 10] = [
        Self::SimilarChannelsDiscover,
        Self::ThumbnailGenerate,
        Self::CtrPredict,
        Self::AudioGenerate,
        Self::ReelGenerate,
        Self::GapsAnalysis,
        Self::GapsOverall,
        Self::IdeasGenerateNext,
        Self::IdeasGeneratePlan,
        Self::IdeasGenerateSeo,
    ];

    /// Configuration key.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::SimilarChannelsDiscover => "SIMILAR_CHANNELS_DISCOVER",
            Self::ThumbnailGenerate => "THUMBNAIL_GENERATE",
            Self::CtrPredict => "CTR_PREDICT",
            Self::AudioGenerate => "AUDIO_GENERATE",
            Self::ReelGenerate => "REEL_GENERATE",
            Self::GapsAnalysis => "GAPS_ANALYSIS",
            Self::GapsOverall => "GAPS_OVERALL",
            Self::IdeasGenerateNext => "IDEAS_GENERATE_NEXT",
            Self::IdeasGeneratePlan => "IDEAS_GENERATE_PLAN",
            Self::IdeasGenerateSeo => "IDEAS_GENERATE_SEO",
        }
    }

    /// Default cost in credits.
    #[must_use]
    pub const fn default_cost(&self) -> i64 {
        match self {
            Self::SimilarChannelsDiscover | Self::ReelGenerate => 20,
            Self::ThumbnailGenerate | Self::IdeasGenerateNext => 15,
            Self::CtrPredict => 5,
            Self::AudioGenerate => 10,
            Self::GapsAnalysis => 25,
            Self::GapsOverall => 30,
            Self::IdeasGeneratePlan | Self::IdeasGenerateSeo => 8,
        }
    }

    /// Human description shown to users.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::SimilarChannelsDiscover => "Discover similar channels",
            Self::ThumbnailGenerate => "Generate AI thumbnail",
            Self::CtrPredict => "Predict thumbnail click-through rate",
            Self::AudioGenerate => "Generate voice-over audio",
            Self::ReelGenerate => "Generate reel video",
            Self::GapsAnalysis => "Analyze content gaps against a competitor",
            Self::GapsOverall => "Analyze content gaps across all competitors",
            Self::IdeasGenerateNext => "Generate next video ideas",
            Self::IdeasGeneratePlan => "Generate video production plan",
            Self::IdeasGenerateSeo => "Generate video SEO suggestions",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for Operation {
    type Err = ThryveError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.key() == s)
            .ok_or_else(|| ThryveError::UnknownOperation(s.to_string()))
    }
}

/// One row of the published cost table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEntry {
    /// Operation key.
    pub operation: Operation,
    /// Cost in credits.
    pub cost: i64,
    /// Human description.
    pub description: &'static str,
}

/// Credit cost per operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditCosts {
    costs: BTreeMap<Operation, i64>,
}

impl Default for CreditCosts {
    fn default() -> Self {
        Self {
            costs: Operation::ALL
                .into_iter()
                .map(|op| (op, op.default_cost()))
                .collect(),
        }
    }
}

impl CreditCosts {
    /// Cost of an operation.
    #[must_use]
    pub fn cost(&self, operation: Operation) -> i64 {
        self.costs
            .get(&operation)
            .copied()
            .unwrap_or_else(|| operation.default_cost())
    }

    /// Apply overrides keyed by operation name.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys or non-positive costs. On error no
    /// override is applied.
    pub fn with_overrides(mut self, overrides: &HashMap<String, i64>) -> Result<Self> {
        let mut parsed = Vec::with_capacity(overrides.len());
        for (key, &cost) in overrides {
            let op: Operation = key.parse()?;
            if cost <= 0 {
                return Err(ThryveError::InvalidCost {
                    operation: key.clone(),
                    cost,
                });
            }
            parsed.push((op, cost));
        }
        self.costs.extend(parsed);
        Ok(self)
    }

    /// Load defaults overridden by a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds an
    /// invalid override.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ThryveError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        let overrides: HashMap<String, i64> = serde_json::from_str(&content)
            .map_err(|e| ThryveError::Serialization(e.to_string()))?;
        Self::default().with_overrides(&overrides)
    }

    /// The full table, in operation order.
    #[must_use]
    pub fn entries(&self) -> Vec<CostEntry> {
        Operation::ALL
            .into_iter()
            .map(|op| CostEntry {
                operation: op,
                cost: self.cost(op),
                description: op.description(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_costs() {
        let costs = CreditCosts::default();
        assert_eq!(costs.cost(Operation::SimilarChannelsDiscover), 20);
        assert_eq!(costs.cost(Operation::ThumbnailGenerate), 15);
        assert_eq!(costs.cost(Operation::CtrPredict), 5);
        assert_eq!(costs.cost(Operation::AudioGenerate), 10);
        assert_eq!(costs.cost(Operation::ReelGenerate), 20);
        assert_eq!(costs.cost(Operation::GapsAnalysis), 25);
        assert_eq!(costs.cost(Operation::GapsOverall), 30);
        assert_eq!(costs.cost(Operation::IdeasGenerateNext), 15);
        assert_eq!(costs.cost(Operation::IdeasGeneratePlan), 8);
        assert_eq!(costs.cost(Operation::IdeasGenerateSeo), 8);
    }

    #[test]
    fn operation_keys_round_trip_through_serde() {
        for op in Operation::ALL {
            let json = serde_json::to_string(&op).unwrap();
            assert_eq!(json, format!("\"{}\"", op.key()));
            assert_eq!(op.key().parse::<Operation>().unwrap(), op);
        }
    }

    #[test]
    fn overrides_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"THUMBNAIL_GENERATE": 12, "REEL_GENERATE": 25}}"#).unwrap();

        let costs = CreditCosts::from_json_file(file.path()).unwrap();
        assert_eq!(costs.cost(Operation::ThumbnailGenerate), 12);
        assert_eq!(costs.cost(Operation::ReelGenerate), 25);
        assert_eq!(costs.cost(Operation::CtrPredict), 5);
    }

    #[test]
    fn unknown_key_rejected() {
        let overrides = HashMap::from([("TELEPORT".to_string(), 3)]);
        let err = CreditCosts::default().with_overrides(&overrides).unwrap_err();
        assert!(matches!(err, ThryveError::UnknownOperation(k) if k == "TELEPORT"));
    }

    #[test]
    fn non_positive_cost_rejected() {
        let overrides = HashMap::from([("CTR_PREDICT".to_string(), 0)]);
        let err = CreditCosts::default().with_overrides(&overrides).unwrap_err();
        assert!(matches!(err, ThryveError::InvalidCost { cost: 0, .. }));
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CreditCosts::from_json_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ThryveError::Configuration(_)));
    }

    #[test]
    fn entries_cover_every_operation() {
        let entries = CreditCosts::default().entries();
        assert_eq!(entries.len(), Operation::ALL.len());
        assert_eq!(entries[0].operation, Operation::SimilarChannelsDiscover);
    }
}
