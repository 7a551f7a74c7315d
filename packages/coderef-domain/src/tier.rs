//! Tier relationships for knowledge-graph traversal.
//!
//! Every relationship is bidirectional: a graph store persisting an edge between two tiered
//! nodes must persist both directions, and traversal may move through tiers in any order
//! (T1 → T2 → T3 → T1 is a valid path).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
	/// Same tier.
	Parallel,
	/// Adjacent tiers.
	Perpendicular,
	/// Tiers two or more levels apart.
	SkipTier,
}
impl EdgeType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Parallel => "PARALLEL",
			Self::Perpendicular => "PERPENDICULAR",
			Self::SkipTier => "SKIP_TIER",
		}
	}
}

impl std::fmt::Display for EdgeType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavigationDirection {
	/// Towards a numerically lower, more foundational tier.
	Upward,
	/// Towards a numerically higher, more specialized tier.
	Downward,
	Lateral,
}
impl NavigationDirection {
	pub fn between(from_tier: i64, to_tier: i64) -> Self {
		match to_tier.cmp(&from_tier) {
			std::cmp::Ordering::Less => Self::Upward,
			std::cmp::Ordering::Greater => Self::Downward,
			std::cmp::Ordering::Equal => Self::Lateral,
		}
	}
}

/// Classifies the relationship between two tiers.
///
/// Depends only on `|tier_a - tier_b|`, so it is symmetric and total over every `i64` pair.
pub fn classify(tier_a: i64, tier_b: i64) -> EdgeType {
	match tier_a.abs_diff(tier_b) {
		0 => EdgeType::Parallel,
		1 => EdgeType::Perpendicular,
		_ => EdgeType::SkipTier,
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierEdge {
	pub tier_a: i64,
	pub tier_b: i64,
	pub edge_type: EdgeType,
}
impl TierEdge {
	pub fn new(tier_a: i64, tier_b: i64) -> Self {
		Self { tier_a, tier_b, edge_type: classify(tier_a, tier_b) }
	}

	/// Both directions of the relationship between the two nodes.
	pub fn directed(&self, node_a: &str, node_b: &str) -> [DirectedEdge; 2] {
		[
			DirectedEdge {
				from: node_a.to_string(),
				to: node_b.to_string(),
				edge_type: self.edge_type,
				direction: NavigationDirection::between(self.tier_a, self.tier_b),
			},
			DirectedEdge {
				from: node_b.to_string(),
				to: node_a.to_string(),
				edge_type: self.edge_type,
				direction: NavigationDirection::between(self.tier_b, self.tier_a),
			},
		]
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectedEdge {
	pub from: String,
	pub to: String,
	pub edge_type: EdgeType,
	pub direction: NavigationDirection,
}

/// A node reached by a single hop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalResult {
	pub chapter_id: String,
	pub title: String,
	pub tier: i64,
	pub edge_type: EdgeType,
	pub score: f32,
	pub book_id: Option<String>,
	pub book_title: Option<String>,
}

/// A multi-hop traversal.
///
/// Nodes and tiers may repeat. `score` is whatever the executing graph store computes; this type
/// does not define an aggregation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
	pub chapters: Vec<String>,
	pub hops: usize,
	pub edge_types: Vec<EdgeType>,
	pub score: f32,
}
impl PathResult {
	pub fn new(
		chapters: Vec<String>,
		edge_types: Vec<EdgeType>,
		score: f32,
	) -> Result<Self, PathReject> {
		if chapters.is_empty() {
			return Err(PathReject::RejectEmpty);
		}
		if edge_types.len() != chapters.len() - 1 {
			return Err(PathReject::RejectEdgeCount {
				chapters: chapters.len(),
				edge_types: edge_types.len(),
			});
		}

		Ok(Self { hops: edge_types.len(), chapters, edge_types, score })
	}

	/// Builds a path from `(node_id, tier)` pairs, classifying each hop from the tiers.
	pub fn from_tiers(nodes: &[(&str, i64)], score: f32) -> Result<Self, PathReject> {
		let chapters = nodes.iter().map(|(id, _)| id.to_string()).collect::<Vec<_>>();
		let edge_types =
			nodes.windows(2).map(|pair| classify(pair[0].1, pair[1].1)).collect::<Vec<_>>();

		Self::new(chapters, edge_types, score)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathReject {
	RejectEmpty,
	RejectEdgeCount { chapters: usize, edge_types: usize },
}

impl std::fmt::Display for PathReject {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::RejectEmpty => f.write_str("path has no chapters"),
			Self::RejectEdgeCount { chapters, edge_types } => {
				let expected = chapters.saturating_sub(1);

				write!(
					f,
					"path with {chapters} chapters needs {expected} edge types, got {edge_types}"
				)
			},
		}
	}
}
