pub mod criticality;
pub mod impact;
pub mod matrix;

pub use criticality::{score_all_pairs, score_transit, CriticalityWeights, GroupPair, TransitScore};
pub use impact::{
    analyze_impact, analyze_impact_with, ImpactReport, LinkChange, LinkState, PairImpact, PairKey,
    PairSelection,
};
pub use matrix::{build_matrix, build_matrix_with, CostMatrix, Grouping, MatrixCell, MatrixOptions};
