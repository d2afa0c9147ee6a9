//! docsum Vector Engine
//!
//! Chunk embedding, k-means clustering and representative selection

mod elbow;
mod embedder;
mod kmeans;
mod selector;
mod types;

pub use elbow::{strategy_from_config, CurvatureElbow, ElbowStrategy, FixedK};
pub use embedder::Embedder;
pub use kmeans::{kmeans, KMeansResult};
pub use selector::ClusterSelector;
pub use types::{Cluster, ClusterSelection, InertiaPoint};
