pub mod cluster;
pub mod host;
pub mod network;
pub mod node_results;
pub mod sidecar;

pub use cluster::{ClusterConfig, ClustersConfig};
pub use host::Host;
pub use network::{Network, NetworkKind};
pub use node_results::{NodeResult, NodeResults};
pub use sidecar::{NetworkData, Sidecar, VmType};
