pub mod agent;
pub mod metrics;
pub mod policies;
pub mod simulation;
pub mod swarm;

pub use agent::Agent;
pub use metrics::MetricsCollector;
pub use policies::PeerPolicy;
pub use simulation::{SimConfig, Simulation};

pub mod prelude {
    pub use crate::agent::{Agent, BandwidthProfile};
    pub use crate::metrics::MetricsSnapshot;
    pub use crate::policies::{AgentView, PeerPolicy, PolicyConfig, PolicyRegistry};
    pub use crate::simulation::{SimConfig, Simulation};
    pub use crate::swarm::{
        AgentId, Download, PeerView, PossessionVector, Request, RoundHistory, Upload,
    };
}
