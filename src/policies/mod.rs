pub mod auction;
pub mod planner;
pub mod reference;
pub mod static_policies;
pub mod tyrant;

use crate::swarm::{AgentId, PeerView, PossessionVector, Request, RoundHistory, Upload};
use std::collections::HashMap;
use std::fmt;

/// Everything a policy may look at for one round: its own identity, its
/// own piece state, and the availability snapshots of every other peer.
pub struct AgentView<'a> {
    pub agent_id: AgentId,
    pub possession: &'a PossessionVector,
    pub peers: &'a [PeerView],
}

/// Per-round decision policy of one swarm participant. The driver calls
/// `requests` first, then (once every agent's requests are collected)
/// `uploads`, strictly once each per round.
pub trait PeerPolicy: Send + fmt::Debug {
    /// Which pieces to ask which peers for this round.
    fn requests(&mut self, view: &AgentView<'_>, history: &RoundHistory) -> Vec<Request>;

    /// How to split the upload budget among this round's requesters.
    /// `requests` holds only the requests addressed to this agent.
    fn uploads(
        &mut self,
        requests: &[Request],
        view: &AgentView<'_>,
        history: &RoundHistory,
    ) -> Vec<Upload>;

    fn name(&self) -> &str;
    fn reset(&mut self);
    fn clone_box(&self) -> Box<dyn PeerPolicy>;
}

/// Simulation constants handed to every policy at construction. No hidden
/// lifecycle hooks: a factory gets this and returns a ready instance.
#[derive(Debug, Clone, Copy)]
pub struct PolicyConfig {
    pub up_bw: f64,
    pub max_requests_per_peer: usize,
    pub seed: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            up_bw: 32.0,
            max_requests_per_peer: 8,
            seed: 0,
        }
    }
}

/// Split a bandwidth budget into n equal shares.
pub fn even_split(bandwidth: f64, n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![bandwidth / n as f64; n]
}

pub struct PolicyRegistry {
    policies: HashMap<String, Box<dyn Fn(&PolicyConfig) -> Box<dyn PeerPolicy> + Send + Sync>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            policies: HashMap::new(),
        };
        registry.register_builtin();
        registry
    }

    fn register_builtin(&mut self) {
        self.register("tyrant", |cfg| Box::new(tyrant::Tyrant::new(cfg)));
        self.register("bittyrant", |cfg| Box::new(tyrant::Tyrant::new(cfg)));
        self.register("reference", |cfg| Box::new(reference::Reference::new(cfg)));
        self.register("std", |cfg| Box::new(reference::Reference::new(cfg)));
        self.register("random", |cfg| Box::new(static_policies::RandomUploader::new(cfg)));
        self.register("even-split", |cfg| Box::new(static_policies::EvenSplit::new(cfg)));
        self.register("evensplit", |cfg| Box::new(static_policies::EvenSplit::new(cfg)));
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&PolicyConfig) -> Box<dyn PeerPolicy> + Send + Sync + 'static,
    {
        self.policies.insert(name.to_lowercase(), Box::new(factory));
    }

    pub fn create(&self, name: &str, config: &PolicyConfig) -> Option<Box<dyn PeerPolicy>> {
        self.policies
            .get(&name.to_lowercase())
            .map(|factory| factory(config))
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.policies.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn global() -> &'static PolicyRegistry {
        use std::sync::OnceLock;
        static REGISTRY: OnceLock<PolicyRegistry> = OnceLock::new();
        REGISTRY.get_or_init(PolicyRegistry::new)
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PolicyBuilder {
    name: String,
    config: PolicyConfig,
}

impl PolicyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: PolicyConfig::default(),
        }
    }

    pub fn up_bw(mut self, bw: f64) -> Self {
        self.config.up_bw = bw;
        self
    }

    pub fn max_requests_per_peer(mut self, max: usize) -> Self {
        self.config.max_requests_per_peer = max;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn build(self) -> Option<Box<dyn PeerPolicy>> {
        PolicyRegistry::global().create(&self.name, &self.config)
    }
}
