//! Dependency cycle detection.
//!
//! Runs after every constructor resolution is in place and walks the
//! construction-order graph they describe:
//! - an edge exists for each parameter that selected a service and is
//!   neither nullable nor defaulted
//! - a parameter that selected a collection has an edge to every member
//! - a deferred (`Lazy<T>`) parameter is not an edge, unless both the
//!   consumer and the target are Transient
//!
//! The last rule catches deferred cycles that memoization cannot break: a
//! transient deferred factory invoked inside its own construction chain
//! recurses forever.

use std::collections::{HashMap, HashSet};

use tarkib_support::rendering::ChainLink;
use tracing::{debug, instrument, warn};

use crate::error::{CircularDependencyError, LazyTransientCycleError, Result, TarkibError};
use crate::key::TypeKey;
use crate::lifetime::Lifetime;
use crate::manifest::ServiceManifest;
use crate::registration::ServiceRegistration;
use crate::types::TypeRef;

#[derive(Debug, Clone)]
struct Edge {
    target: TypeKey,
    /// Deferred edge kept because both ends are Transient.
    deferred: bool,
}

/// A constructed service type and what it needs first.
#[derive(Debug, Clone)]
struct Node {
    ty: TypeRef,
    lifetime: Lifetime,
    edges: Vec<Edge>,
}

/// One entry of the DFS path, with how it was reached.
#[derive(Debug, Clone)]
struct Step {
    key: TypeKey,
    via_deferred: bool,
}

/// Depth-first cycle search over constructor resolutions.
pub(crate) struct GraphValidator {
    nodes: HashMap<TypeKey, Node>,
    /// Resolution order, so the first reported cycle is deterministic.
    order: Vec<TypeKey>,
    visiting: HashSet<TypeKey>,
    validated: HashSet<TypeKey>,
    path: Vec<Step>,
}

impl GraphValidator {
    /// Builds the graph from every closed resolution in the manifest.
    pub fn from_manifest(manifest: &ServiceManifest<'_>) -> Self {
        let mut nodes = HashMap::new();
        let mut order = Vec::new();

        for resolution in manifest.get_all_constructor_resolutions() {
            if resolution.ty().is_open() {
                continue;
            }

            let mut edges = Vec::new();
            for parameter in resolution.parameters() {
                let Some(selected) = parameter.selected_service() else {
                    continue;
                };
                if !parameter.is_hard_dependency() {
                    continue;
                }

                let selected = manifest.registration(selected);
                let targets: Vec<&ServiceRegistration> = match selected.collected_services() {
                    Some(members) => members.iter().map(|id| manifest.registration(*id)).collect(),
                    None => vec![selected],
                };

                for target in targets {
                    if target.lifetime() < resolution.lifetime() {
                        warn!(
                            consumer = %resolution.ty(),
                            consumer_lifetime = %resolution.lifetime(),
                            dependency = %target.resolved_type(),
                            dependency_lifetime = %target.lifetime(),
                            "Service holds a dependency with a shorter lifetime"
                        );
                    }

                    let both_transient =
                        resolution.lifetime().is_transient() && target.lifetime().is_transient();
                    if parameter.is_deferred() && !both_transient {
                        continue;
                    }
                    edges.push(Edge {
                        target: TypeKey::new(target.resolved_type()),
                        deferred: parameter.is_deferred(),
                    });
                }
            }

            let key = TypeKey::new(resolution.ty());
            order.push(key.clone());
            nodes.insert(
                key,
                Node {
                    ty: resolution.ty().clone(),
                    lifetime: resolution.lifetime(),
                    edges,
                },
            );
        }

        Self {
            nodes,
            order,
            visiting: HashSet::new(),
            validated: HashSet::new(),
            path: Vec::new(),
        }
    }

    /// Searches the whole graph and reports the first cycle found.
    ///
    /// # Errors
    /// - [`TarkibError::CircularDependency`]: a cycle of hard dependencies
    /// - [`TarkibError::LazyTransientCycle`]: a cycle closed by a transient
    ///   deferred reference
    #[instrument(skip(self), name = "cycle_detection")]
    pub fn validate(&mut self) -> Result<()> {
        debug!(node_count = self.order.len(), "Starting dependency cycle detection");

        let order = self.order.clone();
        for key in &order {
            if !self.validated.contains(key) {
                self.visit(key, false)?;
            }
        }

        debug!("No dependency cycles found");
        Ok(())
    }

    fn visit(&mut self, key: &TypeKey, via_deferred: bool) -> Result<()> {
        if self.visiting.contains(key) {
            return Err(self.cycle_error(key, via_deferred));
        }
        if self.validated.contains(key) {
            return Ok(());
        }

        // Leaves (no resolution) cannot be part of a cycle.
        let Some(edges) = self.nodes.get(key).map(|node| node.edges.clone()) else {
            self.validated.insert(key.clone());
            return Ok(());
        };

        self.visiting.insert(key.clone());
        self.path.push(Step {
            key: key.clone(),
            via_deferred,
        });

        for edge in &edges {
            self.visit(&edge.target, edge.deferred)?;
        }

        self.path.pop();
        self.visiting.remove(key);
        self.validated.insert(key.clone());
        Ok(())
    }

    /// Cuts the cycle out of the current path, from `repeated` back to itself.
    fn cycle_error(&self, repeated: &TypeKey, closed_by_deferred: bool) -> TarkibError {
        let start = self
            .path
            .iter()
            .position(|step| &step.key == repeated)
            .unwrap_or(0);
        let cycle = &self.path[start..];

        let display = |key: &TypeKey| {
            self.nodes
                .get(key)
                .map(|node| node.ty.display_name())
                .unwrap_or_else(|| key.ty().display_name())
        };
        let mut chain: Vec<String> = cycle.iter().map(|step| display(&step.key)).collect();
        chain.push(display(repeated));

        // The first step's flag describes how the cycle was entered, not an edge in it.
        let deferred = closed_by_deferred || cycle.iter().skip(1).any(|step| step.via_deferred);
        if !deferred {
            warn!(cycle = ?chain, "Circular dependency detected");
            return TarkibError::CircularDependency(CircularDependencyError { chain });
        }

        let lifetime_of = |key: &TypeKey| {
            self.nodes
                .get(key)
                .map(|node| node.lifetime.to_string())
                .unwrap_or_default()
        };
        let mut links: Vec<ChainLink> = cycle
            .iter()
            .enumerate()
            .map(|(i, step)| ChainLink {
                display_name: display(&step.key),
                lifetime: lifetime_of(&step.key),
                via: (i > 0 && step.via_deferred).then(|| "deferred".to_string()),
            })
            .collect();
        links.push(ChainLink {
            display_name: display(repeated),
            lifetime: lifetime_of(repeated),
            via: closed_by_deferred.then(|| "deferred".to_string()),
        });

        warn!(cycle = ?chain, "Deferred dependency cycle between transient services");
        TarkibError::LazyTransientCycle(LazyTransientCycleError { links })
    }
}
