//! Trace-chain resolution over a [`TraceIndex`].
//!
//! Hops are counted from the queried ID. Tracing a requirement forward:
//!
//! ```text
//! DIFF-1 (0) -> DIFF-1_AC-1 (1) -> DIFF-DiffEngine, src/diff.ts:10,
//!                                  test/diff.test.ts:4, DIFF_P-1 (2)
//!                               -> property tests (3)
//! ```
//!
//! Reverse resolution walks from a component or property back to the ACs it
//! serves and their requirement.

use crate::ids::IdKind;
use crate::index::TraceIndex;
use crate::specs::Location;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Reverse,
    #[default]
    Both,
}

impl Direction {
    fn forward(self) -> bool {
        matches!(self, Direction::Forward | Direction::Both)
    }

    fn reverse(self) -> bool {
        matches!(self, Direction::Reverse | Direction::Both)
    }
}

impl FromStr for Direction {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forward" => Ok(Direction::Forward),
            "reverse" => Ok(Direction::Reverse),
            "both" => Ok(Direction::Both),
            other => eyre::bail!("unknown direction '{other}' (expected forward, reverse or both)"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceOptions {
    pub direction: Direction,
    /// Maximum number of hops from the queried ID; `None` is unbounded
    pub depth: Option<usize>,
    /// Keep only nodes whose ID starts with, or whose file path contains, this token
    pub scope: Option<String>,
    pub no_code: bool,
    pub no_tests: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Requirement,
    AcceptanceCriterion,
    Component,
    Property,
    Implementation,
    Test,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Requirement => "requirement",
            NodeKind::AcceptanceCriterion => "acceptance-criterion",
            NodeKind::Component => "component",
            NodeKind::Property => "property",
            NodeKind::Implementation => "implementation",
            NodeKind::Test => "test",
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One vertex of a resolved chain.
///
/// Implementation and test nodes carry the ID they serve plus the marker
/// location; spec nodes carry their definition site when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceNode {
    pub id: String,
    pub kind: NodeKind,
    pub location: Option<Location>,
    /// Heading or item text, when the spec provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceChain {
    pub query_id: String,
    pub requirement: Option<TraceNode>,
    pub acs: Vec<TraceNode>,
    pub design_components: Vec<TraceNode>,
    pub implementations: Vec<TraceNode>,
    pub tests: Vec<TraceNode>,
    pub properties: Vec<TraceNode>,
}

impl TraceChain {
    fn new(query_id: &str) -> Self {
        Self {
            query_id: query_id.to_string(),
            requirement: None,
            acs: Vec::new(),
            design_components: Vec::new(),
            implementations: Vec::new(),
            tests: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Every node of the chain, requirement first.
    pub fn nodes(&self) -> impl Iterator<Item = &TraceNode> {
        self.requirement
            .iter()
            .chain(&self.acs)
            .chain(&self.design_components)
            .chain(&self.properties)
            .chain(&self.implementations)
            .chain(&self.tests)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResult {
    pub chains: Vec<TraceChain>,
    pub not_found: Vec<String>,
}

/// Resolve one chain per queried ID.
pub fn resolve_trace(index: &TraceIndex, query_ids: &[String], options: &TraceOptions) -> TraceResult {
    let mut result = TraceResult::default();
    for query in query_ids {
        if !index.contains(query) {
            result.not_found.push(query.clone());
            continue;
        }
        let mut walk = Walk::new(index, options, query);
        walk.resolve();
        result.chains.push(walk.chain);
    }
    result
}

/// State of one chain resolution.
struct Walk<'a> {
    index: &'a TraceIndex,
    options: &'a TraceOptions,
    query: &'a str,
    chain: TraceChain,
    seen: HashSet<(NodeKind, String, Option<Location>)>,
}

impl<'a> Walk<'a> {
    fn new(index: &'a TraceIndex, options: &'a TraceOptions, query: &'a str) -> Self {
        Self {
            index,
            options,
            query,
            chain: TraceChain::new(query),
            seen: HashSet::new(),
        }
    }

    fn resolve(&mut self) {
        let query = self.query;
        let direction = self.options.direction;

        match self.index.kind_of(query) {
            IdKind::Requirement => {
                self.chain.requirement = Some(self.spec_node(query, NodeKind::Requirement));
                if direction.forward() && self.within(1) {
                    for ac in self.list(&self.index.req_to_acs, query) {
                        if self.add_spec(&ac, NodeKind::AcceptanceCriterion, 1) {
                            self.expand_ac(&ac, 1);
                        }
                    }
                }
            }
            IdKind::Component => {
                self.force_spec(query, NodeKind::Component);
                if direction.forward() && self.within(1) && !self.options.no_code {
                    for location in self.locations(&self.index.component_to_code_locations, query) {
                        self.add_located(query, NodeKind::Implementation, location);
                    }
                }
                if direction.reverse() && self.within(1) {
                    for ac in self.list(&self.index.component_to_acs, query) {
                        if self.add_spec(&ac, NodeKind::AcceptanceCriterion, 1) {
                            self.add_parent_requirement(&ac, 2);
                        }
                    }
                }
            }
            IdKind::Property => {
                self.force_spec(query, NodeKind::Property);
                if direction.forward() && self.within(1) && !self.options.no_tests {
                    for location in self.locations(&self.index.property_to_test_locations, query) {
                        self.add_located(query, NodeKind::Test, location);
                    }
                }
                if direction.reverse() && self.within(1) {
                    for ac in self.list(&self.index.property_to_acs, query) {
                        if self.add_spec(&ac, NodeKind::AcceptanceCriterion, 1) {
                            self.add_parent_requirement(&ac, 2);
                        }
                    }
                }
            }
            // Unclassifiable IDs can only have come from markers, which key
            // the AC location maps.
            IdKind::AcceptanceCriterion | IdKind::Unknown => {
                self.force_spec(query, NodeKind::AcceptanceCriterion);
                self.add_parent_requirement(query, 1);
                if direction.forward() {
                    self.expand_ac(query, 0);
                }
            }
        }
    }

    /// Components, code, tests and properties of an AC found at `hop`.
    fn expand_ac(&mut self, ac: &str, hop: usize) {
        let next = hop + 1;
        if !self.within(next) {
            return;
        }

        for component in self.list(&self.index.ac_to_design_components, ac) {
            self.add_spec(&component, NodeKind::Component, next);
        }
        if !self.options.no_code {
            for location in self.locations(&self.index.ac_to_code_locations, ac) {
                self.add_located(ac, NodeKind::Implementation, location);
            }
        }
        if !self.options.no_tests {
            for location in self.locations(&self.index.ac_to_test_locations, ac) {
                self.add_located(ac, NodeKind::Test, location);
            }
        }

        let properties: Vec<String> = self
            .index
            .properties_validating(ac)
            .into_iter()
            .map(str::to_string)
            .collect();
        for property in properties {
            if self.add_spec(&property, NodeKind::Property, next)
                && self.within(next + 1)
                && !self.options.no_tests
            {
                for location in self.locations(&self.index.property_to_test_locations, &property) {
                    self.add_located(&property, NodeKind::Test, location);
                }
            }
        }
    }

    /// The requirement owning `ac`, as context.
    fn add_parent_requirement(&mut self, ac: &str, hop: usize) {
        if self.chain.requirement.is_some() || !self.within(hop) {
            return;
        }
        let Some(req) = self.index.ac_to_req.get(ac) else {
            return;
        };
        let node = self.spec_node(req, NodeKind::Requirement);
        if self.in_scope(&node) {
            self.chain.requirement = Some(node);
        }
    }

    fn within(&self, hop: usize) -> bool {
        self.options.depth.is_none_or(|depth| hop <= depth)
    }

    fn in_scope(&self, node: &TraceNode) -> bool {
        let Some(scope) = self.options.scope.as_deref() else {
            return true;
        };
        node.id.starts_with(scope)
            || node
                .location
                .as_ref()
                .is_some_and(|l| l.file_path.to_string_lossy().contains(scope))
    }

    fn spec_node(&self, id: &str, kind: NodeKind) -> TraceNode {
        TraceNode {
            id: id.to_string(),
            kind,
            location: self.index.id_locations.get(id).cloned(),
            meta: self.index.titles.get(id).cloned(),
        }
    }

    /// Add the queried node itself, bypassing scope.
    fn force_spec(&mut self, id: &str, kind: NodeKind) {
        let node = self.spec_node(id, kind);
        self.push(node);
    }

    /// Add a spec node found at `hop`; returns whether traversal may continue through it.
    fn add_spec(&mut self, id: &str, kind: NodeKind, hop: usize) -> bool {
        if !self.within(hop) {
            return false;
        }
        let node = self.spec_node(id, kind);
        if !self.in_scope(&node) {
            return false;
        }
        self.push(node);
        true
    }

    fn add_located(&mut self, id: &str, kind: NodeKind, location: Location) {
        let node = TraceNode {
            id: id.to_string(),
            kind,
            location: Some(location),
            meta: None,
        };
        if self.in_scope(&node) {
            self.push(node);
        }
    }

    fn push(&mut self, node: TraceNode) {
        let key = (node.kind, node.id.clone(), node.location.clone());
        if !self.seen.insert(key) {
            return;
        }
        let list = match node.kind {
            NodeKind::Requirement => {
                self.chain.requirement.get_or_insert(node);
                return;
            }
            NodeKind::AcceptanceCriterion => &mut self.chain.acs,
            NodeKind::Component => &mut self.chain.design_components,
            NodeKind::Property => &mut self.chain.properties,
            NodeKind::Implementation => &mut self.chain.implementations,
            NodeKind::Test => &mut self.chain.tests,
        };
        list.push(node);
    }

    fn list(&self, map: &std::collections::BTreeMap<String, Vec<String>>, key: &str) -> Vec<String> {
        map.get(key).cloned().unwrap_or_default()
    }

    fn locations(
        &self,
        map: &std::collections::BTreeMap<String, Vec<Location>>,
        key: &str,
    ) -> Vec<Location> {
        map.get(key).cloned().unwrap_or_default()
    }
}
