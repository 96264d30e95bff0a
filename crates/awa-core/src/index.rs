//! The traceability index: specs and markers joined into one ID graph.

use crate::ids::{self, IdKind};
use crate::markers::{CodeMarker, MarkerKind};
use crate::specs::{CrossRefKind, Location, SpecParseResult};
use std::collections::{BTreeMap, BTreeSet};

/// Bidirectional ID graph.
///
/// Value lists keep discovery order (spec files in path order, then line
/// order; markers likewise). IDs seen only in code are still members of
/// [`TraceIndex::all_ids`], so they can be traced even when no spec defines
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceIndex {
    pub req_to_acs: BTreeMap<String, Vec<String>>,
    pub ac_to_design_components: BTreeMap<String, Vec<String>>,
    pub ac_to_code_locations: BTreeMap<String, Vec<Location>>,
    pub ac_to_test_locations: BTreeMap<String, Vec<Location>>,
    pub property_to_test_locations: BTreeMap<String, Vec<Location>>,
    pub component_to_code_locations: BTreeMap<String, Vec<Location>>,

    pub ac_to_req: BTreeMap<String, String>,
    pub component_to_acs: BTreeMap<String, Vec<String>>,
    pub property_to_acs: BTreeMap<String, Vec<String>>,

    pub id_locations: BTreeMap<String, Location>,
    pub titles: BTreeMap<String, String>,

    pub requirement_ids: BTreeSet<String>,
    pub ac_ids: BTreeSet<String>,
    pub property_ids: BTreeSet<String>,
    pub component_names: BTreeSet<String>,
    pub all_ids: BTreeSet<String>,
}

impl TraceIndex {
    /// Join parsed specs and scanned markers. Pure; performs no I/O.
    pub fn build(specs: &SpecParseResult, markers: &[CodeMarker]) -> Self {
        let mut index = TraceIndex {
            id_locations: specs.id_locations.clone(),
            titles: specs.titles.clone(),
            requirement_ids: specs.requirement_ids.clone(),
            ac_ids: specs.ac_ids.clone(),
            property_ids: specs.property_ids.clone(),
            component_names: specs.component_names.clone(),
            all_ids: specs.all_ids.clone(),
            ..TraceIndex::default()
        };

        for file in &specs.spec_files {
            for ac in &file.ac_ids {
                let Some(req) = ids::ac_parent(ac) else {
                    continue;
                };
                if specs.requirement_ids.contains(req) {
                    push_unique(index.req_to_acs.entry(req.to_string()).or_default(), ac);
                    index.ac_to_req.insert(ac.clone(), req.to_string());
                }
            }

            for xref in &file.cross_refs {
                match (xref.kind, &xref.component, &xref.property) {
                    (CrossRefKind::Implements, Some(component), _) => {
                        for id in &xref.ids {
                            push_unique(
                                index.ac_to_design_components.entry(id.clone()).or_default(),
                                component,
                            );
                            push_unique(
                                index.component_to_acs.entry(component.clone()).or_default(),
                                id,
                            );
                        }
                    }
                    (CrossRefKind::Validates, _, Some(property)) => {
                        for id in &xref.ids {
                            push_unique(
                                index.property_to_acs.entry(property.clone()).or_default(),
                                id,
                            );
                        }
                    }
                    _ => {}
                }
            }
        }

        for marker in markers {
            let location = Location::new(&marker.file_path, marker.line);
            let target = match marker.kind {
                MarkerKind::Impl => &mut index.ac_to_code_locations,
                MarkerKind::Test if ids::is_property(&marker.id) => {
                    &mut index.property_to_test_locations
                }
                MarkerKind::Test => &mut index.ac_to_test_locations,
                MarkerKind::Component => &mut index.component_to_code_locations,
            };
            target.entry(marker.id.clone()).or_default().push(location);
            index.all_ids.insert(marker.id.clone());
        }

        index
    }

    /// Kind of an indexed ID: set membership first, then the ID grammar.
    pub fn kind_of(&self, id: &str) -> IdKind {
        if self.requirement_ids.contains(id) {
            IdKind::Requirement
        } else if self.ac_ids.contains(id) {
            IdKind::AcceptanceCriterion
        } else if self.property_ids.contains(id) {
            IdKind::Property
        } else if self.component_names.contains(id) {
            IdKind::Component
        } else {
            ids::classify(id)
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.all_ids.contains(id)
    }

    /// Properties whose `VALIDATES:` lines name `ac`, in property order.
    pub fn properties_validating(&self, ac: &str) -> Vec<&str> {
        self.property_to_acs
            .iter()
            .filter(|(_, acs)| acs.iter().any(|a| a == ac))
            .map(|(property, _)| property.as_str())
            .collect()
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|existing| existing == value) {
        list.push(value.to_string());
    }
}
