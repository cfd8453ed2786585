//! Schema-to-schema reference graph.
//!
//! Nodes are component schemas keyed by canonical pointer. Edges live in a
//! `DiGraphMap`; strongly connected components give the cycle groups and the
//! per-schema depth, and a DFS from each schema gives the transitive ("deep")
//! dependencies used for declaration ordering.

use std::collections::{BTreeSet, HashMap};

use indexmap::{IndexMap, IndexSet};
use petgraph::Direction;
use petgraph::algo::kosaraju_scc;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;

use crate::error::BuildError;
use crate::parse::ref_resolve::ComponentResolver;
use crate::parse::schema::{Schema, SchemaOrBool, SchemaOrRef};

/// One component schema in the graph.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphNode {
    pub pointer: String,
    /// Schemas this one references directly.
    pub dependencies: IndexSet<String>,
    /// Schemas that reference this one directly.
    pub dependents: IndexSet<String>,
    /// Every schema reachable from this one.
    pub deep_dependencies: IndexSet<String>,
    /// Members of one cycle group share a depth.
    pub depth: usize,
    pub circular: bool,
    /// Index into [`DependencyGraph::cycles`].
    pub cycle: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DependencyGraph {
    nodes: IndexMap<String, GraphNode>,
    cycles: Vec<Vec<String>>,
    order: Vec<String>,
}

impl DependencyGraph {
    /// Build the graph over every component schema of the document.
    pub fn build(resolver: &ComponentResolver<'_>) -> Result<Self, BuildError> {
        let mut edges = Vec::new();
        for located in resolver.component_schemas() {
            let mut raw_refs = Vec::new();
            collect_refs(located.value, &mut raw_refs);

            let mut targets = Vec::with_capacity(raw_refs.len());
            for raw in raw_refs {
                targets.push(resolver.schema_pointer(&raw)?);
            }
            edges.push((located.pointer, targets));
        }
        let graph = Self::from_edges(edges);
        log::debug!(
            "dependency graph: {} schemas, {} cycles",
            graph.len(),
            graph.cycles.len()
        );
        Ok(graph)
    }

    /// Build the graph from `(schema, direct dependencies)` pairs in
    /// declaration order. Edges to schemas not listed are dropped.
    pub fn from_edges<I, S>(edges: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<S>)>,
        S: Into<String>,
    {
        let edges: Vec<(String, Vec<String>)> = edges
            .into_iter()
            .map(|(from, to)| (from.into(), to.into_iter().map(Into::into).collect()))
            .collect();

        let declared: IndexSet<&str> = edges.iter().map(|(pointer, _)| pointer.as_str()).collect();
        let mut graph = DiGraphMap::<&str, ()>::new();
        for &pointer in &declared {
            graph.add_node(pointer);
        }
        for (from, targets) in &edges {
            for to in targets {
                if !graph.contains_node(to.as_str()) {
                    log::trace!("dropping edge {from} -> {to}: not a component schema");
                    continue;
                }
                graph.add_edge(from.as_str(), to.as_str(), ());
            }
        }

        let components = kosaraju_scc(&graph);
        let depths = component_depths(&graph, &components);
        let cycles = cycle_groups(&graph, &components, &declared);
        let cycle_of: HashMap<&str, usize> = cycles
            .iter()
            .enumerate()
            .flat_map(|(index, members)| members.iter().map(move |m| (*m, index)))
            .collect();

        let mut nodes = IndexMap::with_capacity(declared.len());
        for &pointer in &declared {
            let cycle = cycle_of.get(pointer).copied();
            let mut deep_dependencies = IndexSet::new();
            let mut dfs = Dfs::new(&graph, pointer);
            while let Some(reached) = dfs.next(&graph) {
                if reached != pointer || cycle.is_some() {
                    deep_dependencies.insert(reached.to_string());
                }
            }
            let node = GraphNode {
                pointer: pointer.to_string(),
                dependencies: graph
                    .neighbors_directed(pointer, Direction::Outgoing)
                    .map(String::from)
                    .collect(),
                dependents: graph
                    .neighbors_directed(pointer, Direction::Incoming)
                    .map(String::from)
                    .collect(),
                deep_dependencies,
                depth: depths.get(pointer).copied().unwrap_or(0),
                circular: cycle.is_some(),
                cycle,
            };
            nodes.insert(pointer.to_string(), node);
        }

        let mut graph = Self {
            nodes,
            cycles: cycles
                .into_iter()
                .map(|members| members.into_iter().map(String::from).collect())
                .collect(),
            order: Vec::new(),
        };
        graph.order = graph.kahn_order();
        graph
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn node(&self, pointer: &str) -> Option<&GraphNode> {
        self.nodes.get(pointer)
    }

    pub fn contains(&self, pointer: &str) -> bool {
        self.nodes.contains_key(pointer)
    }

    /// Leaves-first declaration order. Members of a cycle are all present.
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    /// Groups of schemas that reach each other, including single schemas
    /// that reference themselves. Members and groups are in declaration
    /// order.
    pub fn cycles(&self) -> &[Vec<String>] {
        &self.cycles
    }

    pub fn is_circular(&self, pointer: &str) -> bool {
        self.nodes.get(pointer).is_some_and(|n| n.circular)
    }

    pub fn depth(&self, pointer: &str) -> usize {
        self.nodes.get(pointer).map_or(0, |n| n.depth)
    }

    /// Schemas on a cycle through `pointer`, itself included, in declaration
    /// order. Empty when `pointer` is not circular.
    pub fn cycle_partners(&self, pointer: &str) -> Vec<String> {
        self.nodes
            .get(pointer)
            .and_then(|node| node.cycle)
            .and_then(|index| self.cycles.get(index))
            .cloned()
            .unwrap_or_default()
    }

    /// Kahn's algorithm over the deep graph, leaves first.
    ///
    /// Ready nodes are taken in declaration order. When nothing is ready, the
    /// earliest-declared node whose outstanding dependencies all sit in its
    /// own cycle group is emitted to break that cycle.
    fn kahn_order(&self) -> Vec<String> {
        let count = self.nodes.len();
        let mut in_degree = vec![0usize; count];
        let mut deep_dependents: Vec<Vec<usize>> = vec![Vec::new(); count];

        for (index, node) in self.nodes.values().enumerate() {
            for dep in &node.deep_dependencies {
                let Some(dep_index) = self.nodes.get_index_of(dep.as_str()) else {
                    continue;
                };
                if dep_index == index {
                    continue;
                }
                in_degree[index] += 1;
                deep_dependents[dep_index].push(index);
            }
        }

        let mut ready: BTreeSet<usize> = (0..count).filter(|i| in_degree[*i] == 0).collect();
        let mut emitted = vec![false; count];
        let mut order = Vec::with_capacity(count);

        while order.len() < count {
            let next = match ready.pop_first() {
                Some(next) => next,
                None => {
                    let Some(forced) = self.cycle_breaker(&emitted) else {
                        break;
                    };
                    log::trace!(
                        "breaking cycle at {}",
                        self.nodes.get_index(forced).map_or("", |(k, _)| k.as_str())
                    );
                    forced
                }
            };
            if emitted[next] {
                continue;
            }
            emitted[next] = true;
            if let Some((key, _)) = self.nodes.get_index(next) {
                order.push(key.clone());
            }
            for &dependent in &deep_dependents[next] {
                in_degree[dependent] = in_degree[dependent].saturating_sub(1);
                if in_degree[dependent] == 0 && !emitted[dependent] {
                    ready.insert(dependent);
                }
            }
        }
        order
    }

    fn cycle_breaker(&self, emitted: &[bool]) -> Option<usize> {
        let pending = |pointer: &String| {
            self.nodes
                .get_index_of(pointer.as_str())
                .is_some_and(|i| !emitted[i])
        };
        let candidate = self.nodes.values().enumerate().find(|(index, node)| {
            !emitted[*index]
                && node
                    .deep_dependencies
                    .iter()
                    .filter(|dep| pending(dep))
                    .all(|dep| {
                        self.nodes
                            .get(dep)
                            .is_some_and(|d| d.cycle.is_some() && d.cycle == node.cycle)
                    })
        });
        candidate
            .map(|(index, _)| index)
            .or_else(|| (0..emitted.len()).find(|i| !emitted[*i]))
    }
}

/// Depth per schema over the condensation: a leaf is 0, a group referencing
/// only itself is 1, otherwise one more than its deepest outside dependency.
fn component_depths<'g>(
    graph: &DiGraphMap<&'g str, ()>,
    components: &[Vec<&'g str>],
) -> HashMap<&'g str, usize> {
    let component_of: HashMap<&str, usize> = components
        .iter()
        .enumerate()
        .flat_map(|(index, members)| members.iter().map(move |m| (*m, index)))
        .collect();

    // Components come back in reverse topological order, sinks first.
    let mut component_depth = vec![0usize; components.len()];
    for (index, members) in components.iter().enumerate() {
        let mut depth = 0;
        for &member in members {
            for dep in graph.neighbors(member) {
                let step = match component_of.get(dep) {
                    Some(&other) if other != index => component_depth[other] + 1,
                    _ => 1,
                };
                depth = depth.max(step);
            }
        }
        component_depth[index] = depth;
    }

    component_of
        .into_iter()
        .map(|(pointer, index)| (pointer, component_depth[index]))
        .collect()
}

fn cycle_groups<'g>(
    graph: &DiGraphMap<&'g str, ()>,
    components: &[Vec<&'g str>],
    declared: &IndexSet<&str>,
) -> Vec<Vec<&'g str>> {
    let mut groups: Vec<Vec<&str>> = components
        .iter()
        .filter(|members| match members.as_slice() {
            [only] => graph.contains_edge(*only, *only),
            _ => true,
        })
        .map(|members| {
            let mut members = members.clone();
            members.sort_by_key(|m| declared.get_index_of(m));
            members
        })
        .collect();
    groups.sort_by_key(|members| members.first().and_then(|m| declared.get_index_of(m)));
    groups
}

/// Collect every `$ref` string below a schema slot, in first-seen order.
pub fn collect_refs(slot: &SchemaOrRef, out: &mut Vec<String>) {
    match slot {
        SchemaOrRef::Ref { ref_path } => {
            if !out.contains(ref_path) {
                out.push(ref_path.clone());
            }
        }
        SchemaOrRef::Schema(schema) => collect_schema_refs(schema, out),
    }
}

fn collect_schema_refs(schema: &Schema, out: &mut Vec<String>) {
    for prop in schema.properties.values() {
        collect_refs(prop, out);
    }
    for slot in [
        &schema.additional_properties,
        &schema.items,
        &schema.unevaluated_items,
    ]
    .into_iter()
    .flatten()
    {
        if let SchemaOrBool::Schema(inner) = slot {
            collect_refs(inner, out);
        }
    }
    for member in schema
        .prefix_items
        .iter()
        .chain(&schema.all_of)
        .chain(&schema.one_of)
        .chain(&schema.any_of)
    {
        collect_refs(member, out);
    }
    if let Some(not) = &schema.not {
        collect_refs(not, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(name: &str) -> String {
        format!("#/components/schemas/{name}")
    }

    fn graph(edges: &[(&str, &[&str])]) -> DependencyGraph {
        DependencyGraph::from_edges(
            edges
                .iter()
                .map(|(from, to)| (s(from), to.iter().map(|t| s(t)).collect())),
        )
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|p| *p == s(name)).unwrap()
    }

    #[test]
    fn test_simple_dependency_order() {
        let g = graph(&[("User", &["Profile"]), ("Profile", &[])]);
        assert_eq!(g.topological_order(), &[s("Profile"), s("User")]);
    }

    #[test]
    fn test_transitive_order() {
        let g = graph(&[
            ("Root", &["User"]),
            ("User", &["Profile", "Settings"]),
            ("Settings", &[]),
            ("Profile", &[]),
        ]);
        let order = g.topological_order();
        assert_eq!(order.len(), 4);
        assert!(position(order, "Profile") < position(order, "User"));
        assert!(position(order, "Settings") < position(order, "User"));
        assert!(position(order, "User") < position(order, "Root"));
        assert_eq!(g.depth(&s("Root")), 2);
        assert_eq!(g.depth(&s("Profile")), 0);
    }

    #[test]
    fn test_independent_schemas_keep_declaration_order() {
        let g = graph(&[("B", &[]), ("A", &[]), ("C", &[])]);
        assert_eq!(g.topological_order(), &[s("B"), s("A"), s("C")]);
    }

    #[test]
    fn test_self_reference_is_circular() {
        let g = graph(&[("Node", &["Node"])]);
        assert!(g.is_circular(&s("Node")));
        assert_eq!(g.cycles(), &[vec![s("Node")]]);
        assert_eq!(g.cycle_partners(&s("Node")), vec![s("Node")]);
        assert_eq!(g.topological_order(), &[s("Node")]);
    }

    #[test]
    fn test_mutual_reference_breaks_by_declaration_order() {
        let g = graph(&[
            ("Author", &["Book"]),
            ("Book", &["Author"]),
            ("Tag", &[]),
        ]);
        assert!(g.is_circular(&s("Author")));
        assert!(g.is_circular(&s("Book")));
        assert!(!g.is_circular(&s("Tag")));
        assert_eq!(g.cycles(), &[vec![s("Author"), s("Book")]]);
        assert_eq!(
            g.topological_order(),
            &[s("Tag"), s("Author"), s("Book")]
        );
        assert_eq!(g.cycle_partners(&s("Book")), vec![s("Author"), s("Book")]);
    }

    #[test]
    fn test_deep_graph_orders_through_nested_refs() {
        // Wrapper only reaches Leaf through Middle, but must still follow it.
        let g = graph(&[("Wrapper", &["Middle"]), ("Middle", &["Leaf"]), ("Leaf", &[])]);
        let node = g.node(&s("Wrapper")).unwrap();
        assert!(node.deep_dependencies.contains(&s("Leaf")));
        assert_eq!(
            g.topological_order(),
            &[s("Leaf"), s("Middle"), s("Wrapper")]
        );
    }

    #[test]
    fn test_schema_depending_on_cycle_follows_it() {
        let g = graph(&[
            ("Owner", &["A"]),
            ("A", &["B"]),
            ("B", &["A"]),
        ]);
        let order = g.topological_order();
        assert!(position(order, "A") < position(order, "Owner"));
        assert!(position(order, "B") < position(order, "Owner"));
        assert!(!g.is_circular(&s("Owner")));
        assert!(g.cycle_partners(&s("Owner")).is_empty());
    }

    #[test]
    fn test_dependents_are_tracked() {
        let g = graph(&[("User", &["Address"]), ("Order", &["Address"]), ("Address", &[])]);
        let address = g.node(&s("Address")).unwrap();
        let dependents: Vec<&String> = address.dependents.iter().collect();
        assert_eq!(dependents, vec![&s("User"), &s("Order")]);
    }

    #[test]
    fn test_unknown_targets_are_dropped() {
        let g = graph(&[("User", &["Ghost"])]);
        assert!(g.node(&s("User")).unwrap().dependencies.is_empty());
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn test_loops_sharing_a_schema_form_one_group() {
        let g = graph(&[
            ("A", &["B", "C"]),
            ("B", &["A"]),
            ("C", &["A"]),
            ("D", &["D"]),
        ]);
        assert_eq!(
            g.cycles(),
            &[vec![s("A"), s("B"), s("C")], vec![s("D")]]
        );
        assert_eq!(g.cycle_partners(&s("C")), vec![s("A"), s("B"), s("C")]);
        assert_eq!(g.node(&s("B")).unwrap().cycle, Some(0));
        assert_eq!(g.node(&s("D")).unwrap().cycle, Some(1));
    }

    #[test]
    fn test_cycle_members_share_depth() {
        let g = graph(&[
            ("Leaf", &[]),
            ("A", &["B", "Leaf"]),
            ("B", &["A"]),
            ("Node", &["Node"]),
        ]);
        assert_eq!(g.depth(&s("A")), 1);
        assert_eq!(g.depth(&s("B")), 1);
        assert_eq!(g.depth(&s("Node")), 1);
        assert_eq!(g.depth(&s("Leaf")), 0);

        let g = graph(&[("Top", &["A"]), ("A", &["B"]), ("B", &["A", "Leaf"]), ("Leaf", &[])]);
        assert_eq!(g.depth(&s("A")), 1);
        assert_eq!(g.depth(&s("B")), 1);
        assert_eq!(g.depth(&s("Top")), 2);
    }
}
