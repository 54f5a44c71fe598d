//! Edge table: how the executor picks the next node
//!
//! Each node has at most one outgoing entry:
//!
//! - **Direct**: always continue with the same [`Target`].
//! - **Conditional**: a dispatcher inspects the post-merge state and returns a
//!   label; the label map turns that label into a [`Target`].
//!
//! Dispatchers return a label type of the caller's choosing. A dispatcher that
//! can fail (a required field is missing, say) is registered with
//! [`EdgeTable::add_fallible_conditional_edges`]; its error is attributed to the
//! source node like any step failure. Open label types
//! (strings) are checked when the dispatcher runs. Enums implementing
//! [`ClosedLabel`] list all their variants, which lets the compiler reject a
//! label map that misses one before anything runs.
//!
//! ```rust
//! use flowgraph_core::edge::ClosedLabel;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Route {
//!     Retry,
//!     Done,
//! }
//!
//! impl ClosedLabel for Route {
//!     fn variants() -> &'static [Self] {
//!         &[Route::Retry, Route::Done]
//!     }
//! }
//! ```

use crate::error::{BoxError, GraphError, Result};
use crate::graph::{NodeId, Target};
use crate::state::GraphState;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Any value a dispatcher can return
pub trait RouteLabel: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> RouteLabel for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// A label type with a known, finite set of values
pub trait ClosedLabel: RouteLabel + Sized {
    /// Every value the dispatcher may return
    fn variants() -> &'static [Self];
}

/// Why a conditional edge produced no target
#[derive(Debug)]
pub enum RouteError {
    /// Debug rendering of a label missing from the label map
    Unmapped(String),
    /// The dispatcher itself failed
    Dispatch(BoxError),
}

type Router<S> = Arc<dyn Fn(&S) -> std::result::Result<Target, RouteError> + Send + Sync>;

/// Dispatcher plus label map, with the label type erased
pub struct ConditionalEdge<S> {
    router: Router<S>,
    targets: Vec<(String, Target)>,
    unmapped: Vec<String>,
}

impl<S: GraphState> ConditionalEdge<S> {
    /// Build from a dispatcher and its label map
    pub fn new<L, F>(dispatcher: F, label_map: HashMap<L, Target>) -> Self
    where
        L: RouteLabel,
        F: Fn(&S) -> L + Send + Sync + 'static,
    {
        Self::fallible(move |state: &S| Ok(dispatcher(state)), label_map)
    }

    /// Build from a dispatcher that may fail
    pub fn fallible<L, F>(dispatcher: F, label_map: HashMap<L, Target>) -> Self
    where
        L: RouteLabel,
        F: Fn(&S) -> std::result::Result<L, BoxError> + Send + Sync + 'static,
    {
        let mut targets: Vec<(String, Target)> = label_map
            .iter()
            .map(|(label, target)| (format!("{:?}", label), target.clone()))
            .collect();
        targets.sort();

        let router: Router<S> = Arc::new(move |state: &S| {
            let label = match dispatcher(state) {
                Ok(label) => label,
                Err(source) => return Err(RouteError::Dispatch(source)),
            };
            label_map
                .get(&label)
                .cloned()
                .ok_or_else(|| RouteError::Unmapped(format!("{:?}", label)))
        });

        Self {
            router,
            targets,
            unmapped: Vec::new(),
        }
    }

    /// Build from a closed label set, remembering which variants have no entry
    pub fn exhaustive<L, F>(dispatcher: F, label_map: HashMap<L, Target>) -> Self
    where
        L: ClosedLabel,
        F: Fn(&S) -> L + Send + Sync + 'static,
    {
        let unmapped = L::variants()
            .iter()
            .filter(|label| !label_map.contains_key(*label))
            .map(|label| format!("{:?}", label))
            .collect();
        Self {
            unmapped,
            ..Self::new(dispatcher, label_map)
        }
    }

    /// Run the dispatcher and map its label
    pub fn route(&self, state: &S) -> std::result::Result<Target, RouteError> {
        (self.router)(state)
    }

    /// `(label, target)` pairs, sorted by label
    pub fn branches(&self) -> &[(String, Target)] {
        &self.targets
    }

    /// Variants of a closed label set that have no mapping
    pub fn unmapped_labels(&self) -> &[String] {
        &self.unmapped
    }
}

/// Outgoing edge of a single node
pub enum Edge<S> {
    /// Unconditional successor
    Direct(Target),
    /// Successor chosen by a dispatcher
    Conditional(ConditionalEdge<S>),
}

impl<S: GraphState> Edge<S> {
    /// Every target this edge can lead to
    pub fn targets(&self) -> Vec<&Target> {
        match self {
            Edge::Direct(target) => vec![target],
            Edge::Conditional(cond) => cond.branches().iter().map(|(_, t)| t).collect(),
        }
    }
}

impl<S> std::fmt::Debug for Edge<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::Direct(target) => f.debug_tuple("Direct").field(target).finish(),
            Edge::Conditional(cond) => f
                .debug_struct("Conditional")
                .field("dispatcher", &"<function>")
                .field("branches", &cond.targets)
                .finish(),
        }
    }
}

/// Map from source node to its single outgoing edge
pub struct EdgeTable<S> {
    edges: BTreeMap<NodeId, Edge<S>>,
}

impl<S: GraphState> EdgeTable<S> {
    pub fn new() -> Self {
        Self {
            edges: BTreeMap::new(),
        }
    }

    /// Register an unconditional edge
    ///
    /// Fails with [`GraphError::DuplicateEdge`] if `from` already has one.
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<Target>) -> Result<()> {
        self.insert(from.into(), Edge::Direct(to.into()))
    }

    /// Register a conditional edge with an open label type
    pub fn add_conditional_edges<L, F>(
        &mut self,
        from: impl Into<NodeId>,
        dispatcher: F,
        label_map: HashMap<L, Target>,
    ) -> Result<()>
    where
        L: RouteLabel,
        F: Fn(&S) -> L + Send + Sync + 'static,
    {
        self.insert(
            from.into(),
            Edge::Conditional(ConditionalEdge::new(dispatcher, label_map)),
        )
    }

    /// Register a conditional edge whose dispatcher returns a `Result`
    pub fn add_fallible_conditional_edges<L, F>(
        &mut self,
        from: impl Into<NodeId>,
        dispatcher: F,
        label_map: HashMap<L, Target>,
    ) -> Result<()>
    where
        L: RouteLabel,
        F: Fn(&S) -> std::result::Result<L, BoxError> + Send + Sync + 'static,
    {
        self.insert(
            from.into(),
            Edge::Conditional(ConditionalEdge::fallible(dispatcher, label_map)),
        )
    }

    /// Register a conditional edge whose label set is closed
    pub fn add_exhaustive_conditional_edges<L, F>(
        &mut self,
        from: impl Into<NodeId>,
        dispatcher: F,
        label_map: HashMap<L, Target>,
    ) -> Result<()>
    where
        L: ClosedLabel,
        F: Fn(&S) -> L + Send + Sync + 'static,
    {
        self.insert(
            from.into(),
            Edge::Conditional(ConditionalEdge::exhaustive(dispatcher, label_map)),
        )
    }

    fn insert(&mut self, from: NodeId, edge: Edge<S>) -> Result<()> {
        if self.edges.contains_key(&from) {
            return Err(GraphError::DuplicateEdge(from));
        }
        self.edges.insert(from, edge);
        Ok(())
    }

    /// Pick the successor of `from` given the post-merge state
    ///
    /// # Errors
    ///
    /// - [`GraphError::StepExecution`] naming `from` if the dispatcher failed
    /// - [`GraphError::UnmappedLabel`] if the dispatcher's label has no entry
    /// - [`GraphError::NoOutgoingEdge`] if `from` has no edge at all
    pub fn resolve(&self, from: &str, state: &S) -> Result<Target> {
        match self.edges.get(from) {
            Some(Edge::Direct(target)) => Ok(target.clone()),
            Some(Edge::Conditional(cond)) => cond.route(state).map_err(|err| match err {
                RouteError::Unmapped(label) => GraphError::UnmappedLabel {
                    node: from.to_string(),
                    label,
                },
                RouteError::Dispatch(source) => GraphError::step_execution(from, source),
            }),
            None => Err(GraphError::NoOutgoingEdge(from.to_string())),
        }
    }

    pub fn get(&self, from: &str) -> Option<&Edge<S>> {
        self.edges.get(from)
    }

    pub fn contains(&self, from: &str) -> bool {
        self.edges.contains_key(from)
    }

    /// Edges in lexical order of their source
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Edge<S>)> {
        self.edges.iter().map(|(from, edge)| (from.as_str(), edge))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl<S: GraphState> Default for EdgeTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Level(i32);

    impl GraphState for Level {
        type Update = i32;

        fn merge(&mut self, update: i32) {
            self.0 = update;
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Sign {
        Positive,
        Negative,
    }

    impl ClosedLabel for Sign {
        fn variants() -> &'static [Self] {
            &[Sign::Positive, Sign::Negative]
        }
    }

    fn sign(state: &Level) -> Sign {
        if state.0 >= 0 {
            Sign::Positive
        } else {
            Sign::Negative
        }
    }

    #[test]
    fn test_direct_edge_resolves() {
        let mut table = EdgeTable::new();
        table.add_edge("a", "b").unwrap();
        table.add_edge("b", crate::graph::END).unwrap();

        assert_eq!(table.resolve("a", &Level(0)).unwrap(), Target::from("b"));
        assert_eq!(table.resolve("b", &Level(0)).unwrap(), Target::End);
    }

    #[test]
    fn test_duplicate_edge_rejected() {
        let mut table: EdgeTable<Level> = EdgeTable::new();
        table.add_edge("a", "b").unwrap();

        let err = table
            .add_conditional_edges("a", |_: &Level| "x", HashMap::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateEdge(ref n) if n == "a"));
    }

    #[test]
    fn test_conditional_edge_resolves() {
        let mut table = EdgeTable::new();
        let map = HashMap::from([
            (Sign::Positive, Target::from("grow")),
            (Sign::Negative, Target::End),
        ]);
        table.add_exhaustive_conditional_edges("check", sign, map).unwrap();

        assert_eq!(table.resolve("check", &Level(3)).unwrap(), Target::from("grow"));
        assert_eq!(table.resolve("check", &Level(-3)).unwrap(), Target::End);
    }

    #[test]
    fn test_unmapped_label_fails() {
        let mut table = EdgeTable::new();
        let map = HashMap::from([("known", Target::End)]);
        table
            .add_conditional_edges("route", |s: &Level| if s.0 > 0 { "known" } else { "other" }, map)
            .unwrap();

        assert!(table.resolve("route", &Level(1)).is_ok());
        let err = table.resolve("route", &Level(0)).unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnmappedLabel { ref node, ref label } if node == "route" && label == "\"other\""
        ));
    }

    #[test]
    fn test_failing_dispatcher_names_source_node() {
        let mut table = EdgeTable::new();
        let map = HashMap::from([("up", Target::from("grow"))]);
        table
            .add_fallible_conditional_edges(
                "route",
                |s: &Level| {
                    if s.0 >= 0 {
                        Ok("up")
                    } else {
                        Err(BoxError::from("level went negative"))
                    }
                },
                map,
            )
            .unwrap();

        assert_eq!(table.resolve("route", &Level(2)).unwrap(), Target::from("grow"));
        let err = table.resolve("route", &Level(-1)).unwrap_err();
        assert_eq!(err.node(), Some("route"));
        assert!(matches!(err, GraphError::StepExecution { .. }));
        assert!(err.to_string().contains("level went negative"));
    }

    #[test]
    fn test_no_outgoing_edge() {
        let table: EdgeTable<Level> = EdgeTable::new();
        assert!(matches!(
            table.resolve("lonely", &Level(0)),
            Err(GraphError::NoOutgoingEdge(ref n)) if n == "lonely"
        ));
    }

    #[test]
    fn test_exhaustive_records_missing_variants() {
        let map = HashMap::from([(Sign::Positive, Target::End)]);
        let edge: ConditionalEdge<Level> = ConditionalEdge::exhaustive(sign, map);
        assert_eq!(edge.unmapped_labels(), ["Negative".to_string()]);
        assert_eq!(edge.branches(), [("Positive".to_string(), Target::End)]);
    }
}
