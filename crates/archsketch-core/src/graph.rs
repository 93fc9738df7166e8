//! Diagram graph: nodes, directed edges and the current selection.

use crate::config::NodeGeometry;
use kurbo::{Point, QuadBez, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Random 12 hex digit prefix shared by node and edge ids.
fn id_prefix() -> String {
    let mut s = Uuid::new_v4().simple().to_string();
    s.truncate(12);
    s
}

/// Parse the trailing `-<tag><n>` sequence of an id, defaulting to 1.
fn parse_sequence(id: &str, tag: char) -> u32 {
    let Some((_, last)) = id.rsplit_once('-') else {
        return 1;
    };
    let digits = last.strip_prefix(tag).unwrap_or(last);
    digits.parse().unwrap_or(1)
}

macro_rules! string_id {
    ($name:ident, $tag:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a fresh id carrying sequence number `n`.
            pub fn generate(n: u32) -> Self {
                Self(format!("{}-{}{}", id_prefix(), $tag, n))
            }

            /// Sequence number encoded in the id (1 if absent or unparsable).
            pub fn sequence_number(&self) -> u32 {
                parse_sequence(&self.0, $tag)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(NodeId, 'N');
string_id!(EdgeId, 'E');

/// Role of a node in the request flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionKind {
    Start,
    #[default]
    Process,
    End,
}

/// A scalar configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// A diagram node. `(x, y)` is the node centre in canvas space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub position: PositionKind,
    /// Icon identifier, resolved by the renderer.
    pub icon: String,
    #[serde(default)]
    pub configurations: BTreeMap<String, ConfigValue>,
}

impl Node {
    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Square footprint of side `size` around the centre.
    pub fn footprint(&self, size: f64) -> Rect {
        Rect::from_center_size(self.center(), (size, size))
    }
}

/// A directed edge from `source`'s output port to `target`'s input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
}

/// Catalog entry used to create a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeTemplate {
    pub label: Option<String>,
    pub icon: Option<String>,
    pub position: Option<PositionKind>,
    #[serde(default)]
    pub configurations: BTreeMap<String, ConfigValue>,
}

/// Partial node update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub label: Option<String>,
    pub icon: Option<String>,
    pub position: Option<PositionKind>,
    pub configurations: Option<BTreeMap<String, ConfigValue>>,
}

/// Current node/edge selection. At most one of `node` and `edge` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub node: Option<NodeId>,
    pub edge: Option<EdgeId>,
    pub details_panel_open: bool,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.node.is_none() && self.edge.is_none()
    }
}

/// Graph operations the interaction machine relies on.
pub trait GraphStore {
    fn nodes(&self) -> &[Node];
    fn edges(&self) -> &[Edge];
    fn node(&self, id: &NodeId) -> Option<&Node>;

    /// Move a node's centre. Returns false if the node does not exist.
    fn update_node_position(&mut self, id: &NodeId, position: Point) -> bool;

    /// Connect `source` to `target`.
    ///
    /// Returns `None` for self loops, duplicate ordered pairs and missing
    /// endpoints.
    fn add_edge(&mut self, source: &NodeId, target: &NodeId) -> Option<EdgeId>;

    /// Remove a node together with every edge touching it.
    fn delete_node(&mut self, id: &NodeId) -> Option<Node>;
    fn delete_edge(&mut self, id: &EdgeId) -> Option<Edge>;

    fn selection(&self) -> &Selection;
    fn set_selected_node(&mut self, id: Option<NodeId>);
    fn set_selected_edge(&mut self, id: Option<EdgeId>);
    fn set_details_panel(&mut self, open: bool);
    fn clear_selection(&mut self);
}

/// Output port anchor of a node.
pub fn output_port(node: &Node, geometry: &NodeGeometry) -> Point {
    node.center() + geometry.output_port
}

/// Input port anchor of a node.
pub fn input_port(node: &Node, geometry: &NodeGeometry) -> Point {
    node.center() + geometry.input_port
}

/// Curve between two ports, sagging proportionally to the horizontal span.
pub fn port_curve(from: Point, to: Point) -> QuadBez {
    let d = to - from;
    let control = from + d * 0.5 + Vec2::new(0.0, d.x.abs() * 0.2);
    QuadBez::new(from, control, to)
}

/// Curve drawn for an edge from `source`'s output port to `target`'s input port.
pub fn edge_curve(source: &Node, target: &Node, geometry: &NodeGeometry) -> QuadBez {
    port_curve(output_port(source, geometry), input_port(target, geometry))
}

/// In-memory diagram graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagramGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    selection: Selection,
}

impl DiagramGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from persisted parts, dropping dangling edges.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut graph = Self::new();
        graph.replace(nodes, edges);
        graph
    }

    /// Replace all nodes and edges. Selection is cleared.
    pub fn replace(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        self.nodes = nodes;
        self.edges = edges;
        let before = self.edges.len();
        let nodes = &self.nodes;
        self.edges.retain(|e| {
            nodes.iter().any(|n| n.id == e.source) && nodes.iter().any(|n| n.id == e.target)
        });
        if self.edges.len() != before {
            log::debug!("Dropped {} dangling edges", before - self.edges.len());
        }
        self.selection = Selection::default();
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn next_node_number(&self) -> u32 {
        self.nodes.iter().map(|n| n.id.sequence_number()).max().unwrap_or(0) + 1
    }

    fn next_edge_number(&self) -> u32 {
        self.edges.iter().map(|e| e.id.sequence_number()).max().unwrap_or(0) + 1
    }

    /// Create a node from a template centred at `at`.
    pub fn add_node(&mut self, template: &NodeTemplate, at: Point) -> NodeId {
        let n = self.next_node_number();
        let id = NodeId::generate(n);
        self.nodes.push(Node {
            id: id.clone(),
            label: template.label.clone().unwrap_or_else(|| format!("Node {}", n)),
            x: at.x,
            y: at.y,
            position: template.position.unwrap_or_default(),
            icon: template.icon.clone().unwrap_or_else(|| "Circle".to_string()),
            configurations: template.configurations.clone(),
        });
        id
    }

    /// Apply a partial update. Returns false if the node does not exist.
    pub fn update_node(&mut self, id: &NodeId, patch: NodePatch) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|n| &n.id == id) else {
            return false;
        };
        if let Some(label) = patch.label {
            node.label = label;
        }
        if let Some(icon) = patch.icon {
            node.icon = icon;
        }
        if let Some(position) = patch.position {
            node.position = position;
        }
        if let Some(configurations) = patch.configurations {
            node.configurations = configurations;
        }
        true
    }

    /// Whether an edge already connects `source` to `target` (in that order).
    pub fn edge_exists(&self, source: &NodeId, target: &NodeId) -> bool {
        self.edges
            .iter()
            .any(|e| &e.source == source && &e.target == target)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.id == id)
    }

    /// Edges whose endpoints both exist, with their resolved nodes.
    pub fn resolved_edges(&self) -> impl Iterator<Item = (&Edge, &Node, &Node)> {
        self.edges.iter().filter_map(|e| {
            let source = self.node(&e.source)?;
            let target = self.node(&e.target)?;
            Some((e, source, target))
        })
    }

    /// Curves for all drawable edges.
    pub fn edge_curves(&self, geometry: &NodeGeometry) -> Vec<(EdgeId, QuadBez)> {
        self.resolved_edges()
            .map(|(e, s, t)| (e.id.clone(), edge_curve(s, t, geometry)))
            .collect()
    }

    /// Bounding box of all node footprints.
    pub fn bounds(&self, footprint: f64) -> Option<Rect> {
        self.nodes
            .iter()
            .map(|n| n.footprint(footprint))
            .reduce(|a, b| a.union(b))
    }

    /// The demo architecture shown on first launch.
    pub fn sample() -> Self {
        let specs: [(&str, &str, f64, f64, PositionKind); 8] = [
            ("Client", "Smartphone", 385.0, 280.0, PositionKind::Start),
            ("Gateway", "Network", 465.0, 280.0, PositionKind::Process),
            ("Service", "Boxes", 545.0, 280.0, PositionKind::Process),
            ("Load Balancer", "Scale", 625.0, 280.0, PositionKind::Process),
            ("Server", "Server", 710.0, 200.0, PositionKind::Process),
            ("Server", "Server", 710.0, 280.0, PositionKind::Process),
            ("Server", "Server", 710.0, 360.0, PositionKind::Process),
            ("Database", "Database", 800.0, 280.0, PositionKind::Process),
        ];
        let nodes: Vec<Node> = specs
            .iter()
            .zip(1..)
            .map(|(&(label, icon, x, y, position), n)| Node {
                id: NodeId::generate(n),
                label: label.to_string(),
                x,
                y,
                position,
                icon: icon.to_string(),
                configurations: BTreeMap::new(),
            })
            .collect();

        let pairs = [(0, 1), (1, 2), (2, 3), (3, 4), (3, 5), (3, 6), (4, 7), (5, 7), (6, 7)];
        let edges = pairs
            .iter()
            .zip(1..)
            .map(|(&(s, t), n)| Edge {
                id: EdgeId::generate(n),
                source: nodes[s].id.clone(),
                target: nodes[t].id.clone(),
            })
            .collect();

        Self::from_parts(nodes, edges)
    }
}

impl GraphStore for DiagramGraph {
    fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    fn edges(&self) -> &[Edge] {
        &self.edges
    }

    fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    fn update_node_position(&mut self, id: &NodeId, position: Point) -> bool {
        match self.nodes.iter_mut().find(|n| &n.id == id) {
            Some(node) => {
                node.x = position.x;
                node.y = position.y;
                true
            }
            None => false,
        }
    }

    fn add_edge(&mut self, source: &NodeId, target: &NodeId) -> Option<EdgeId> {
        if source == target {
            log::debug!("Rejected self loop on {}", source);
            return None;
        }
        if self.node(source).is_none() || self.node(target).is_none() {
            log::debug!("Rejected edge {} -> {}: missing endpoint", source, target);
            return None;
        }
        if self.edge_exists(source, target) {
            return None;
        }
        let id = EdgeId::generate(self.next_edge_number());
        self.edges.push(Edge {
            id: id.clone(),
            source: source.clone(),
            target: target.clone(),
        });
        Some(id)
    }

    fn delete_node(&mut self, id: &NodeId) -> Option<Node> {
        let index = self.nodes.iter().position(|n| &n.id == id)?;
        let node = self.nodes.remove(index);
        self.edges.retain(|e| &e.source != id && &e.target != id);

        if self.selection.node.as_ref() == Some(id) {
            self.selection.node = None;
        }
        if let Some(edge) = &self.selection.edge {
            if !self.edges.iter().any(|e| &e.id == edge) {
                self.selection.edge = None;
            }
        }
        Some(node)
    }

    fn delete_edge(&mut self, id: &EdgeId) -> Option<Edge> {
        let index = self.edges.iter().position(|e| &e.id == id)?;
        if self.selection.edge.as_ref() == Some(id) {
            self.selection.edge = None;
        }
        Some(self.edges.remove(index))
    }

    fn selection(&self) -> &Selection {
        &self.selection
    }

    fn set_selected_node(&mut self, id: Option<NodeId>) {
        if id.is_some() {
            self.selection.edge = None;
            self.selection.details_panel_open = true;
        }
        self.selection.node = id;
    }

    fn set_selected_edge(&mut self, id: Option<EdgeId>) {
        if id.is_some() {
            self.selection.node = None;
            self.selection.details_panel_open = true;
        }
        self.selection.edge = id;
    }

    fn set_details_panel(&mut self, open: bool) {
        self.selection.details_panel_open = open;
    }

    fn clear_selection(&mut self) {
        self.selection = Selection::default();
    }
}
