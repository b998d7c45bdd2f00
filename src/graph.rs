use std::collections::HashSet;

use crate::error::{FiligreeError, FiligreeResult};

/// Pixel dimensions of one source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> FiligreeResult<Self> {
        let canvas = Self { width, height };
        canvas.validate()?;
        Ok(canvas)
    }

    pub fn validate(&self) -> FiligreeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FiligreeError::config("canvas width/height must be > 0"));
        }
        Ok(())
    }
}

/// The prepared overlay raster, reused across every file in a batch.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct WatermarkAsset {
    pub width: u32,
    pub height: u32,
    /// Alpha multiplier applied by the graph, 0..=1.
    pub opacity: f64,
}

impl WatermarkAsset {
    pub fn validate(&self) -> FiligreeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FiligreeError::config("watermark width/height must be > 0"));
        }
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(FiligreeError::config("opacity must be within 0..=1"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct NodeId(pub u32);

/// A consumable stream: one of the two declared inputs, or an output port of
/// an earlier node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PortRef {
    MainImage,
    WatermarkAsset,
    Node { node: NodeId, output: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum NodeOp {
    /// Resize to `width`, height derived from the input's aspect ratio.
    Scale { width: u32 },
    /// Multiply the alpha channel by `opacity`.
    AlphaMultiply { opacity: f64 },
    /// Replicate one input into `fanout` identical output ports.
    Split { fanout: u32 },
    /// Paste input 1 onto input 0 at `(x, y)`.
    Overlay { x: i64, y: i64 },
    /// Fixed-layout grid paste anchored at the origin; never parameterized
    /// by a density.
    TileOverlay { cols: u32, rows: u32, overlap: u32 },
}

impl NodeOp {
    /// Number of input ports the op consumes.
    pub fn arity(&self) -> usize {
        match *self {
            NodeOp::Scale { .. } | NodeOp::AlphaMultiply { .. } | NodeOp::Split { .. } => 1,
            NodeOp::Overlay { .. } => 2,
            NodeOp::TileOverlay { cols, rows, .. } => 1 + (cols * rows) as usize,
        }
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub op: NodeOp,
    pub inputs: Vec<PortRef>,
    /// Named output ports. Only the final node may leave this empty; the
    /// engine then treats its result as the overall output.
    pub outputs: Vec<String>,
}

/// Ordered DAG of compositing operations. The last node's first output (or
/// its unlabeled result) is the final image.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
}

impl Graph {
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Checks the single-assignment/forward-reference invariants: every
    /// output port is produced exactly once, every consumed port references
    /// a declared source or an earlier node, and input counts match each
    /// op's arity.
    pub fn validate(&self) -> FiligreeResult<()> {
        if self.nodes.is_empty() {
            return Err(FiligreeError::graph("graph must contain at least one node"));
        }

        let mut seen_ids = HashSet::new();
        let mut seen_ports = HashSet::new();

        for (idx, node) in self.nodes.iter().enumerate() {
            if !seen_ids.insert(node.id) {
                return Err(FiligreeError::graph(format!(
                    "node id {} produced twice",
                    node.id.0
                )));
            }

            let arity = node.op.arity();
            if node.inputs.len() != arity {
                return Err(FiligreeError::graph(format!(
                    "node {} expects {} inputs, got {}",
                    node.id.0,
                    arity,
                    node.inputs.len()
                )));
            }

            for input in &node.inputs {
                if let PortRef::Node { node: src, output } = input {
                    let Some(src_node) = self.nodes[..idx].iter().find(|n| n.id == *src) else {
                        return Err(FiligreeError::graph(format!(
                            "node {} consumes node {} which does not appear earlier",
                            node.id.0, src.0
                        )));
                    };
                    if *output as usize >= src_node.outputs.len() {
                        return Err(FiligreeError::graph(format!(
                            "node {} consumes output {} of node {}, which has {} outputs",
                            node.id.0,
                            output,
                            src.0,
                            src_node.outputs.len()
                        )));
                    }
                }
            }

            for name in &node.outputs {
                if name.is_empty() {
                    return Err(FiligreeError::graph(format!(
                        "node {} has an empty output port name",
                        node.id.0
                    )));
                }
                if !seen_ports.insert(name.as_str()) {
                    return Err(FiligreeError::graph(format!(
                        "output port '{name}' produced twice"
                    )));
                }
            }

            if node.outputs.is_empty() && idx + 1 != self.nodes.len() {
                return Err(FiligreeError::graph(format!(
                    "node {} omits output labels but is not the final node",
                    node.id.0
                )));
            }
        }

        Ok(())
    }
}
