use crate::{
    error::{FiligreeError, FiligreeResult},
    graph::{Graph, Node, NodeId, NodeOp, PortRef},
};

/// Stream labels for the two declared inputs of the engine invocation:
/// input 0 is the main image, input 1 the watermark asset.
pub const MAIN_INPUT_LABEL: &str = "[0:v]";
pub const WATERMARK_INPUT_LABEL: &str = "[1:v]";

/// Renders a validated graph into ffmpeg `-filter_complex` syntax.
///
/// Most nodes map one-to-one onto filters. The `Split` + `TileOverlay` pair
/// is the exception: ffmpeg's `tile` filter consumes the replicas as
/// successive frames of a single stream, so the pair collapses into
/// `tile=layout=CxR:overlap=N` applied to the split's own input, followed by
/// an origin-anchored overlay.
pub fn to_filter_complex(graph: &Graph) -> FiligreeResult<String> {
    graph.validate()?;

    let mut parts = Vec::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        match node.op {
            NodeOp::Scale { width } => parts.push(format!(
                "{}scale={width}:-1{}",
                input_label(graph, &node.inputs[0])?,
                output_labels(node)
            )),
            NodeOp::AlphaMultiply { opacity } => parts.push(format!(
                "{}format=rgba,colorchannelmixer=aa={opacity}{}",
                input_label(graph, &node.inputs[0])?,
                output_labels(node)
            )),
            NodeOp::Split { fanout } => {
                if split_feeds_tile_overlay(graph, node.id) {
                    continue;
                }
                parts.push(format!(
                    "{}split={fanout}{}",
                    input_label(graph, &node.inputs[0])?,
                    output_labels(node)
                ));
            }
            NodeOp::Overlay { x, y } => parts.push(format!(
                "{}{}overlay={x}:{y}{}",
                input_label(graph, &node.inputs[0])?,
                input_label(graph, &node.inputs[1])?,
                output_labels(node)
            )),
            NodeOp::TileOverlay {
                cols,
                rows,
                overlap,
            } => {
                let grid_src = tile_overlay_source(graph, node)?;
                parts.push(format!(
                    "{grid_src}tile=layout={cols}x{rows}:overlap={overlap}[tiled]"
                ));
                parts.push(format!(
                    "{}[tiled]overlay=0:0{}",
                    input_label(graph, &node.inputs[0])?,
                    output_labels(node)
                ));
            }
        }
    }

    Ok(parts.join(";"))
}

fn input_label(graph: &Graph, port: &PortRef) -> FiligreeResult<String> {
    match port {
        PortRef::MainImage => Ok(MAIN_INPUT_LABEL.to_string()),
        PortRef::WatermarkAsset => Ok(WATERMARK_INPUT_LABEL.to_string()),
        PortRef::Node { node, output } => {
            let src = graph
                .node(*node)
                .ok_or_else(|| FiligreeError::graph(format!("unknown node {}", node.0)))?;
            let name = src.outputs.get(*output as usize).ok_or_else(|| {
                FiligreeError::graph(format!(
                    "node {} has no output {output}",
                    node.0
                ))
            })?;
            Ok(format!("[{name}]"))
        }
    }
}

fn output_labels(node: &Node) -> String {
    node.outputs
        .iter()
        .map(|name| format!("[{name}]"))
        .collect()
}

fn split_feeds_tile_overlay(graph: &Graph, split: NodeId) -> bool {
    graph.nodes.iter().any(|n| {
        matches!(n.op, NodeOp::TileOverlay { .. })
            && n.inputs
                .iter()
                .any(|r| matches!(r, PortRef::Node { node, .. } if *node == split))
    })
}

/// The stream that feeds the grid: the input of the `Split` whose ports the
/// `TileOverlay` consumes.
fn tile_overlay_source(graph: &Graph, node: &Node) -> FiligreeResult<String> {
    let Some(PortRef::Node { node: split_id, .. }) = node.inputs.get(1) else {
        return Err(FiligreeError::graph(
            "tile overlay must consume split output ports",
        ));
    };
    let split_id = *split_id;
    let split = graph
        .node(split_id)
        .ok_or_else(|| FiligreeError::graph(format!("unknown node {}", split_id.0)))?;
    if !matches!(split.op, NodeOp::Split { .. }) {
        return Err(FiligreeError::graph(
            "tile overlay must consume split output ports",
        ));
    }
    input_label(graph, &split.inputs[0])
}
