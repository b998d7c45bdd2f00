use crate::{
    error::{FiligreeError, FiligreeResult},
    graph::{Canvas, Graph, Node, NodeId, NodeOp, PortRef, WatermarkAsset},
};

/// How the watermark's target width is derived from the canvas. Height is
/// always derived from the asset's aspect ratio afterwards.
///
/// Two distinct policies, never unified: proportional-of-min-dimension
/// pairs with the spread grid, percent-of-width with the fixed 2x2 grid.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ScalePolicy {
    ProportionOfCanvas {
        factor_tiled: f64,
        factor_untiled: f64,
    },
    PercentOfCanvasWidth {
        percent: f64,
    },
}

impl ScalePolicy {
    pub fn validate(&self) -> FiligreeResult<()> {
        match *self {
            ScalePolicy::ProportionOfCanvas {
                factor_tiled,
                factor_untiled,
            } => {
                for factor in [factor_tiled, factor_untiled] {
                    if !factor.is_finite() || factor <= 0.0 || factor > 1.0 {
                        return Err(FiligreeError::config(
                            "scale factor must be within (0, 1]",
                        ));
                    }
                }
            }
            ScalePolicy::PercentOfCanvasWidth { percent } => {
                if !percent.is_finite() || percent <= 0.0 || percent > 100.0 {
                    return Err(FiligreeError::config(
                        "scale percent must be within (0, 100]",
                    ));
                }
            }
        }
        Ok(())
    }

    fn target_width(&self, canvas: Canvas, tiled: bool) -> f64 {
        match *self {
            ScalePolicy::ProportionOfCanvas {
                factor_tiled,
                factor_untiled,
            } => {
                let factor = if tiled { factor_tiled } else { factor_untiled };
                f64::from(canvas.width.min(canvas.height)) * factor
            }
            ScalePolicy::PercentOfCanvasWidth { percent } => {
                f64::from(canvas.width) * percent / 100.0
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TileConfig {
    /// Single centered placement.
    None,
    /// density x density grid, corner-anchored proportional spacing.
    Spread { density: u32 },
    /// Constant 2x2 layout with 1-unit overlap, anchored at the origin.
    FixedGrid,
}

impl TileConfig {
    pub fn validate(&self) -> FiligreeResult<()> {
        if let TileConfig::Spread { density } = self
            && *density < 1
        {
            return Err(FiligreeError::config("tile density must be >= 1"));
        }
        Ok(())
    }

    pub fn is_tiled(&self) -> bool {
        !matches!(self, TileConfig::None)
    }
}

/// Scaled watermark dimensions for one canvas, rounded to whole pixels
/// (never below 1).
pub fn scaled_size(
    canvas: Canvas,
    asset: WatermarkAsset,
    scale: &ScalePolicy,
    tiling: &TileConfig,
) -> (u32, u32) {
    let width = scale.target_width(canvas, tiling.is_tiled()).round().max(1.0);
    let height = (width * f64::from(asset.height) / f64::from(asset.width))
        .round()
        .max(1.0);
    (width as u32, height as u32)
}

/// Synthesizes the compositing graph for one source image:
/// scale -> alpha-multiply -> (split ->) overlay chain.
///
/// The graph always starts from the two declared sources (`MainImage`,
/// `WatermarkAsset`) and ends in the node whose result is the output image.
/// Spread placement interpolates positions so the corner tiles land exactly
/// at the canvas corners; `density == 1` collapses to the centered
/// single-overlay shape, which also keeps the `density - 1` divisor nonzero.
pub fn build(
    canvas: Canvas,
    asset: WatermarkAsset,
    scale: &ScalePolicy,
    tiling: &TileConfig,
) -> FiligreeResult<Graph> {
    canvas.validate()?;
    asset.validate()?;
    scale.validate()?;
    tiling.validate()?;

    let (scaled_w, scaled_h) = scaled_size(canvas, asset, scale, tiling);
    let span_x = i64::from(canvas.width) - i64::from(scaled_w);
    let span_y = i64::from(canvas.height) - i64::from(scaled_h);

    let mut nodes = vec![
        Node {
            id: NodeId(0),
            op: NodeOp::Scale { width: scaled_w },
            inputs: vec![PortRef::WatermarkAsset],
            outputs: vec!["scaled".to_string()],
        },
        Node {
            id: NodeId(1),
            op: NodeOp::AlphaMultiply {
                opacity: asset.opacity,
            },
            inputs: vec![PortRef::Node {
                node: NodeId(0),
                output: 0,
            }],
            outputs: vec!["watermark".to_string()],
        },
    ];
    let watermark = PortRef::Node {
        node: NodeId(1),
        output: 0,
    };

    match *tiling {
        TileConfig::None | TileConfig::Spread { density: 1 } => {
            nodes.push(Node {
                id: NodeId(2),
                op: NodeOp::Overlay {
                    x: span_x / 2,
                    y: span_y / 2,
                },
                inputs: vec![PortRef::MainImage, watermark],
                outputs: vec![],
            });
        }
        TileConfig::Spread { density } => {
            let fanout = density * density;
            nodes.push(Node {
                id: NodeId(2),
                op: NodeOp::Split { fanout },
                inputs: vec![watermark],
                outputs: (0..fanout).map(|i| format!("tile{i}")).collect(),
            });

            let mut current = PortRef::MainImage;
            for row in 0..density {
                for col in 0..density {
                    let idx = row * density + col;
                    let id = NodeId(3 + idx);
                    let last = idx + 1 == fanout;
                    nodes.push(Node {
                        id,
                        op: NodeOp::Overlay {
                            x: span_x * i64::from(col) / i64::from(density - 1),
                            y: span_y * i64::from(row) / i64::from(density - 1),
                        },
                        inputs: vec![
                            current,
                            PortRef::Node {
                                node: NodeId(2),
                                output: idx,
                            },
                        ],
                        outputs: if last { vec![] } else { vec![format!("ovl{idx}")] },
                    });
                    current = PortRef::Node { node: id, output: 0 };
                }
            }
        }
        TileConfig::FixedGrid => {
            nodes.push(Node {
                id: NodeId(2),
                op: NodeOp::Split { fanout: 4 },
                inputs: vec![watermark],
                outputs: (0..4).map(|i| format!("tile{i}")).collect(),
            });
            let mut inputs = vec![PortRef::MainImage];
            inputs.extend((0..4).map(|output| PortRef::Node {
                node: NodeId(2),
                output,
            }));
            nodes.push(Node {
                id: NodeId(3),
                op: NodeOp::TileOverlay {
                    cols: 2,
                    rows: 2,
                    overlap: 1,
                },
                inputs,
                outputs: vec![],
            });
        }
    }

    let graph = Graph { nodes };
    graph.validate()?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(width: u32, height: u32) -> WatermarkAsset {
        WatermarkAsset {
            width,
            height,
            opacity: 0.5,
        }
    }

    #[test]
    fn proportion_policy_uses_min_dimension_and_tiled_factor() {
        let policy = ScalePolicy::ProportionOfCanvas {
            factor_tiled: 0.15,
            factor_untiled: 0.3,
        };
        let canvas = Canvas::new(2000, 1000).unwrap();

        let (w, _) = scaled_size(canvas, asset(100, 100), &policy, &TileConfig::Spread { density: 4 });
        assert_eq!(w, 150);

        let (w, _) = scaled_size(canvas, asset(100, 100), &policy, &TileConfig::None);
        assert_eq!(w, 300);
    }

    #[test]
    fn percent_policy_uses_canvas_width() {
        let policy = ScalePolicy::PercentOfCanvasWidth { percent: 30.0 };
        let canvas = Canvas::new(1000, 200).unwrap();
        let (w, _) = scaled_size(canvas, asset(100, 100), &policy, &TileConfig::FixedGrid);
        assert_eq!(w, 300);
    }

    #[test]
    fn height_preserves_asset_aspect_ratio() {
        let policy = ScalePolicy::PercentOfCanvasWidth { percent: 20.0 };
        let canvas = Canvas::new(500, 300).unwrap();
        let (w, h) = scaled_size(canvas, asset(100, 60), &policy, &TileConfig::None);
        assert_eq!((w, h), (100, 60));
    }

    #[test]
    fn untiled_graph_is_a_single_centered_overlay() {
        let canvas = Canvas::new(500, 300).unwrap();
        let graph = build(
            canvas,
            asset(100, 60),
            &ScalePolicy::PercentOfCanvasWidth { percent: 20.0 },
            &TileConfig::None,
        )
        .unwrap();

        assert_eq!(graph.nodes.len(), 3);
        let NodeOp::Overlay { x, y } = graph.nodes[2].op else {
            panic!("expected Overlay");
        };
        assert_eq!((x, y), (200, 120));
    }

    #[test]
    fn density_one_collapses_to_centered_single_overlay() {
        let canvas = Canvas::new(1000, 1000).unwrap();
        let graph = build(
            canvas,
            asset(100, 100),
            &ScalePolicy::PercentOfCanvasWidth { percent: 10.0 },
            &TileConfig::Spread { density: 1 },
        )
        .unwrap();

        let overlays: Vec<_> = graph
            .nodes
            .iter()
            .filter(|n| matches!(n.op, NodeOp::Overlay { .. }))
            .collect();
        assert_eq!(overlays.len(), 1);
        assert!(
            !graph
                .nodes
                .iter()
                .any(|n| matches!(n.op, NodeOp::Split { .. }))
        );
        let NodeOp::Overlay { x, y } = overlays[0].op else {
            unreachable!()
        };
        assert_eq!((x, y), (450, 450));
    }

    #[test]
    fn density_two_positions_are_row_major_and_corner_anchored() {
        let canvas = Canvas::new(1000, 1000).unwrap();
        let graph = build(
            canvas,
            asset(100, 100),
            &ScalePolicy::PercentOfCanvasWidth { percent: 10.0 },
            &TileConfig::Spread { density: 2 },
        )
        .unwrap();

        let positions: Vec<_> = graph
            .nodes
            .iter()
            .filter_map(|n| match n.op {
                NodeOp::Overlay { x, y } => Some((x, y)),
                _ => None,
            })
            .collect();
        assert_eq!(positions, vec![(0, 0), (900, 0), (0, 900), (900, 900)]);
    }

    #[test]
    fn rejects_out_of_range_opacity_before_building() {
        let canvas = Canvas::new(100, 100).unwrap();
        let policy = ScalePolicy::PercentOfCanvasWidth { percent: 10.0 };
        for opacity in [1.5, -0.1] {
            let bad = WatermarkAsset {
                width: 10,
                height: 10,
                opacity,
            };
            let err = build(canvas, bad, &policy, &TileConfig::None).unwrap_err();
            assert!(matches!(err, FiligreeError::Config(_)));
        }
    }

    #[test]
    fn rejects_degenerate_dimensions_and_density() {
        let policy = ScalePolicy::PercentOfCanvasWidth { percent: 10.0 };
        let canvas = Canvas::new(100, 100).unwrap();

        let err = build(
            Canvas {
                width: 0,
                height: 100,
            },
            asset(10, 10),
            &policy,
            &TileConfig::None,
        )
        .unwrap_err();
        assert!(matches!(err, FiligreeError::Config(_)));

        let err = build(
            canvas,
            asset(10, 10),
            &policy,
            &TileConfig::Spread { density: 0 },
        )
        .unwrap_err();
        assert!(matches!(err, FiligreeError::Config(_)));
    }

    #[test]
    fn fixed_grid_emits_split_and_one_tile_overlay() {
        let canvas = Canvas::new(1000, 800).unwrap();
        let graph = build(
            canvas,
            asset(200, 100),
            &ScalePolicy::PercentOfCanvasWidth { percent: 30.0 },
            &TileConfig::FixedGrid,
        )
        .unwrap();

        let NodeOp::Split { fanout } = graph.nodes[2].op else {
            panic!("expected Split");
        };
        assert_eq!(fanout, 4);

        let NodeOp::TileOverlay {
            cols,
            rows,
            overlap,
        } = graph.nodes[3].op
        else {
            panic!("expected TileOverlay");
        };
        assert_eq!((cols, rows, overlap), (2, 2, 1));
        assert_eq!(graph.nodes[3].inputs[0], PortRef::MainImage);
        assert_eq!(graph.nodes[3].inputs.len(), 5);
    }
}
