#![forbid(unsafe_code)]

pub mod asset;
pub mod batch;
pub mod builder;
pub mod config;
pub mod error;
pub mod exec_ffmpeg;
pub mod graph;
pub mod probe;
pub mod serialize;

pub use asset::{RenderedAsset, TextStyle};
pub use batch::{BatchSummary, run_batch};
pub use builder::{ScalePolicy, TileConfig, build};
pub use config::{Config, WatermarkSource};
pub use error::{FiligreeError, FiligreeResult};
pub use graph::{Canvas, Graph, Node, NodeId, NodeOp, PortRef, WatermarkAsset};
