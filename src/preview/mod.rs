//! The preview pipeline: which dataset, which bands, and how samples become
//! display values.
//!
//! - [`registry`]: id → dataset path mapping
//! - [`bands`]: band selection from the `indexes` parameter
//! - [`stretch`]: per-tile percentile contrast stretch
//! - [`composite`]: stretched bands to RGB

pub mod bands;
pub mod composite;
pub mod registry;
pub mod stretch;

pub use bands::{parse_requested, select, select_or_default, BandSelection};
pub use composite::{compose, RenderedTile};
pub use registry::{PreviewEntry, PreviewRegistry};
pub use stretch::ContrastStretch;
