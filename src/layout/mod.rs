//! # Layout
//!
//! Pure geometry: canonical-to-surface coordinate mapping and table grid
//! layout. Nothing here allocates surfaces or talks to the network.

pub mod table;
pub mod transform;

pub use table::{CellSources, ColumnSpan, TableGeometry, TableLayout};
pub use transform::{
    CANONICAL_HEIGHT, CANONICAL_WIDTH, MAX_ZOOM, MIN_ZOOM, PRINT_SCALE, ScreenRect, clamp_zoom,
    contain, page_size, transform, zoom_in, zoom_out,
};
