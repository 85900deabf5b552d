//! Capabilities
//!
//! The two narrow contracts through which the tree runtime consumes the
//! outside world. The runtime never implements these; a rendering host
//! supplies them.

use crate::{NodeId, Size};
use trellis_props::Value;

/// Presenter capability - can repaint a node and measure content
pub trait Presenter {
    /// Whether the presenting surface is currently present
    fn is_visible(&self) -> bool;

    /// Request a re-render of a node
    fn refresh_node(&mut self, node: NodeId);

    /// Measure content on behalf of a node
    fn measure_content(&mut self, owner: NodeId, content: &Value) -> Size;
}

/// View capability - a presenter that exposes viewport dimensions
///
/// Consumed only by the root element's parameterless arrange entry
/// point, which arranges the whole tree into `(0, 0, width, height)`.
pub trait View: Presenter {
    fn viewport_width(&self) -> f64;

    fn viewport_height(&self) -> f64;
}
