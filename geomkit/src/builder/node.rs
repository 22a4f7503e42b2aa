use crate::indexed::define_index;

define_index!(NodeId, "An index in the scene node arena");
define_index!(
    GeometryId,
    "An index into the packed geometry list of a finished scene"
);

/// A node in the scene hierarchy
///
/// Each node draws `count` indices starting at `start` in its geometry's
/// index array, and may have children which draw further ranges.  While the
/// builder is running, `start` is relative to the node's section; once the
/// scene is finalized it is relative to the packed geometry instead.
#[derive(Clone, Debug, Default)]
pub struct SceneNode {
    pub(crate) name: String,
    pub(crate) start: usize,
    pub(crate) count: usize,
    pub(crate) material: Option<usize>,
    pub(crate) geometry: Option<GeometryId>,
    pub(crate) section: Option<usize>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl SceneNode {
    /// Returns the node's name (empty if unnamed)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the node's name
    ///
    /// Named nodes survive finalization even if they draw nothing.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns the first index drawn by this node
    pub fn start(&self) -> usize {
        self.start
    }

    /// Returns the number of indices drawn by this node
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the palette material index, if any
    pub fn material(&self) -> Option<usize> {
        self.material
    }

    /// Sets the palette material index
    pub fn set_material(&mut self, m: Option<usize>) {
        self.material = m;
    }

    /// Returns the packed geometry drawn by this node (set on finalization)
    ///
    /// This is `None` before finalization, for the root, and for named nodes
    /// kept from a section that was dropped for being empty.
    pub fn geometry(&self) -> Option<GeometryId> {
        self.geometry
    }

    /// Returns the builder section that this node draws from
    pub fn section(&self) -> Option<usize> {
        self.section
    }

    /// Returns the parent node, or `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns child nodes, in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}
