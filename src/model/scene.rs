use serde::{Deserialize, Serialize};

/// A node discovered when the avatar's scene was loaded.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    /// Blend shape names in morph target order. Empty if the node has no morpher.
    #[serde(default)]
    pub morph_targets: Vec<String>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            morph_targets: vec![],
        }
    }

    pub fn with_morph_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.morph_targets = targets.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_morph_targets(&self) -> bool {
        !self.morph_targets.is_empty()
    }
}

/// Flat registry of named scene nodes, filled in once when the scene is loaded.
///
/// Whatever engine renders the avatar walks its own scene tree and registers
/// the nodes here, so nothing in the animation code depends on that engine.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct NodeRegistry {
    nodes: Vec<SceneNode>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. A node with the same name replaces the old one.
    pub fn register(&mut self, node: SceneNode) {
        match self.nodes.iter_mut().find(|v| v.name == node.name) {
            Some(v) => *v = node,
            None => self.nodes.push(node),
        }
    }

    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|v| v.name == name)
    }

    /// Find the node that carries the blend shapes.
    ///
    /// `preferred` is used when it exists and has morph targets, otherwise the
    /// first registered node with morph targets is returned.
    pub fn find_morph_node(&self, preferred: &str) -> Option<&SceneNode> {
        self.find(preferred)
            .filter(|v| v.has_morph_targets())
            .or_else(|| self.nodes.iter().find(|v| v.has_morph_targets()))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<SceneNode> for NodeRegistry {
    fn from_iter<T: IntoIterator<Item = SceneNode>>(iter: T) -> Self {
        let mut r = Self::new();
        for node in iter {
            r.register(node);
        }

        r
    }
}
