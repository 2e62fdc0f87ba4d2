use glam::Mat4;

/// A node in the scene arena. Children are arena indices.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: Option<String>,
    pub local: Mat4,
    pub mesh: Option<usize>,
    pub children: Vec<usize>,
}

/// Scene hierarchy stored as a flat node arena plus the root list.
///
/// Node indices match glTF node indices when built from a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneGraph {
    pub nodes: Vec<SceneNode>,
    pub roots: Vec<usize>,
}

impl SceneGraph {
    /// Builds the arena from a document, rooted at the default scene.
    ///
    /// Falls back to the first scene, and to an empty graph when the document
    /// has no scenes at all.
    pub fn from_document(document: &gltf::Document) -> Self {
        let nodes = document
            .nodes()
            .map(|node| SceneNode {
                name: node.name().map(str::to_owned),
                local: Mat4::from_cols_array_2d(&node.transform().matrix()),
                mesh: node.mesh().map(|m| m.index()),
                children: node.children().map(|c| c.index()).collect(),
            })
            .collect();

        let roots = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .map(|scene| scene.nodes().map(|n| n.index()).collect())
            .unwrap_or_default();

        Self { nodes, roots }
    }

    /// Appends a node and returns its index.
    pub fn push(&mut self, local: Mat4, mesh: Option<usize>) -> usize {
        self.nodes.push(SceneNode {
            name: None,
            local,
            mesh,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    /// Appends a node as a child of `parent`.
    pub fn push_child(&mut self, parent: usize, local: Mat4, mesh: Option<usize>) -> usize {
        let child = self.push(local, mesh);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        child
    }

    /// Appends a node and marks it as a scene root.
    pub fn push_root(&mut self, local: Mat4, mesh: Option<usize>) -> usize {
        let root = self.push(local, mesh);
        self.roots.push(root);
        root
    }

    pub fn node(&self, index: usize) -> Option<&SceneNode> {
        self.nodes.get(index)
    }
}
