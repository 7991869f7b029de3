use std::collections::HashMap;

/// Maps blend shape names to their index in the mesh's morph target array.
///
/// Built once when the animatable mesh is discovered. If a name appears more
/// than once, the first index is kept.
#[derive(Debug, Default, Clone)]
pub struct BlendShapeTable {
    indices: HashMap<String, usize>,
    names: Vec<String>,
}

impl BlendShapeTable {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut r = Self::default();

        for (idx, name) in names.into_iter().enumerate() {
            let name = name.into();
            r.indices.entry(name.clone()).or_insert(idx);
            r.names.push(name);
        }

        r
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    /// Number of morph targets on the mesh, including duplicate names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Target names in morph target order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}
