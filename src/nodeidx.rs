use rustc_hash::FxHashMap;

/// Two-way index between node names (terms and genes) and dense `u32` ids.
#[derive(Debug)]
pub struct NodeIndex {
    name_to_id: FxHashMap<String, u32>,
    names: Vec<String>,
}

impl NodeIndex {
    pub fn new() -> Self {
        NodeIndex {
            name_to_id: FxHashMap::default(),
            names: Vec::new(),
        }
    }

    pub fn get_or_insert_id(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = self.names.len() as u32;
        self.name_to_id.insert(name.to_owned(), id);
        self.names.push(name.to_owned());
        id
    }

    pub fn get_id(&self, name: &str) -> Option<u32> {
        self.name_to_id.get(name).copied()
    }

    pub fn get_name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for NodeIndex {
    fn default() -> Self {
        Self::new()
    }
}
