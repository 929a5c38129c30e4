//! Arena-backed document tree.
//!
//! Nodes live in a flat table owned by [`Document`] and refer to each other
//! by [`NodeId`] index. The parent link is a plain index, so trees can be
//! cloned or dropped without any cycle bookkeeping.

/// Index of a node inside its owning [`Document`] arena.
pub type NodeId = usize;

/// Kind of a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Synthetic document root. Every tree has exactly one.
    Root,
    /// Tagged element with attributes and children.
    Element,
    /// Character data.
    Text,
    /// `<!-- ... -->`
    Comment,
    /// `<![CDATA[ ... ]]>`
    CData,
    /// `<!...>` or `<?...>` directive, stored with its leading marker.
    Directive,
}

/// A single node in the document arena.
#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    /// Element name; empty for non-element nodes.
    name: String,
    /// Character data for text/comment/CDATA/directive nodes.
    data: String,
    /// Attributes in insertion order, values exactly as written in markup.
    attrs: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: String::new(),
            data: String::new(),
            attrs: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Kind of this node.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Element name as written in the source markup. Empty for non-elements.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Character data of a text, comment, CDATA or directive node.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Whether this node is an element.
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Attributes in insertion order.
    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    /// Value of the named attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Replace the named attribute's value in place, or append it.
    ///
    /// An existing attribute keeps its position so serialized output stays
    /// byte-stable everywhere except the replaced value.
    pub fn set_attr(&mut self, name: &str, value: String) {
        if let Some(slot) = self.attrs.iter_mut().find(|(key, _)| key == name) {
            slot.1 = value;
        } else {
            self.attrs.push((name.to_string(), value));
        }
    }

    /// Parent of this node, if any.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in document order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A parsed document: a node arena plus the id of its root.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Root)],
            root: 0,
        }
    }

    /// Id of the document root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow a node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this document.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Mutably borrow a node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this document.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    /// Number of nodes in the arena, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document holds nothing but the root node.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Append a new element under `parent` and return its id.
    pub fn create_element(&mut self, parent: NodeId, name: &str) -> NodeId {
        let mut node = Node::new(NodeKind::Element);
        node.name = name.to_string();
        self.attach(parent, node)
    }

    /// Append a text node under `parent` and return its id.
    pub fn create_text(&mut self, parent: NodeId, data: &str) -> NodeId {
        let mut node = Node::new(NodeKind::Text);
        node.data = data.to_string();
        self.attach(parent, node)
    }

    /// Append a comment node under `parent` and return its id.
    pub fn create_comment(&mut self, parent: NodeId, data: &str) -> NodeId {
        let mut node = Node::new(NodeKind::Comment);
        node.data = data.to_string();
        self.attach(parent, node)
    }

    /// Append a CDATA node under `parent` and return its id.
    pub fn create_cdata(&mut self, parent: NodeId, data: &str) -> NodeId {
        let mut node = Node::new(NodeKind::CData);
        node.data = data.to_string();
        self.attach(parent, node)
    }

    /// Append a directive node under `parent` and return its id.
    pub fn create_directive(&mut self, parent: NodeId, data: &str) -> NodeId {
        let mut node = Node::new(NodeKind::Directive);
        node.data = data.to_string();
        self.attach(parent, node)
    }

    /// Add an attribute to an element, preserving insertion order.
    pub fn push_attr(&mut self, id: NodeId, name: &str, value: &str) {
        self.nodes[id]
            .attrs
            .push((name.to_string(), value.to_string()));
    }

    /// Ids of `id` and all its descendants in depth-first pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            for &child in self.nodes[current].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Walk from `id` towards the root, yielding ancestor ids nearest-first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.nodes[id].parent;
        while let Some(parent) = current {
            out.push(parent);
            current = self.nodes[parent].parent;
        }
        out
    }

    fn attach(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = self.nodes.len();
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        id
    }
}
