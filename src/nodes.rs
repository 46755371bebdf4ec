//! Arena-backed document tree.
//!
//! All nodes of one parse live in a single `Tree`; a `NodeId` is an
//! index into it. Each slot carries parent/child/sibling links, so
//! unlinking and re-parenting (which the inline pass does constantly
//! when wrapping runs of siblings into emphasis or link nodes) are
//! O(1) pointer swaps. Dropping the `Document` frees everything at
//! once.

/// Index of a node inside a [`Tree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Ordered or bullet list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Ordered,
}

/// Delimiter of an ordered list marker: `1.` or `1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListDelim {
    Period,
    Paren,
}

/// Shared data of `List` and `ListItem` nodes.
///
/// The item's content indent (columns a continuation line must reach)
/// is `marker_offset + padding`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListData {
    pub kind: ListKind,
    pub tight: bool,
    pub bullet_char: u8,
    pub delimiter: ListDelim,
    pub start: usize,
    /// Columns between the start of the marker and the item content.
    pub padding: usize,
    /// Indentation of the marker itself.
    pub marker_offset: usize,
}

impl Default for ListData {
    fn default() -> Self {
        Self {
            kind: ListKind::Bullet,
            tight: false,
            bullet_char: 0,
            delimiter: ListDelim::Period,
            start: 1,
            padding: 0,
            marker_offset: 0,
        }
    }
}

/// Data of a `CodeBlock` node.
///
/// `info` is `None` exactly when the block is indented rather than
/// fenced; a fenced block without an info string stores `Some("")`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeData {
    pub fenced: bool,
    pub fence_char: u8,
    pub fence_length: usize,
    pub fence_offset: usize,
    pub info: Option<String>,
    pub literal: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeadingData {
    /// 1..=6.
    pub level: u8,
    pub setext: bool,
}

/// Destination and title of a `Link` or `Image` node.
///
/// Both strings are stored with entities and backslash escapes already
/// decoded; percent-encoding of the URL happens at render time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkData {
    pub url: String,
    /// Empty string means no title.
    pub title: String,
}

/// The closed set of node kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeValue {
    // Blocks.
    Document,
    BlockQuote,
    List(ListData),
    ListItem(ListData),
    CodeBlock(CodeData),
    /// Raw HTML block; the type code (1..=7) only matters while the
    /// block is open.
    HtmlBlock {
        html_type: u8,
        literal: String,
    },
    Paragraph,
    Heading(HeadingData),
    ThematicBreak,

    // Inlines.
    Text(String),
    SoftBreak,
    LineBreak,
    Code(String),
    HtmlInline(String),
    Emph,
    Strong,
    Link(LinkData),
    Image(LinkData),
}

impl NodeValue {
    /// Whether this kind is a block-level kind.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeValue::Document
                | NodeValue::BlockQuote
                | NodeValue::List(..)
                | NodeValue::ListItem(..)
                | NodeValue::CodeBlock(..)
                | NodeValue::HtmlBlock { .. }
                | NodeValue::Paragraph
                | NodeValue::Heading(..)
                | NodeValue::ThematicBreak
        )
    }

    /// Whether this kind may hold block children.
    pub fn is_container_block(&self) -> bool {
        matches!(
            self,
            NodeValue::Document
                | NodeValue::BlockQuote
                | NodeValue::List(..)
                | NodeValue::ListItem(..)
        )
    }

    /// Whether a node of this kind may contain a child of `child`'s kind.
    pub fn can_contain(&self, child: &NodeValue) -> bool {
        match self {
            NodeValue::Document | NodeValue::BlockQuote | NodeValue::ListItem(..) => {
                child.is_block() && !matches!(child, NodeValue::ListItem(..))
            }
            NodeValue::List(..) => matches!(child, NodeValue::ListItem(..)),
            NodeValue::Paragraph
            | NodeValue::Heading(..)
            | NodeValue::Emph
            | NodeValue::Strong
            | NodeValue::Link(..)
            | NodeValue::Image(..) => !child.is_block(),
            _ => false,
        }
    }

    pub fn text(&self) -> Option<&String> {
        match self {
            NodeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn text_mut(&mut self) -> Option<&mut String> {
        match self {
            NodeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Per-node payload.
#[derive(Clone, Debug)]
pub struct Ast {
    pub value: NodeValue,
    /// Raw text accumulated during the block phase (paragraph and
    /// heading leaves keep their lines here until the inline pass
    /// consumes them).
    pub content: String,
    /// First line of the node's source extent, 1-based.
    pub start_line: usize,
    /// Last line of the node's source extent, 1-based.
    pub end_line: usize,
    /// Still accepting lines during the block phase.
    pub open: bool,
    /// The last line contained in this node was blank. Drives the
    /// tight/loose computation for lists.
    pub last_line_blank: bool,
}

impl Ast {
    pub fn new(value: NodeValue, start_line: usize) -> Self {
        Self {
            value,
            content: String::new(),
            start_line,
            end_line: start_line,
            open: true,
            last_line_blank: false,
        }
    }
}

#[derive(Clone, Debug)]
struct Node {
    ast: Ast,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

/// Growable node arena holding one document tree.
#[derive(Clone, Debug, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(cap),
        }
    }

    /// Allocate a detached node.
    pub fn new_node(&mut self, ast: Ast) -> NodeId {
        debug_assert!(self.nodes.len() < u32::MAX as usize);
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            ast,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        });
        id
    }

    #[inline]
    pub fn ast(&self, id: NodeId) -> &Ast {
        &self.nodes[id.index()].ast
    }

    #[inline]
    pub fn ast_mut(&mut self, id: NodeId) -> &mut Ast {
        &mut self.nodes[id.index()].ast
    }

    #[inline]
    pub fn value(&self, id: NodeId) -> &NodeValue {
        &self.nodes[id.index()].ast.value
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    #[inline]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].first_child
    }

    #[inline]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].last_child
    }

    #[inline]
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].prev_sibling
    }

    #[inline]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].next_sibling
    }

    /// Detach `id` (and its subtree) from its parent and siblings.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let n = &self.nodes[id.index()];
            (n.parent, n.prev_sibling, n.next_sibling)
        };
        match prev {
            Some(p) => self.nodes[p.index()].next_sibling = next,
            None => {
                if let Some(par) = parent {
                    self.nodes[par.index()].first_child = next;
                }
            }
        }
        match next {
            Some(nx) => self.nodes[nx.index()].prev_sibling = prev,
            None => {
                if let Some(par) = parent {
                    self.nodes[par.index()].last_child = prev;
                }
            }
        }
        let n = &mut self.nodes[id.index()];
        n.parent = None;
        n.prev_sibling = None;
        n.next_sibling = None;
    }

    /// Append `child` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(parent != child);
        self.detach(child);
        let old_last = self.nodes[parent.index()].last_child;
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[child.index()].prev_sibling = old_last;
        match old_last {
            Some(l) => self.nodes[l.index()].next_sibling = Some(child),
            None => self.nodes[parent.index()].first_child = Some(child),
        }
        self.nodes[parent.index()].last_child = Some(child);
    }

    /// Insert `new` immediately after `id` in its sibling list.
    pub fn insert_after(&mut self, id: NodeId, new: NodeId) {
        debug_assert!(id != new);
        self.detach(new);
        let (parent, next) = {
            let n = &self.nodes[id.index()];
            (n.parent, n.next_sibling)
        };
        self.nodes[new.index()].parent = parent;
        self.nodes[new.index()].prev_sibling = Some(id);
        self.nodes[new.index()].next_sibling = next;
        self.nodes[id.index()].next_sibling = Some(new);
        match next {
            Some(nx) => self.nodes[nx.index()].prev_sibling = Some(new),
            None => {
                if let Some(par) = parent {
                    self.nodes[par.index()].last_child = Some(new);
                }
            }
        }
    }

    /// Insert `new` immediately before `id` in its sibling list.
    pub fn insert_before(&mut self, id: NodeId, new: NodeId) {
        debug_assert!(id != new);
        self.detach(new);
        let (parent, prev) = {
            let n = &self.nodes[id.index()];
            (n.parent, n.prev_sibling)
        };
        self.nodes[new.index()].parent = parent;
        self.nodes[new.index()].next_sibling = Some(id);
        self.nodes[new.index()].prev_sibling = prev;
        self.nodes[id.index()].prev_sibling = Some(new);
        match prev {
            Some(p) => self.nodes[p.index()].next_sibling = Some(new),
            None => {
                if let Some(par) = parent {
                    self.nodes[par.index()].first_child = Some(new);
                }
            }
        }
    }

    /// Iterator over the children of `id`, in order.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    /// Number of nodes ever allocated in this tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Child iterator returned by [`Tree::children`].
pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.next_sibling(id);
        Some(id)
    }
}

/// A parsed document: the arena plus its root node.
#[derive(Clone, Debug)]
pub struct Document {
    pub tree: Tree,
    root: NodeId,
}

impl Document {
    pub(crate) fn new(tree: Tree, root: NodeId) -> Self {
        debug_assert!(matches!(tree.value(root), NodeValue::Document));
        Self { tree, root }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(tree: &mut Tree, s: &str) -> NodeId {
        tree.new_node(Ast::new(NodeValue::Text(s.to_string()), 1))
    }

    #[test]
    fn test_append_links() {
        let mut tree = Tree::new();
        let root = tree.new_node(Ast::new(NodeValue::Document, 1));
        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        tree.append(root, a);
        tree.append(root, b);

        assert_eq!(tree.first_child(root), Some(a));
        assert_eq!(tree.last_child(root), Some(b));
        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.previous_sibling(b), Some(a));
        assert_eq!(tree.parent(a), Some(root));
        assert_eq!(tree.parent(b), Some(root));
    }

    #[test]
    fn test_detach_middle() {
        let mut tree = Tree::new();
        let root = tree.new_node(Ast::new(NodeValue::Document, 1));
        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        let c = text(&mut tree, "c");
        tree.append(root, a);
        tree.append(root, b);
        tree.append(root, c);

        tree.detach(b);
        assert_eq!(tree.next_sibling(a), Some(c));
        assert_eq!(tree.previous_sibling(c), Some(a));
        assert_eq!(tree.parent(b), None);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, c]);
    }

    #[test]
    fn test_detach_ends() {
        let mut tree = Tree::new();
        let root = tree.new_node(Ast::new(NodeValue::Document, 1));
        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        tree.append(root, a);
        tree.append(root, b);

        tree.detach(a);
        assert_eq!(tree.first_child(root), Some(b));
        tree.detach(b);
        assert_eq!(tree.first_child(root), None);
        assert_eq!(tree.last_child(root), None);
    }

    #[test]
    fn test_insert_after_before() {
        let mut tree = Tree::new();
        let root = tree.new_node(Ast::new(NodeValue::Document, 1));
        let a = text(&mut tree, "a");
        let c = text(&mut tree, "c");
        tree.append(root, a);
        tree.append(root, c);

        let b = text(&mut tree, "b");
        tree.insert_after(a, b);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, b, c]);

        let z = text(&mut tree, "z");
        tree.insert_before(a, z);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![z, a, b, c]);
        assert_eq!(tree.first_child(root), Some(z));
    }

    #[test]
    fn test_reparent_via_append() {
        let mut tree = Tree::new();
        let root = tree.new_node(Ast::new(NodeValue::Document, 1));
        let emph = tree.new_node(Ast::new(NodeValue::Emph, 1));
        let a = text(&mut tree, "a");
        tree.append(root, a);
        tree.append(root, emph);
        tree.append(emph, a);

        assert_eq!(tree.parent(a), Some(emph));
        assert_eq!(tree.first_child(root), Some(emph));
        assert_eq!(tree.first_child(emph), Some(a));
    }

    #[test]
    fn test_can_contain() {
        let list = NodeValue::List(ListData::default());
        let item = NodeValue::ListItem(ListData::default());
        let para = NodeValue::Paragraph;
        let text = NodeValue::Text(String::new());

        assert!(list.can_contain(&item));
        assert!(!list.can_contain(&para));
        assert!(item.can_contain(&para));
        assert!(!item.can_contain(&item));
        assert!(para.can_contain(&text));
        assert!(!para.can_contain(&para));
        assert!(NodeValue::Document.can_contain(&list));
    }
}
