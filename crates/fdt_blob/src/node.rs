use core::{fmt, slice::ChunksExact};

use crate::{
    DeviceTree,
    token::{self, Token},
};

/// A node of the device tree.
#[derive(Clone, Copy)]
pub struct Node<'a> {
    tree: DeviceTree<'a>,
    name: &'a str,
    depth: usize,
    /// Offset of the first token after `FDT_BEGIN_NODE`.
    body: usize,
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("depth", &self.depth)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

impl<'a> Node<'a> {
    /// Full node name including the unit address, e.g. `memory@80000000`.
    ///
    /// The root node has an empty name.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Node name without the unit address, e.g. `memory`.
    #[must_use]
    pub fn unit_name(&self) -> &'a str {
        self.name.split_once('@').map_or(self.name, |(name, _)| name)
    }

    /// Nesting depth, the root node is 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn properties(&self) -> Properties<'a> {
        Properties {
            tree: self.tree,
            offset: self.body,
        }
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<Property<'a>> {
        self.properties().find(|p| p.name() == name)
    }

    /// Returns the direct children of this node in document order.
    #[must_use]
    pub fn children(&self) -> Children<'a> {
        Children {
            nodes: Nodes::new(self.tree, self.body, self.depth + 1),
            depth: self.depth + 1,
        }
    }

    pub(crate) fn matches_component(&self, component: &str) -> bool {
        if component.contains('@') {
            self.name == component
        } else {
            self.unit_name() == component
        }
    }
}

/// Lazy document-order sequence of nodes.
///
/// Restartable: the tree is immutable, so calling [`DeviceTree::nodes`]
/// again yields the same sequence.
#[derive(Debug, Clone)]
pub struct Nodes<'a> {
    tree: DeviceTree<'a>,
    offset: usize,
    depth: usize,
    /// The sequence ends when a node at this depth is closed.
    floor: usize,
    done: bool,
}

impl<'a> Nodes<'a> {
    pub(crate) fn new(tree: DeviceTree<'a>, offset: usize, depth: usize) -> Self {
        Self {
            tree,
            offset,
            depth,
            floor: depth,
            done: false,
        }
    }
}

impl<'a> Iterator for Nodes<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let Ok((token, next)) = token::read(self.tree.structs(), self.offset) else {
                self.done = true;
                break;
            };
            self.offset = next;
            match token {
                Token::BeginNode(name) => {
                    let node = Node {
                        tree: self.tree,
                        name,
                        depth: self.depth,
                        body: next,
                    };
                    self.depth += 1;
                    return Some(node);
                }
                Token::EndNode => {
                    if self.depth == self.floor {
                        self.done = true;
                    } else {
                        self.depth -= 1;
                    }
                }
                Token::Prop { .. } => {}
                Token::End => self.done = true,
            }
        }
        None
    }
}

/// Direct children of a node.
#[derive(Debug, Clone)]
pub struct Children<'a> {
    nodes: Nodes<'a>,
    depth: usize,
}

impl<'a> Iterator for Children<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let depth = self.depth;
        self.nodes.find(|n| n.depth == depth)
    }
}

/// Properties of a single node.
#[derive(Debug, Clone)]
pub struct Properties<'a> {
    tree: DeviceTree<'a>,
    offset: usize,
}

impl<'a> Iterator for Properties<'a> {
    type Item = Property<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (token, next) = token::read(self.tree.structs(), self.offset).ok()?;
        let Token::Prop { name_offset, value } = token else {
            return None;
        };
        self.offset = next;
        Some(Property {
            name: self.tree.string_at(name_offset)?,
            value,
        })
    }
}

/// A property value, still in blob (big-endian) encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Property<'a> {
    name: &'a str,
    value: &'a [u8],
}

impl<'a> Property<'a> {
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.name
    }

    #[must_use]
    pub fn value(&self) -> &'a [u8] {
        self.value
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Interprets the value as a `<string>`.
    ///
    /// The terminating NUL is stripped.
    #[must_use]
    pub fn as_str(&self) -> Option<&'a str> {
        let bytes = self.value.strip_suffix(&[0]).unwrap_or(self.value);
        core::str::from_utf8(bytes).ok()
    }

    /// Interprets the value as a single `<u32>` cell.
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        Some(u32::from_be_bytes(self.value.try_into().ok()?))
    }

    /// Interprets the value as a single `<u64>`.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        Some(u64::from_be_bytes(self.value.try_into().ok()?))
    }

    /// Interprets the value as exactly one 64-bit `(address, size)` pair.
    ///
    /// Returns `None` unless the value is exactly 16 bytes long.
    #[must_use]
    pub fn reg_pair(&self) -> Option<(u64, u64)> {
        let (base, size) = self.value.split_at_checked(8)?;
        if size.len() != 8 {
            return None;
        }
        Some((
            u64::from_be_bytes(base.try_into().ok()?),
            u64::from_be_bytes(size.try_into().ok()?),
        ))
    }

    /// Iterates over the value as `<u32>` cells.
    ///
    /// Trailing bytes that do not fill a cell are ignored.
    #[must_use]
    pub fn cells(&self) -> Cells<'a> {
        Cells {
            chunks: self.value.chunks_exact(4),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cells<'a> {
    chunks: ChunksExact<'a, u8>,
}

impl Iterator for Cells<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.chunks.next()?;
        Some(u32::from_be_bytes(chunk.try_into().ok()?))
    }
}

#[cfg(test)]
mod tests {
    use crate::{DeviceTree, builder::FdtBuilder};

    #[test]
    fn property_accessors() {
        let mut b = FdtBuilder::new();
        b.begin_node("")
            .property_str("device_type", "memory")
            .property_u32("#size-cells", 2)
            .property("clock", &0x1234_5678_9abc_def0_u64.to_be_bytes())
            .property_reg(&[(0x8000_0000, 0x1000), (0x9000_0000, 0x2000)])
            .property("empty", &[])
            .end_node();
        let blob = b.finish();
        let tree = DeviceTree::from_bytes(&blob).unwrap();
        let root = tree.root().unwrap();

        assert_eq!(root.property("device_type").unwrap().as_str(), Some("memory"));
        assert_eq!(root.property("#size-cells").unwrap().as_u32(), Some(2));
        assert_eq!(
            root.property("clock").unwrap().as_u64(),
            Some(0x1234_5678_9abc_def0)
        );

        let reg = root.property("reg").unwrap();
        assert_eq!(reg.len(), 32);
        assert_eq!(reg.reg_pair(), None);
        assert_eq!(
            reg.cells().collect::<Vec<_>>(),
            [0, 0x8000_0000, 0, 0x1000, 0, 0x9000_0000, 0, 0x2000]
        );

        assert!(root.property("empty").unwrap().is_empty());
        assert!(root.property("missing").is_none());
        assert_eq!(root.properties().count(), 5);
    }

    #[test]
    fn children_skip_grandchildren() {
        let mut b = FdtBuilder::new();
        b.begin_node("");
        b.begin_node("cpus");
        b.begin_node("cpu@0").end_node();
        b.begin_node("cpu@1");
        b.begin_node("interrupt-controller").end_node();
        b.end_node();
        b.end_node();
        b.begin_node("soc").end_node();
        b.end_node();
        let blob = b.finish();
        let tree = DeviceTree::from_bytes(&blob).unwrap();

        let root = tree.root().unwrap();
        let top = root.children().map(|n| n.name()).collect::<Vec<_>>();
        assert_eq!(top, ["cpus", "soc"]);

        let cpus = tree.find_node("/cpus").unwrap();
        let harts = cpus.children().map(|n| n.name()).collect::<Vec<_>>();
        assert_eq!(harts, ["cpu@0", "cpu@1"]);
    }

    #[test]
    fn nop_tokens_are_skipped() {
        let mut b = FdtBuilder::new();
        b.begin_node("").nop().property_u32("a", 1).nop();
        b.begin_node("child").nop().end_node();
        b.end_node();
        let blob = b.finish();
        let tree = DeviceTree::from_bytes(&blob).unwrap();

        assert_eq!(tree.nodes().count(), 2);
        assert_eq!(tree.root().unwrap().property("a").unwrap().as_u32(), Some(1));
        assert!(tree.find_node("/child").is_some());
    }
}
