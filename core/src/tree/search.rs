//! Cross-level tag search.

use super::{ElementRef, ElementTree, NodeId};
use crate::header::Tag;

impl ElementTree {
    /// Search for an element by tag, starting from the given node.
    ///
    /// The node itself (unless `exclude_self` is set) and its following
    /// siblings are tested in order,
    /// each followed by a depth-first search of its descendants.
    /// If nothing matches and the node has a parent,
    /// the search resumes right after the parent,
    /// one level up.
    /// This lets an attribute of an enclosing data set be resolved
    /// from inside a nested item.
    ///
    /// Tags are not unique across levels:
    /// the first match in this order is returned.
    pub fn find(&self, start: NodeId, tag: Tag, exclude_self: bool) -> Option<NodeId> {
        let mut from = start;
        let mut exclude = exclude_self;
        loop {
            let node = self.node(from)?;
            let cursor = if exclude {
                node.next_sibling
            } else {
                Some(from)
            };
            if let Some(found) = self.find_in_level(cursor, tag) {
                return Some(found);
            }
            from = node.parent?;
            exclude = true;
        }
    }

    /// Search the whole tree, starting from the first top-level element.
    pub fn find_tag(&self, tag: Tag) -> Option<ElementRef<'_>> {
        self.first
            .and_then(|first| self.find(first, tag, false))
            .and_then(|id| self.get(id))
    }

    /// Test the nodes from `cursor` to the end of its level,
    /// descending into each one, without ever going up.
    fn find_in_level(&self, mut cursor: Option<NodeId>, tag: Tag) -> Option<NodeId> {
        while let Some(id) = cursor {
            let node = self.node(id)?;
            if node.header.tag == tag {
                return Some(id);
            }
            if let Some(found) = self.find_in_level(node.first_child, tag) {
                return Some(found);
            }
            cursor = node.next_sibling;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::header::{Tag, VR};
    use crate::tree::ElementTree;

    const PATIENT_NAME: Tag = Tag(0x0010, 0x0010);
    const HALF_LIFE: Tag = Tag(0x0018, 0x1075);
    const MODALITY: Tag = Tag(0x0008, 0x0060);

    #[test]
    fn find_nested_from_top_level() {
        let mut tree = ElementTree::new();
        let top = tree
            .append_element(None, PATIENT_NAME, VR::PN, "DOE^JOHN")
            .unwrap();
        let seq = tree.append_sequence(None, Tag(0x0054, 0x0016)).unwrap();
        let item = tree.append_item(seq).unwrap();
        let x = tree
            .append_element(Some(item), HALF_LIFE, VR::DS, "6586.2")
            .unwrap();

        assert_eq!(tree.find(top, HALF_LIFE, false), Some(x));
        assert_eq!(tree.find(top, HALF_LIFE, true), Some(x));
        assert_eq!(tree.find_tag(HALF_LIFE).map(|e| e.id()), Some(x));
        assert_eq!(tree.find_tag(MODALITY).map(|e| e.id()), None);
    }

    #[test]
    fn find_enclosing_from_nested_item() {
        let mut tree = ElementTree::new();
        let seq = tree.append_sequence(None, Tag(0x0054, 0x0016)).unwrap();
        let item = tree.append_item(seq).unwrap();
        let inner = tree
            .append_element(Some(item), HALF_LIFE, VR::DS, "6586.2")
            .unwrap();
        let modality = tree.append_element(None, MODALITY, VR::CS, "PT").unwrap();

        // resolved one level up, after the enclosing sequence
        assert_eq!(tree.find(inner, MODALITY, true), Some(modality));
    }

    #[test]
    fn exclude_self_finds_next_occurrence() {
        let mut tree = ElementTree::new();
        let seq = tree.append_sequence(None, Tag(0x0008, 0x1140)).unwrap();
        let item1 = tree.append_item(seq).unwrap();
        let a = tree
            .append_element(Some(item1), Tag(0x0008, 0x1155), VR::UI, "1.2.3")
            .unwrap();
        let item2 = tree.append_item(seq).unwrap();
        let b = tree
            .append_element(Some(item2), Tag(0x0008, 0x1155), VR::UI, "1.2.4")
            .unwrap();

        assert_eq!(tree.find(a, Tag(0x0008, 0x1155), false), Some(a));
        assert_eq!(tree.find(a, Tag(0x0008, 0x1155), true), Some(b));
        assert_eq!(tree.find(b, Tag(0x0008, 0x1155), true), None);
    }
}
