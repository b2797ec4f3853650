//! Three-level navigation tree over the flat chunk list.
//!
//! Nodes live in an arena and refer to each other by index. The root
//! summarises the document, one section node exists per run of leaves that
//! share a top-level section, and the original chunks are the leaves.

use mdchunk_core::{Chunk, Document, HierarchyInfo, HierarchyLevel, SectionId};

use super::strategies::BLOCK_SEPARATOR;

#[derive(Debug, Clone)]
pub struct HierarchyNode {
    pub id: usize,
    pub level: HierarchyLevel,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub chunk: Chunk,
}

#[derive(Debug, Clone)]
pub struct HierarchyTree {
    nodes: Vec<HierarchyNode>,
}

impl HierarchyTree {
    pub fn build(leaves: Vec<Chunk>, doc: &Document) -> Self {
        let mut tree = Self {
            nodes: vec![HierarchyNode {
                id: 0,
                level: HierarchyLevel::Root,
                parent: None,
                children: Vec::new(),
                chunk: root_chunk(doc),
            }],
        };

        // (top-level section, node id) of the section node currently open.
        let mut open: Option<(SectionId, usize)> = None;
        for leaf in leaves {
            let top = top_section_of(&leaf, doc);
            let parent = match (top, open) {
                (None, _) => 0,
                (Some(section), Some((current, node))) if section == current => node,
                (Some(section), _) => {
                    let node = tree.push(0, HierarchyLevel::Section, section_chunk(doc, section, &leaf));
                    open = Some((section, node));
                    node
                }
            };
            if parent != 0 {
                let section = &mut tree.nodes[parent].chunk;
                section.end_line = section.end_line.max(leaf.end_line);
            }
            tree.push(parent, HierarchyLevel::Leaf, leaf);
        }

        tree.annotate();
        tracing::debug!(nodes = tree.nodes.len(), "Hierarchy built");
        tree
    }

    fn push(&mut self, parent: usize, level: HierarchyLevel, chunk: Chunk) -> usize {
        let id = self.nodes.len();
        self.nodes.push(HierarchyNode {
            id,
            level,
            parent: Some(parent),
            children: Vec::new(),
            chunk,
        });
        self.nodes[parent].children.push(id);
        id
    }

    fn annotate(&mut self) {
        let section_count = self
            .nodes
            .iter()
            .filter(|n| n.level == HierarchyLevel::Section)
            .count();
        for node in &mut self.nodes {
            let is_root = node.level == HierarchyLevel::Root;
            let is_leaf = node.level == HierarchyLevel::Leaf;
            let chunk = &mut node.chunk;
            chunk.set_meta("hierarchy_level", node.level.depth());
            chunk.set_meta("node_id", node.id);
            if let Some(parent) = node.parent {
                chunk.set_meta("parent_id", parent);
            }
            chunk.set_meta("is_root", is_root);
            chunk.set_meta("is_leaf", is_leaf);
            if is_root {
                chunk.set_meta("section_count", section_count);
            }
            chunk.hierarchy = Some(HierarchyInfo {
                node_id: node.id,
                level: node.level,
                parent: node.parent,
                children: node.children.clone(),
                is_root,
                is_leaf,
            });
        }
    }

    pub fn root(&self) -> &HierarchyNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: usize) -> Option<&HierarchyNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in depth-first pre-order, root first.
    pub fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![0usize];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev().copied());
        }
        order
    }

    /// Every node, root and sections included.
    pub fn debug_view(&self) -> Vec<Chunk> {
        self.preorder()
            .into_iter()
            .map(|id| self.nodes[id].chunk.clone())
            .collect()
    }

    /// Leaves only, in original chunk order.
    pub fn leaves(&self) -> Vec<Chunk> {
        self.preorder()
            .into_iter()
            .filter(|&id| self.nodes[id].level == HierarchyLevel::Leaf)
            .map(|id| self.nodes[id].chunk.clone())
            .collect()
    }

    pub fn into_view(self, debug: bool) -> Vec<Chunk> {
        if debug {
            self.debug_view()
        } else {
            self.leaves()
        }
    }
}

fn top_section_of(chunk: &Chunk, doc: &Document) -> Option<SectionId> {
    chunk
        .spans
        .iter()
        .find_map(|s| doc.block(s.block_id).and_then(|b| b.section))
        .and_then(|section| doc.top_section(section))
        .map(|s| s.id)
}

fn root_chunk(doc: &Document) -> Chunk {
    let top_sections: Vec<&str> = doc
        .sections
        .iter()
        .filter(|s| s.parent.is_none())
        .map(|s| s.title.as_str())
        .collect();
    let title = doc
        .sections
        .iter()
        .min_by_key(|s| s.level)
        .map_or("Document", |s| s.title.as_str());

    let mut content = format!("# {title}");
    if !top_sections.is_empty() {
        content.push_str(BLOCK_SEPARATOR);
        let outline: Vec<String> = top_sections.iter().map(|t| format!("- {t}")).collect();
        content.push_str(&outline.join("\n"));
    }
    let end_line = doc.blocks.last().map_or(1, |b| b.end_line);
    let mut chunk = Chunk::new(content, 1, end_line);
    chunk.set_meta("content_type", "summary");
    chunk.set_meta("section_title", title);
    chunk
}

fn section_chunk(doc: &Document, section: SectionId, first_leaf: &Chunk) -> Chunk {
    let Some(info) = doc.section(section) else {
        return Chunk::new(String::new(), first_leaf.start_line, first_leaf.end_line);
    };
    let header = doc.block(info.header_block);
    let mut content = header.map_or_else(|| info.title.clone(), |b| b.content.clone());
    let subsections: Vec<String> = doc
        .sections
        .iter()
        .filter(|s| s.parent == Some(section))
        .map(|s| format!("- {}", s.title))
        .collect();
    if !subsections.is_empty() {
        content.push_str(BLOCK_SEPARATOR);
        content.push_str(&subsections.join("\n"));
    }
    let start_line = header.map_or(first_leaf.start_line, |b| b.start_line);
    let mut chunk = Chunk::new(content, start_line, first_leaf.end_line);
    chunk.set_meta("content_type", "section");
    chunk.set_meta("section_title", info.title.as_str());
    chunk.set_meta("header_path", doc.header_path(section));
    chunk
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::strategies::Strategy;
    use crate::document::parse_markdown;
    use mdchunk_core::{ChunkConfig, StrategyKind};

    const DOC: &str = "Preamble text.\n\n# Guide\n\nIntro.\n\n## Install\n\nSteps.\n\n## Usage\n\nRun it.\n\n# Appendix\n\nExtra.";

    fn tree() -> (Vec<Chunk>, HierarchyTree) {
        let doc = parse_markdown(DOC);
        let chunks = StrategyKind::Structural
            .build(&doc, &ChunkConfig::default())
            .unwrap();
        let tree = HierarchyTree::build(chunks.clone(), &doc);
        (chunks, tree)
    }

    #[test]
    fn leaves_preserve_chunk_order() {
        let (chunks, tree) = tree();
        let leaves = tree.leaves();
        assert_eq!(leaves.len(), chunks.len());
        for (leaf, chunk) in leaves.iter().zip(&chunks) {
            assert_eq!(leaf.content, chunk.content);
            assert!(leaf.is_leaf());
            assert!(leaf.meta_flag("is_leaf"));
        }
    }

    #[test]
    fn root_summarises_top_sections() {
        let (_, tree) = tree();
        let root = &tree.root().chunk;
        assert_eq!(root.content, "# Guide\n\n- Guide\n- Appendix");
        assert!(root.meta_flag("is_root"));
        assert_eq!(root.meta_usize("section_count"), Some(2));
    }

    #[test]
    fn sections_group_their_leaves() {
        let (chunks, tree) = tree();
        let root = tree.root();
        // Preamble leaf plus two section nodes.
        assert_eq!(root.children.len(), 3);
        assert_eq!(tree.node(root.children[0]).unwrap().level, HierarchyLevel::Leaf);
        let guide = tree.node(root.children[1]).unwrap();
        assert_eq!(guide.level, HierarchyLevel::Section);
        assert_eq!(guide.chunk.content, "# Guide\n\n- Install\n- Usage");
        assert_eq!(guide.children.len(), chunks.len() - 2);
        for child in &guide.children {
            assert_eq!(tree.node(*child).unwrap().parent, Some(guide.id));
        }
    }

    #[test]
    fn debug_view_includes_every_node() {
        let (chunks, tree) = tree();
        let all = tree.debug_view();
        assert_eq!(all.len(), tree.len());
        assert_eq!(all.len(), chunks.len() + 3);
        assert!(all[0].meta_flag("is_root"));
        assert_eq!(all[0].meta_usize("hierarchy_level"), Some(0));
    }
}
