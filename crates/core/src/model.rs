use serde::{Deserialize, Serialize};

/// Index of a node inside the arena used while assembling a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct NodeId(pub usize);

/// One row of a flat artifact listing.
///
/// Accepts both the listing wire shape (`is_dir`, `file_size`) and the
/// camelCase spelling (`isDirectory`, `size`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatEntry {
    #[serde(default)]
    pub path: String,
    #[serde(rename = "is_dir", alias = "isDirectory", alias = "isDir", default)]
    pub is_directory: bool,
    #[serde(rename = "file_size", alias = "size", default)]
    pub size: u64,
}

impl FlatEntry {
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
            size,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_directory: true,
            size: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// Coarse artifact category shown next to a file in the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Folder,
    Model,
    Log,
    Config,
    Image,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub name: String,
    pub kind: NodeKind,
    pub category: FileCategory,
    /// Base path joined with the accumulated segments, always with a leading `/`.
    pub full_path: String,
    pub size: u64,
    pub is_binary: bool,
    /// Present iff the node is a folder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
    pub loaded: bool,
}

impl TreeNode {
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Depth-first, pre-order walk. `depth` is 0 for the node itself.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a TreeNode, usize)) {
        self.walk_at(0, f);
    }

    fn walk_at<'a>(&'a self, depth: usize, f: &mut impl FnMut(&'a TreeNode, usize)) {
        f(self, depth);
        for child in self.children() {
            child.walk_at(depth + 1, f);
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        let mut n = 0;
        self.walk(&mut |_, _| n += 1);
        n
    }
}

/// Walk every root in order.
pub fn walk_forest<'a>(roots: &'a [TreeNode], f: &mut impl FnMut(&'a TreeNode, usize)) {
    for root in roots {
        root.walk(f);
    }
}

pub fn find_by_path<'a>(roots: &'a [TreeNode], full_path: &str) -> Option<&'a TreeNode> {
    let mut found = None;
    walk_forest(roots, &mut |node, _| {
        if found.is_none() && node.full_path == full_path {
            found = Some(node);
        }
    });
    found
}
