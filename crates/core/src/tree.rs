use std::collections::HashMap;

use tracing::{debug, trace};

use crate::files::{file_category, is_binary_file};
use crate::model::{FileCategory, FlatEntry, NodeId, NodeKind, TreeNode};

/// Path of `path` relative to `base`, or `None` when nothing remains.
///
/// Paths outside `base` are returned unchanged.
pub fn relative_path<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    let rel = if base.is_empty() {
        path
    } else if path == base {
        ""
    } else {
        path.strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(path)
    };
    (!rel.is_empty()).then_some(rel)
}

fn node_full_path(base: &str, key: &str) -> String {
    let joined = if base.is_empty() {
        key.to_string()
    } else {
        format!("{base}/{key}")
    };
    format!("/{}", joined.trim_start_matches('/'))
}

struct Slot {
    node: TreeNode,
    children: Vec<NodeId>,
}

struct Arena {
    slots: Vec<Slot>,
    roots: Vec<NodeId>,
    id_by_key: HashMap<String, NodeId>,
}

impl Arena {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            roots: Vec::new(),
            id_by_key: HashMap::new(),
        }
    }

    fn insert(&mut self, key: String, parent: Option<NodeId>, node: TreeNode) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            node,
            children: Vec::new(),
        });
        self.id_by_key.insert(key, id);
        match parent {
            Some(pid) => self.attach(pid, id),
            None => self.roots.push(id),
        }
        id
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        let slot = &mut self.slots[parent.0];
        if !slot.node.is_folder() {
            // A file path reused as a directory prefix becomes a folder.
            trace!(path = %slot.node.full_path, "promoting file node to folder");
            slot.node.kind = NodeKind::Folder;
            slot.node.category = FileCategory::Folder;
            slot.node.is_binary = false;
            slot.node.children = Some(Vec::new());
        }
        slot.children.push(child);
    }

    fn into_forest(self) -> Vec<TreeNode> {
        let Arena { slots, roots, .. } = self;
        let mut slots: Vec<Option<Slot>> = slots.into_iter().map(Some).collect();
        roots
            .into_iter()
            .filter_map(|id| materialize(&mut slots, id))
            .collect()
    }
}

fn materialize(slots: &mut [Option<Slot>], id: NodeId) -> Option<TreeNode> {
    let Slot { mut node, children } = slots.get_mut(id.0)?.take()?;
    if let Some(out) = node.children.as_mut() {
        for child in children {
            if let Some(c) = materialize(slots, child) {
                out.push(c);
            }
        }
    }
    Some(node)
}

/// Build a nested tree from a flat listing whose paths share `base`.
///
/// Sibling order follows first occurrence in `entries`. Entries that
/// resolve to the base itself contribute nothing, and a repeated path
/// reuses the node created for its first occurrence.
pub fn build_tree(entries: &[FlatEntry], base: &str) -> Vec<TreeNode> {
    let mut arena = Arena::new();

    for entry in entries {
        let Some(rel) = relative_path(&entry.path, base) else {
            trace!(path = %entry.path, "skipping base entry");
            continue;
        };
        let parts: Vec<&str> = rel.split('/').filter(|p| !p.is_empty()).collect();

        let mut key = String::new();
        let mut parent: Option<NodeId> = None;
        for (i, part) in parts.iter().enumerate() {
            if !key.is_empty() {
                key.push('/');
            }
            key.push_str(part);

            if let Some(id) = arena.id_by_key.get(&key).copied() {
                parent = Some(id);
                continue;
            }

            let is_last = i + 1 == parts.len();
            let is_folder = !is_last || entry.is_directory;
            let node = TreeNode {
                name: part.to_string(),
                kind: if is_folder { NodeKind::Folder } else { NodeKind::File },
                category: if is_folder {
                    FileCategory::Folder
                } else {
                    file_category(part)
                },
                full_path: node_full_path(base, &key),
                size: if is_last { entry.size } else { 0 },
                is_binary: !is_folder && is_binary_file(part),
                children: is_folder.then(Vec::new),
                loaded: false,
            };
            parent = Some(arena.insert(key.clone(), parent, node));
        }
    }

    let nodes = arena.slots.len();
    let forest = arena.into_forest();
    debug!(entries = entries.len(), roots = forest.len(), nodes, base, "built artifact tree");
    forest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn relative_path_rules() {
        assert_eq!(relative_path("a/b", ""), Some("a/b"));
        assert_eq!(relative_path("a/b", "a"), Some("b"));
        assert_eq!(relative_path("a", "a"), None);
        assert_eq!(relative_path("ab/c", "a"), Some("ab/c"));
        assert_eq!(relative_path("", ""), None);
    }

    #[test]
    fn top_level_listing_keeps_input_order() {
        let entries = vec![
            FlatEntry::dir("iris_model"),
            FlatEntry::dir("logs"),
            FlatEntry::file("config.yaml", 1024),
        ];
        let roots = build_tree(&entries, "");
        assert_eq!(names(&roots), ["iris_model", "logs", "config.yaml"]);
        assert_eq!(roots[0].children, Some(vec![]));
        assert_eq!(roots[2].children, None);
        assert_eq!(roots[2].size, 1024);
        assert_eq!(roots[2].full_path, "/config.yaml");
    }

    #[test]
    fn base_is_stripped() {
        let entries = vec![
            FlatEntry::file("iris_model/MLmodel", 927),
            FlatEntry::file("iris_model/conda.yaml", 262),
        ];
        let roots = build_tree(&entries, "iris_model");
        assert_eq!(names(&roots), ["MLmodel", "conda.yaml"]);
        assert_eq!(roots[0].full_path, "/iris_model/MLmodel");
        assert!(!roots[0].is_binary);
    }

    #[test]
    fn base_entry_itself_is_skipped() {
        let entries = vec![FlatEntry::dir("iris_model"), FlatEntry::file("iris_model/model.pkl", 10)];
        let roots = build_tree(&entries, "iris_model");
        assert_eq!(names(&roots), ["model.pkl"]);
        assert!(roots[0].is_binary);
        assert_eq!(roots[0].category, FileCategory::Model);
    }

    #[test]
    fn intermediate_folders_are_materialized_once() {
        let entries = vec![
            FlatEntry::file("a/b/one.txt", 1),
            FlatEntry::file("a/b/two.txt", 2),
            FlatEntry::file("a/c.bin", 3),
        ];
        let roots = build_tree(&entries, "");
        assert_eq!(roots.len(), 1);
        let a = &roots[0];
        assert!(a.is_folder());
        assert_eq!(a.size, 0);
        assert_eq!(names(a.children()), ["b", "c.bin"]);
        assert_eq!(names(a.children()[0].children()), ["one.txt", "two.txt"]);
        assert_eq!(a.children()[0].full_path, "/a/b");
        assert!(a.children()[1].is_binary);
    }

    #[test]
    fn duplicate_paths_reuse_node() {
        let entries = vec![FlatEntry::file("x/y.txt", 5), FlatEntry::file("x/y.txt", 9)];
        let roots = build_tree(&entries, "");
        assert_eq!(roots[0].count(), 2);
        assert_eq!(roots[0].children()[0].size, 5);
    }

    #[test]
    fn file_reused_as_prefix_becomes_folder() {
        let entries = vec![FlatEntry::file("data", 4), FlatEntry::file("data/part.bin", 8)];
        let roots = build_tree(&entries, "");
        assert!(roots[0].is_folder());
        assert!(!roots[0].is_binary);
        assert_eq!(names(roots[0].children()), ["part.bin"]);
    }

    #[test]
    fn empty_segments_are_ignored() {
        let roots = build_tree(&[FlatEntry::file("a//b/", 1)], "");
        assert_eq!(roots[0].name, "a");
        assert_eq!(roots[0].children()[0].full_path, "/a/b");
        assert_eq!(roots[0].children()[0].kind, NodeKind::File);
    }
}
