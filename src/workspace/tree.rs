//! Forest of entities for depth-first presentation.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::workspace::WorkspaceEntity;

/// An entity with its hierarchical children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub entity: WorkspaceEntity,
    pub children: Vec<TreeNode>,
}

/// Build a forest from `entities` using their hierarchical parents.
///
/// Entities whose parent is not in the set become roots. Roots and children
/// are ordered by path.
pub fn build_forest(entities: &[WorkspaceEntity]) -> Vec<TreeNode> {
    let index: HashMap<&Path, usize> = entities
        .iter()
        .enumerate()
        .map(|(i, e)| (e.path.as_path(), i))
        .collect();

    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut roots: Vec<usize> = Vec::new();
    for (i, entity) in entities.iter().enumerate() {
        match entity
            .hierarchical_parent()
            .and_then(|p| index.get(p).copied())
            .filter(|&p| p != i)
        {
            Some(parent) => children.entry(parent).or_default().push(i),
            None => roots.push(i),
        }
    }

    let by_path = |a: &usize, b: &usize| entities[*a].path.cmp(&entities[*b].path);
    roots.sort_by(by_path);
    for list in children.values_mut() {
        list.sort_by(by_path);
    }

    let mut placed = HashSet::new();
    let mut forest: Vec<TreeNode> = roots
        .into_iter()
        .map(|i| build_node(i, entities, &children, &mut placed))
        .collect();

    // Entities caught in a parent cycle are never reached from a root.
    let mut stranded: Vec<usize> = (0..entities.len()).filter(|i| !placed.contains(i)).collect();
    stranded.sort_by(by_path);
    for i in stranded {
        if !placed.contains(&i) {
            forest.push(build_node(i, entities, &children, &mut placed));
        }
    }

    forest
}

fn build_node(
    i: usize,
    entities: &[WorkspaceEntity],
    children: &HashMap<usize, Vec<usize>>,
    placed: &mut HashSet<usize>,
) -> TreeNode {
    placed.insert(i);
    let mut kids = Vec::new();
    for &c in children.get(&i).map(Vec::as_slice).unwrap_or_default() {
        if !placed.contains(&c) {
            kids.push(build_node(c, entities, children, placed));
        }
    }
    TreeNode {
        entity: entities[i].clone(),
        children: kids,
    }
}

/// Pre-order rows of `(tree depth, entity)`.
pub fn flatten_depth_first(forest: &[TreeNode]) -> Vec<(usize, &WorkspaceEntity)> {
    fn visit<'a>(node: &'a TreeNode, depth: usize, out: &mut Vec<(usize, &'a WorkspaceEntity)>) {
        out.push((depth, &node.entity));
        for child in &node.children {
            visit(child, depth + 1, out);
        }
    }

    let mut rows = Vec::new();
    for node in forest {
        visit(node, 0, &mut rows);
    }
    rows
}
