use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::row::{coerce_text, Row};

/// Identifier of a node within one `FilterTree` instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupOperator {
    And,
    Or,
}

impl GroupOperator {
    pub fn as_str(&self) -> &str {
        match self {
            GroupOperator::And => "AND",
            GroupOperator::Or => "OR",
        }
    }

    pub fn toggled(&self) -> GroupOperator {
        match self {
            GroupOperator::And => GroupOperator::Or,
            GroupOperator::Or => GroupOperator::And,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub id: NodeId,
    pub column: String,
    pub pattern: String,
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: NodeId,
    pub operator: GroupOperator,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FilterNode {
    Condition(Condition),
    Group(Group),
}

impl FilterNode {
    pub fn id(&self) -> NodeId {
        match self {
            FilterNode::Condition(c) => c.id,
            FilterNode::Group(g) => g.id,
        }
    }
}

/// Typed input for one condition, kept outside the tree so structural
/// rebuilds never lose in-progress edits. Owned by the controller, one
/// store per table instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionValue {
    pub column: String,
    pub pattern: String,
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueStore {
    entries: HashMap<NodeId, ConditionValue>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> Option<&ConditionValue> {
        self.entries.get(&id)
    }

    pub fn insert(&mut self, id: NodeId, value: ConditionValue) {
        self.entries.insert(id, value);
    }

    pub fn remove(&mut self, id: NodeId) {
        self.entries.remove(&id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Nested boolean filter expression stored as an arena of nodes addressed
/// by id. The root is always a Group. Structural operations take `&self`
/// and return a new tree; callers never observe in-place mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterTree {
    nodes: HashMap<NodeId, FilterNode>,
    root: NodeId,
    next_id: u64,
}

impl FilterTree {
    /// One AND group containing a single empty condition on `first_column`.
    pub fn create_default(first_column: &str) -> Self {
        let mut tree = FilterTree {
            nodes: HashMap::new(),
            root: NodeId(0),
            next_id: 0,
        };
        let root = tree.alloc_id();
        let cond = tree.alloc_id();
        tree.nodes.insert(
            cond,
            FilterNode::Condition(Condition {
                id: cond,
                column: first_column.to_string(),
                pattern: String::new(),
                case_sensitive: false,
            }),
        );
        tree.nodes.insert(
            root,
            FilterNode::Group(Group {
                id: root,
                operator: GroupOperator::And,
                children: vec![cond],
            }),
        );
        tree.root = root;
        tree
    }

    fn alloc_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&FilterNode> {
        self.nodes.get(&id)
    }

    pub fn group(&self, id: NodeId) -> Option<&Group> {
        match self.nodes.get(&id) {
            Some(FilterNode::Group(g)) => Some(g),
            _ => None,
        }
    }

    pub fn condition(&self, id: NodeId) -> Option<&Condition> {
        match self.nodes.get(&id) {
            Some(FilterNode::Condition(c)) => Some(c),
            _ => None,
        }
    }

    /// All condition ids in the tree, in no particular order.
    pub fn condition_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter_map(|(id, node)| match node {
                FilterNode::Condition(_) => Some(*id),
                FilterNode::Group(_) => None,
            })
            .collect()
    }

    /// Appends an empty condition to `group`. Unknown or non-group ids
    /// leave the tree unchanged.
    pub fn add_condition(&self, group: NodeId, default_column: &str) -> FilterTree {
        let mut next = self.clone();
        if next.group(group).is_none() {
            return next;
        }
        let cond = next.alloc_id();
        next.nodes.insert(
            cond,
            FilterNode::Condition(Condition {
                id: cond,
                column: default_column.to_string(),
                pattern: String::new(),
                case_sensitive: false,
            }),
        );
        if let Some(FilterNode::Group(g)) = next.nodes.get_mut(&group) {
            g.children.push(cond);
        }
        next
    }

    /// Appends a nested AND group holding one empty condition.
    pub fn add_group(&self, group: NodeId, default_column: &str) -> FilterTree {
        let mut next = self.clone();
        if next.group(group).is_none() {
            return next;
        }
        let child_group = next.alloc_id();
        let cond = next.alloc_id();
        next.nodes.insert(
            cond,
            FilterNode::Condition(Condition {
                id: cond,
                column: default_column.to_string(),
                pattern: String::new(),
                case_sensitive: false,
            }),
        );
        next.nodes.insert(
            child_group,
            FilterNode::Group(Group {
                id: child_group,
                operator: GroupOperator::And,
                children: vec![cond],
            }),
        );
        if let Some(FilterNode::Group(g)) = next.nodes.get_mut(&group) {
            g.children.push(child_group);
        }
        next
    }

    /// Removes the child at `index` from `group`, dropping the whole
    /// subtree. Returns the new tree and the ids of every condition that
    /// was removed, so the caller can evict their value-store entries.
    pub fn remove_child(&self, group: NodeId, index: usize) -> (FilterTree, Vec<NodeId>) {
        let mut next = self.clone();
        let child = match next.group(group) {
            Some(g) => match g.children.get(index) {
                Some(id) => *id,
                None => return (next, Vec::new()),
            },
            None => return (next, Vec::new()),
        };
        if let Some(FilterNode::Group(g)) = next.nodes.get_mut(&group) {
            g.children.remove(index);
        }
        let mut purged = Vec::new();
        next.drop_subtree(child, &mut purged);
        (next, purged)
    }

    fn drop_subtree(&mut self, id: NodeId, purged: &mut Vec<NodeId>) {
        match self.nodes.remove(&id) {
            Some(FilterNode::Condition(_)) => purged.push(id),
            Some(FilterNode::Group(g)) => {
                for child in g.children {
                    self.drop_subtree(child, purged);
                }
            }
            None => {}
        }
    }

    /// Flips AND to OR and back on `group`.
    pub fn toggle_operator(&self, group: NodeId) -> FilterTree {
        let mut next = self.clone();
        if let Some(FilterNode::Group(g)) = next.nodes.get_mut(&group) {
            g.operator = g.operator.toggled();
        }
        next
    }

    /// Value edit on one condition.
    pub fn set_condition(
        &self,
        id: NodeId,
        column: &str,
        pattern: &str,
        case_sensitive: bool,
    ) -> FilterTree {
        let mut next = self.clone();
        if let Some(FilterNode::Condition(c)) = next.nodes.get_mut(&id) {
            c.column = column.to_string();
            c.pattern = pattern.to_string();
            c.case_sensitive = case_sensitive;
        }
        next
    }

    /// True when no condition carries a pattern, i.e. the tree cannot
    /// exclude any row.
    pub fn is_pass_through(&self) -> bool {
        self.nodes.values().all(|node| match node {
            FilterNode::Condition(c) => c.pattern.is_empty(),
            FilterNode::Group(_) => true,
        })
    }

    /// Compiles the tree into a reusable predicate. Patterns are compiled
    /// once here rather than per row.
    pub fn compile(&self) -> CompiledFilter {
        CompiledFilter {
            root: self.compile_node(self.root),
        }
    }

    fn compile_node(&self, id: NodeId) -> CompiledNode {
        match self.nodes.get(&id) {
            Some(FilterNode::Condition(c)) => {
                if c.pattern.is_empty() {
                    // An unconfigured condition must not exclude rows.
                    return CompiledNode::PassThrough;
                }
                match RegexBuilder::new(&c.pattern)
                    .case_insensitive(!c.case_sensitive)
                    .build()
                {
                    Ok(regex) => CompiledNode::Match {
                        column: c.column.clone(),
                        regex,
                    },
                    // Malformed pattern fails closed.
                    Err(_) => CompiledNode::NeverMatches,
                }
            }
            Some(FilterNode::Group(g)) => CompiledNode::Group {
                operator: g.operator,
                children: g.children.iter().map(|c| self.compile_node(*c)).collect(),
            },
            // Dangling id: treat as pass-through rather than excluding rows.
            None => CompiledNode::PassThrough,
        }
    }

    /// Convenience single-row evaluation. Callers filtering many rows
    /// should `compile()` once and reuse the predicate.
    pub fn evaluate(&self, row: &Row) -> bool {
        self.compile().matches(row)
    }
}

#[derive(Debug)]
enum CompiledNode {
    PassThrough,
    NeverMatches,
    Match {
        column: String,
        regex: Regex,
    },
    Group {
        operator: GroupOperator,
        children: Vec<CompiledNode>,
    },
}

impl CompiledNode {
    fn matches(&self, row: &Row) -> bool {
        match self {
            CompiledNode::PassThrough => true,
            CompiledNode::NeverMatches => false,
            CompiledNode::Match { column, regex } => {
                regex.is_match(&coerce_text(row.get(column.as_str())))
            }
            CompiledNode::Group { operator, children } => match operator {
                // An empty group is vacuously true under both operators.
                GroupOperator::And => children.iter().all(|c| c.matches(row)),
                GroupOperator::Or => {
                    children.is_empty() || children.iter().any(|c| c.matches(row))
                }
            },
        }
    }
}

/// A compiled filter predicate over rows.
#[derive(Debug)]
pub struct CompiledFilter {
    root: CompiledNode,
}

impl CompiledFilter {
    pub fn matches(&self, row: &Row) -> bool {
        self.root.matches(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn tree_with_condition(column: &str, pattern: &str, case_sensitive: bool) -> FilterTree {
        let tree = FilterTree::create_default(column);
        let cond = tree.group(tree.root()).unwrap().children[0];
        tree.set_condition(cond, column, pattern, case_sensitive)
    }

    #[test]
    fn test_default_tree_shape() {
        let tree = FilterTree::create_default("name");
        let root = tree.group(tree.root()).expect("root must be a group");
        assert_eq!(root.operator, GroupOperator::And);
        assert_eq!(root.children.len(), 1);
        let cond = tree.condition(root.children[0]).expect("child is a condition");
        assert_eq!(cond.column, "name");
        assert_eq!(cond.pattern, "");
        assert!(!cond.case_sensitive);
    }

    #[test]
    fn test_empty_condition_passes_all_rows() {
        let tree = FilterTree::create_default("name");
        assert!(tree.evaluate(&row(&[("name", json!("Bob"))])));
        assert!(tree.evaluate(&row(&[])));
    }

    #[test]
    fn test_condition_matches_anywhere_in_string() {
        let tree = tree_with_condition("name", "nn", false);
        assert!(tree.evaluate(&row(&[("name", json!("Annie"))])));
        assert!(!tree.evaluate(&row(&[("name", json!("Bob"))])));
    }

    #[test]
    fn test_case_sensitivity() {
        let insensitive = tree_with_condition("name", "^a", false);
        assert!(insensitive.evaluate(&row(&[("name", json!("Ann"))])));

        let sensitive = tree_with_condition("name", "^a", true);
        assert!(!sensitive.evaluate(&row(&[("name", json!("Ann"))])));
        assert!(sensitive.evaluate(&row(&[("name", json!("ann"))])));
    }

    #[test]
    fn test_malformed_pattern_fails_closed() {
        let tree = tree_with_condition("name", "(unclosed", false);
        assert!(!tree.evaluate(&row(&[("name", json!("(unclosed"))])));
    }

    #[test]
    fn test_missing_cell_coerces_to_empty_string() {
        let tree = tree_with_condition("name", "^$", false);
        assert!(tree.evaluate(&row(&[])));
        assert!(tree.evaluate(&row(&[("name", json!(null))])));
        assert!(!tree.evaluate(&row(&[("name", json!("x"))])));
    }

    #[test]
    fn test_numeric_cell_matches_as_string() {
        let tree = tree_with_condition("age", "^3", false);
        assert!(tree.evaluate(&row(&[("age", json!(30))])));
        assert!(!tree.evaluate(&row(&[("age", json!(25))])));
    }

    #[test]
    fn test_empty_group_is_vacuously_true() {
        let tree = FilterTree::create_default("name");
        let (tree, _) = tree.remove_child(tree.root(), 0);
        assert_eq!(tree.group(tree.root()).unwrap().children.len(), 0);
        assert!(tree.evaluate(&row(&[("name", json!("anything"))])));

        let or_tree = tree.toggle_operator(tree.root());
        assert!(or_tree.evaluate(&row(&[("name", json!("anything"))])));
    }

    #[test]
    fn test_and_or_truth_tables() {
        // Two conditions: name starts with A, age contains 3.
        let base = FilterTree::create_default("name");
        let root = base.root();
        let tree = base.add_condition(root, "age");
        let children = tree.group(root).unwrap().children.clone();
        let tree = tree.set_condition(children[0], "name", "^A", false);
        let tree = tree.set_condition(children[1], "age", "3", false);

        let both = row(&[("name", json!("Ann")), ("age", json!(30))]);
        let first_only = row(&[("name", json!("Ann")), ("age", json!(25))]);
        let second_only = row(&[("name", json!("Bob")), ("age", json!(31))]);
        let neither = row(&[("name", json!("Bob")), ("age", json!(25))]);

        assert!(tree.evaluate(&both));
        assert!(!tree.evaluate(&first_only));
        assert!(!tree.evaluate(&second_only));
        assert!(!tree.evaluate(&neither));

        let or_tree = tree.toggle_operator(root);
        assert!(or_tree.evaluate(&both));
        assert!(or_tree.evaluate(&first_only));
        assert!(or_tree.evaluate(&second_only));
        assert!(!or_tree.evaluate(&neither));
    }

    #[test]
    fn test_nested_group_evaluation() {
        // name ^A AND (age 25 OR age 30)
        let base = FilterTree::create_default("name");
        let root = base.root();
        let tree = base.add_group(root, "age");
        let children = tree.group(root).unwrap().children.clone();
        let tree = tree.set_condition(children[0], "name", "^A", false);

        let nested = children[1];
        let tree = tree.toggle_operator(nested);
        let tree = tree.add_condition(nested, "age");
        let nested_children = tree.group(nested).unwrap().children.clone();
        let tree = tree.set_condition(nested_children[0], "age", "^25$", false);
        let tree = tree.set_condition(nested_children[1], "age", "^30$", false);

        assert!(tree.evaluate(&row(&[("name", json!("Ann")), ("age", json!(25))])));
        assert!(tree.evaluate(&row(&[("name", json!("Ada")), ("age", json!(30))])));
        assert!(!tree.evaluate(&row(&[("name", json!("Ann")), ("age", json!(40))])));
        assert!(!tree.evaluate(&row(&[("name", json!("Bob")), ("age", json!(25))])));
    }

    #[test]
    fn test_three_child_truth_tables() {
        let base = FilterTree::create_default("a");
        let root = base.root();
        let tree = base.add_condition(root, "b").add_condition(root, "c");
        let children = tree.group(root).unwrap().children.clone();
        assert_eq!(children.len(), 3);
        let tree = tree.set_condition(children[0], "a", "x", false);
        let tree = tree.set_condition(children[1], "b", "x", false);
        let tree = tree.set_condition(children[2], "c", "x", false);

        let all = row(&[("a", json!("x")), ("b", json!("x")), ("c", json!("x"))]);
        let two = row(&[("a", json!("x")), ("b", json!("x")), ("c", json!("y"))]);
        let none = row(&[("a", json!("y")), ("b", json!("y")), ("c", json!("y"))]);

        assert!(tree.evaluate(&all));
        assert!(!tree.evaluate(&two));

        let or_tree = tree.toggle_operator(root);
        assert!(or_tree.evaluate(&two));
        assert!(!or_tree.evaluate(&none));
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let tree = tree_with_condition("name", "^A", false);
        let r = row(&[("name", json!("Ann"))]);
        for _ in 0..10 {
            assert!(tree.evaluate(&r));
        }
    }

    #[test]
    fn test_operations_do_not_mutate_original() {
        let tree = FilterTree::create_default("name");
        let before = tree.group(tree.root()).unwrap().children.len();
        let _bigger = tree.add_condition(tree.root(), "name");
        assert_eq!(tree.group(tree.root()).unwrap().children.len(), before);
    }

    #[test]
    fn test_node_ids_unique_across_operations() {
        let tree = FilterTree::create_default("a");
        let tree = tree.add_condition(tree.root(), "a");
        let tree = tree.add_group(tree.root(), "a");
        let mut ids: Vec<u64> = tree.condition_ids().iter().map(|id| id.0).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total, "ids must be unique");
    }

    #[test]
    fn test_remove_child_reports_purged_conditions_recursively() {
        let tree = FilterTree::create_default("a");
        let root = tree.root();
        let tree = tree.add_group(root, "a");
        let nested = tree.group(root).unwrap().children[1];
        let tree = tree.add_condition(nested, "a");
        // Nested group now has two conditions; removing it purges both.
        let (tree, purged) = tree.remove_child(root, 1);
        assert_eq!(purged.len(), 2);
        assert!(tree.group(nested).is_none());
        for id in purged {
            assert!(tree.node(id).is_none());
        }
    }

    #[test]
    fn test_remove_child_out_of_range_is_a_no_op() {
        let tree = FilterTree::create_default("a");
        let (next, purged) = tree.remove_child(tree.root(), 5);
        assert!(purged.is_empty());
        assert_eq!(next.group(next.root()).unwrap().children.len(), 1);
    }

    #[test]
    fn test_value_store_purge() {
        let mut store = ValueStore::new();
        store.insert(
            NodeId(1),
            ConditionValue {
                column: "name".into(),
                pattern: "^A".into(),
                case_sensitive: false,
            },
        );
        assert_eq!(store.len(), 1);
        store.remove(NodeId(1));
        assert!(store.is_empty());
    }
}
