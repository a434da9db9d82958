// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{OutputFormat, Styles, TestId};
use crate::{
    discovery::{DiscoveredClass, DiscoveryResult, SourcePosition},
    errors::WriteTestListError,
};
use camino::{Utf8Path, Utf8PathBuf};
use owo_colors::OwoColorize;
use std::{
    collections::{BTreeSet, HashMap},
    io::{self, Write},
};
use xctest_metadata::{SourceLocationSummary, TestListSummary, TestNodeKind, TestNodeSummary};

/// The index of a node within the [`TestTree`] arena.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
struct NodeIndex(usize);

/// Where a class or method is declared.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceLocation {
    /// The source file.
    pub path: Utf8PathBuf,

    /// The position of the declaration's name.
    pub position: SourcePosition,
}

impl SourceLocation {
    fn to_summary(&self) -> SourceLocationSummary {
        SourceLocationSummary {
            path: self.path.clone(),
            line: self.position.line,
            column: self.position.column,
        }
    }
}

#[derive(Clone, Debug)]
struct TestNode {
    id: TestId,
    label: String,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
    location: Option<SourceLocation>,
}

/// Auxiliary per-node data, kept out of the arena and keyed by id.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeMeta {
    /// The kind of node.
    pub kind: TestNodeKind,

    /// The build target, once resolved.
    pub resolved_target: Option<String>,

    /// The directory a domain or category node groups. `None` for classes and methods.
    pub source_dir: Option<Utf8PathBuf>,
}

/// The hierarchical store of discovered tests.
///
/// Nodes live in an arena and are addressed externally by [`TestId`]. Removed slots are reused by
/// later insertions, but ids never are: an id always refers to the same logical test.
///
/// If several files declare the same class, the declaration from the file that sorts first is
/// shown, matching the order the scanner walks files in. The others are kept aside and take over
/// if that file stops declaring the class.
#[derive(Clone, Debug, Default)]
pub struct TestTree {
    nodes: Vec<Option<TestNode>>,
    free: Vec<NodeIndex>,
    index: HashMap<TestId, NodeIndex>,
    meta: HashMap<TestId, NodeMeta>,
    roots: Vec<NodeIndex>,
    // Every declaration of each class id, ordered by source file. The first one is in the tree.
    declarations: HashMap<TestId, Vec<DiscoveredClass>>,
}

impl TestTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tree from a discovery result.
    pub fn from_discovery(discovery: &DiscoveryResult) -> Self {
        let mut tree = Self::new();
        tree.replace_all(discovery);
        tree
    }

    /// Discards the whole tree and rebuilds it from `discovery`.
    pub fn replace_all(&mut self, discovery: &DiscoveryResult) {
        *self = Self::default();
        for class in &discovery.classes {
            self.record_declaration(class.clone());
        }
        for class in &discovery.classes {
            self.insert_winner(&class_id(class));
        }
    }

    /// Replaces the nodes declared in `file` with `classes`, leaving nodes from other files alone.
    ///
    /// Domain and category nodes that become empty are removed. A class that `file` no longer
    /// declares falls back to a declaration of the same class in another file, if there is one.
    pub fn apply_document_update(&mut self, file: &Utf8Path, classes: &[DiscoveredClass]) {
        // Class ids declared in `file` before or after the update.
        let mut affected = BTreeSet::new();
        for (id, declarations) in &mut self.declarations {
            let before = declarations.len();
            declarations.retain(|class| class.source_file != file);
            if declarations.len() != before {
                affected.insert(id.clone());
            }
        }
        self.declarations.retain(|_, declarations| !declarations.is_empty());
        let added: Vec<TestId> = classes
            .iter()
            .map(|class| self.record_declaration(class.clone()))
            .collect();
        affected.extend(added.iter().cloned());

        for id in &affected {
            let Some(&index) = self.index.get(id) else {
                continue;
            };
            let stale = {
                let current = self
                    .node(index)
                    .and_then(|node| node.location.as_ref())
                    .map(|loc| loc.path.as_path());
                let winner = self.winner(id).map(|class| class.source_file.as_path());
                current == Some(file) || current != winner
            };
            if stale {
                let parent = self.node(index).and_then(|node| node.parent);
                self.remove_subtree(index);
                self.prune_upwards(parent);
            }
        }

        for id in added.iter().chain(&affected) {
            self.insert_winner(id);
        }
    }

    /// Looks up a node by id.
    pub fn lookup(&self, id: &TestId) -> Option<NodeView<'_>> {
        let index = *self.index.get(id)?;
        Some(self.view(index))
    }

    /// Returns true if the tree contains the given id.
    pub fn contains(&self, id: &TestId) -> bool {
        self.index.contains_key(id)
    }

    /// Returns the children of a node in insertion order, or an empty list if the node doesn't
    /// exist.
    pub fn children_of(&self, id: &TestId) -> Vec<NodeView<'_>> {
        self.lookup(id)
            .map(|node| node.children().collect())
            .unwrap_or_default()
    }

    /// Returns the parent of a node.
    pub fn parent_of(&self, id: &TestId) -> Option<NodeView<'_>> {
        self.lookup(id)?.parent()
    }

    /// Iterates over the domain nodes in insertion order.
    pub fn roots(&self) -> impl Iterator<Item = NodeView<'_>> + '_ {
        self.roots.iter().map(|&index| self.view(index))
    }

    /// Returns the method nodes under `id`, depth-first. A method id returns just itself.
    pub fn leaves_under(&self, id: &TestId) -> Vec<NodeView<'_>> {
        let Some(&start) = self.index.get(id) else {
            return Vec::new();
        };

        let mut leaves = Vec::new();
        let mut stack = vec![start];
        while let Some(index) = stack.pop() {
            let view = self.view(index);
            if view.kind() == TestNodeKind::Method {
                leaves.push(view);
            } else {
                stack.extend(view.node.children.iter().rev().copied());
            }
        }
        leaves
    }

    /// Returns the auxiliary metadata for a node.
    pub fn meta(&self, id: &TestId) -> Option<&NodeMeta> {
        self.meta.get(id)
    }

    /// Records the build target for a node. Returns false if the node doesn't exist.
    pub fn set_resolved_target(&mut self, id: &TestId, target: impl Into<String>) -> bool {
        match self.meta.get_mut(id) {
            Some(meta) => {
                meta.resolved_target = Some(target.into());
                true
            }
            None => false,
        }
    }

    /// Returns the number of method nodes.
    pub fn test_count(&self) -> usize {
        self.count_kind(TestNodeKind::Method)
    }

    /// Returns the number of class nodes.
    pub fn class_count(&self) -> usize {
        self.count_kind(TestNodeKind::Class)
    }

    /// Returns true if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Returns the set of source files that contribute nodes to the tree.
    pub fn files(&self) -> BTreeSet<&Utf8Path> {
        self.live_nodes()
            .filter_map(|(_, node)| node.location.as_ref().map(|loc| loc.path.as_path()))
            .collect()
    }

    /// Returns a serializable summary of the tree.
    pub fn to_summary(&self) -> TestListSummary {
        TestListSummary {
            test_count: self.test_count(),
            class_count: self.class_count(),
            roots: self.roots().map(|root| root.to_summary()).collect(),
        }
    }

    /// Outputs this tree to the given writer.
    pub fn write(
        &self,
        output_format: OutputFormat,
        writer: impl Write,
        colorize: bool,
    ) -> Result<(), WriteTestListError> {
        match output_format {
            OutputFormat::Human { verbose } => self
                .write_human(writer, verbose, colorize)
                .map_err(WriteTestListError::Io),
            OutputFormat::Serializable(format) => format
                .to_writer(&self.to_summary(), writer)
                .map_err(WriteTestListError::Json),
        }
    }

    // ---
    // Helper methods
    // ---

    fn record_declaration(&mut self, class: DiscoveredClass) -> TestId {
        let id = class_id(&class);
        let declarations = self.declarations.entry(id.clone()).or_default();
        // Declarations within one file keep their order.
        let position =
            declarations.partition_point(|existing| existing.source_file <= class.source_file);
        declarations.insert(position, class);
        if declarations.len() > 1 {
            tracing::debug!(
                "class `{id}` is declared {} times, using the declaration in `{}`",
                declarations.len(),
                declarations[0].source_file,
            );
        }
        id
    }

    fn winner(&self, id: &TestId) -> Option<&DiscoveredClass> {
        self.declarations.get(id)?.first()
    }

    fn insert_winner(&mut self, id: &TestId) {
        if self.index.contains_key(id) {
            return;
        }
        if let Some(class) = self.winner(id).cloned() {
            self.insert_class(&class);
        }
    }

    fn insert_class(&mut self, class: &DiscoveredClass) {
        let domain_id = TestId::domain(&class.domain);
        let domain_dir = class
            .category_dir
            .parent()
            .map(|dir| dir.to_owned())
            .unwrap_or_else(|| class.category_dir.clone());
        let domain = self.ensure_grouping(
            domain_id,
            &class.domain,
            None,
            TestNodeKind::Domain,
            domain_dir,
        );

        let category_id = TestId::category(&class.domain, &class.category);
        let category = self.ensure_grouping(
            category_id,
            &class.category,
            Some(domain),
            TestNodeKind::Category,
            class.category_dir.clone(),
        );

        let class_id = class_id(class);
        let class_index = self.insert_node(
            TestNode {
                id: class_id.clone(),
                label: class.class_name.clone(),
                parent: Some(category),
                children: Vec::new(),
                location: Some(SourceLocation {
                    path: class.source_file.clone(),
                    position: class.position,
                }),
            },
            TestNodeKind::Class,
            None,
        );

        for method in &class.methods {
            let method_id = class_id.method(&method.name);
            if self.index.contains_key(&method_id) {
                continue;
            }
            self.insert_node(
                TestNode {
                    id: method_id,
                    label: method.name.clone(),
                    parent: Some(class_index),
                    children: Vec::new(),
                    location: Some(SourceLocation {
                        path: class.source_file.clone(),
                        position: method.position,
                    }),
                },
                TestNodeKind::Method,
                None,
            );
        }
    }

    fn ensure_grouping(
        &mut self,
        id: TestId,
        label: &str,
        parent: Option<NodeIndex>,
        kind: TestNodeKind,
        source_dir: Utf8PathBuf,
    ) -> NodeIndex {
        if let Some(&index) = self.index.get(&id) {
            return index;
        }
        self.insert_node(
            TestNode {
                id,
                label: label.to_owned(),
                parent,
                children: Vec::new(),
                location: None,
            },
            kind,
            Some(source_dir),
        )
    }

    fn insert_node(
        &mut self,
        node: TestNode,
        kind: TestNodeKind,
        source_dir: Option<Utf8PathBuf>,
    ) -> NodeIndex {
        let id = node.id.clone();
        let parent = node.parent;
        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index.0] = Some(node);
                index
            }
            None => {
                self.nodes.push(Some(node));
                NodeIndex(self.nodes.len() - 1)
            }
        };

        match parent.and_then(|parent| self.node_mut(parent)) {
            Some(parent) => parent.children.push(index),
            None => self.roots.push(index),
        }
        self.index.insert(id.clone(), index);
        self.meta.insert(
            id,
            NodeMeta {
                kind,
                resolved_target: None,
                source_dir,
            },
        );
        index
    }

    fn remove_subtree(&mut self, index: NodeIndex) {
        let Some(node) = self.nodes.get_mut(index.0).and_then(Option::take) else {
            return;
        };
        match node.parent.and_then(|parent| self.node_mut(parent)) {
            Some(parent) => parent.children.retain(|&child| child != index),
            None => self.roots.retain(|&root| root != index),
        }
        self.index.remove(&node.id);
        self.meta.remove(&node.id);
        self.free.push(index);

        for child in node.children {
            // The parent is already gone, so detaching from it is a no-op.
            self.remove_subtree(child);
        }
    }

    fn prune_upwards(&mut self, mut current: Option<NodeIndex>) {
        while let Some(index) = current {
            let Some(node) = self.node(index) else {
                return;
            };
            if !node.children.is_empty() {
                return;
            }
            current = node.parent;
            self.remove_subtree(index);
        }
    }

    fn node(&self, index: NodeIndex) -> Option<&TestNode> {
        self.nodes.get(index.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, index: NodeIndex) -> Option<&mut TestNode> {
        self.nodes.get_mut(index.0).and_then(Option::as_mut)
    }

    fn live_nodes(&self) -> impl Iterator<Item = (NodeIndex, &TestNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| Some((NodeIndex(index), node.as_ref()?)))
    }

    fn count_kind(&self, kind: TestNodeKind) -> usize {
        self.meta.values().filter(|meta| meta.kind == kind).count()
    }

    fn view(&self, index: NodeIndex) -> NodeView<'_> {
        let node = self.nodes[index.0]
            .as_ref()
            .expect("indexes handed out by the tree always point to live nodes");
        let meta = &self.meta[&node.id];
        NodeView {
            tree: self,
            node,
            meta,
        }
    }

    fn write_human(&self, mut writer: impl Write, verbose: bool, colorize: bool) -> io::Result<()> {
        let mut styles = Styles::default();
        if colorize {
            styles.colorize();
        }

        if self.is_empty() {
            writeln!(writer, "(no tests)")?;
            return Ok(());
        }

        let mut stack: Vec<(NodeView<'_>, usize)> = self.roots().collect::<Vec<_>>().into_iter().rev().map(|r| (r, 0)).collect();
        while let Some((node, depth)) = stack.pop() {
            let indent = "  ".repeat(depth);
            match node.kind() {
                TestNodeKind::Domain | TestNodeKind::Category => {
                    writeln!(writer, "{indent}{}:", node.label().style(styles.grouping))?;
                }
                TestNodeKind::Class => {
                    write!(writer, "{indent}{}", node.label().style(styles.class_name))?;
                    if verbose {
                        if let Some(target) = node.resolved_target() {
                            write!(writer, " {} {target}", "target:".style(styles.field))?;
                        }
                    }
                    writeln!(writer)?;
                }
                TestNodeKind::Method => {
                    write!(writer, "{indent}{}", node.label().style(styles.method_name))?;
                    if verbose {
                        if let Some(location) = node.location() {
                            write!(
                                writer,
                                " {} {}:{}",
                                "at:".style(styles.field),
                                location.path,
                                location.position.line + 1,
                            )?;
                        }
                    }
                    writeln!(writer)?;
                }
            }

            let children: Vec<_> = node.children().collect();
            stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }
        Ok(())
    }
}

fn class_id(class: &DiscoveredClass) -> TestId {
    TestId::class(&class.domain, &class.category, &class.class_name)
}

/// A borrowed view of a node in a [`TestTree`].
#[derive(Clone, Copy, Debug)]
pub struct NodeView<'a> {
    tree: &'a TestTree,
    node: &'a TestNode,
    meta: &'a NodeMeta,
}

impl<'a> NodeView<'a> {
    /// Returns the id of this node.
    pub fn id(&self) -> &'a TestId {
        &self.node.id
    }

    /// Returns the kind of this node.
    pub fn kind(&self) -> TestNodeKind {
        self.meta.kind
    }

    /// Returns the display label.
    pub fn label(&self) -> &'a str {
        &self.node.label
    }

    /// Returns the declaration site, for classes and methods.
    pub fn location(&self) -> Option<&'a SourceLocation> {
        self.node.location.as_ref()
    }

    /// Returns the resolved build target, if any.
    pub fn resolved_target(&self) -> Option<&'a str> {
        self.meta.resolved_target.as_deref()
    }

    /// Returns the auxiliary metadata for this node.
    pub fn meta(&self) -> &'a NodeMeta {
        self.meta
    }

    /// Returns the path used to resolve this node's build target: the source file for classes and
    /// methods, the grouped directory otherwise.
    pub fn resolution_path(&self) -> Option<&'a Utf8Path> {
        match &self.node.location {
            Some(location) => Some(&location.path),
            None => self.meta.source_dir.as_deref(),
        }
    }

    /// Returns the parent node.
    pub fn parent(&self) -> Option<NodeView<'a>> {
        let tree = self.tree;
        self.node.parent.map(|index| tree.view(index))
    }

    /// Iterates over the children of this node in insertion order.
    pub fn children(self) -> impl Iterator<Item = NodeView<'a>> + 'a {
        let tree = self.tree;
        self.node.children.iter().map(move |&index| tree.view(index))
    }

    fn to_summary(&self) -> TestNodeSummary {
        TestNodeSummary {
            id: self.id().to_string(),
            kind: self.kind(),
            label: self.label().to_owned(),
            location: self.location().map(SourceLocation::to_summary),
            resolved_target: self.resolved_target().map(str::to_owned),
            children: self.children().map(|child| child.to_summary()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{discovery::DiscoveredMethod, tree::SerializableFormat};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn class(
        domain: &str,
        category: &str,
        name: &str,
        file: &str,
        methods: &[&str],
    ) -> DiscoveredClass {
        DiscoveredClass {
            domain: domain.to_owned(),
            category: category.to_owned(),
            category_dir: Utf8PathBuf::from(format!("/root/{domain}/{category}")),
            class_name: name.to_owned(),
            source_file: Utf8PathBuf::from(file),
            position: SourcePosition { line: 2, column: 6 },
            methods: methods
                .iter()
                .enumerate()
                .map(|(i, method)| DiscoveredMethod {
                    name: (*method).to_owned(),
                    position: SourcePosition {
                        line: 3 + i,
                        column: 9,
                    },
                })
                .collect(),
        }
    }

    fn discovery() -> DiscoveryResult {
        DiscoveryResult {
            classes: vec![
                class(
                    "Auth",
                    "Unit",
                    "LoginTests",
                    "/root/Auth/Unit/LoginTests.swift",
                    &["testLogin", "testLogout"],
                ),
                class(
                    "Auth",
                    "Unit",
                    "TokenTests",
                    "/root/Auth/Unit/TokenTests.swift",
                    &["testRefresh"],
                ),
                class(
                    "Feed",
                    "UI",
                    "FeedTests",
                    "/root/Feed/UI/FeedTests.swift",
                    &["testScroll"],
                ),
            ],
        }
    }

    fn all_ids(tree: &TestTree) -> Vec<(String, String)> {
        let mut ids: Vec<_> = tree
            .live_nodes()
            .map(|(_, node)| (node.id.to_string(), node.label.clone()))
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn builds_four_levels() {
        let tree = TestTree::from_discovery(&discovery());

        let roots: Vec<_> = tree.roots().map(|root| root.id().as_str()).collect();
        assert_eq!(roots, vec!["Auth", "Feed"]);

        let classes: Vec<_> = tree
            .children_of(&TestId::new("Auth:Unit"))
            .iter()
            .map(|class| class.label())
            .collect();
        assert_eq!(classes, vec!["LoginTests", "TokenTests"]);

        let login = tree.lookup(&TestId::new("Auth:Unit:LoginTests")).unwrap();
        assert_eq!(login.kind(), TestNodeKind::Class);
        assert_eq!(login.parent().unwrap().id().as_str(), "Auth:Unit");
        assert_eq!(
            login.resolution_path(),
            Some(Utf8Path::new("/root/Auth/Unit/LoginTests.swift"))
        );

        let category = tree.lookup(&TestId::new("Auth:Unit")).unwrap();
        assert_eq!(category.location(), None);
        assert_eq!(category.resolution_path(), Some(Utf8Path::new("/root/Auth/Unit")));
        assert_eq!(
            tree.lookup(&TestId::new("Auth")).unwrap().resolution_path(),
            Some(Utf8Path::new("/root/Auth"))
        );

        assert_eq!(tree.test_count(), 4);
        assert_eq!(tree.class_count(), 3);
    }

    #[test]
    fn method_ids_extend_class_ids() {
        let tree = TestTree::from_discovery(&discovery());
        for (_, node) in tree.live_nodes() {
            if let Some(parent) = tree.parent_of(&node.id) {
                assert!(parent.id().is_ancestor_of(&node.id), "{}", node.id);
            }
        }
        let leaves: Vec<_> = tree
            .leaves_under(&TestId::new("Auth"))
            .iter()
            .map(|leaf| leaf.id().to_string())
            .collect();
        assert_eq!(
            leaves,
            vec![
                "Auth:Unit:LoginTests.testLogin",
                "Auth:Unit:LoginTests.testLogout",
                "Auth:Unit:TokenTests.testRefresh",
            ]
        );
    }

    #[test]
    fn replace_all_is_idempotent() {
        let mut tree = TestTree::from_discovery(&discovery());
        let first = all_ids(&tree);
        tree.replace_all(&discovery());
        assert_eq!(all_ids(&tree), first);
        assert_eq!(tree.to_summary(), TestTree::from_discovery(&discovery()).to_summary());
    }

    #[test]
    fn document_update_matches_full_rescan() {
        let mut tree = TestTree::from_discovery(&discovery());
        tree.set_resolved_target(&TestId::new("Feed:UI:FeedTests"), "FeedTests");

        // LoginTests loses a method and gains a sibling class in the same file.
        let file = Utf8Path::new("/root/Auth/Unit/LoginTests.swift");
        let updated = vec![
            class("Auth", "Unit", "LoginTests", file.as_str(), &["testLogin"]),
            class("Auth", "Unit", "SessionTests", file.as_str(), &["testExpiry"]),
        ];
        tree.apply_document_update(file, &updated);

        let mut expected = discovery();
        expected.classes.remove(0);
        expected.classes.extend(updated);
        assert_eq!(all_ids(&tree), all_ids(&TestTree::from_discovery(&expected)));

        // Other files are untouched.
        assert_eq!(
            tree.lookup(&TestId::new("Feed:UI:FeedTests")).unwrap().resolved_target(),
            Some("FeedTests")
        );
    }

    #[test]
    fn document_update_prunes_empty_groupings() {
        let mut tree = TestTree::from_discovery(&discovery());
        tree.apply_document_update(Utf8Path::new("/root/Feed/UI/FeedTests.swift"), &[]);

        assert!(!tree.contains(&TestId::new("Feed")));
        assert!(!tree.contains(&TestId::new("Feed:UI")));
        assert!(tree.meta(&TestId::new("Feed:UI:FeedTests.testScroll")).is_none());
        let roots: Vec<_> = tree.roots().map(|root| root.id().to_string()).collect();
        assert_eq!(roots, vec!["Auth"]);

        // Removing one of two files in a category keeps the category.
        tree.apply_document_update(Utf8Path::new("/root/Auth/Unit/TokenTests.swift"), &[]);
        assert!(tree.contains(&TestId::new("Auth:Unit")));
        assert_eq!(tree.test_count(), 2);

        // Re-adding reuses freed slots without confusing ids.
        tree.apply_document_update(
            Utf8Path::new("/root/Feed/UI/FeedTests.swift"),
            &[class("Feed", "UI", "FeedTests", "/root/Feed/UI/FeedTests.swift", &["testScroll"])],
        );
        assert_eq!(tree.test_count(), 3);
        assert_eq!(tree.files().len(), 2);
    }

    #[test]
    fn duplicate_class_keeps_first_declaration() {
        let mut discovery = discovery();
        discovery.classes.push(class(
            "Auth",
            "Unit",
            "LoginTests",
            "/root/Auth/Unit/Other.swift",
            &["testOther"],
        ));
        let tree = TestTree::from_discovery(&discovery);
        let login = tree.lookup(&TestId::new("Auth:Unit:LoginTests")).unwrap();
        assert_eq!(
            login.location().unwrap().path,
            Utf8PathBuf::from("/root/Auth/Unit/LoginTests.swift")
        );
        assert_eq!(tree.children_of(login.id()).len(), 2);
    }

    #[test]
    fn duplicate_class_follows_file_order() {
        // Discovery order doesn't matter: the file that sorts first wins.
        let discovery = DiscoveryResult {
            classes: vec![
                class("Auth", "Unit", "X", "/root/Auth/Unit/b.swift", &["testB"]),
                class("Auth", "Unit", "X", "/root/Auth/Unit/a.swift", &["testA"]),
            ],
        };
        let tree = TestTree::from_discovery(&discovery);
        assert!(tree.contains(&TestId::new("Auth:Unit:X.testA")));
        assert!(!tree.contains(&TestId::new("Auth:Unit:X.testB")));
    }

    #[test]
    fn document_update_restores_shadowed_class() {
        let a = Utf8Path::new("/root/Auth/Unit/a.swift");
        let b_class = class("Auth", "Unit", "X", "/root/Auth/Unit/b.swift", &["testB"]);
        let mut tree = TestTree::from_discovery(&DiscoveryResult {
            classes: vec![
                class("Auth", "Unit", "X", a.as_str(), &["testA"]),
                b_class.clone(),
            ],
        });
        assert_eq!(tree.test_count(), 1);

        tree.apply_document_update(a, &[]);
        let rescan = TestTree::from_discovery(&DiscoveryResult {
            classes: vec![b_class.clone()],
        });
        assert_eq!(all_ids(&tree), all_ids(&rescan));
        assert_eq!(tree.test_count(), 1);
        assert_eq!(
            tree.lookup(&TestId::new("Auth:Unit:X")).unwrap().location().unwrap().path,
            Utf8PathBuf::from("/root/Auth/Unit/b.swift")
        );

        // Declaring the class in `a.swift` again takes precedence back.
        let a_class = class("Auth", "Unit", "X", a.as_str(), &["testA2"]);
        tree.apply_document_update(a, std::slice::from_ref(&a_class));
        let rescan = TestTree::from_discovery(&DiscoveryResult {
            classes: vec![a_class, b_class],
        });
        assert_eq!(all_ids(&tree), all_ids(&rescan));
        assert!(tree.contains(&TestId::new("Auth:Unit:X.testA2")));

        // Editing the shadowed file leaves the shown class alone.
        tree.set_resolved_target(&TestId::new("Auth:Unit:X"), "AuthTests");
        tree.apply_document_update(
            Utf8Path::new("/root/Auth/Unit/b.swift"),
            &[class("Auth", "Unit", "X", "/root/Auth/Unit/b.swift", &["testB2"])],
        );
        assert_eq!(
            tree.lookup(&TestId::new("Auth:Unit:X")).unwrap().resolved_target(),
            Some("AuthTests")
        );
        assert!(tree.contains(&TestId::new("Auth:Unit:X.testA2")));
        assert!(!tree.contains(&TestId::new("Auth:Unit:X.testB2")));
    }

    #[test]
    fn write_human_and_json() {
        let mut tree = TestTree::from_discovery(&discovery());
        tree.set_resolved_target(&TestId::new("Auth:Unit:TokenTests"), "AuthTests");

        let mut buf = Vec::new();
        tree.write(OutputFormat::Human { verbose: false }, &mut buf, false)
            .unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            indoc! {"
                Auth:
                  Unit:
                    LoginTests
                      testLogin
                      testLogout
                    TokenTests
                      testRefresh
                Feed:
                  UI:
                    FeedTests
                      testScroll
            "}
        );

        let mut buf = Vec::new();
        tree.write(OutputFormat::Human { verbose: true }, &mut buf, false)
            .unwrap();
        let verbose = String::from_utf8(buf).unwrap();
        assert!(verbose.contains("    TokenTests target: AuthTests\n"), "{verbose}");
        assert!(
            verbose.contains("      testLogin at: /root/Auth/Unit/LoginTests.swift:4\n"),
            "{verbose}"
        );

        let mut buf = Vec::new();
        tree.write(
            OutputFormat::Serializable(SerializableFormat::Json),
            &mut buf,
            false,
        )
        .unwrap();
        let summary = TestListSummary::parse_json(String::from_utf8(buf).unwrap()).unwrap();
        assert_eq!(summary, tree.to_summary());
        assert_eq!(summary.iter_methods().count(), 4);
    }

    #[test]
    fn empty_tree() {
        let tree = TestTree::new();
        assert!(tree.is_empty());
        assert!(tree.children_of(&TestId::new("Auth")).is_empty());
        assert!(tree.leaves_under(&TestId::new("Auth")).is_empty());

        let mut buf = Vec::new();
        tree.write(OutputFormat::Human { verbose: false }, &mut buf, false)
            .unwrap();
        assert_eq!(buf, b"(no tests)\n");
    }
}
