use crate::engines::generation::grammar::{Threshold, TERMINATOR};
use crate::engines::generation::locator::NodeSpan;
use crate::error::{EnsembleGpError, Result};
use std::fmt;

pub type NodeId = usize;

/// Deepest parenthesis nesting the parser accepts
pub const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Index of a base classifier in the pool
    Leaf(usize),
    Combiner {
        threshold: Option<Threshold>,
        children: Vec<NodeId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Position of the node in the string it was parsed from
    pub span: NodeSpan,
    /// Unmatched `(` before the node; the root combiner has depth 0
    pub depth: usize,
}

/// Index-based view of a tree string.
///
/// Nodes are stored in post-order: every child has a smaller id than its
/// parent and the root is the last node.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    pub fn parse(tree: &str) -> Result<Self> {
        let body = tree.strip_suffix(TERMINATOR).ok_or_else(|| {
            EnsembleGpError::StructuralViolation(format!(
                "Tree '{}' does not end with '{}'",
                tree, TERMINATOR
            ))
        })?;

        let mut parser = Parser {
            src: body,
            pos: 0,
            nodes: Vec::new(),
        };
        let root = parser.node(0)?;

        if let Some(extra) = body[parser.pos..].chars().next() {
            return Err(EnsembleGpError::StructuralViolation(format!(
                "Unexpected '{}' at offset {} in '{}'",
                extra, parser.pos, tree
            )));
        }

        Ok(Self {
            nodes: parser.nodes,
            root,
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids with every child before its parent
    pub fn post_order(&self) -> impl Iterator<Item = NodeId> {
        0..self.nodes.len()
    }

    /// Maximum nesting of parentheses; 0 for a bare leaf
    pub fn depth(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Combiner { .. }))
            .map(|n| n.depth + 1)
            .max()
            .unwrap_or(0)
    }

    /// Leaf indices in left-to-right order, repeats included
    pub fn leaves(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes.iter().filter_map(|n| match n.kind {
            NodeKind::Leaf(index) => Some(index),
            NodeKind::Combiner { .. } => None,
        })
    }

    pub fn combiner_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Combiner { .. }))
            .count()
    }

    fn write_node(&self, id: NodeId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.nodes[id].kind {
            NodeKind::Leaf(index) => write!(f, "{}", index),
            NodeKind::Combiner {
                threshold,
                children,
            } => {
                f.write_str("(")?;
                if let Some(threshold) = threshold {
                    write!(f, "{} ", threshold)?;
                }
                for (i, &child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    self.write_node(child, f)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Writes the tree back as a tree string, terminator included
impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(self.root, f)?;
        write!(f, "{}", TERMINATOR)
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    nodes: Vec<Node>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn violation(&self, message: &str) -> EnsembleGpError {
        EnsembleGpError::StructuralViolation(format!(
            "{} at offset {} in '{}'",
            message, self.pos, self.src
        ))
    }

    fn node(&mut self, depth: usize) -> Result<NodeId> {
        match self.peek() {
            Some(b'(') => self.combiner(depth),
            Some(b) if b.is_ascii_digit() => self.leaf(depth),
            Some(_) => Err(self.violation("Expected a leaf or '('")),
            None => Err(self.violation("Unexpected end of tree")),
        }
    }

    fn leaf(&mut self, depth: usize) -> Result<NodeId> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }

        let text = &self.src[start..self.pos];
        let index = text.parse::<usize>().map_err(|_| {
            EnsembleGpError::StructuralViolation(format!("Leaf '{}' is not a valid index", text))
        })?;

        Ok(self.push(Node {
            kind: NodeKind::Leaf(index),
            span: NodeSpan::new(start, self.pos),
            depth,
        }))
    }

    fn combiner(&mut self, depth: usize) -> Result<NodeId> {
        if depth >= MAX_NESTING {
            return Err(self.violation(&format!("Nesting deeper than {}", MAX_NESTING)));
        }
        let start = self.pos;
        self.pos += 1;

        let threshold = if self.peek() == Some(b'v') {
            let token = self
                .src
                .get(self.pos..self.pos + Threshold::TOKEN_LEN)
                .and_then(Threshold::parse)
                .ok_or_else(|| self.violation("Malformed threshold token"))?;
            self.pos += Threshold::TOKEN_LEN;
            if self.peek() != Some(b' ') {
                return Err(self.violation("Expected ' ' after threshold"));
            }
            self.pos += 1;
            Some(token)
        } else {
            None
        };

        let mut children = vec![self.node(depth + 1)?];
        loop {
            match self.peek() {
                Some(b' ') => {
                    self.pos += 1;
                    children.push(self.node(depth + 1)?);
                }
                Some(b')') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => return Err(self.violation("Expected ' ' or ')'")),
                None => return Err(self.violation("Unbalanced parentheses")),
            }
        }

        if children.len() < 2 {
            return Err(EnsembleGpError::StructuralViolation(format!(
                "Combination node at offset {} has a single child",
                start
            )));
        }

        Ok(self.push(Node {
            kind: NodeKind::Combiner {
                threshold,
                children,
            },
            span: NodeSpan::new(start, self.pos),
            depth,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let tree = Tree::parse("((0 1) 12 (v.40 3 4));").unwrap();

        assert_eq!(tree.len(), 8);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.combiner_count(), 3);
        assert_eq!(tree.leaves().collect::<Vec<_>>(), vec![0, 1, 12, 3, 4]);

        let root = tree.node(tree.root());
        assert_eq!(root.depth, 0);
        assert_eq!(root.span, NodeSpan::new(0, 21));

        let NodeKind::Combiner { children, threshold } = &root.kind else {
            panic!("root should be a combiner");
        };
        assert!(threshold.is_none());
        assert_eq!(children.len(), 3);

        let last = tree.node(children[2]);
        assert_eq!(last.depth, 1);
        assert!(matches!(
            last.kind,
            NodeKind::Combiner { threshold: Some(t), .. } if t.hundredths() == 40
        ));
    }

    #[test]
    fn test_post_order() {
        let tree = Tree::parse("((0 1) 2);").unwrap();
        for id in tree.post_order() {
            if let NodeKind::Combiner { children, .. } = &tree.node(id).kind {
                assert!(children.iter().all(|&c| c < id));
            }
        }
        assert_eq!(tree.root(), tree.len() - 1);
    }

    #[test]
    fn test_display_round_trips() {
        for s in ["(0 1);", "((v.05 0 1) (2 3 4) 5);", "7;"] {
            assert_eq!(Tree::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_bare_leaf() {
        let tree = Tree::parse("3;").unwrap();
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.leaves().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |levels: usize| {
            let mut s = String::from("0");
            for _ in 0..levels {
                s = format!("({} 1)", s);
            }
            s.push(';');
            s
        };
        assert_eq!(Tree::parse(&nested(MAX_NESTING)).unwrap().depth(), MAX_NESTING);
        assert!(matches!(
            Tree::parse(&nested(MAX_NESTING + 1)),
            Err(EnsembleGpError::StructuralViolation(_))
        ));

        let runaway = format!("{}0 1{};", "(".repeat(100_000), ")".repeat(100_000));
        assert!(matches!(
            Tree::parse(&runaway),
            Err(EnsembleGpError::StructuralViolation(_))
        ));
    }

    #[test]
    fn test_structural_violations() {
        for s in ["(0 1)", "(0 1", "(0);", "(0 1));", "(0,1);", "(v.5 0 1);", "();", "(0  1);"] {
            assert!(
                matches!(Tree::parse(s), Err(EnsembleGpError::StructuralViolation(_))),
                "{} should be rejected",
                s
            );
        }
    }
}
