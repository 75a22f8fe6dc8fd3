//! Persistent sequence backing [`InMemoryLog`](super::InMemoryLog).
//!
//! An AVL-balanced rope of reference-counted nodes. Leaves hold up to
//! [`LEAF_CAPACITY`] items. Every operation copies only the nodes on the path
//! it touches and shares the rest, so cloning is O(1), `push_back` and `get`
//! are O(log n) and `split_at`/`concat` are O(log² n) at worst. No node is
//! ever modified after construction.

use std::sync::Arc;

pub(crate) const LEAF_CAPACITY: usize = 32;

#[derive(Debug)]
enum Node<T> {
    Leaf(Vec<T>),
    Branch {
        left: Arc<Node<T>>,
        right: Arc<Node<T>>,
        len: usize,
        height: u8,
    },
}

impl<T> Node<T> {
    fn len(&self) -> usize {
        match self {
            Node::Leaf(items) => items.len(),
            Node::Branch { len, .. } => *len,
        }
    }

    fn height(&self) -> u8 {
        match self {
            Node::Leaf(_) => 0,
            Node::Branch { height, .. } => *height,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Rope<T> {
    root: Option<Arc<Node<T>>>,
}

impl<T> Clone for Rope<T> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
        }
    }
}

impl<T> Default for Rope<T> {
    fn default() -> Self {
        Self { root: None }
    }
}

fn branch<T>(left: Arc<Node<T>>, right: Arc<Node<T>>) -> Arc<Node<T>> {
    let len = left.len() + right.len();
    let height = left.height().max(right.height()) + 1;
    Arc::new(Node::Branch {
        left,
        right,
        len,
        height,
    })
}

fn children<T>(node: &Arc<Node<T>>) -> (Arc<Node<T>>, Arc<Node<T>>) {
    match &**node {
        Node::Branch { left, right, .. } => (left.clone(), right.clone()),
        Node::Leaf(_) => unreachable!("leaf has no children"),
    }
}

/// Builds a node from subtrees whose heights differ by at most two.
fn balance<T>(left: Arc<Node<T>>, right: Arc<Node<T>>) -> Arc<Node<T>> {
    let (hl, hr) = (left.height(), right.height());
    if hl > hr + 1 {
        let (ll, lr) = children(&left);
        if ll.height() >= lr.height() {
            branch(ll, branch(lr, right))
        } else {
            let (lrl, lrr) = children(&lr);
            branch(branch(ll, lrl), branch(lrr, right))
        }
    } else if hr > hl + 1 {
        let (rl, rr) = children(&right);
        if rr.height() >= rl.height() {
            branch(branch(left, rl), rr)
        } else {
            let (rll, rlr) = children(&rl);
            branch(branch(left, rll), branch(rlr, rr))
        }
    } else {
        branch(left, right)
    }
}

fn join<T>(left: Arc<Node<T>>, right: Arc<Node<T>>) -> Arc<Node<T>> {
    let (hl, hr) = (left.height(), right.height());
    if hl > hr + 1 {
        let (ll, lr) = children(&left);
        balance(ll, join(lr, right))
    } else if hr > hl + 1 {
        let (rl, rr) = children(&right);
        balance(join(left, rl), rr)
    } else {
        branch(left, right)
    }
}

fn concat<T>(left: Option<Arc<Node<T>>>, right: Option<Arc<Node<T>>>) -> Option<Arc<Node<T>>> {
    match (left, right) {
        (None, r) => r,
        (l, None) => l,
        (Some(l), Some(r)) => Some(join(l, r)),
    }
}

fn push<T: Clone>(node: &Arc<Node<T>>, item: T) -> Arc<Node<T>> {
    match &**node {
        Node::Leaf(items) if items.len() < LEAF_CAPACITY => {
            let mut items = items.clone();
            items.push(item);
            Arc::new(Node::Leaf(items))
        }
        Node::Leaf(_) => branch(node.clone(), Arc::new(Node::Leaf(vec![item]))),
        Node::Branch { left, right, .. } => balance(left.clone(), push(right, item)),
    }
}

type Split<T> = (Option<Arc<Node<T>>>, Option<Arc<Node<T>>>);

fn split<T: Clone>(node: &Arc<Node<T>>, at: usize) -> Split<T> {
    if at == 0 {
        return (None, Some(node.clone()));
    }
    if at >= node.len() {
        return (Some(node.clone()), None);
    }
    match &**node {
        Node::Leaf(items) => (
            Some(Arc::new(Node::Leaf(items[..at].to_vec()))),
            Some(Arc::new(Node::Leaf(items[at..].to_vec()))),
        ),
        Node::Branch { left, right, .. } => {
            let left_len = left.len();
            if at < left_len {
                let (a, b) = split(left, at);
                (a, concat(b, Some(right.clone())))
            } else if at == left_len {
                (Some(left.clone()), Some(right.clone()))
            } else {
                let (a, b) = split(right, at - left_len);
                (concat(Some(left.clone()), a), b)
            }
        }
    }
}

impl<T: Clone> Rope<T> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.root.as_ref().map_or(0, |root| root.len())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    #[cfg(test)]
    pub(crate) fn height(&self) -> u8 {
        self.root.as_ref().map_or(0, |root| root.height())
    }

    pub(crate) fn get(&self, mut position: usize) -> Option<&T> {
        let mut node = self.root.as_deref()?;
        if position >= node.len() {
            return None;
        }
        loop {
            match node {
                Node::Leaf(items) => return items.get(position),
                Node::Branch { left, right, .. } => {
                    if position < left.len() {
                        node = left.as_ref();
                    } else {
                        position -= left.len();
                        node = right.as_ref();
                    }
                }
            }
        }
    }

    pub(crate) fn first(&self) -> Option<&T> {
        self.get(0)
    }

    pub(crate) fn last(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|position| self.get(position))
    }

    #[must_use]
    pub(crate) fn push_back(&self, item: T) -> Self {
        let root = match &self.root {
            None => Arc::new(Node::Leaf(vec![item])),
            Some(root) => push(root, item),
        };
        Self { root: Some(root) }
    }

    /// Appends `items`, packing them into full leaves before joining.
    #[must_use]
    pub(crate) fn extend(&self, items: impl IntoIterator<Item = T>) -> Self {
        let mut root = self.root.clone();
        let mut chunk = Vec::with_capacity(LEAF_CAPACITY);
        for item in items {
            chunk.push(item);
            if chunk.len() == LEAF_CAPACITY {
                let leaf = Arc::new(Node::Leaf(std::mem::take(&mut chunk)));
                root = concat(root, Some(leaf));
            }
        }
        if !chunk.is_empty() {
            root = concat(root, Some(Arc::new(Node::Leaf(chunk))));
        }
        Self { root }
    }

    /// Splits into the first `at` items and the rest.
    pub(crate) fn split_at(&self, at: usize) -> (Self, Self) {
        match &self.root {
            None => (Self::new(), Self::new()),
            Some(root) => {
                let (left, right) = split(root, at);
                (Self { root: left }, Self { root: right })
            }
        }
    }

    #[must_use]
    pub(crate) fn take(&self, count: usize) -> Self {
        self.split_at(count).0
    }

    #[must_use]
    pub(crate) fn drop_front(&self, count: usize) -> Self {
        self.split_at(count).1
    }

    pub(crate) fn concat(&self, other: &Self) -> Self {
        Self {
            root: concat(self.root.clone(), other.root.clone()),
        }
    }

    /// Lazy cursor over `[start, start + count)`, clamped to the rope length.
    pub(crate) fn cursor(&self, start: usize, count: usize) -> Cursor<T> {
        let remaining = count.min(self.len().saturating_sub(start));
        let mut cursor = Cursor {
            stack: Vec::new(),
            leaf: None,
            position: 0,
            remaining,
        };
        if remaining == 0 {
            return cursor;
        }
        let Some(mut node) = self.root.clone() else {
            return cursor;
        };
        let mut offset = start;
        loop {
            let next = match &*node {
                Node::Leaf(_) => break,
                Node::Branch { left, right, .. } => {
                    if offset < left.len() {
                        cursor.stack.push(right.clone());
                        left.clone()
                    } else {
                        offset -= left.len();
                        right.clone()
                    }
                }
            };
            node = next;
        }
        cursor.leaf = Some(node);
        cursor.position = offset;
        cursor
    }

    #[cfg(test)]
    pub(crate) fn shares_root_with(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Forward iterator that owns the nodes it still has to visit.
#[derive(Debug)]
pub(crate) struct Cursor<T> {
    stack: Vec<Arc<Node<T>>>,
    leaf: Option<Arc<Node<T>>>,
    position: usize,
    remaining: usize,
}

impl<T: Clone> Cursor<T> {
    fn descend_leftmost(&mut self, mut node: Arc<Node<T>>) {
        loop {
            let next = match &*node {
                Node::Leaf(_) => break,
                Node::Branch { left, right, .. } => {
                    self.stack.push(right.clone());
                    left.clone()
                }
            };
            node = next;
        }
        self.leaf = Some(node);
        self.position = 0;
    }
}

impl<T: Clone> Iterator for Cursor<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.remaining == 0 {
            return None;
        }
        loop {
            if let Some(leaf) = &self.leaf {
                if let Node::Leaf(items) = &**leaf {
                    if let Some(item) = items.get(self.position) {
                        self.position += 1;
                        self.remaining -= 1;
                        return Some(item.clone());
                    }
                }
            }
            let next = self.stack.pop()?;
            self.descend_leftmost(next);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
