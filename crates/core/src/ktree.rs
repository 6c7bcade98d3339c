//! Ordered tree of integers, the encoding substrate for packed activity
//! shapes: node values index into the view pool, the topology mirrors the
//! captured view tree.

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct KTree {
    value: usize,
    children: Vec<KTree>,
}

impl KTree {
    pub fn new(value: usize) -> KTree {
        KTree {
            value,
            children: Vec::new(),
        }
    }

    pub fn value(&self) -> usize {
        self.value
    }

    pub fn add_child_tree(&mut self, child: KTree) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[KTree] {
        &self.children
    }

    /// Depth-first visit, self before children, delivering each node's value
    /// and child count.
    pub fn visit<F>(&self, f: &mut F) where F: FnMut(usize, usize) {
        f(self.value, self.children.len());
        for child in &self.children {
            child.visit(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visit_streams_self_before_children() {
        let mut root = KTree::new(0);
        let mut a = KTree::new(1);
        a.add_child_tree(KTree::new(3));
        root.add_child_tree(a);
        root.add_child_tree(KTree::new(2));

        let mut stream = Vec::new();
        root.visit(&mut |value, count| stream.push((value, count)));
        assert_eq!(stream, vec![(0, 2), (1, 1), (3, 0), (2, 0)]);
    }

    #[test]
    fn children_keep_insertion_order() {
        let mut root = KTree::new(9);
        for value in [4, 7, 1] {
            root.add_child_tree(KTree::new(value));
        }
        let values: Vec<usize> = root.children().iter().map(KTree::value).collect();
        assert_eq!(values, vec![4, 7, 1]);
    }
}
