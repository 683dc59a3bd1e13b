//! 頻度木（非平衡の二分探索木）。
//!
//! ノードは Vec に連続配置し、子はインデックスで参照する。
//! 複製は Vec の複製なので、形もキーと頻度の組もそのまま写る。
//! 再平衡はしない。単調な挿入順では高さがノード数まで伸びるが、
//! 走査・探索・挿入はすべて反復で書いてあるのでスタックは溢れない。

use std::borrow::Borrow;
use std::cmp::Ordering;

use crate::error::TreeError;

/// 走査方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// 中順（昇順）
    Ascending,
    /// 逆中順（降順）
    Descending,
}

#[derive(Debug, Clone)]
struct Node<K> {
    key: K,
    count: u64,
    left: Option<usize>,
    right: Option<usize>,
}

/// キーごとの出現回数を数える木
#[derive(Debug, Clone)]
pub struct FrequencyTree<K> {
    nodes: Vec<Node<K>>,
    root: Option<usize>,
}

impl<K> Default for FrequencyTree<K> {
    fn default() -> Self {
        FrequencyTree {
            nodes: Vec::new(),
            root: None,
        }
    }
}

impl<K: Ord> FrequencyTree<K> {
    pub fn new() -> Self {
        FrequencyTree::default()
    }

    /// キーを1回数える。返り値は挿入後の頻度。
    /// 新しいノードが確保できなければ木は変わらない。
    pub fn insert(&mut self, key: K) -> Result<u64, TreeError> {
        let mut cursor = self.root;
        let mut parent: Option<(usize, Ordering)> = None;

        while let Some(i) = cursor {
            let node = &mut self.nodes[i];
            match key.cmp(&node.key) {
                Ordering::Equal => {
                    node.count += 1;
                    return Ok(node.count);
                }
                Ordering::Less => {
                    parent = Some((i, Ordering::Less));
                    cursor = node.left;
                }
                Ordering::Greater => {
                    parent = Some((i, Ordering::Greater));
                    cursor = node.right;
                }
            }
        }

        self.nodes.try_reserve(1).map_err(|_| {
            tracing::warn!(nodes = self.nodes.len(), "tree node allocation failed");
            TreeError::Allocation {
                nodes: self.nodes.len(),
            }
        })?;

        let index = self.nodes.len();
        self.nodes.push(Node {
            key,
            count: 1,
            left: None,
            right: None,
        });
        match parent {
            None => self.root = Some(index),
            Some((p, Ordering::Less)) => self.nodes[p].left = Some(index),
            Some((p, _)) => self.nodes[p].right = Some(index),
        }
        Ok(1)
    }

    /// キーの頻度。無ければ 0
    pub fn search<Q>(&self, key: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cursor = self.root;
        while let Some(i) = cursor {
            let node = &self.nodes[i];
            match key.cmp(node.key.borrow()) {
                Ordering::Equal => return node.count,
                Ordering::Less => cursor = node.left,
                Ordering::Greater => cursor = node.right,
            }
        }
        0
    }
}

impl<K> FrequencyTree<K> {
    /// 全ノードの頻度の合計
    pub fn traverse(&self, order: Order) -> u64 {
        self.traverse_with(order, |_, _| {})
    }

    /// 指定順に (キー, 頻度) を渡しながら走査し、頻度の合計を返す
    pub fn traverse_with<F>(&self, order: Order, mut visit: F) -> u64
    where
        F: FnMut(&K, u64),
    {
        let mut sum = 0;
        for (key, count) in self.iter_order(order) {
            visit(key, count);
            sum += count;
        }
        sum
    }

    /// 昇順
    pub fn iter(&self) -> Iter<'_, K> {
        self.iter_order(Order::Ascending)
    }

    /// 降順
    pub fn iter_desc(&self) -> Iter<'_, K> {
        self.iter_order(Order::Descending)
    }

    pub fn iter_order(&self, order: Order) -> Iter<'_, K> {
        Iter {
            nodes: &self.nodes,
            stack: Vec::new(),
            cursor: self.root,
            order,
        }
    }

    /// 異なるキーの数
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 木の高さ（空なら 0）
    pub fn height(&self) -> usize {
        let mut best = 0;
        let mut stack: Vec<(usize, usize)> = self.root.map(|r| (r, 1)).into_iter().collect();
        while let Some((i, depth)) = stack.pop() {
            best = best.max(depth);
            let node = &self.nodes[i];
            for child in [node.left, node.right].into_iter().flatten() {
                stack.push((child, depth + 1));
            }
        }
        best
    }

    /// 全ノードを解放して空にする
    pub fn clear(&mut self) {
        self.nodes = Vec::new();
        self.root = None;
    }
}

/// 中順イテレータ
pub struct Iter<'a, K> {
    nodes: &'a [Node<K>],
    stack: Vec<usize>,
    cursor: Option<usize>,
    order: Order,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = (&'a K, u64);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(i) = self.cursor {
            self.stack.push(i);
            let node = &self.nodes[i];
            self.cursor = match self.order {
                Order::Ascending => node.left,
                Order::Descending => node.right,
            };
        }

        let i = self.stack.pop()?;
        let node = &self.nodes[i];
        self.cursor = match self.order {
            Order::Ascending => node.right,
            Order::Descending => node.left,
        };
        Some((&node.key, node.count))
    }
}
