//! 軌道（下降脚ごとの 2 の因子数の列）。
//!
//! 記号は 8 個ずつブロックにまとめて格納する。ブロックは先頭記号を最上位バイトに
//! 置いた u64 としても読めるので、比較はブロック単位の整数比較 1 回で済む。
//! パック表現はホストのバイト順に依存しない（`u64::from_be_bytes`）。

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::ErrorFlags;

/// 1ブロックあたりの記号数
pub const BLOCK_LEN: usize = 8;

type Block = [u8; BLOCK_LEN];

/// 追記専用の軌道列
#[derive(Debug, Clone, Default)]
pub struct OrbitPath {
    /// ブロック列。記号 i は blocks[i / 8][i % 8]
    blocks: Vec<Block>,
    /// 記号数
    len: usize,
    error: ErrorFlags,
}

impl OrbitPath {
    pub fn new() -> Self {
        OrbitPath::default()
    }

    /// 記号列から構築（テスト・外部データ用）
    pub fn from_counts<I: IntoIterator<Item = u64>>(counts: I) -> Self {
        let mut orbit = OrbitPath::new();
        for c in counts {
            orbit.append(c);
        }
        orbit
    }

    /// 末尾に因子数を1つ追加する。
    /// 新しいブロックが確保できなければ MEMORY を立てて何もしない。
    /// 255 を超える値は 255 に飽和させ SYMBOL_RANGE を立てる。
    pub fn append(&mut self, count: u64) {
        let pos = self.len % BLOCK_LEN;
        if pos == 0 {
            if self.blocks.try_reserve(1).is_err() {
                tracing::warn!(len = self.len, "orbit block allocation failed");
                self.error.insert(ErrorFlags::MEMORY);
                return;
            }
            self.blocks.push([0; BLOCK_LEN]);
        }

        let symbol = match u8::try_from(count) {
            Ok(s) => s,
            Err(_) => {
                self.error.insert(ErrorFlags::SYMBOL_RANGE);
                u8::MAX
            }
        };

        let last = self.blocks.len() - 1;
        self.blocks[last][pos] = symbol;
        self.len += 1;
    }

    /// 記号数（経路長）
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// i 番目の記号
    pub fn get(&self, i: usize) -> Option<u8> {
        if i >= self.len {
            return None;
        }
        Some(self.blocks[i / BLOCK_LEN][i % BLOCK_LEN])
    }

    /// 記号を挿入順に返す
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.blocks.iter().flatten().copied().take(self.len)
    }

    /// 因子数の合計
    pub fn total(&self) -> u64 {
        self.iter().map(u64::from).sum()
    }

    /// ブロック数
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// ブロックのパック表現（先頭記号が最上位バイト）
    pub fn packed_blocks(&self) -> impl Iterator<Item = u64> + '_ {
        self.blocks.iter().map(|b| u64::from_be_bytes(*b))
    }

    pub fn error(&self) -> ErrorFlags {
        self.error
    }

    /// 10進・空白区切りの文字列（例: "0 1 1 1 3 2"）
    pub fn render(&self) -> String {
        let mut s = String::with_capacity(self.len * 2);
        for (i, symbol) in self.iter().enumerate() {
            if i > 0 {
                s.push(' ');
            }
            s.push_str(&symbol.to_string());
        }
        s
    }

    /// 全ブロックを解放し、長さとエラーを 0 に戻す
    pub fn clear(&mut self) {
        self.blocks = Vec::new();
        self.len = 0;
        self.error = ErrorFlags::empty();
    }
}

impl fmt::Display for OrbitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl PartialEq for OrbitPath {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.blocks == other.blocks
    }
}

impl Eq for OrbitPath {}

impl Hash for OrbitPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len.hash(state);
        self.blocks.hash(state);
    }
}

impl PartialOrd for OrbitPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrbitPath {
    /// 辞書式順序。ブロックを上位から u64 として比較し、最初の差で決まる。
    /// 共通部分が全て等しければ短い方が小さい。
    /// 未使用位置は 0 なので、ブロック内で一方が終わっていても辞書式と一致する。
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.packed_blocks().zip(other.packed_blocks()) {
            match a.cmp(&b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        self.len.cmp(&other.len)
    }
}
