//! エラー種別。
//!
//! 経路計算の失敗は致命的ではない。`ErrorFlags` で報告し、部分結果は保持する。
//! 呼び出し側（範囲走査など）がスキップするか続行するかを決める。

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use thiserror::Error;

/// 経路・軌道のエラービットマスク
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ErrorFlags(u8);

impl ErrorFlags {
    /// 符号付き演算の桁あふれ
    pub const OVERFLOW: ErrorFlags = ErrorFlags(0x1);
    /// ブロック確保の失敗
    pub const MEMORY: ErrorFlags = ErrorFlags(0x2);
    /// 255 を超える因子数（飽和して格納）
    pub const SYMBOL_RANGE: ErrorFlags = ErrorFlags(0x4);
    /// 軌道長が上限を超えた（発散防止で打ち切り）
    pub const LIMIT: ErrorFlags = ErrorFlags(0x8);

    pub const fn empty() -> Self {
        ErrorFlags(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: ErrorFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: ErrorFlags) {
        self.0 |= other.0;
    }
}

impl BitOr for ErrorFlags {
    type Output = ErrorFlags;

    fn bitor(self, rhs: ErrorFlags) -> ErrorFlags {
        ErrorFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ErrorFlags {
    fn bitor_assign(&mut self, rhs: ErrorFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ErrorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let names = [
            (ErrorFlags::OVERFLOW, "overflow"),
            (ErrorFlags::MEMORY, "memory"),
            (ErrorFlags::SYMBOL_RANGE, "symbol-range"),
            (ErrorFlags::LIMIT, "limit"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// 同値類文字列の解析エラー。
/// 「不正な入力」と「正当な 0」を区別するため、失敗は必ずこの型で返す。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassParseError {
    #[error("equivalence class is empty")]
    Empty,

    #[error("invalid leading symbol '{symbol}' (expected 0..{limit})")]
    InvalidLeading { symbol: char, limit: u32 },

    #[error("invalid symbol '{symbol}' at position {position} (expected 0..{limit})")]
    InvalidSymbol {
        position: usize,
        symbol: char,
        limit: u32,
    },

    #[error("equivalence class too long for the integer domain (position {position})")]
    Overflow { position: usize },
}

/// 単発の経路演算（next / ancestry）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("integer overflow in the {domain} domain")]
    Overflow { domain: &'static str },

    #[error("no parent of {start} found within {cap} probes (last scale {scale})")]
    AncestrySearchExhausted { start: String, scale: u64, cap: u64 },
}

/// 頻度木のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("failed to allocate tree node ({nodes} nodes in use)")]
    Allocation { nodes: usize },
}

/// 範囲走査のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("scan range {multiplier}*{divisor}^{exponent} does not fit in 64 bits")]
    RangeTooLarge {
        exponent: u32,
        divisor: i64,
        multiplier: i64,
    },

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// 設定読み込みのエラー
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid connection parameters: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_combine() {
        let mut flags = ErrorFlags::empty();
        assert!(flags.is_empty());
        flags.insert(ErrorFlags::OVERFLOW);
        flags |= ErrorFlags::MEMORY;
        assert!(flags.contains(ErrorFlags::OVERFLOW));
        assert!(flags.contains(ErrorFlags::MEMORY));
        assert!(!flags.contains(ErrorFlags::LIMIT));
        assert_eq!(flags.bits(), 0x3);
        assert_eq!(flags.to_string(), "overflow|memory");
    }

    #[test]
    fn test_flags_display_empty() {
        assert_eq!(ErrorFlags::default().to_string(), "none");
    }
}
