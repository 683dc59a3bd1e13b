//! 収束列（同値類の流れ）と終端までの連鎖。
//!
//! 開始値から写像を1回ずつ適用し、各値の同値類を残りの桁数で表示できる形で並べる。
//! 接続のたびに次の接続の因子数で字下げを調整し、桁数と経路の予算を減らす。
//! 絶対値が開始値を下回るか経路の予算が尽きたら止まる。

use num_traits::{One, Zero};

use crate::domain::PathInt;
use crate::error::PathError;
use crate::params::Params;
use crate::path::{exceeds, PathEngine};

/// 収束列の1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceStep<T> {
    pub value: T,
    /// この値から計算した軌道の長さ
    pub path_length: usize,
    /// 残りの同値類の桁数
    pub digits: usize,
    /// 字下げ（1 以上）
    pub indent: usize,
    pub flow: String,
}

/// 1つの開始値に対する収束列
#[derive(Debug, Clone)]
pub struct ConvergenceSequence<T> {
    pub start: T,
    /// 開始値の経路で現れた最大の絶対値（表示幅用）
    pub max: T,
    pub steps: Vec<SequenceStep<T>>,
    /// 最後に求めた次の値。0 は退化した列
    pub terminus: T,
}

/// 収束列を作る。`path_len` と `digits` は接続ごとに次の接続の因子数だけ減る
pub fn convergence_sequence<T: PathInt>(
    path: &PathEngine<T>,
    path_len: i64,
    digits: i64,
) -> Result<ConvergenceSequence<T>, PathError> {
    let params = *path.params();
    let start = path.start().clone();

    let mut steps = Vec::new();
    let mut current = start.clone();
    let mut next = T::zero();
    let mut indent: usize = 1;
    let mut digits = digits.max(0);
    let mut path_len = path_len;
    let divisor = T::from(params.divisor);

    while path_len >= 0 {
        let width = usize::try_from(digits.max(0)).unwrap_or(0);
        let engine = PathEngine::with_class_len(current.clone(), width, &params);
        steps.push(SequenceStep {
            value: current.clone(),
            path_length: engine.path_length(),
            digits: width,
            indent,
            flow: engine.flow(width),
        });

        if exceeds(&start, &current) {
            break;
        }

        next = engine.next()?;
        if next.is_zero() {
            break;
        }

        if !current.trunc_rem(&divisor).is_zero() {
            let facts = engine.next_factors();
            indent = if facts == 1 {
                indent + 1
            } else if facts as usize >= indent {
                1
            } else {
                indent + 1 - facts as usize
            };
            let facts = i64::try_from(facts).unwrap_or(i64::MAX);
            digits = digits.saturating_sub(facts);
            path_len = path_len.saturating_sub(facts);
        }

        current = next.clone();
    }

    Ok(ConvergenceSequence {
        start,
        max: path.max().clone(),
        steps,
        terminus: next,
    })
}

/// 経路因子数の桁で表示する収束列（予算は同値類因子数）
pub fn segment_flow<T: PathInt>(path: &PathEngine<T>) -> Result<ConvergenceSequence<T>, PathError> {
    convergence_sequence(
        path,
        to_budget(path.class_factors()),
        to_budget(path.path_factors()),
    )
}

/// 同値類の長さで表示する収束列
pub fn class_flow_sequence<T: PathInt>(
    path: &PathEngine<T>,
) -> Result<ConvergenceSequence<T>, PathError> {
    convergence_sequence(
        path,
        to_budget(path.class_factors()),
        i64::try_from(path.class_len()).unwrap_or(i64::MAX),
    )
}

fn to_budget(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// 終端までの連鎖
#[derive(Debug, Clone)]
pub struct TerminalFlow<T> {
    pub segments: Vec<ConvergenceSequence<T>>,
    /// 最後の区間の開始値
    pub last: T,
    /// 最後の区間の終端
    pub next: T,
    /// 連鎖が |1| に到達したか。偽なら 1 を含まない局所ループ
    pub global: bool,
}

/// 区間の収束列を、絶対値が減らなくなるまでつなげる
pub fn terminal_flow<T: PathInt>(start: T, params: &Params) -> Result<TerminalFlow<T>, PathError> {
    let mut segments = Vec::new();
    let mut next = start;
    let mut last;

    loop {
        last = next;
        let engine = PathEngine::new(last.clone(), params);
        let segment = segment_flow(&engine)?;
        next = segment.terminus.clone();
        segments.push(segment);
        if !exceeds(&last, &next) {
            break;
        }
    }

    let global = last.is_one() || (-last.clone()).is_one();
    if !global {
        tracing::info!(start = %last, "non-global terminus loop detected");
    }

    Ok(TerminalFlow {
        segments,
        last,
        next,
        global,
    })
}
