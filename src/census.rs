//! 範囲走査と度数分布。
//!
//! 範囲は M·D^e（e = |exponent|）。exponent が負なら負の整数を走査する。
//! 各整数の経路を計算して頻度木に数える。エラーフラグの立った経路は数えずに飛ばす。
//!
//! 高速モード（`ScanSettings::speed`）では、経路長の目標が進捗指数以上のとき
//! i ≡ 3 (mod 4) の整数だけを計算する。偶数（軌道 [1]）と i ≡ 1 (mod 4)（軌道 [0, 2]）は
//! 1 接続で収束することが分かっているので、その度数 range/2 と range/4 を外挿で加える。

use crate::domain::PathInt;
use crate::error::ScanError;
use crate::orbit::OrbitPath;
use crate::params::{Params, ScanSettings};
use crate::path::PathEngine;
use crate::tree::{FrequencyTree, Order};

/// 走査範囲 M·D^exponent（exponent = 0 なら空）
pub fn scan_range(exponent: u32, params: &Params) -> Result<i64, ScanError> {
    let too_large = || ScanError::RangeTooLarge {
        exponent,
        divisor: params.divisor,
        multiplier: params.multiplier,
    };
    if exponent == 0 {
        return Ok(0);
    }
    let mut range = params.multiplier;
    for _ in 0..exponent {
        range = range.checked_mul(params.divisor).ok_or_else(too_large)?;
    }
    Ok(range)
}

/// 1つの走査の範囲・刻み・進捗表示
struct Sweep {
    range: i64,
    sign: i64,
    first: i64,
    step: usize,
    /// (間隔, 剰余)。i % 間隔 == 剰余 のとき進捗を出す
    progress: Option<(i64, i64)>,
}

impl Sweep {
    fn new(exponent: i32, params: &Params) -> Result<Sweep, ScanError> {
        let range = scan_range(exponent.unsigned_abs(), params)?;
        Ok(Sweep {
            range,
            sign: if exponent < 0 { -1 } else { 1 },
            first: 1,
            step: 1,
            progress: None,
        })
    }

    fn with_progress(mut self, progress_exponent: u32, params: &Params) -> Self {
        // 間隔が表現できなければ進捗は出さない
        self.progress = match scan_range(progress_exponent, params) {
            Ok(blip) if blip > 0 => Some((blip, self.first % blip)),
            _ => None,
        };
        self
    }

    /// 経路を順に計算して `each` に渡す。フラグ付きの経路は飛ばし、その数を返す
    fn run<T, F>(&self, params: &Params, budget: Option<u64>, mut each: F) -> Result<u64, ScanError>
    where
        T: PathInt,
        F: FnMut(PathEngine<T>) -> Result<(), ScanError>,
    {
        let mut skipped = 0;
        for i in (self.first..=self.range).step_by(self.step) {
            let path = PathEngine::compute(T::from(i * self.sign), budget, params);

            if let Some((blip, modulus)) = self.progress {
                if i % blip == modulus {
                    let done = i as f64 * 100.0 / self.range as f64;
                    tracing::info!(i, range = self.range, "progress {:7.3}%", done);
                }
            }

            let errors = path.errors();
            if !errors.is_empty() {
                tracing::warn!(start = %path.start(), %errors, "skipping flagged path");
                skipped += 1;
                continue;
            }
            each(path)?;
        }
        Ok(skipped)
    }
}

/// 単純な度数分布の結果
#[derive(Debug, Clone)]
pub struct Census<K> {
    pub range: i64,
    pub tree: FrequencyTree<K>,
    /// エラーで飛ばした整数の数
    pub skipped: u64,
}

impl<K> Census<K> {
    /// 数えた整数の総数
    pub fn total(&self) -> u64 {
        self.tree.traverse(Order::Ascending)
    }
}

fn simple_census<T, K, G, V>(
    exponent: i32,
    params: &Params,
    scan: &ScanSettings,
    key: G,
    mut visit: V,
) -> Result<Census<K>, ScanError>
where
    T: PathInt,
    K: Ord,
    G: Fn(&PathEngine<T>) -> K,
    V: FnMut(&PathEngine<T>),
{
    let magnitude = exponent.unsigned_abs();
    let mut sweep = Sweep::new(exponent, params)?;
    if magnitude > scan.progress_exponent {
        sweep = sweep.with_progress(scan.progress_exponent, params);
    }
    if magnitude >= scan.suppress_exponent {
        tracing::info!(exponent = magnitude, suppress = scan.suppress_exponent, "suppressing per-path output");
    }
    tracing::debug!(range = sweep.range, sign = sweep.sign, "census scan");

    let mut tree = FrequencyTree::new();
    let skipped = sweep.run(params, None, |path: PathEngine<T>| {
        tree.insert(key(&path))?;
        if magnitude <= scan.suppress_exponent && magnitude <= scan.progress_exponent {
            visit(&path);
        }
        Ok(())
    })?;

    Ok(Census {
        range: sweep.range,
        tree,
        skipped,
    })
}

/// 軌道の長さ（下降脚の数）の分布
pub fn leg_census<T: PathInt>(
    exponent: i32,
    params: &Params,
    scan: &ScanSettings,
    visit: impl FnMut(&PathEngine<T>),
) -> Result<Census<usize>, ScanError> {
    simple_census(exponent, params, scan, |p: &PathEngine<T>| p.path_length(), visit)
}

/// 経路因子数の分布（収束する同値類の最小の長さ）
pub fn factor_census<T: PathInt>(
    exponent: i32,
    params: &Params,
    scan: &ScanSettings,
    visit: impl FnMut(&PathEngine<T>),
) -> Result<Census<u64>, ScanError> {
    simple_census(exponent, params, scan, |p: &PathEngine<T>| p.path_factors(), visit)
}

/// 軌道そのものの分布
pub fn orbit_census<T: PathInt>(
    exponent: i32,
    params: &Params,
    scan: &ScanSettings,
    visit: impl FnMut(&PathEngine<T>),
) -> Result<Census<OrbitPath>, ScanError> {
    simple_census(exponent, params, scan, |p: &PathEngine<T>| p.orbit().clone(), visit)
}

/// 長さごとの収束する同値類
#[derive(Debug, Clone)]
pub struct ClassCensus {
    pub range: i64,
    /// 経路因子数が目標以下だった整数の数
    pub found: u64,
    /// by_length[n]: 長さ n の同値類文字列の頻度
    pub by_length: Vec<FrequencyTree<String>>,
    pub skipped: u64,
}

/// 経路因子数が `digits` 以下の整数を、その長さの同値類文字列で数える
pub fn convergent_classes<T: PathInt>(
    digits: i32,
    params: &Params,
    scan: &ScanSettings,
    mut visit: impl FnMut(&PathEngine<T>),
) -> Result<ClassCensus, ScanError> {
    let target = digits.unsigned_abs();
    let mut sweep = Sweep::new(digits, params)?;
    if target > scan.progress_exponent {
        sweep = sweep.with_progress(scan.progress_exponent, params);
    }
    tracing::debug!(range = sweep.range, target, "convergent class scan");

    let mut by_length: Vec<FrequencyTree<String>> =
        (0..=target).map(|_| FrequencyTree::new()).collect();
    let mut found = 0;

    let skipped = sweep.run(params, None, |path: PathEngine<T>| {
        if target <= scan.suppress_exponent && target <= scan.progress_exponent {
            visit(&path);
        }
        let factors = path.path_factors();
        if factors <= u64::from(target) {
            found += 1;
            let len = usize::try_from(factors).unwrap_or(usize::MAX);
            if let Some(tree) = by_length.get_mut(len) {
                tree.insert(path.flow(len))?;
            }
        }
        Ok(())
    })?;

    Ok(ClassCensus {
        range: sweep.range,
        found,
        by_length,
        skipped,
    })
}

/// 長さごとの収束する軌道
#[derive(Debug, Clone)]
pub struct PathCensus<T> {
    pub range: i64,
    /// by_length[n]: 軌道の長さ n の軌道の頻度
    pub by_length: Vec<FrequencyTree<OrbitPath>>,
    /// 高速モードで偶数の寄与を外挿したか
    pub speed: bool,
    /// 外挿した偶数の度数（軌道 [1]）
    pub extrapolated_even: u64,
    /// 外挿した 1 (mod 4) の度数（軌道 [0, 2]）
    pub extrapolated_single: u64,
    /// 範囲内で現れた最大の絶対値
    pub max: T,
    /// max を生んだ開始値
    pub max_start: T,
    pub skipped: u64,
}

impl<T> PathCensus<T> {
    /// 見つかった収束経路の総数（外挿分を含む）
    pub fn total(&self) -> u64 {
        let counted: u64 = self
            .by_length
            .iter()
            .map(|tree| tree.traverse(Order::Ascending))
            .sum();
        counted + self.extrapolated_even + self.extrapolated_single
    }
}

/// 経路因子数が `path_length` 以下で収束する軌道を数える
pub fn convergent_paths<T: PathInt>(
    path_length: i32,
    params: &Params,
    scan: &ScanSettings,
    mut visit: impl FnMut(&PathEngine<T>),
) -> Result<PathCensus<T>, ScanError> {
    let target = path_length.unsigned_abs();
    // 長い経路では進捗の間隔を広げる
    let progress_exponent = if target > 24 { target - 9 } else { 15 };

    let mut sweep = Sweep::new(path_length, params)?;
    let speed = scan.speed && target >= progress_exponent;
    if speed {
        sweep.first = 3;
        sweep.step = 4;
    }
    if target >= scan.suppress_exponent {
        sweep = sweep.with_progress(progress_exponent, params);
    }
    tracing::debug!(range = sweep.range, target, speed, "convergent path scan");

    // 因子数の打ち切りは高速モードのときだけ
    let budget = speed.then_some(u64::from(target));
    let mut by_length: Vec<FrequencyTree<OrbitPath>> =
        (0..=target).map(|_| FrequencyTree::new()).collect();
    let mut max = T::zero();
    let mut max_start = T::zero();

    let skipped = sweep.run(params, budget, |path: PathEngine<T>| {
        if *path.max() > max {
            max = path.max().clone();
            max_start = path.start().clone();
        }
        if target < scan.suppress_exponent {
            visit(&path);
        }
        if path.budget_exceeded() || path.path_factors() > u64::from(target) {
            return Ok(());
        }
        let len = path.path_length();
        if len >= by_length.len() {
            by_length.resize_with(len + 1, FrequencyTree::new);
        }
        by_length[len].insert(path.orbit().clone())?;
        Ok(())
    })?;

    let range = u64::try_from(sweep.range).unwrap_or(0);
    let (extrapolated_even, extrapolated_single) = if speed {
        (range / 2, range / 4)
    } else {
        (0, 0)
    };

    Ok(PathCensus {
        range: sweep.range,
        by_length,
        speed,
        extrapolated_even,
        extrapolated_single,
        max,
        max_start,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p() -> Params {
        Params::default()
    }

    #[test]
    fn test_scan_range() {
        assert_eq!(scan_range(0, &p()), Ok(0));
        assert_eq!(scan_range(1, &p()), Ok(6));
        assert_eq!(scan_range(4, &p()), Ok(48));
        assert!(matches!(
            scan_range(70, &p()),
            Err(ScanError::RangeTooLarge { exponent: 70, .. })
        ));
    }

    #[test]
    fn test_leg_census_counts_every_integer() {
        let census = leg_census::<i64>(4, &p(), &ScanSettings::default(), |_| {}).unwrap();
        assert_eq!(census.range, 48);
        assert_eq!(census.total(), 48);
        assert_eq!(census.tree.search(&1), 24);
        assert!(census.tree.node_count() <= 48);
    }

    #[test]
    fn test_negative_exponent_scans_negatives() {
        let mut starts = Vec::new();
        let census =
            leg_census::<i64>(-2, &p(), &ScanSettings::default(), |path| starts.push(*path.start()))
                .unwrap();
        assert_eq!(census.total(), 12);
        assert_eq!(starts.first(), Some(&-1));
        assert_eq!(starts.last(), Some(&-12));
    }

    #[test]
    fn test_convergent_classes() {
        let census = convergent_classes::<i64>(3, &p(), &ScanSettings::default(), |_| {}).unwrap();
        assert_eq!(census.range, 24);
        // 偶数は経路因子数 1
        assert_eq!(census.by_length[1].traverse(Order::Ascending), 12);
        // 1 と 13 は同じ同値類
        assert_eq!(census.by_length[2].search("+10"), 2);
        let found: u64 = census
            .by_length
            .iter()
            .map(|t| t.traverse(Order::Ascending))
            .sum();
        assert_eq!(found, census.found);
    }

    #[test]
    fn test_convergent_paths_small() {
        let census = convergent_paths::<i64>(4, &p(), &ScanSettings::default(), |_| {}).unwrap();
        assert_eq!(census.range, 48);
        assert!(!census.speed);
        assert_eq!(census.by_length[1].search(&OrbitPath::from_counts([1])), 24);
        assert_eq!(census.by_length[2].search(&OrbitPath::from_counts([0, 2])), 12);
        // 3, 19, 35
        assert_eq!(census.by_length[3].search(&OrbitPath::from_counts([0, 1, 3])), 3);
        // 最大値は打ち切らない経路から求める
        let (true_max, true_start) = (1..=48i64)
            .map(|n| (*PathEngine::new(n, &p()).max(), n))
            .max_by_key(|&(m, n)| (m, -n))
            .unwrap();
        assert_eq!((census.max, census.max_start), (true_max, true_start));
        assert_eq!((census.max, census.max_start), (9232, 27));
    }

    #[test]
    fn test_convergent_paths_budget_only_in_speed_mode() {
        let scan = ScanSettings {
            speed: true,
            ..ScanSettings::default()
        };
        let fast = convergent_paths::<i64>(15, &p(), &scan, |_| {}).unwrap();
        let full = convergent_paths::<i64>(15, &p(), &ScanSettings::default(), |_| {}).unwrap();
        assert!(fast.speed);
        // 通常走査の最大値は高速モードの打ち切り値以上
        assert!(full.max >= fast.max);
        let again = PathEngine::new(full.max_start, &p());
        assert_eq!(*again.max(), full.max);
    }
}
