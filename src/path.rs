//! 経路エンジン。
//!
//! 開始整数から、絶対値が開始値を下回るまで接続 n → M·n + A と D での除算を
//! 繰り返し、下降脚ごとの因子数（軌道）と統計量を求める。
//!
//! - 偶数（D で割り切れる）開始値: 軌道 [1]、経路因子数 1
//! - 奇数: 軌道の先頭に 0 を置き、以降 1 接続ごとに因子数を1つ追加
//!
//! 桁あふれ・確保失敗・軌道長上限は `ErrorFlags` に記録し、そこまでの部分結果を保持する。

use num_traits::{One, Signed, Zero};

use crate::class::parse_class_with_len;
use crate::domain::PathInt;
use crate::error::{ClassParseError, ErrorFlags, PathError};
use crate::orbit::OrbitPath;
use crate::params::Params;

/// 接続定数をドメインの整数に変換したもの
struct Constants<T> {
    d: T,
    m: T,
    a: T,
}

impl<T: PathInt> Constants<T> {
    fn new(params: &Params) -> Self {
        Constants {
            d: T::from(params.divisor),
            m: T::from(params.multiplier),
            a: T::from(params.addend),
        }
    }

    /// M·n + A。表現できなければ None
    fn connect(&self, n: &T) -> Option<T> {
        n.checked_mul(&self.m)?.checked_add(&self.a)
    }

    fn divisible(&self, n: &T) -> bool {
        n.trunc_rem(&self.d).is_zero()
    }

    /// D の因子を全て取り除く（0 はそのまま）
    fn strip(&self, n: &T) -> (T, u64) {
        let mut x = n.clone();
        let mut count = 0;
        if x.is_zero() {
            return (x, 0);
        }
        while self.divisible(&x) {
            x = x.trunc_div(&self.d);
            count += 1;
        }
        (x, count)
    }

    /// D の因子を取り除くが、|x| < |floor| になった時点で止める
    fn factor(&self, n: &T, floor: &T) -> (T, u64) {
        let mut x = n.clone();
        let mut count = 0;
        while !x.is_zero() && self.divisible(&x) {
            x = x.trunc_div(&self.d);
            count += 1;
            if exceeds(floor, &x) {
                break;
            }
        }
        (x, count)
    }
}

/// -|x|。負側は常に表現できるので桁あふれしない
fn neg_magnitude<T: PathInt>(x: &T) -> T {
    if x.is_positive() {
        -x.clone()
    } else {
        x.clone()
    }
}

/// |a| > |b|
pub(crate) fn exceeds<T: PathInt>(a: &T, b: &T) -> bool {
    neg_magnitude(a) < neg_magnitude(b)
}

/// 親探索の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parent<T> {
    /// 接続・約分すると元の整数に戻る整数
    pub value: T,
    /// 見つかったときの倍率
    pub scale: u64,
}

/// 1つの開始整数に対する経路と統計量
#[derive(Debug, Clone)]
pub struct PathEngine<T: PathInt> {
    start: T,
    sign: i8,
    /// 途中で現れた最大の絶対値
    max: T,
    /// 収束した値（ループを抜けた時点の値）
    terminus: T,
    orbit: OrbitPath,
    path_factors: u64,
    class_factors: u64,
    next_factors: u64,
    class_len: usize,
    budget: Option<u64>,
    budget_exceeded: bool,
    errors: ErrorFlags,
    params: Params,
}

impl<T: PathInt> PathEngine<T> {
    /// 経路を計算する。`budget` を超える経路因子数になった時点で打ち切る
    pub fn compute(start: T, budget: Option<u64>, params: &Params) -> Self {
        let mut engine = PathEngine::empty(start, budget, params);
        engine.class_len = natural_class_len(&engine.start, params);
        engine.run();
        engine
    }

    pub fn new(start: T, params: &Params) -> Self {
        PathEngine::compute(start, None, params)
    }

    /// 同値類の長さを指定して構築（flow の桁数になる）
    pub fn with_class_len(start: T, class_len: usize, params: &Params) -> Self {
        let mut engine = PathEngine::empty(start, None, params);
        engine.class_len = class_len;
        engine.run();
        engine
    }

    /// 同値類文字列から構築。同値類の長さは記号数
    pub fn from_class(class: &str, params: &Params) -> Result<Self, ClassParseError> {
        let parsed = parse_class_with_len::<T>(class, params)?;
        Ok(PathEngine::with_class_len(parsed.value, parsed.len, params))
    }

    /// 別の開始値で再計算する（打ち切り設定と接続定数は引き継ぐ）
    pub fn assign(&mut self, start: T) {
        let class_len = natural_class_len(&start, &self.params);
        let mut engine = PathEngine::empty(start, self.budget, &self.params);
        engine.class_len = class_len;
        engine.run();
        *self = engine;
    }

    fn empty(start: T, budget: Option<u64>, params: &Params) -> Self {
        debug_assert!(params.validate().is_ok(), "invalid connection: {:?}", params);
        PathEngine {
            terminus: start.clone(),
            start,
            sign: 0,
            max: T::zero(),
            orbit: OrbitPath::new(),
            path_factors: 0,
            class_factors: 0,
            next_factors: 0,
            class_len: 0,
            budget,
            budget_exceeded: false,
            errors: ErrorFlags::empty(),
            params: *params,
        }
    }

    fn flag_overflow(&mut self, at: &T) {
        tracing::warn!(start = %self.start, value = %at, domain = T::DOMAIN, "overflow while building path");
        self.errors.insert(ErrorFlags::OVERFLOW);
    }

    fn run(&mut self) {
        let k = Constants::<T>::new(&self.params);
        let start = self.start.clone();

        self.sign = if start.is_positive() {
            1
        } else if start.is_negative() {
            -1
        } else {
            0
        };
        self.max = match start.checked_abs() {
            Some(m) => m,
            None => {
                self.flag_overflow(&start);
                T::zero()
            }
        };

        let mut current = start.clone();

        if k.divisible(&start) {
            self.orbit.append(1);
            self.path_factors = 1;
        } else {
            self.orbit.append(0);
            loop {
                let connection = match k.connect(&current) {
                    Some(c) if c.is_negative() == current.is_negative() => c,
                    _ => {
                        self.flag_overflow(&current);
                        break;
                    }
                };

                if exceeds(&connection, &self.max) {
                    match connection.checked_abs() {
                        Some(m) => self.max = m,
                        None => {
                            self.flag_overflow(&connection);
                            break;
                        }
                    }
                }

                let (reduced, leg) = k.factor(&connection, &start);

                if let Some(budget) = self.budget {
                    if self.path_factors + leg > budget {
                        tracing::trace!(start = %start, budget, "path factor budget exceeded");
                        self.path_factors += leg;
                        self.budget_exceeded = true;
                        self.terminus = reduced;
                        return;
                    }
                }

                if self.orbit.len() >= self.params.max_orbit_len {
                    tracing::warn!(start = %start, limit = self.params.max_orbit_len, "orbit length limit reached");
                    self.errors.insert(ErrorFlags::LIMIT);
                    break;
                }

                let before = self.orbit.len();
                self.orbit.append(leg);
                if self.orbit.len() == before {
                    // 確保失敗は orbit 側のフラグに残る
                    break;
                }
                self.path_factors += leg;

                current = reduced;
                if !exceeds(&current, &start) {
                    break;
                }
            }
        }

        self.class_factors = self.path_factors;
        if !current.is_zero() {
            let (_, f) = k.strip(&current);
            self.class_factors += f;
        }
        self.terminus = current;

        let (core, _) = k.strip(&start);
        self.next_factors = match k.connect(&core) {
            Some(c) => k.strip(&c).1,
            None => {
                self.flag_overflow(&core);
                0
            }
        };
    }

    pub fn start(&self) -> &T {
        &self.start
    }

    /// 開始値の符号（-1, 0, 1）
    pub fn sign(&self) -> i8 {
        self.sign
    }

    /// 途中で現れた最大の絶対値
    pub fn max(&self) -> &T {
        &self.max
    }

    /// 収束した値
    pub fn terminus(&self) -> &T {
        &self.terminus
    }

    pub fn orbit(&self) -> &OrbitPath {
        &self.orbit
    }

    /// 軌道の長さ（下降脚の数、先頭の印を含む）
    pub fn path_length(&self) -> usize {
        self.orbit.len()
    }

    /// 経路上で取り除いた D の因子の合計。予算超過で止まった場合は超過した合計
    pub fn path_factors(&self) -> u64 {
        self.path_factors
    }

    /// 経路因子数に、収束値に残った D の因子を加えたもの
    pub fn class_factors(&self) -> u64 {
        self.class_factors
    }

    /// 開始値の次の接続が持つ D の因子数。1 なら発散側、2 以上なら収束側
    pub fn next_factors(&self) -> u64 {
        self.next_factors
    }

    pub fn class_len(&self) -> usize {
        self.class_len
    }

    pub fn budget_exceeded(&self) -> bool {
        self.budget_exceeded
    }

    /// エンジンと軌道のエラーフラグ
    pub fn errors(&self) -> ErrorFlags {
        self.errors | self.orbit.error()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn render_orbit(&self) -> String {
        self.orbit.render()
    }

    /// 符号付きの同値類文字列を `digits` 桁で返す。
    /// 先頭記号は start mod (D·M)、以降は (start / M) を D で割りながら mod D を並べる。
    pub fn flow(&self, digits: usize) -> String {
        let k = Constants::<T>::new(&self.params);
        let radix = T::from(self.params.class_radix());

        let mut out = String::with_capacity(digits + 1);
        if digits > 0 {
            match self.sign {
                1 => out.push('+'),
                -1 => out.push('-'),
                _ => {}
            }
        }

        let mut factors = self.start.trunc_div(&k.m);
        let mut remainder = self.start.trunc_rem(&radix);
        for _ in 0..digits {
            out.push_str(&remainder.abs().to_string());
            factors = factors.trunc_div(&k.d);
            remainder = factors.trunc_rem(&k.d);
        }
        out
    }

    /// 同値類の長さで flow
    pub fn class_flow(&self) -> String {
        self.flow(self.class_len)
    }

    /// 接続・約分すると開始値に戻る整数を `scale` から順に探す。
    /// D または M で割り切れる整数には親がない（`Ok(None)`）。
    pub fn ancestry(&self, scale: u64) -> Result<Option<Parent<T>>, PathError> {
        let k = Constants::<T>::new(&self.params);
        if k.divisible(&self.start) || self.start.trunc_rem(&k.m).is_zero() {
            return Ok(None);
        }

        let overflow = || PathError::Overflow { domain: T::DOMAIN };
        let base = self.start.checked_mul(&k.d).ok_or_else(overflow)?;
        let cap = self.params.ancestry_cap;

        let mut scale = scale;
        for _ in 0..cap {
            let s = i64::try_from(scale).map_err(|_| overflow())?;
            let candidate = T::from(s)
                .checked_mul(&base)
                .and_then(|x| x.checked_sub(&k.a))
                .ok_or_else(overflow)?
                .trunc_div(&k.m);
            let connection = k.connect(&candidate).ok_or_else(overflow)?;
            if k.strip(&connection).0 == self.start {
                return Ok(Some(Parent {
                    value: candidate,
                    scale,
                }));
            }
            scale = scale.checked_add(1).ok_or_else(overflow)?;
        }

        tracing::warn!(start = %self.start, scale, cap, "ancestry search exhausted");
        Err(PathError::AncestrySearchExhausted {
            start: self.start.to_string(),
            scale,
            cap,
        })
    }

    /// 親を小さい倍率から順に `count` 個集める
    pub fn ancestors(&self, count: usize) -> Result<Vec<Parent<T>>, PathError> {
        let mut found = Vec::with_capacity(count);
        let mut scale = 1;
        while found.len() < count {
            match self.ancestry(scale)? {
                Some(parent) => {
                    scale = parent.scale + 1;
                    found.push(parent);
                }
                None => break,
            }
        }
        Ok(found)
    }

    /// 写像を1回だけ適用した値（D で割り切れれば n / D、そうでなければ M·n + A）
    pub fn next(&self) -> Result<T, PathError> {
        let k = Constants::<T>::new(&self.params);
        if k.divisible(&self.start) {
            Ok(self.start.trunc_div(&k.d))
        } else {
            k.connect(&self.start)
                .ok_or(PathError::Overflow { domain: T::DOMAIN })
        }
    }
}

/// 自然な同値類の長さ: start / M を |r| ≤ 1 になるまで D で割った回数 + 1
pub fn natural_class_len<T: PathInt>(start: &T, params: &Params) -> usize {
    let d = T::from(params.divisor);
    let mut residual = start.trunc_div(&T::from(params.multiplier));
    let mut len = 1;
    while exceeds(&residual, &T::one()) {
        residual = residual.trunc_div(&d);
        len += 1;
    }
    len
}
