//! 接続パラメータと走査設定。
//!
//! 接続定数（除数 D, 乗数 M, 加数 A）はプロセス全体の可変状態ではなく、
//! 値として各計算に渡す。計算の途中で変えることはできない。
//!
//! 設定の優先順位（低→高）:
//! 1. 組み込みの既定値
//! 2. 設定ファイル（TOML）
//! 3. 環境変数 `COLLATZ__*`（例: `COLLATZ__PARAMS__MULTIPLIER=5`）

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// コラッツ接続 n → M·n + A と除数 D、および探索上限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// 除数 D（既定 2）
    pub divisor: i64,
    /// 乗数 M（既定 3）
    pub multiplier: i64,
    /// 加数 A（既定 1）
    pub addend: i64,
    /// 1軌道あたりの下降脚数の上限。超えたら発散とみなして打ち切る
    pub max_orbit_len: usize,
    /// 親探索（ancestry）の試行回数上限
    pub ancestry_cap: u64,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            divisor: 2,
            multiplier: 3,
            addend: 1,
            max_orbit_len: 1_000_000,
            ancestry_cap: 1_000_000,
        }
    }
}

impl Params {
    /// 標準の 3n+1
    pub fn collatz() -> Self {
        Params::default()
    }

    /// 接続定数だけを差し替えた値。
    ///
    /// 検査はしないので、経路を計算する前に [`Params::validate`] を通すこと。
    /// D < 2 では因子の除去が終わらず、D = 0 では除算で panic する。
    pub fn with_connection(divisor: i64, multiplier: i64, addend: i64) -> Self {
        Params {
            divisor,
            multiplier,
            addend,
            ..Params::default()
        }
    }

    /// 同値類の先頭記号の基数 D·M
    pub fn class_radix(&self) -> i64 {
        self.divisor.saturating_mul(self.multiplier)
    }

    /// 同値類の記号は10進1桁で表すため D·M ≤ 10 が必要
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.divisor < 2 {
            return Err(SettingsError::Invalid(format!(
                "divisor must be at least 2 (got {})",
                self.divisor
            )));
        }
        if self.multiplier < 1 {
            return Err(SettingsError::Invalid(format!(
                "multiplier must be positive (got {})",
                self.multiplier
            )));
        }
        match self.divisor.checked_mul(self.multiplier) {
            Some(radix) if radix <= 10 => {}
            _ => {
                return Err(SettingsError::Invalid(format!(
                    "divisor*multiplier must not exceed 10 (got {}*{})",
                    self.divisor, self.multiplier
                )))
            }
        }
        if self.max_orbit_len == 0 {
            return Err(SettingsError::Invalid("max_orbit_len must be positive".into()));
        }
        Ok(())
    }
}

/// 範囲走査の表示・高速化設定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// 高速モード: 偶数と 1 (mod 4) の奇数を計算せず既知の寄与で外挿する
    pub speed: bool,
    /// この指数以上では個別の経路を出力しない
    pub suppress_exponent: u32,
    /// この指数を超えると進捗ログを出す
    pub progress_exponent: u32,
    /// この長さ以下なら同値類・経路の一覧を出力する
    pub summary_length: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            speed: false,
            suppress_exponent: 12,
            progress_exponent: 14,
            summary_length: 25,
        }
    }
}

/// 設定ファイル全体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub params: Params,
    pub scan: ScanSettings,
}

impl Settings {
    /// 既定値 → ファイル → 環境変数 の順に重ねて読み込む
    pub fn load(path: Option<&Path>) -> Result<Settings, SettingsError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("COLLATZ")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.params.validate()?;
        tracing::debug!(?settings, "settings loaded");
        Ok(settings)
    }
}
