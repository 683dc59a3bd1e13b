//! コラッツ写像の収束経路と同値類
//!
//! 整数 n から n → M·n + A（既定は 3n+1）と D（既定は 2）での除算を繰り返し、
//! 絶対値が開始値を下回るまでの「下降脚ごとの因子数」を軌道として記録する。
//! 軌道と同値類文字列を範囲全体で数え、収束パターンの度数分布を作る。
//!
//! 整数ドメインは固定幅（i64 / i128）と多倍長（BigInt）を同じコードで扱う。

pub mod census;
pub mod class;
pub mod domain;
pub mod error;
pub mod orbit;
pub mod params;
pub mod path;
pub mod sequence;
pub mod tree;

pub use census::{
    convergent_classes, convergent_paths, factor_census, leg_census, orbit_census, scan_range,
    Census, ClassCensus, PathCensus,
};
pub use class::{parse_class, parse_class_with_len, ParsedClass};
pub use domain::PathInt;
pub use error::{ClassParseError, ErrorFlags, PathError, ScanError, SettingsError, TreeError};
pub use orbit::OrbitPath;
pub use params::{Params, ScanSettings, Settings};
pub use path::{natural_class_len, Parent, PathEngine};
pub use sequence::{
    class_flow_sequence, convergence_sequence, segment_flow, terminal_flow, ConvergenceSequence,
    SequenceStep, TerminalFlow,
};
pub use tree::{FrequencyTree, Order};
