use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use collatz_orbit::*;
use num_bigint::BigInt;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// コラッツ写像の収束経路と同値類
#[derive(Parser, Debug)]
#[command(name = "collatz-orbit", version, about, long_about = None)]
struct Cli {
    /// ログ詳細度（-d: info, -dd: debug, -ddd: trace）
    #[arg(short, long, action = ArgAction::Count, global = true)]
    debug: u8,

    /// 設定ファイル（TOML）
    #[arg(long, global = true, env = "COLLATZ_CONFIG")]
    config: Option<PathBuf>,

    /// 多倍長整数で計算する
    #[arg(long, global = true)]
    bigint: bool,

    /// 高速モード（偶数と 1 mod 4 を外挿）
    #[arg(long, global = true)]
    speed: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 整数の軌道と同値類
    Path {
        #[arg(allow_hyphen_values = true)]
        start: String,
    },
    /// 同値類文字列の軌道
    Class {
        #[arg(allow_hyphen_values = true)]
        class: String,
    },
    /// 収束列
    Seq {
        #[arg(allow_hyphen_values = true)]
        value: String,
        /// 値を同値類文字列として読む
        #[arg(short = 'e', long = "class")]
        class: bool,
    },
    /// 終端までの収束列の連鎖
    Term {
        #[arg(allow_hyphen_values = true)]
        value: String,
        #[arg(short = 'e', long = "class")]
        class: bool,
    },
    /// 親（接続・約分で戻る整数）
    Ancestry {
        #[arg(allow_hyphen_values = true)]
        start: String,
        /// 生成する親の数
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },
    /// 下降脚の数の分布（範囲 M·D^exponent）
    Legs {
        #[arg(allow_hyphen_values = true)]
        exponent: i32,
    },
    /// 経路因子数の分布
    Factors {
        #[arg(allow_hyphen_values = true)]
        exponent: i32,
    },
    /// 軌道の分布
    Orbits {
        #[arg(allow_hyphen_values = true)]
        exponent: i32,
    },
    /// 指定長以下で収束する同値類
    Classes {
        #[arg(allow_hyphen_values = true)]
        digits: i32,
    },
    /// 指定の因子数以下で収束する軌道
    Paths {
        #[arg(allow_hyphen_values = true)]
        length: i32,
    },
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    let outcome = if cli.bigint {
        run::<BigInt>(&cli)
    } else {
        run::<i64>(&cli)
    };

    if let Err(e) = outcome {
        eprintln!("エラー: {:#}", e);
        std::process::exit(1);
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    // RUST_LOG があればそちらを優先
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();

    tracing::debug!(?level, "logging initialised");
}

fn run<T>(cli: &Cli) -> Result<()>
where
    T: PathInt,
    <T as FromStr>::Err: Display,
{
    let mut settings = Settings::load(cli.config.as_deref()).context("設定の読み込みに失敗")?;
    if cli.speed {
        settings.scan.speed = true;
    }
    let params = settings.params;
    let scan = settings.scan;
    tracing::debug!(domain = T::DOMAIN, ?params, "starting");

    let timer = Instant::now();
    match &cli.command {
        Command::Path { start } => {
            let path = PathEngine::new(parse_int::<T>(start)?, &params);
            print_path(&path);
        }
        Command::Class { class } => {
            let path = PathEngine::<T>::from_class(class, &params)?;
            print_path(&path);
        }
        Command::Seq { value, class } => {
            let path = engine_from::<T>(value, *class, &params)?;
            let seq = if *class {
                class_flow_sequence(&path)?
            } else {
                segment_flow(&path)?
            };
            print_sequence(&seq, &params);
        }
        Command::Term { value, class } => {
            let path = engine_from::<T>(value, *class, &params)?;
            let flow = terminal_flow(path.start().clone(), &params)?;
            for segment in &flow.segments {
                print_sequence(segment, &params);
            }
            if !flow.global {
                println!("終端ループに大域終端 (|1|) が含まれない: {} → {}", flow.last, flow.next);
            }
        }
        Command::Ancestry { start, count } => {
            let path = PathEngine::new(parse_int::<T>(start)?, &params);
            let parents = path.ancestors(*count)?;
            if parents.is_empty() {
                println!("{} に親は存在しない", path.start());
            }
            for parent in parents {
                let p = PathEngine::new(parent.value, &params);
                println!("(scale {})", parent.scale);
                print_line(&p, p.class_len(), 0, &p.class_flow(), 0);
            }
        }
        Command::Legs { exponent } => {
            let census = leg_census::<T>(*exponent, &params, &scan, |p| print_orbit(p, 0))?;
            print_counts(&census.tree);
            println!("全 {} 件", census.total());
            print_skipped(census.skipped);
        }
        Command::Factors { exponent } => {
            let census = factor_census::<T>(*exponent, &params, &scan, |p| print_class(p, 0))?;
            print_counts(&census.tree);
            println!("全 {} 件", census.total());
            print_skipped(census.skipped);
        }
        Command::Orbits { exponent } => {
            let census = orbit_census::<T>(*exponent, &params, &scan, |p| print_orbit(p, 0))?;
            census.tree.traverse_with(Order::Ascending, |orbit, count| {
                println!("Count {:>10}, downlegs {:4}: flow is {}", count, orbit.len(), orbit);
            });
            println!("全 {} 件", census.total());
            print_skipped(census.skipped);
        }
        Command::Classes { digits } => {
            let census = convergent_classes::<T>(*digits, &params, &scan, |p| print_class(p, 0))?;
            print_class_census(&census, digits.unsigned_abs() as usize, &scan);
        }
        Command::Paths { length } => {
            let census = convergent_paths::<T>(*length, &params, &scan, |p| print_orbit(p, 0))?;
            print_path_census(&census, length.unsigned_abs() as usize, &params, &scan);
        }
    }
    println!("計算時間 = {:?}", timer.elapsed());
    Ok(())
}

fn parse_int<T>(s: &str) -> Result<T>
where
    T: PathInt,
    <T as FromStr>::Err: Display,
{
    s.trim()
        .parse::<T>()
        .map_err(|e| anyhow!("整数を解析できません: {} ({})", s, e))
}

fn engine_from<T>(value: &str, class: bool, params: &Params) -> Result<PathEngine<T>>
where
    T: PathInt,
    <T as FromStr>::Err: Display,
{
    if class {
        Ok(PathEngine::from_class(value, params)?)
    } else {
        Ok(PathEngine::new(parse_int::<T>(value)?, params))
    }
}

/// 1行の経路表示: `開始値: (長さ,M*D^因子数): 流れ`
fn print_line<T: PathInt>(path: &PathEngine<T>, factors: usize, indent: usize, flow: &str, width: usize) {
    let params = path.params();
    println!(
        "{:>w$}: ({:02},{}*{}^{:03}):{:pad$}{}",
        path.start(),
        path.path_length(),
        params.multiplier,
        params.divisor,
        factors,
        "",
        flow,
        w = width,
        pad = indent.max(1),
    );
}

fn print_orbit<T: PathInt>(path: &PathEngine<T>, width: usize) {
    print_line(path, path.path_factors() as usize, 0, &path.render_orbit(), width);
}

fn print_class<T: PathInt>(path: &PathEngine<T>, width: usize) {
    let factors = path.path_factors() as usize;
    print_line(path, factors, 0, &path.flow(factors), width);
}

fn print_path<T: PathInt>(path: &PathEngine<T>) {
    print_line(path, path.class_len(), 0, &path.class_flow(), 0);
    println!();
    println!("--- 結果 ---");
    println!("軌道                = {}", path.render_orbit());
    println!("経路の長さ          = {}", path.path_length());
    println!("経路因子数          = {}", path.path_factors());
    println!("同値類因子数        = {}", path.class_factors());
    println!("次の接続の因子数    = {}", path.next_factors());
    println!("最大値              = {}", path.max());
    println!("収束値              = {}", path.terminus());
    println!("同値類の長さ        = {}", path.class_len());
    if !path.errors().is_empty() {
        println!("エラー              = {}", path.errors());
    }
}

fn print_sequence<T: PathInt>(seq: &ConvergenceSequence<T>, params: &Params) {
    let width = seq.max.decimal_digits() + 1;
    println!("Convergence sequence for {} is:", seq.start);
    for step in &seq.steps {
        let path = PathEngine::with_class_len(step.value.clone(), step.digits, params);
        print_line(&path, step.digits, step.indent, &step.flow, width);
    }
}

fn print_counts<K: Display>(tree: &FrequencyTree<K>) {
    tree.traverse_with(Order::Ascending, |key, count| {
        println!("For {:>3}: downleg count is {}", key, count);
    });
}

fn print_skipped(skipped: u64) {
    if skipped > 0 {
        println!("エラーで除外 = {}", skipped);
    }
}

fn print_class_census(census: &ClassCensus, digits: usize, scan: &ScanSettings) {
    if digits <= scan.summary_length {
        println!();
        println!("Summary of convergent equivalence classes with up to {} digits in length", digits);
        for tree in census.by_length.iter().rev() {
            tree.traverse_with(Order::Ascending, |class, count| {
                let len = class.trim_start_matches(['+', '-']).len();
                println!("Count {:>10}, class length {:4}: flow is {}", count, len, class);
            });
        }
    }

    println!();
    println!("Classlen (Pathways): Frequency");
    for (len, tree) in census.by_length.iter().enumerate() {
        if !tree.is_empty() {
            println!("{:8} ({:8}): {}", len, tree.node_count(), tree.traverse(Order::Ascending));
        }
    }
    println!(
        "Found {} convergent equivalence classes of length {} out of {} total ({}/{}).",
        census.found,
        digits,
        census.range,
        census.found / 3,
        census.range / 3
    );
    print_skipped(census.skipped);
}

fn print_path_census<T: PathInt>(
    census: &PathCensus<T>,
    length: usize,
    params: &Params,
    scan: &ScanSettings,
) {
    if length <= scan.summary_length {
        println!();
        println!(
            "Summary of convergent paths with up to {} factors of {}",
            length, params.divisor
        );
        for tree in census.by_length.iter().rev() {
            tree.traverse_with(Order::Ascending, |orbit, count| {
                println!("Count {:>10}, downlegs {:4}: flow is {}", count, orbit.len(), orbit);
            });
        }
    }

    println!();
    println!("Downlegs Uplegs (Pathways): Frequency");
    if census.speed {
        println!("{:8} {:6} ({:8}): {}", 1, 0, 1, census.extrapolated_even);
        println!("{:8} {:6} ({:8}): {}", 2, 1, 1, census.extrapolated_single);
    }
    for (len, tree) in census.by_length.iter().enumerate() {
        if !tree.is_empty() {
            println!(
                "{:8} {:6} ({:8}): {}",
                len,
                len.saturating_sub(1),
                tree.node_count(),
                tree.traverse(Order::Ascending)
            );
        }
    }

    // 高速モードでは最大値が正確でない
    if !census.speed {
        println!(
            "Largest integer divergence in range is {} ({} digits), beginning with terminus {}",
            census.max,
            census.max.decimal_digits(),
            census.max_start
        );
    }

    let total = census.total();
    let range = u64::try_from(census.range).unwrap_or(0);
    println!(
        "Found {} convergent paths out of {} total ({}/{}) with up to {} factors of {}",
        total,
        census.range,
        total / 3,
        range / 3,
        length,
        params.divisor
    );
    print_skipped(census.skipped);
}
