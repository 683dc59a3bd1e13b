//! 同値類文字列の解析。
//!
//! 形式: 省略可能な符号 `+`/`-`、先頭記号 `0..D·M`、以降の記号は `0` か `1`。
//! 先頭記号はそのまま、k 番目（k ≥ 1）の `1` は M·D^k を加える。
//! `PathEngine::flow` の逆変換になっている。

use crate::domain::PathInt;
use crate::error::ClassParseError;
use crate::params::Params;

/// 同値類の記号列を解析した結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedClass<T> {
    /// 代表となる整数
    pub value: T,
    /// 記号数（符号を除く）。同値類の長さになる
    pub len: usize,
}

/// 同値類文字列から整数を復元する
pub fn parse_class<T: PathInt>(s: &str, params: &Params) -> Result<T, ClassParseError> {
    parse_class_with_len(s, params).map(|parsed| parsed.value)
}

/// 整数と記号数を返す版
pub fn parse_class_with_len<T: PathInt>(
    s: &str,
    params: &Params,
) -> Result<ParsedClass<T>, ClassParseError> {
    let s = s.trim();
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut chars = body.chars();
    let leading = chars.next().ok_or(ClassParseError::Empty)?;

    let radix = params.class_radix();
    let limit = u32::try_from(radix).unwrap_or(u32::MAX);
    let mut value = match leading.to_digit(10) {
        Some(d) if d < limit => T::from(i64::from(d)),
        _ => {
            return Err(ClassParseError::InvalidLeading {
                symbol: leading,
                limit,
            })
        }
    };

    let divisor = T::from(params.divisor);
    // 表現できない重みは None。以降の `0` は読み飛ばせる
    let mut weight = Some(T::from(radix));
    for (offset, symbol) in chars.enumerate() {
        let position = offset + 1;
        if offset > 0 {
            weight = weight.and_then(|w| w.checked_mul(&divisor));
        }
        match symbol {
            '1' => {
                value = weight
                    .as_ref()
                    .and_then(|w| value.checked_add(w))
                    .ok_or(ClassParseError::Overflow { position })?;
            }
            '0' => {}
            _ => {
                return Err(ClassParseError::InvalidSymbol {
                    position,
                    symbol,
                    limit: 2,
                })
            }
        }
    }

    if negative {
        value = -value;
    }

    Ok(ParsedClass {
        value,
        len: body.chars().count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathEngine;
    use num_bigint::BigInt;

    fn p() -> Params {
        Params::default()
    }

    #[test]
    fn test_parse_basic() {
        assert_eq!(parse_class::<i64>("+3", &p()), Ok(3));
        assert_eq!(parse_class::<i64>("+11", &p()), Ok(7));
        assert_eq!(parse_class::<i64>("+3001", &p()), Ok(27));
        assert_eq!(parse_class::<i64>("+11011", &p()), Ok(79));
        assert_eq!(parse_class::<i64>("5", &p()), Ok(5));
    }

    #[test]
    fn test_parse_negative() {
        assert_eq!(parse_class::<i64>("-11", &p()), Ok(-7));
        assert_eq!(parse_class::<i64>("-501", &p()), Ok(-17));
    }

    #[test]
    fn test_zero_is_distinct_from_error() {
        assert_eq!(parse_class::<i64>("0", &p()), Ok(0));
        assert_eq!(parse_class::<i64>("", &p()), Err(ClassParseError::Empty));
        assert_eq!(parse_class::<i64>("-", &p()), Err(ClassParseError::Empty));
    }

    #[test]
    fn test_invalid_symbols() {
        assert_eq!(
            parse_class::<i64>("+6", &p()),
            Err(ClassParseError::InvalidLeading {
                symbol: '6',
                limit: 6
            })
        );
        assert_eq!(
            parse_class::<i64>("+312", &p()),
            Err(ClassParseError::InvalidSymbol {
                position: 2,
                symbol: '2',
                limit: 2
            })
        );
        assert!(parse_class::<i64>("x1", &p()).is_err());
    }

    #[test]
    fn test_overflow_detected() {
        let long = format!("+1{}", "1".repeat(80));
        assert!(matches!(
            parse_class::<i64>(&long, &p()),
            Err(ClassParseError::Overflow { .. })
        ));
        // 多倍長なら同じ文字列でも解析できる
        assert!(parse_class::<BigInt>(&long, &p()).is_ok());
    }

    #[test]
    fn test_trailing_zeros_past_domain_width() {
        let params = p();
        let class = PathEngine::new(1i64, &params).flow(70);
        assert_eq!(class.len(), 71);
        assert_eq!(parse_class::<i64>(&class, &params), Ok(1));

        // 桁あふれした位置の `1` だけが失敗する
        let mut late_one = class.clone();
        late_one.push('1');
        assert_eq!(
            parse_class::<i64>(&late_one, &params),
            Err(ClassParseError::Overflow { position: 71 })
        );
    }

    #[test]
    fn test_len_excludes_sign() {
        let parsed = parse_class_with_len::<i64>("-501", &p()).unwrap();
        assert_eq!(parsed.len, 3);
        assert_eq!(parsed.value, -17);
    }
}
