/*
 * @Author       : 老董
 * @Description  : 十六进制浮点数（C 的 `%a` 格式）的读写
 *
 * 例：1.0 -> `0x1p+0`，0.1 -> `0x1.999999999999ap-4`，-2.5 -> `-0x1.4p+1`。
 * 写出的文本可逐位还原原始 f64。
 */

use super::CodecError;

const MANTISSA_BITS: u32 = 52;
const MANTISSA_MASK: u64 = (1 << MANTISSA_BITS) - 1;
const EXPONENT_BIAS: i32 = 1023;

/// 把 f64 写成十六进制浮点文本
pub fn format_hexfloat(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    let sign = if value.is_sign_negative() { "-" } else { "" };
    if value.is_infinite() {
        return format!("{sign}inf");
    }

    let bits = value.abs().to_bits();
    let biased_exponent = (bits >> MANTISSA_BITS) as i32;
    let mantissa = bits & MANTISSA_MASK;

    if biased_exponent == 0 && mantissa == 0 {
        return format!("{sign}0x0p+0");
    }

    // 非规格化数以 0x0.xxx 开头，指数固定为 -1022
    let (lead, exponent) = if biased_exponent == 0 {
        (0, 1 - EXPONENT_BIAS)
    } else {
        (1, biased_exponent - EXPONENT_BIAS)
    };

    let digits = format!("{mantissa:013x}");
    let digits = digits.trim_end_matches('0');
    if digits.is_empty() {
        format!("{sign}0x{lead}p{exponent:+}")
    } else {
        format!("{sign}0x{lead}.{digits}p{exponent:+}")
    }
}

/// 解析十六进制浮点文本（也接受 `inf`、`-inf`、`nan`，以及省略指数的写法）
pub fn parse_hexfloat(text: &str) -> Result<f64, CodecError> {
    let invalid = || CodecError::InvalidHexFloat(text.to_string());

    let (negative, body) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let signed = |v: f64| if negative { -v } else { v };

    let lowered = body.to_ascii_lowercase();
    match lowered.as_str() {
        "inf" | "infinity" => return Ok(signed(f64::INFINITY)),
        "nan" => return Ok(f64::NAN),
        _ => {}
    }

    let body = lowered.strip_prefix("0x").ok_or_else(invalid)?;
    let (mantissa_text, exponent_text) = match body.split_once('p') {
        Some((m, e)) => (m, Some(e)),
        None => (body, None),
    };
    let exponent: i32 = match exponent_text {
        Some(e) => e.parse().map_err(|_| invalid())?,
        None => 0,
    };

    let mut mantissa: u64 = 0;
    let mut shift: i32 = 0;
    let mut seen_point = false;
    let mut seen_digit = false;
    for c in mantissa_text.chars() {
        if c == '.' {
            if seen_point {
                return Err(invalid());
            }
            seen_point = true;
            continue;
        }
        let digit = c.to_digit(16).ok_or_else(invalid)? as u64;
        seen_digit = true;
        if mantissa < (1 << 59) {
            mantissa = mantissa * 16 + digit;
            if seen_point {
                shift -= 4;
            }
        } else if !seen_point {
            // 超出精度的整数位只影响量级
            shift += 4;
        }
    }
    if !seen_digit {
        return Err(invalid());
    }

    Ok(signed(ldexp(mantissa as f64, exponent + shift)))
}

/// x * 2^e，分段相乘以免中间结果溢出或过早下溢
fn ldexp(mut x: f64, mut e: i32) -> f64 {
    while e > 1000 {
        x *= pow2(1000);
        e -= 1000;
        if x.is_infinite() {
            return x;
        }
    }
    while e < -1000 {
        x *= pow2(-1000);
        e += 1000;
        if x == 0.0 {
            return x;
        }
    }
    x * pow2(e)
}

/// 2^e，要求 e 在规格化范围内
fn pow2(e: i32) -> f64 {
    debug_assert!((1 - EXPONENT_BIAS..=EXPONENT_BIAS).contains(&e));
    f64::from_bits(((e + EXPONENT_BIAS) as u64) << MANTISSA_BITS)
}
