use super::{CodecError, TokenReader, format_hexfloat, parse_hexfloat, write_section};
use crate::assert_err;

#[test]
fn test_format_hexfloat_known_values() {
    assert_eq!(format_hexfloat(1.0), "0x1p+0");
    assert_eq!(format_hexfloat(0.1), "0x1.999999999999ap-4");
    assert_eq!(format_hexfloat(-2.5), "-0x1.4p+1");
    assert_eq!(format_hexfloat(0.0), "0x0p+0");
    assert_eq!(format_hexfloat(-0.0), "-0x0p+0");
    assert_eq!(format_hexfloat(f64::INFINITY), "inf");
    assert_eq!(format_hexfloat(f64::NEG_INFINITY), "-inf");
    assert_eq!(format_hexfloat(f64::from_bits(1)), "0x0.0000000000001p-1022");
}

#[test]
fn test_parse_hexfloat_c_style() {
    assert_eq!(parse_hexfloat("0x1.8p1").unwrap(), 3.0);
    assert_eq!(parse_hexfloat("0X1P-2").unwrap(), 0.25);
    assert_eq!(parse_hexfloat("0x10").unwrap(), 16.0);
    assert_eq!(parse_hexfloat("-0x1p+0").unwrap(), -1.0);
    assert_eq!(parse_hexfloat("inf").unwrap(), f64::INFINITY);
    assert!(parse_hexfloat("nan").unwrap().is_nan());
}

#[test]
fn test_hexfloat_bit_exact_roundtrip() {
    let values = [
        0.1,
        -0.0,
        1.0 / 3.0,
        std::f64::consts::PI,
        f64::MAX,
        f64::MIN_POSITIVE,
        f64::MIN_POSITIVE / 3.0,
        f64::from_bits(1),
        f64::EPSILON,
        -123_456.789e-300,
        0.99 - (0.99 - 0.5) * 0.95,
    ];
    for value in values {
        let text = format_hexfloat(value);
        let parsed = parse_hexfloat(&text).unwrap();
        assert_eq!(parsed.to_bits(), value.to_bits(), "{value} -> {text}");
    }
}

#[test]
fn test_parse_hexfloat_rejects_garbage() {
    assert_err!(parse_hexfloat("1.5"), CodecError::InvalidHexFloat(_));
    assert_err!(parse_hexfloat("0x"), CodecError::InvalidHexFloat(_));
    assert_err!(parse_hexfloat("0x1.2.3p0"), CodecError::InvalidHexFloat(_));
    assert_err!(parse_hexfloat("0x1pz"), CodecError::InvalidHexFloat(_));
}

#[test]
fn test_token_reader_sections() {
    let mut out = String::new();
    write_section(&mut out, "BACKPROP_ORDER", &[3usize, 1, 2]);
    write_section::<f64>(&mut out, "BEST_CLASS_ERROR", &[]);
    write_section(&mut out, "BEST_CORRECT_PREDICTIONS", &[7usize]);

    let mut reader = TokenReader::new(&out);
    assert!(reader.next_label("BACKPROP_ORDER").unwrap().is_none());
    let count: usize = reader.next_parse("count").unwrap();
    let order: Vec<usize> = (0..count)
        .map(|_| reader.next_parse("order").unwrap())
        .collect();
    assert_eq!(order, vec![3, 1, 2]);

    // 空段落只有标签和 0，不需要额外跳行
    assert!(reader.next_label("BEST_CLASS_ERROR").unwrap().is_none());
    assert_eq!(reader.next_parse::<usize>("count").unwrap(), 0);

    assert_eq!(
        reader.next_label("WRONG").unwrap(),
        Some("BEST_CORRECT_PREDICTIONS")
    );
}

#[test]
fn test_token_reader_errors() {
    let mut reader = TokenReader::new("abc 2");
    assert_err!(
        reader.next_parse::<i32>("exact_id"),
        CodecError::InvalidToken { expected: "exact_id", .. }
    );
    assert_err!(reader.next_bool("flag"), CodecError::InvalidToken { .. });
    assert_err!(
        reader.next_token("more"),
        CodecError::UnexpectedEof { expected: "more" }
    );
}

#[test]
fn test_token_reader_extent_bounds() {
    let mut reader = TokenReader::new("0 0 100 101 18446744073709551615 -1");
    assert_err!(
        reader.next_extent(1, "node.size_x"),
        CodecError::InvalidToken { expected: "node.size_x", .. }
    );
    assert_eq!(reader.next_extent(0, "edge.filter_x").unwrap(), 0);
    assert_eq!(reader.next_extent(1, "node.size_y").unwrap(), 100);
    assert_err!(reader.next_extent(0, "edge.filter_y"), CodecError::InvalidToken { .. });
    assert_err!(reader.next_extent(0, "edge.filter_y"), CodecError::InvalidToken { .. });
    assert_err!(reader.next_extent(0, "edge.filter_y"), CodecError::InvalidToken { .. });
}
