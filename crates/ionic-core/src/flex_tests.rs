use crate::flex::*;
use crate::{DecodeError, Error, Int};

#[test]
fn flex_uint_lengths() {
    assert_eq!(read_flex_uint(&[0x01], 0).unwrap(), (0, 1));
    assert_eq!(read_flex_uint(&[0x1B], 0).unwrap(), (13, 1));
    assert_eq!(read_flex_uint(&[0xFF], 0).unwrap(), (127, 1));
    assert_eq!(read_flex_uint(&[0x02, 0x02], 0).unwrap(), (128, 2));
    assert_eq!(read_flex_uint(&[0x04, 0x00, 0x08], 0).unwrap(), (1 << 16, 3));
}

#[test]
fn flex_int_sign() {
    assert_eq!(read_flex_int(&[0xFF], 0).unwrap(), (-1, 1));
    assert_eq!(read_flex_int(&[0x03], 0).unwrap(), (1, 1));
    assert_eq!(read_flex_int(&[0x81], 0).unwrap(), (-64, 1));
    assert_eq!(read_flex_int(&[0x02, 0x01], 0).unwrap(), (64, 2));
}

#[test]
fn writers_are_minimal() {
    for v in [0u64, 1, 127, 128, 16_383, 16_384, (1 << 56) - 1] {
        let mut out = Vec::new();
        let len = write_flex_uint(v, &mut out);
        assert_eq!(read_flex_uint(&out, 0).unwrap(), (v, len));
    }
    for v in [0i64, -1, 63, -64, 64, -65, 1 << 40, -(1 << 40)] {
        let mut out = Vec::new();
        let len = write_flex_int(v, &mut out);
        assert_eq!(read_flex_int(&out, 0).unwrap(), (v, len), "value {v}");
        if (-64..64).contains(&v) {
            assert_eq!(len, 1);
        }
    }
}

#[test]
fn zero_first_byte_is_rejected() {
    assert_eq!(
        read_flex_uint(&[0x00, 0x00], 0).unwrap_err(),
        Error::Decode(DecodeError::IntegerOverflow)
    );
}

#[test]
fn truncated_flex_uint() {
    assert_eq!(
        read_flex_uint(&[0x04, 0x00], 0).unwrap_err(),
        Error::Decode(DecodeError::UnexpectedEof { position: 2 })
    );
}

#[test]
fn flex_syms() {
    assert_eq!(read_flex_sym(&[0x09], 0).unwrap(), (FlexSym::Sid(4), 1));
    assert_eq!(
        read_flex_sym(&[0xFB, b'a', b'b', b'c'], 0).unwrap(),
        (FlexSym::Text("abc"), 4)
    );
    assert_eq!(read_flex_sym(&[0x01, 0x61], 0).unwrap(), (FlexSym::System(1), 2));
    assert_eq!(read_flex_sym(&[0x01, 0xF0], 0).unwrap(), (FlexSym::End, 2));
}

#[test]
fn fixed_widths() {
    assert_eq!(fixed_uint(&[0xFF, 0xFF]), Int::Small(65_535));
    assert_eq!(fixed_int(&[0xFF, 0xFF]), Int::Small(-1));
    assert_eq!(fixed_u64(&[0x34, 0x12]), 0x1234);
}
