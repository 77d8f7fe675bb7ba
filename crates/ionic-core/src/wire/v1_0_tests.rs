use super::v1_0;
use crate::{DecodeError, Error, Int};

#[test]
fn ints_take_sign_from_type() {
    assert_eq!(v1_0::int(&[0x01, 0x00], false), Int::Small(256));
    assert_eq!(v1_0::int(&[0x05], true), Int::Small(-5));
    assert_eq!(v1_0::int(&[], false), Int::Small(0));
}

#[test]
fn floats() {
    assert_eq!(v1_0::float(&[]).unwrap(), 0.0);
    assert_eq!(v1_0::float(&[0x3F, 0x80, 0x00, 0x00]).unwrap(), 1.0);
    assert_eq!(
        v1_0::float(&[0x40, 0x09, 0x21, 0xFB, 0x54, 0x44, 0x2D, 0x18]).unwrap(),
        std::f64::consts::PI
    );
    assert_eq!(
        v1_0::float(&[0x00, 0x00]).unwrap_err(),
        Error::Decode(DecodeError::InvalidFloatLength(2))
    );
}

#[test]
fn decimals() {
    assert_eq!(v1_0::decimal(&[]).unwrap().to_string(), "0d0");
    assert_eq!(v1_0::decimal(&[0xC2, 0x01, 0x5F]).unwrap().to_string(), "351d-2");
    assert_eq!(v1_0::decimal(&[0x81, 0x87]).unwrap().to_string(), "-7d1");
    assert!(v1_0::decimal(&[0x80, 0x80]).unwrap().is_negative_zero());
}

#[test]
fn timestamp_minute_precision() {
    let ts = v1_0::timestamp(&[0x80, 0x0F, 0xD7, 0x82, 0x97, 0x8C, 0x8E]).unwrap();
    assert_eq!(ts.to_string(), "2007-02-23T12:14Z");
}

#[test]
fn timestamp_year_only_has_unknown_offset() {
    let ts = v1_0::timestamp(&[0xC0, 0x0F, 0xD0]).unwrap();
    assert_eq!(ts.to_string(), "2000T");
}

#[test]
fn timestamp_fraction() {
    let ts = v1_0::timestamp(&[
        0x80, 0x0F, 0xD7, 0x82, 0x97, 0x8C, 0x8E, 0x9E, 0xC3, 0x01, 0xF4,
    ])
    .unwrap();
    assert_eq!(ts.to_string(), "2007-02-23T12:14:30.500Z");
}

#[test]
fn timestamp_hour_without_minute() {
    let err = v1_0::timestamp(&[0x80, 0x0F, 0xD7, 0x82, 0x97, 0x8C]).unwrap_err();
    assert_eq!(
        err,
        Error::Decode(DecodeError::InvalidTimestamp("hour without minute"))
    );
}

#[test]
fn symbol_ids_up_to_four_bytes() {
    assert_eq!(v1_0::sid(&[]).unwrap(), 0);
    assert_eq!(v1_0::sid(&[0x01, 0x00]).unwrap(), 256);
    assert!(v1_0::sid(&[1, 0, 0, 0, 0]).is_err());
}
