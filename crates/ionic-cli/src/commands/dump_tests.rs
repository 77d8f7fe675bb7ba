use ionic_core::Colors;
use ionic_lib::StreamReader;

use super::dump::{Format, dump};

const IVM_1_1: [u8; 4] = [0xE0, 0x01, 0x01, 0xEA];

fn render(body: &[u8], format: Format) -> String {
    let bytes = [&IVM_1_1[..], body].concat();
    let mut reader = StreamReader::new(&bytes);
    let mut out = String::new();
    dump(&mut *reader, format, &mut out).unwrap();
    out
}

#[test]
fn text_output() {
    let body = [
        // [1, 2]
        0xB4, 0x61, 0x01, 0x61, 0x02,
        // {a: b}
        0xF3, 0xFF, b'a', 0xA1, b'b', 0x01, 0xF0,
        // t::"x"
        0xE7, 0xFF, b't', 0x91, b'x',
        // (:values (:: 3 null))
        0xEF, 0x01, 0x02, 0x07, 0x61, 0x03, 0xEA,
    ];

    insta::assert_snapshot!(render(&body, Format::Text(Colors::OFF)), @r#"
    [
      1
      2
    ]
    {
      a: b
    }
    t::"x"
    3
    null
    "#);
}

#[test]
fn json_lines() {
    let body = [0xB2, 0x61, 0x01, 0xEB, 0x05];

    insta::assert_snapshot!(render(&body, Format::Json), @r#"
    {"depth":0,"token":"list"}
    {"depth":1,"token":"int","value":1}
    {"depth":0,"token":"end"}
    {"depth":0,"token":"null","type":"string","value":null}
    "#);
}

#[test]
fn output_stops_at_the_error() {
    let bytes = [&IVM_1_1[..], &[0x61, 0x01, 0xEF, 0x01, 0x03][..]].concat();
    let mut reader = StreamReader::new(&bytes);
    let mut out = String::new();

    let err = dump(&mut *reader, Format::Text(Colors::OFF), &mut out).unwrap_err();

    assert_eq!(out, "1\n");
    assert!(err.is_decode());
}
