use ionic_core::{DecodeError, Error, MacroError, TokenKind, ValueReader};
use ionic_vm::FlattenLimits;

use crate::test_utils::{
    IVM_1_0, IVM_1_1, annotated, cat, directive, fields, int, list, read_all, read_error, sexp,
    string, symbol,
};
use crate::{ReaderOptions, StreamReader, Version};

#[test]
fn version_marker_switches_generation() {
    let bytes = [
        0xE0, 0x01, 0x01, 0xEA, 0x60, 0xB4, 0x61, 0x01, 0x61, 0x02, 0xB4, 0x61, 0x03, 0x61, 0x04,
    ];
    let mut reader = StreamReader::new(&bytes);
    let mut tokens = Vec::new();
    loop {
        let token = reader.next_token().unwrap();
        tokens.push(token);
        if token == TokenKind::End {
            break;
        }
    }

    assert_eq!(
        tokens,
        [TokenKind::Int, TokenKind::List, TokenKind::List, TokenKind::End]
    );
    assert_eq!(reader.version(), Version::V1_1);
    assert_eq!(read_all(&bytes), "0 [1, 2] [3, 4]");
}

#[test]
fn stream_without_marker_is_ion_1_0() {
    let bytes = [0x21, 0x05, 0x31, 0x05];
    let reader = StreamReader::new(&bytes);

    assert_eq!(reader.version(), Version::V1_0);
    assert_eq!(read_all(&bytes), "5 -5");
}

#[test]
fn ion_1_0_scalars() {
    let bytes = cat(&[
        &IVM_1_0,
        &[0x21, 0x05, 0x20, 0x10, 0x11, 0x0F, 0x83, b'a', b'b', b'c', 0x2F],
    ]);

    assert_eq!(read_all(&bytes), r#"5 0 false true null "abc" null.int"#);
}

#[test]
fn ion_1_0_struct_and_annotations() {
    let bytes = cat(&[
        &IVM_1_0,
        // {name: 1}
        &[0xD3, 0x84, 0x21, 0x01],
        // padding, then name::7
        &[0x00, 0xE4, 0x81, 0x84, 0x21, 0x07],
    ]);

    assert_eq!(read_all(&bytes), "{name: 1} name::7");
}

#[test]
fn local_symbol_tables() {
    let bytes = cat(&[
        &IVM_1_0,
        // $ion_symbol_table::{symbols: ["a", "b"]}
        &[0xE9, 0x81, 0x83, 0xD6, 0x87, 0xB4, 0x81, b'a', 0x81, b'b'],
        &[0x71, 0x0A, 0x71, 0x0B],
        // $ion_symbol_table::{imports: $ion_symbol_table, symbols: ["c"]}
        &[0xEA, 0x81, 0x83, 0xD7, 0x86, 0x71, 0x03, 0x87, 0xB2, 0x81, b'c'],
        &[0x71, 0x0A, 0x71, 0x0C],
        // $ion_symbol_table::{symbols: ["d"]}
        &[0xE7, 0x81, 0x83, 0xD4, 0x87, 0xB2, 0x81, b'd'],
        &[0x71, 0x0A],
    ]);

    assert_eq!(read_all(&bytes), "a b a c d");
}

#[test]
fn symbol_table_resets_on_version_marker() {
    let bytes = cat(&[
        &IVM_1_0,
        &[0xE7, 0x81, 0x83, 0xD4, 0x87, 0xB2, 0x81, b'a'],
        &IVM_1_0,
        &[0x71, 0x0A],
    ]);

    let err = read_error(&bytes);

    assert!(matches!(
        err,
        Error::Decode(DecodeError::SymbolOutOfRange { sid: 10, max: 9 })
    ));
}

#[test]
fn ion_1_1_containers() {
    let bytes = cat(&[
        &IVM_1_1,
        // delimited list, then delimited struct with inline names
        &[0xF1, 0x61, 0x01, 0x61, 0x02, 0xF0],
        &[0xF3, 0xFF, b'a', 0x61, 0x05, 0x01, 0xF0],
        // typed null, null
        &[0xEB, 0x05, 0xEA],
    ]);

    assert_eq!(read_all(&bytes), "[1, 2] {a: 5} null.string null");
}

#[test]
fn system_macro_invocations() {
    let bytes = cat(&[
        &IVM_1_1,
        // (:values 5) through the default table
        &[0x01, 0x01, 0x61, 0x05],
        // (:values (:: 1 2)) by system address, with a prefixed group
        &[0xEF, 0x01, 0x02, 0x09, 0x61, 0x01, 0x61, 0x02],
        // delimited group
        &[0xEF, 0x01, 0x02, 0x01, 0x61, 0x03, 0x61, 0x04, 0xF0],
        // (:none)
        &[0xEF, 0x00],
        &[0x61, 0x07],
    ]);

    assert_eq!(read_all(&bytes), "5 1 2 3 4 7");
}

#[test]
fn invalid_presence_bits() {
    let bytes = cat(&[&IVM_1_1, &[0xEF, 0x01, 0x03, 0x61, 0x01]]);

    assert!(matches!(
        read_error(&bytes),
        Error::Decode(DecodeError::InvalidPresenceBits)
    ));
}

#[test]
fn expansion_in_field_position() {
    let bytes = cat(&[
        &IVM_1_1,
        // {a: (:values 1 2)}
        &[0xF3, 0xFF, b'a', 0xEF, 0x01, 0x02, 0x09, 0x61, 0x01, 0x61, 0x02, 0x01, 0xF0],
        // {a: (:none), bc: 3}
        &[0xF3, 0xFF, b'a', 0xEF, 0x00, 0xFD, b'b', b'c', 0x61, 0x03, 0x01, 0xF0],
    ]);

    assert_eq!(read_all(&bytes), "{a: 1, a: 2} {bc: 3}");
}

#[test]
fn macro_defined_by_directive() {
    let pair = sexp(&[
        symbol("macro"),
        symbol("pair"),
        sexp(&[symbol("x"), symbol("y")]),
        list(&[sexp(&[symbol("%x")]), sexp(&[symbol("%y")])]),
    ]);
    let bytes = cat(&[
        &IVM_1_1,
        &directive("set_macros", &[pair]),
        &[0x00, 0x61, 0x01, 0x61, 0x02],
        &[0x00],
        &string("a"),
        &int(-3),
    ]);

    assert_eq!(read_all(&bytes), r#"[1, 2] ["a", -3]"#);

    let mut reader = StreamReader::new(&bytes);
    reader.next_token().unwrap();
    let table = reader.macro_table();
    assert_eq!(table.len(), 1);
    assert_eq!(table[0].name(), Some("pair"));
}

#[test]
fn replaced_macro_table_drops_system_addresses() {
    let bytes = cat(&[
        &IVM_1_1,
        &directive("set_macros", &[]),
        &[0x01, 0x01, 0x61, 0x05],
    ]);

    assert!(matches!(
        read_error(&bytes),
        Error::Macro(MacroError::UndefinedMacro(1))
    ));
}

#[test]
fn symbols_added_by_e_expression() {
    let bytes = cat(&[
        &IVM_1_1,
        // (:add_symbols "a")
        &[0xEF, 0x14, 0x01],
        &string("a"),
        // symbol ID 66, the first after the system symbols
        &[0xE1, 0x42],
    ]);

    assert_eq!(read_all(&bytes), "a");
}

#[test]
fn symbols_set_by_clause() {
    let bytes = cat(&[
        &IVM_1_1,
        &directive("set_symbols", &[string("x"), string("y")]),
        &[0xE1, 0x01, 0xE1, 0x02],
    ]);

    let mut reader = StreamReader::new(&bytes);
    assert_eq!(reader.next_token().unwrap(), TokenKind::Symbol);
    assert_eq!(reader.read_symbol().unwrap().text(), Some("x"));
    assert_eq!(reader.symbol_table().len(), 3);
    assert_eq!(read_all(&bytes), "x y");
}

#[test]
fn annotated_values_are_not_directives_below_top_level() {
    let inner = directive("set_symbols", &[string("x")]);
    let bytes = cat(&[&IVM_1_1, &list(&[inner])]);

    assert_eq!(read_all(&bytes), r#"[$ion::(set_symbols "x")]"#);
}

#[test]
fn directive_macro_inside_container_fails() {
    let bytes = cat(&[&IVM_1_1, &[0xB3, 0xEF, 0x14, 0x00]]);

    assert!(matches!(
        read_error(&bytes),
        Error::Macro(MacroError::InvalidDirective(_))
    ));
}

#[test]
fn use_directive_is_unsupported() {
    let bytes = cat(&[&IVM_1_1, &directive("use", &[string("catalog")])]);

    assert!(matches!(
        read_error(&bytes),
        Error::Macro(MacroError::UnsupportedFeature("use"))
    ));
}

#[test]
fn container_depth_limit() {
    let bytes = cat(&[&IVM_1_1, &list(&[list(&[list(&[])])])]);
    let options = ReaderOptions::new().max_container_depth(2);
    let mut reader = StreamReader::with_options(&bytes, options);

    reader.next_token().unwrap();
    let mut outer = reader.take_list().unwrap();
    outer.next_token().unwrap();
    let mut inner = outer.take_list().unwrap();
    inner.next_token().unwrap();
    let err = inner.take_list().unwrap_err();

    assert!(matches!(err, Error::Decode(DecodeError::DepthExceeded(2))));
}

#[test]
fn deep_delimited_nesting_stops_at_depth_limit() {
    let depth = 100_000;
    let bytes = cat(&[&IVM_1_1, &vec![0xF1; depth], &vec![0xF0; depth]]);
    let options = ReaderOptions::new().max_container_depth(2);
    let mut reader = StreamReader::with_options(&bytes, options);

    assert_eq!(reader.next_token().unwrap(), TokenKind::List);
    let mut outer = reader.take_list().unwrap();
    assert_eq!(outer.next_token().unwrap(), TokenKind::List);
    let mut inner = outer.take_list().unwrap();
    assert_eq!(inner.next_token().unwrap(), TokenKind::List);
    let err = inner.take_list().unwrap_err();

    assert!(matches!(err, Error::Decode(DecodeError::DepthExceeded(2))));
}

#[test]
fn flatten_limits_apply_to_expansions() {
    let bytes = cat(&[&IVM_1_1, &[0xEF, 0x01, 0x02, 0x09, 0x61, 0x01, 0x61, 0x02]]);
    let options = ReaderOptions::new().flatten_limits(FlattenLimits::new().max_instructions(1));
    let mut reader = StreamReader::with_options(&bytes, options);

    let err = reader.next_token().unwrap_err();

    assert!(matches!(err, Error::Macro(MacroError::LimitExceeded(1))));
}

#[test]
fn annotations_reach_the_application() {
    let bytes = cat(&[&IVM_1_1, &annotated("tag", int(1))]);
    let mut reader = StreamReader::new(&bytes);

    assert_eq!(reader.next_token().unwrap(), TokenKind::Annotations);
    let mut annotations = Vec::new();
    reader.read_annotations(&mut annotations).unwrap();
    assert_eq!(annotations[0].text(), Some("tag"));
    assert_eq!(reader.next_token().unwrap(), TokenKind::Int);
    assert_eq!(reader.annotations().len(), 1);
    assert_eq!(reader.read_i64().unwrap(), 1);
}

#[test]
fn skipping_an_annotated_value() {
    let bytes = cat(&[&IVM_1_1, &annotated("tag", list(&[int(1)])), &int(2)]);
    let mut reader = StreamReader::new(&bytes);

    assert_eq!(reader.next_token().unwrap(), TokenKind::Annotations);
    reader.skip().unwrap();
    assert_eq!(reader.next_token().unwrap(), TokenKind::Int);
    assert_eq!(reader.read_i64().unwrap(), 2);
}

#[test]
fn struct_fields_through_cursor() {
    let bytes = cat(&[&IVM_1_1, &fields(&[("k", int(4))])]);
    let mut reader = StreamReader::new(&bytes);

    reader.next_token().unwrap();
    let mut entries = reader.take_struct().unwrap();
    assert_eq!(entries.next_token().unwrap(), TokenKind::FieldName);
    assert_eq!(entries.field_name_sid().unwrap(), None);
    assert_eq!(entries.read_field_name().unwrap().text(), Some("k"));
    assert_eq!(entries.next_token().unwrap(), TokenKind::Int);
    assert_eq!(entries.next_token().unwrap(), TokenKind::End);
    assert!(reader.field_name_sid().is_err());
}
