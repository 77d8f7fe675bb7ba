use indoc::indoc;
use ionic_core::{TokenKind, UsageError, ValueReader};

use crate::StreamReader;
use crate::pool::CursorKind;
use crate::test_utils::{IVM_1_1, annotated, cat, fields, int, list};

/// One line per top-level token, with integer values and annotation text.
fn transcript(bytes: &[u8]) -> String {
    let mut reader = StreamReader::new(bytes);
    let mut out = String::new();
    loop {
        let token = reader.next_token().unwrap();
        let line = match token {
            TokenKind::Int => format!("{token} {}", reader.read_i64().unwrap()),
            TokenKind::Annotations => {
                let mut annotations = Vec::new();
                reader.read_annotations(&mut annotations).unwrap();
                let names: Vec<String> = annotations.iter().map(ToString::to_string).collect();
                format!("{token} {}", names.join(" "))
            }
            _ => token.to_string(),
        };
        out.push_str(&line);
        out.push('\n');
        if token == TokenKind::End {
            return out;
        }
    }
}

#[test]
fn top_level_transcript() {
    let bytes = cat(&[
        &IVM_1_1,
        &annotated("tag", int(1)),
        &fields(&[("a", int(2))]),
        // (:values (:: 3 4))
        &[0xEF, 0x01, 0x02, 0x09, 0x61, 0x03, 0x61, 0x04],
    ]);

    assert_eq!(
        transcript(&bytes),
        indoc! {"
            annotations tag
            int 1
            struct
            int 3
            int 4
            end
        "}
    );
}

#[test]
fn expanded_values_are_marked() {
    let bytes = cat(&[&IVM_1_1, &[0xEF, 0x01, 0x01, 0x61, 0x01], &int(2)]);
    let mut reader = StreamReader::new(&bytes);

    reader.next_token().unwrap();
    assert!(reader.is_expanded());
    reader.next_token().unwrap();
    assert!(!reader.is_expanded());
}

#[test]
fn containers_from_expansions() {
    // (:values [1, {k: 2}])
    let argument = list(&[int(1), fields(&[("k", int(2))])]);
    let bytes = cat(&[&IVM_1_1, &[0xEF, 0x01, 0x01], &argument]);
    let mut reader = StreamReader::new(&bytes);

    assert_eq!(reader.next_token().unwrap(), TokenKind::List);
    let mut items = reader.take_list().unwrap();
    assert_eq!(items.kind(), CursorKind::List);
    assert_eq!(items.depth(), 1);
    assert_eq!(items.next_token().unwrap(), TokenKind::Int);
    assert_eq!(items.next_token().unwrap(), TokenKind::Struct);
    let mut entries = items.take_struct().unwrap();
    assert!(entries.in_struct());
    assert_eq!(entries.next_token().unwrap(), TokenKind::FieldName);
    assert_eq!(entries.field_name().and_then(|f| f.text()), Some("k"));
    assert_eq!(entries.next_token().unwrap(), TokenKind::Int);
    assert_eq!(entries.read_i64().unwrap(), 2);
    assert_eq!(entries.next_token().unwrap(), TokenKind::End);
    assert_eq!(items.next_token().unwrap(), TokenKind::End);
    assert_eq!(reader.next_token().unwrap(), TokenKind::End);
}

#[test]
fn accessor_on_field_name_fails() {
    let bytes = cat(&[&IVM_1_1, &fields(&[("k", int(2))])]);
    let mut reader = StreamReader::new(&bytes);

    reader.next_token().unwrap();
    let mut entries = reader.take_struct().unwrap();
    entries.next_token().unwrap();
    let err = entries.read_int().unwrap_err();

    assert!(matches!(
        err,
        ionic_core::Error::Usage(UsageError::WrongToken {
            expected: TokenKind::Int,
            found: TokenKind::FieldName,
        })
    ));
}

#[test]
fn reading_past_end_fails() {
    let bytes = IVM_1_1;
    let mut reader = StreamReader::new(&bytes);

    assert_eq!(reader.next_token().unwrap(), TokenKind::End);
    let err = reader.next_token().unwrap_err();

    assert!(matches!(err, ionic_core::Error::Usage(UsageError::PastEnd)));
}

#[test]
fn unread_child_does_not_disturb_parent() {
    let bytes = cat(&[&IVM_1_1, &list(&[int(1), int(2)]), &int(3)]);
    let mut reader = StreamReader::new(&bytes);

    reader.next_token().unwrap();
    let _items = reader.take_list().unwrap();
    assert_eq!(reader.next_token().unwrap(), TokenKind::Int);
    assert_eq!(reader.read_i64().unwrap(), 3);
}
