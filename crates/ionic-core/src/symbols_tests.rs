use std::sync::Arc;

use crate::{DecodeError, Error, SymbolTable};

#[test]
fn reserved_zero_has_no_text() {
    let table = SymbolTable::new();
    assert_eq!(table.len(), 1);
    assert_eq!(table.text(0).unwrap(), None);
}

#[test]
fn system_tables() {
    let v10 = SymbolTable::system_1_0();
    assert_eq!(v10.len(), 10);
    assert_eq!(v10.text(3).unwrap().map(|t| &**t), Some("$ion_symbol_table"));

    let v11 = SymbolTable::system_1_1();
    assert_eq!(v11.len(), 66);
    assert_eq!(SymbolTable::system_text_1_1(21), Some(""));
    assert_eq!(SymbolTable::system_text_1_1(64), Some("none"));
    assert_eq!(SymbolTable::system_text_1_1(0), None);
}

#[test]
fn extending_keeps_old_ids() {
    let old = SymbolTable::from_texts(["a", "b"]);
    let new = old.extended([Some(Arc::from("c")), None]);

    assert_eq!(new.len(), old.len() + 2);
    for (sid, text) in old.iter() {
        assert_eq!(new.text(sid).unwrap().map(|t| &**t), text);
    }
    assert_eq!(new.text(3).unwrap().map(|t| &**t), Some("c"));
    assert_eq!(new.text(4).unwrap(), None);
    // The original is untouched.
    assert_eq!(old.len(), 3);
}

#[test]
fn out_of_range_sid() {
    let table = SymbolTable::from_texts(["a"]);
    assert_eq!(
        table.token(2).unwrap_err(),
        Error::Decode(DecodeError::SymbolOutOfRange { sid: 2, max: 1 })
    );
}

#[test]
fn token_display() {
    let table = SymbolTable::from_entries([None, Some(Arc::from("x"))]);
    assert_eq!(table.token(1).unwrap().to_string(), "$1");
    assert_eq!(table.token(2).unwrap().to_string(), "x");
    assert_eq!(table.sid_of("x"), Some(2));
}
