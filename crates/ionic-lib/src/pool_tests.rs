use ionic_core::{TokenKind, ValueReader};

use crate::StreamReader;
use crate::pool::{CursorKind, CursorState, ResourcePool};
use crate::test_utils::{IVM_1_1, cat, int, list};

#[test]
fn released_state_is_reused() {
    let mut pool = ResourcePool::new();

    let mut state = pool.acquire(CursorKind::List);
    state.program_code.extend([1, 2, 3]);
    pool.release(CursorKind::List, state);
    assert_eq!(pool.idle(CursorKind::List), 1);

    let state = pool.acquire(CursorKind::List);
    assert!(state.program_code.is_empty());
    assert!(state.program_code.capacity() >= 3);
    assert_eq!(pool.allocations(), 1);
}

#[test]
fn kinds_have_separate_free_lists() {
    let mut pool = ResourcePool::new();

    pool.release(CursorKind::Struct, CursorState::default());
    let _ = pool.acquire(CursorKind::Sexp);

    assert_eq!(pool.idle(CursorKind::Struct), 1);
    assert_eq!(pool.allocations(), 1);
}

#[test]
fn annotation_buffers_come_back_empty() {
    let mut pool = ResourcePool::new();

    let mut buffer = pool.acquire_annotations();
    buffer.push(ionic_core::SymbolToken::with_text("a"));
    pool.release_annotations(buffer);

    assert!(pool.acquire_annotations().is_empty());
    assert_eq!(pool.allocations(), 1);
}

#[test]
fn reading_similar_values_reaches_steady_state() {
    let value = list(&[int(1), list(&[int(2)])]);
    let bytes = cat(&[&IVM_1_1, &value, &value, &value, &value]);
    let mut reader = StreamReader::new(&bytes);

    fn read_one(reader: &mut StreamReader<'_>) {
        assert_eq!(reader.next_token().unwrap(), TokenKind::List);
        let mut outer = reader.take_list().unwrap();
        outer.next_token().unwrap();
        outer.next_token().unwrap();
        let mut inner = outer.take_list().unwrap();
        assert_eq!(inner.next_token().unwrap(), TokenKind::Int);
        inner.close();
        outer.close();
    }

    read_one(&mut reader);
    let after_first = reader.pool_allocations();
    read_one(&mut reader);
    read_one(&mut reader);
    read_one(&mut reader);

    assert_eq!(reader.pool_allocations(), after_first);
}

#[test]
fn dropped_cursors_return_their_state() {
    let bytes = cat(&[&IVM_1_1, &list(&[int(1)])]);
    let mut reader = StreamReader::new(&bytes);
    let session = std::rc::Rc::clone(reader.session());

    reader.next_token().unwrap();
    let mut child = reader.take_list().unwrap();
    assert_eq!(session.borrow().pool.idle(CursorKind::List), 0);

    // The child may outlive the reader it was taken from.
    drop(reader);
    assert_eq!(session.borrow().pool.idle(CursorKind::TopLevel), 1);
    assert_eq!(child.next_token().unwrap(), TokenKind::Int);
    drop(child);
    assert_eq!(session.borrow().pool.idle(CursorKind::List), 1);
}
