use ionic_core::{Error, MacroError};

use super::env::EnvArena;

fn frame(arena: &mut EnvArena, params: &[&[u32]]) -> u32 {
    let (mut args, mut bounds) = arena.take_buffers();
    bounds.push(0);
    for p in params {
        args.extend_from_slice(p);
        bounds.push(args.len());
    }
    arena.push(args, bounds)
}

#[test]
fn push_and_pop_nest() {
    let mut arena = EnvArena::new();
    assert_eq!(arena.depth(), 0);
    assert!(arena.current().is_none());

    let outer = frame(&mut arena, &[&[1, 2], &[]]);
    let inner = frame(&mut arena, &[&[3]]);
    assert_eq!(arena.depth(), 2);

    let current = arena.current().unwrap();
    assert_eq!(current.parent(), Some(outer));
    assert_eq!(current.param_count(), 1);
    assert_eq!(arena.argument(0).unwrap(), &[3]);
    assert_ne!(inner, outer);

    arena.pop();
    assert_eq!(arena.depth(), 1);
    assert_eq!(arena.argument(0).unwrap(), &[1, 2]);
    assert_eq!(arena.argument(1).unwrap(), &[] as &[u32]);
}

#[test]
fn missing_argument() {
    let mut arena = EnvArena::new();
    assert_eq!(
        arena.argument(0).unwrap_err(),
        Error::from(MacroError::UnresolvedParameter(0))
    );

    frame(&mut arena, &[&[7]]);
    assert_eq!(
        arena.argument(1).unwrap_err(),
        Error::from(MacroError::UnresolvedParameter(1))
    );
}

#[test]
fn popped_buffers_are_reused() {
    let mut arena = EnvArena::new();
    frame(&mut arena, &[&[1, 2, 3, 4]]);
    arena.pop();

    let (args, bounds) = arena.take_buffers();
    assert!(args.is_empty());
    assert!(bounds.is_empty());
    assert!(args.capacity() >= 4);
}

#[test]
fn clear_drops_every_frame() {
    let mut arena = EnvArena::new();
    frame(&mut arena, &[&[1]]);
    frame(&mut arena, &[&[2]]);
    arena.clear();

    assert_eq!(arena.depth(), 0);
    assert!(arena.current().is_none());
}

#[test]
#[should_panic(expected = "pop on empty environment")]
fn pop_on_empty_panics() {
    EnvArena::new().pop();
}
