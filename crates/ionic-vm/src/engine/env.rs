//! Argument environments for nested macro invocations.
//!
//! Each frame owns the pre-flattened arguments of one invocation and links to
//! the frame of its caller. Frames are strictly nested, so popping always
//! removes the newest frame; its buffers are kept for the next push.

use ionic_core::{MacroError, Result};

/// Arguments of one invocation.
#[derive(Debug, Default)]
pub struct EnvFrame {
    /// Flattened argument instructions, one parameter after another.
    args: Vec<u32>,
    /// `bounds[i]..bounds[i + 1]` is parameter `i` within `args`.
    bounds: Vec<usize>,
    /// Index of the calling frame.
    parent: Option<u32>,
}

impl EnvFrame {
    pub fn parent(&self) -> Option<u32> {
        self.parent
    }

    pub fn param_count(&self) -> usize {
        self.bounds.len().saturating_sub(1)
    }

    pub fn argument(&self, index: usize) -> Option<&[u32]> {
        let start = *self.bounds.get(index)?;
        let end = *self.bounds.get(index + 1)?;
        Some(&self.args[start..end])
    }
}

/// Stack of argument frames with recycled buffers.
#[derive(Debug, Default)]
pub struct EnvArena {
    frames: Vec<EnvFrame>,
    current: Option<u32>,
    spare: Vec<(Vec<u32>, Vec<usize>)>,
}

impl EnvArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty buffers for building the next frame.
    pub fn take_buffers(&mut self) -> (Vec<u32>, Vec<usize>) {
        self.spare.pop().unwrap_or_default()
    }

    /// Return buffers that did not become a frame.
    pub fn recycle(&mut self, mut args: Vec<u32>, mut bounds: Vec<usize>) {
        args.clear();
        bounds.clear();
        self.spare.push((args, bounds));
    }

    /// Buffer pairs waiting for the next frame.
    pub fn spare_count(&self) -> usize {
        self.spare.len()
    }

    /// Push a frame whose parameters are delimited by `bounds`.
    pub fn push(&mut self, args: Vec<u32>, bounds: Vec<usize>) -> u32 {
        debug_assert_eq!(bounds.last().copied().unwrap_or(0), args.len());
        let idx = self.frames.len() as u32;
        self.frames.push(EnvFrame {
            args,
            bounds,
            parent: self.current,
        });
        self.current = Some(idx);
        idx
    }

    /// Pop the current frame.
    ///
    /// Panics if the stack is empty.
    pub fn pop(&mut self) {
        let current_idx = self.current.expect("pop on empty environment");
        debug_assert_eq!(current_idx as usize, self.frames.len() - 1);
        let Some(frame) = self.frames.pop() else {
            unreachable!("current frame index without a frame")
        };
        self.current = frame.parent;
        self.recycle(frame.args, frame.bounds);
    }

    /// Drop every frame, keeping their buffers.
    pub fn clear(&mut self) {
        while self.current.is_some() {
            self.pop();
        }
    }

    #[inline]
    pub fn current(&self) -> Option<&EnvFrame> {
        self.current.map(|i| &self.frames[i as usize])
    }

    /// Number of frames on the chain from the current frame to the root.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut idx = self.current;
        while let Some(i) = idx {
            depth += 1;
            idx = self.frames[i as usize].parent;
        }
        depth
    }

    /// Flattened argument for parameter `index` of the current frame.
    pub fn argument(&self, index: usize) -> Result<&[u32]> {
        self.current()
            .and_then(|frame| frame.argument(index))
            .ok_or_else(|| MacroError::UnresolvedParameter(index).into())
    }
}
