//! Frame-pointer chain walker.
//!
//! A frame record is the two-word pair the calling convention leaves at the
//! frame-pointer address: the caller's record address and the return address
//! into the caller. Following `up` links yields the call chain. But the
//! chain is plain stack memory and nothing guarantees it is intact, so every
//! address is held against the stack extent *before* it is read, and a link
//! that fails to move strictly toward the stack base ends the walk. Strictly
//! increasing addresses inside a bounded region also bound the walk itself:
//! it cannot take more steps than the extent has bytes.
//!
//! Termination is a state, not an error. A walk that runs off a broken,
//! foreign, or frame-pointer-omitted chain quietly becomes [`FrameIter::end`]
//! and stays there.


use core::iter::FusedIterator;

use crate::extent::StackExtent;
use crate::Addr;

/// One frame record, as written by `push rbp; mov rsp, rbp` (or the aarch64
/// equivalent): link to the caller's record, then the return address.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameRecord {
    pub(crate) up: *const FrameRecord,
    pub(crate) ret: *const (),
}

/// The sole raw stack read in the crate.
///
/// # Safety
/// `fp` must point at a live frame record. In practice: it passed
/// [`StackExtent::contains`] for the stack it belongs to, or it is the
/// calling function's own record.
pub(crate) unsafe fn read_record(fp: Addr) -> FrameRecord {
    fp.ptr().cast::<FrameRecord>().read()
}

/// One visited position of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Frame-record address.
    pub fp: Addr,
    /// Return address associated with this position. Lags one record behind
    /// `fp`: it is the address the walk *entered* this frame through, which
    /// is what lets the first position carry the capture's own return
    /// address without any dereference.
    pub ip: Addr,
}

/// Iterator over the frame chain, from a seeded starting pair toward the
/// outermost caller.
///
/// Live while `fp` is non-null; the end state is canonical (null/null) and
/// sticky. Dereferencing via [`current`](FrameIter::current) is safe in every
/// state.
#[derive(Debug, Clone)]
pub struct FrameIter {
    fp: Addr,
    ip: Addr,
    extent: StackExtent,
}

impl FrameIter {
    /// Seed a live iterator from a trusted pair. No validity check here: the
    /// pair comes from a capture (or from a caller who vouched for it), not
    /// from following a link. A null seed is already the end.
    pub(crate) fn new(fp: Addr, ip: Addr, extent: StackExtent) -> FrameIter {
        if fp.is_null() {
            return FrameIter::end();
        }
        FrameIter { fp, ip, extent }
    }

    /// The canonical terminal iterator. Every exhausted or broken walk
    /// compares equal to this.
    pub fn end() -> FrameIter {
        FrameIter {
            fp: Addr::NULL,
            ip: Addr::NULL,
            extent: StackExtent::new(0, 0),
        }
    }

    pub fn is_end(&self) -> bool {
        self.fp.is_null()
    }

    /// Current position, by value. At the end this is the null/null
    /// sentinel, so generic draining code needs no special case.
    pub fn current(&self) -> Frame {
        Frame {
            fp: self.fp,
            ip: self.ip,
        }
    }

    fn finish(&mut self) {
        self.fp = Addr::NULL;
        self.ip = Addr::NULL;
    }

    /// Step to the parent frame, or to the end state if the chain stops
    /// making sense.
    pub fn advance(&mut self) {
        if self.fp.is_null() {
            // Keeps the operation total; a live iterator never has a null fp.
            self.ip = Addr::NULL;
            return;
        }

        if !self.extent.contains(self.fp) {
            trace!("frame {:p} outside stack extent, ending walk", self.fp);
            self.finish();
            return;
        }

        // SAFETY: `fp` was bounds-checked just above.
        let record = unsafe { read_record(self.fp) };
        let up = Addr::from_ptr(record.up);

        if !self.extent.contains(up) {
            trace!(
                "parent link {:p} of frame {:p} outside stack extent, ending walk",
                up,
                self.fp
            );
            self.finish();
            return;
        }

        // A parent that is not strictly further up the stack means the chain
        // cycled or was rewritten under us.
        if up <= self.fp {
            trace!(
                "parent link {:p} of frame {:p} does not progress, ending walk",
                up,
                self.fp
            );
            self.finish();
            return;
        }

        self.ip = Addr::from_ptr(record.ret);
        self.fp = up;
    }

    /// `k` single steps. Sticks at the end: stepping past it is a no-op.
    pub fn advance_by(&mut self, k: usize) {
        for _ in 0..k {
            if self.is_end() {
                break;
            }
            self.advance();
        }
    }
}

impl PartialEq for FrameIter {
    fn eq(&self, other: &FrameIter) -> bool {
        // Position only. The extent is walk configuration, not walk state;
        // terminal iterators compare equal however they got there.
        self.fp == other.fp && self.ip == other.ip
    }
}

impl Eq for FrameIter {}

impl Iterator for FrameIter {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.is_end() {
            return None;
        }
        let frame = self.current();
        self.advance();
        Some(frame)
    }
}

impl FusedIterator for FrameIter {}

/// Instruction-pointer-only view of a walk, for consumers that want a
/// printable stream of return addresses and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpIter(FrameIter);

impl IpIter {
    pub(crate) fn new(frames: FrameIter) -> IpIter {
        IpIter(frames)
    }

    pub fn end() -> IpIter {
        IpIter(FrameIter::end())
    }

    pub fn is_end(&self) -> bool {
        self.0.is_end()
    }

    /// Current return address; null at the end.
    pub fn current(&self) -> Addr {
        self.0.current().ip
    }
}

impl Iterator for IpIter {
    type Item = Addr;

    fn next(&mut self) -> Option<Addr> {
        self.0.next().map(|frame| frame.ip)
    }
}

impl FusedIterator for IpIter {}
