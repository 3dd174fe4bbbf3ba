//! Walk the current thread's own call stack by chasing frame-pointer records.
//!
//! # how it works
//! Code compiled with frame pointers leaves a two-word record on the stack at
//! every call (`push rbp; mov rsp, rbp` on x86-64): the caller's record
//! address and the return address into the caller. Those records form a
//! linked chain through live stack memory, and this crate follows it, one
//! frame at a time, checking every address against the thread's known stack
//! extent *before* dereferencing it. A link that leaves the extent, or that
//! fails to move strictly toward the stack base, ends the walk instead of
//! faulting: a broken chain is a normal termination, not an error.
//!
//! There is no DWARF here, no unwind tables, no symbol resolution. The only
//! things consulted are the records the compiler already wrote and one OS
//! query for the stack limit. Build with `-Cforce-frame-pointers=yes` (the
//! workspace `.cargo/config.toml` does) or the chain will not be there to
//! follow.
//!
//! Capture is scoped: [`with_current`] hands a [`Stack`] to a closure by
//! reference and the borrow cannot leave it, so a handle can never outlive
//! the frames it points into.
//!
//! ```no_run
//! fpwalk::with_current(|stack| {
//!     println!("called from: {}", stack.ips());
//! });
//! ```

#[macro_use]
extern crate tracing;

use core::fmt;

mod arch;
pub mod extent;
mod stack;
mod walk;

pub use extent::StackExtent;
pub use stack::{with_current, Ips, Stack};
pub use walk::fp::{Frame, FrameIter, IpIter};

/// An address on (or claimed to be on) the stack. Never dereferenced by
/// itself; all the walk needs from it is identity, order, and a signed
/// distance to the stack top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Addr(*const ());

impl Addr {
    pub const NULL: Addr = Addr(core::ptr::null());

    pub fn addr(self) -> usize {
        self.0.addr()
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    pub(crate) fn ptr(self) -> *const () {
        self.0
    }

    pub(crate) fn from_ptr<T>(ptr: *const T) -> Addr {
        Addr(ptr.cast())
    }
}

impl fmt::Pointer for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.0, f)
    }
}

impl fmt::LowerHex for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.addr(), f)
    }
}
