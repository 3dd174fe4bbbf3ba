//! Where the stack is allowed to be.
//!
//! Frame-pointer chains are not self-describing; the only external fact we
//! can hold a candidate frame address against is the extent of the stack
//! itself: a top (high) address and a maximum size. For the initial thread
//! both come from the OS, once per process: glibc exports the top as
//! `__libc_stack_end` and the size is `RLIMIT_STACK`.

use std::sync::OnceLock;

use crate::Addr;

extern "C" {
    /// High end of the initial thread's stack, set up by glibc at startup.
    static __libc_stack_end: *const core::ffi::c_void;
}

/// The region frame records may legitimately live in: `[top - limit, top]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackExtent {
    top: usize,
    limit: usize,
}

impl StackExtent {
    /// An extent supplied by the caller, for threads whose stack the
    /// process-wide query does not describe (e.g. obtained via
    /// `pthread_getattr_np`).
    pub fn new(top: usize, limit: usize) -> StackExtent {
        // Clamped so the signed offset arithmetic in `contains` cannot
        // overflow.
        StackExtent {
            top,
            limit: limit.min(isize::MAX as usize),
        }
    }

    /// The initial thread's extent. Queried from the OS on first use,
    /// constant afterwards.
    ///
    /// Aborts the process if the OS cannot report the stack limit: every
    /// bounds check downstream depends on it, so there is no degraded mode.
    pub fn current() -> StackExtent {
        static EXTENT: OnceLock<StackExtent> = OnceLock::new();
        *EXTENT.get_or_init(StackExtent::query)
    }

    #[instrument(level = "trace")]
    fn query() -> StackExtent {
        let mut rl = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: `rl` outlives the call and is the type getrlimit expects.
        let ret = unsafe { libc::getrlimit(libc::RLIMIT_STACK, &mut rl) };
        if ret != 0 {
            error!(
                "getrlimit(RLIMIT_STACK) failed: {}",
                std::io::Error::last_os_error()
            );
            std::process::abort();
        }

        // RLIM_INFINITY would overflow the signed offset arithmetic in
        // `contains`; an isize::MAX limit bounds nothing less in practice.
        let limit = rl.rlim_cur.min(isize::MAX as libc::rlim_t) as usize;

        // SAFETY: glibc initializes this before main.
        let top = unsafe { __libc_stack_end } as usize;

        trace!("stack extent: top={top:#x} limit={limit:#x}");
        StackExtent { top, limit }
    }

    pub fn top(&self) -> usize {
        self.top
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether `addr` plausibly lies within the walkable stack region.
    ///
    /// Pure arithmetic on the address value; `addr` may be arbitrary
    /// garbage and must still never be dereferenced here. The stack grows
    /// down, so a live frame sits at or below `top` and no further away
    /// than `limit`.
    pub fn contains(&self, addr: Addr) -> bool {
        let offset = addr.addr().wrapping_sub(self.top) as isize;
        offset <= 0 && offset >= -(self.limit as isize)
    }
}
