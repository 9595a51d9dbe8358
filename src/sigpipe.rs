//! Scoped SIGPIPE masking around transport I/O.
//!
//! Writing to a socket after the peer has reset the connection can raise SIGPIPE on
//! platforms that deliver it, whose default disposition terminates the process. This
//! module blocks SIGPIPE for the calling thread around a single read/write, restoring
//! the thread's prior signal mask on the way out so it never leaks process-wide.

#[cfg(unix)]
pub fn with_sigpipe_blocked<F, T>(f: F) -> T
where
    F: FnOnce() -> T,
{
    let _guard = Guard::block();
    f()
}

#[cfg(not(unix))]
pub fn with_sigpipe_blocked<F, T>(f: F) -> T
where
    F: FnOnce() -> T,
{
    f()
}

#[cfg(unix)]
struct Guard {
    prior: libc::sigset_t,
}

#[cfg(unix)]
impl Guard {
    fn block() -> Self {
        unsafe {
            // The placeholder that will receive the prior mask must be zero-initialized
            // before pthread_sigmask writes into it, or restoring it on drop could
            // install whatever garbage happened to be on the stack.
            let mut prior: libc::sigset_t = std::mem::zeroed();
            let mut to_block: libc::sigset_t = std::mem::zeroed();
            libc::sigemptyset(&mut to_block);
            libc::sigaddset(&mut to_block, libc::SIGPIPE);
            libc::pthread_sigmask(libc::SIG_BLOCK, &to_block, &mut prior);
            Self { prior }
        }
    }
}

#[cfg(unix)]
impl Drop for Guard {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_sigmask(libc::SIG_SETMASK, &self.prior, std::ptr::null_mut());
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn restores_mask_after_scope() {
        let before = sigpipe_blocked();
        with_sigpipe_blocked(|| {
            // SIGPIPE must be blocked while inside the guarded scope.
            assert!(sigpipe_blocked());
        });
        assert_eq!(before, sigpipe_blocked());
    }

    fn sigpipe_blocked() -> bool {
        unsafe {
            let mut set: libc::sigset_t = std::mem::zeroed();
            let mut empty: libc::sigset_t = std::mem::zeroed();
            libc::sigemptyset(&mut empty);
            libc::pthread_sigmask(libc::SIG_BLOCK, &empty, &mut set);
            libc::sigismember(&set, libc::SIGPIPE) == 1
        }
    }
}
