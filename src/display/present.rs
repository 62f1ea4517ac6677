// src/display/present.rs

//! The page-flip driver.
//!
//! Presentation is done through page flipping: a flip request is sent to
//! the kernel, which switches the scanned-out framebuffer in an interrupt
//! routine at the next vertical blank and reports completion back over
//! the DRM descriptor. The caller blocks until that completion event, so
//! at most one flip is ever in flight; double buffering is simple enough
//! that a deeper asynchronous queue is not worth its complexity here.
//!
//! Per call the session goes `Idle → FlipRequested → (FlipCompleted |
//! FlipAborted)`, and the wait always resolves before the call returns.
//!
//! Presentation failures are absorbed, not raised: a failed flip leaves
//! the previous frame on screen, which is strictly better for a running
//! media pipeline than tearing the whole session down.

use log::{debug, trace, warn};
use std::io;
use std::os::unix::io::AsFd;

use drm::control::{Device as ControlDevice, Event, PageFlipFlags};

use crate::display::device::Card;
use crate::display::session::DisplaySession;
use crate::os::poll::{wait_readable, PollOutcome};

/// How a flip attempt ended, and with it which buffer stays locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlipResolution {
    /// The hardware confirmed the flip; the new buffer is on screen.
    Completed,
    /// The flip never happened; the old buffer is still scanned out.
    Aborted,
}

impl DisplaySession {
    /// Presents the just-rendered frame and blocks until the hardware
    /// confirms the flip.
    ///
    /// Exactly one of two outcomes holds on return: the flip completed
    /// and the previously displayed buffer went back to the pool, or the
    /// flip never happened and the previously displayed buffer is still
    /// locked as the front buffer. Either way exactly one buffer remains
    /// locked.
    pub fn present_frame(&mut self) {
        let Some(render) = self.render.as_ref() else {
            debug!("present_frame called without a bound rendering context");
            return;
        };

        // Make the rendered content the allocation surface's front buffer.
        if let Err(err) = render.swap() {
            warn!("buffer swap failed: {}", err);
            return;
        }

        // Lock it for scanout; the buffer on screen stays locked too, so
        // the renderer always writes a buffer the display is not reading.
        let next = match unsafe { self.surface.lock_front_buffer() } {
            Ok(bo) => bo,
            Err(err) => {
                warn!("failed to lock front buffer: {}", err);
                return;
            }
        };

        let framebuffer = match self.framebuffers.handle_for(&self.card, &next) {
            Ok(handle) => handle,
            Err(err) => {
                warn!("framebuffer registration failed: {}", err);
                return;
            }
        };

        let resolution = match self
            .card
            .page_flip(self.crtc, framebuffer, PageFlipFlags::EVENT, None)
        {
            Ok(()) => {
                let card = &self.card;
                resolve_flip(|| wait_readable(card.as_fd()), || dispatch_flip_event(card))
            }
            Err(err) => {
                warn!("page flip submission failed: {}", err);
                FlipResolution::Aborted
            }
        };

        if resolution == FlipResolution::Aborted {
            warn!("page flip did not complete; keeping previous frame");
        }
        rotate_front(&mut self.front, next, resolution);
    }
}

/// Drains pending display events, reporting whether a flip completion
/// was among them.
fn dispatch_flip_event(card: &Card) -> io::Result<bool> {
    let events = card.receive_events()?;
    let mut completed = false;
    for event in events {
        if let Event::PageFlip(flip) = event {
            trace!(
                "page flip completed on {:?}: frame {} at {:?}",
                flip.crtc,
                flip.frame,
                flip.duration
            );
            completed = true;
        }
    }
    Ok(completed)
}

/// Blocks on the submitted flip until it resolves one way or the other.
///
/// `wait` parks the thread on the display descriptor; `dispatch` drains
/// its events and reports whether the completion arrived. Wakeups that
/// carry no completion loop back into the wait. Hangup, a wait failure,
/// or a dispatch error abort the flip.
fn resolve_flip(
    mut wait: impl FnMut() -> PollOutcome,
    mut dispatch: impl FnMut() -> io::Result<bool>,
) -> FlipResolution {
    loop {
        match wait() {
            PollOutcome::Readable => match dispatch() {
                Ok(true) => return FlipResolution::Completed,
                Ok(false) => {}
                Err(err) => {
                    warn!("failed to dispatch display events: {}", err);
                    return FlipResolution::Aborted;
                }
            },
            PollOutcome::Hangup => {
                warn!("display descriptor hangup while waiting for page flip");
                return FlipResolution::Aborted;
            }
            PollOutcome::Failed => return FlipResolution::Aborted,
        }
    }
}

/// Settles buffer ownership after the flip attempt.
///
/// A completed flip rotates: the new buffer becomes the locked front
/// buffer and the old one drops back to the allocation pool. An aborted
/// flip keeps the old buffer locked on screen and returns the new one to
/// the pool instead.
fn rotate_front<T>(front: &mut Option<T>, next: T, resolution: FlipResolution) {
    if resolution == FlipResolution::Completed {
        *front = Some(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    // Stand-in for a locked buffer object: counts live locks in the
    // shared pool and releases its lock on drop.
    struct Locked {
        id: u32,
        pool: Rc<Cell<u32>>,
    }

    impl Locked {
        fn acquire(pool: &Rc<Cell<u32>>, id: u32) -> Self {
            pool.set(pool.get() + 1);
            Self {
                id,
                pool: Rc::clone(pool),
            }
        }
    }

    impl Drop for Locked {
        fn drop(&mut self) {
            self.pool.set(self.pool.get() - 1);
        }
    }

    #[test]
    fn completed_flip_rotates_and_releases_the_old_buffer() {
        let pool = Rc::new(Cell::new(0));
        let mut front = Some(Locked::acquire(&pool, 1));

        rotate_front(&mut front, Locked::acquire(&pool, 2), FlipResolution::Completed);

        assert_eq!(front.as_ref().map(|b| b.id), Some(2));
        assert_eq!(pool.get(), 1);
    }

    #[test]
    fn aborted_flip_keeps_the_displayed_buffer_locked() {
        let pool = Rc::new(Cell::new(0));
        let mut front = Some(Locked::acquire(&pool, 1));

        // Covers both a rejected submission and an abandoned wait: the
        // freshly locked buffer goes straight back to the pool.
        rotate_front(&mut front, Locked::acquire(&pool, 2), FlipResolution::Aborted);

        assert_eq!(front.as_ref().map(|b| b.id), Some(1));
        assert_eq!(pool.get(), 1);
    }

    #[test]
    fn exactly_one_buffer_stays_locked_across_repeated_presents() {
        let pool = Rc::new(Cell::new(0));
        let mut front = Some(Locked::acquire(&pool, 0));

        for id in 1..=32 {
            let resolution = if id % 5 == 0 {
                FlipResolution::Aborted
            } else {
                FlipResolution::Completed
            };
            rotate_front(&mut front, Locked::acquire(&pool, id), resolution);
            assert_eq!(pool.get(), 1);
        }
    }

    #[test]
    fn flip_resolves_once_the_completion_event_arrives() {
        // First wakeup carries unrelated events, second one completes.
        let mut dispatches = 0;
        let resolution = resolve_flip(
            || PollOutcome::Readable,
            || {
                dispatches += 1;
                Ok(dispatches == 2)
            },
        );
        assert_eq!(resolution, FlipResolution::Completed);
        assert_eq!(dispatches, 2);
    }

    #[test]
    fn hangup_during_the_wait_aborts_the_flip() {
        let resolution = resolve_flip(
            || PollOutcome::Hangup,
            || unreachable!("hangup must not dispatch events"),
        );
        assert_eq!(resolution, FlipResolution::Aborted);
    }

    #[test]
    fn wait_failure_and_dispatch_error_abort_the_flip() {
        assert_eq!(
            resolve_flip(|| PollOutcome::Failed, || unreachable!()),
            FlipResolution::Aborted
        );
        assert_eq!(
            resolve_flip(
                || PollOutcome::Readable,
                || Err(io::Error::from_raw_os_error(libc::ENODEV)),
            ),
            FlipResolution::Aborted
        );
    }
}
