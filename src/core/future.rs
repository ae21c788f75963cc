use std::future::Future;
use std::marker::PhantomData;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use crate::core::frame::{Classify, Frame, Settlement, settle_all};
use crate::error::panic_message;
use crate::stack::{Context, Installed};

/// Error text of a future dropped before it settled.
pub const DROPPED_BEFORE_COMPLETION: &str = "dropped before completion";

/// Future returned by [`Tracked::call_async`](crate::Tracked::call_async) and
/// [`Tracked::try_call_async`](crate::Tracked::try_call_async).
///
/// Runs the wrapped future in its own branch of the async context, with its
/// invocation keys on top of the stack. Settles the invocation when the
/// wrapped future completes, panics, or is dropped unfinished.
#[must_use = "futures do nothing unless polled"]
pub struct TrackedFuture<Fut, S> {
    fut: Pin<Box<Fut>>,
    frames: Vec<Frame>,
    ctx: Context,
    entered: bool,
    _classify: PhantomData<fn() -> S>,
}

impl<Fut, S> TrackedFuture<Fut, S> {
    pub(crate) fn new(fut: Fut, frames: Vec<Frame>) -> Self {
        Self {
            fut: Box::pin(fut),
            frames,
            ctx: Context::current(),
            entered: false,
            _classify: PhantomData,
        }
    }

    /// `true` until the invocation has settled.
    pub fn is_pending(&self) -> bool {
        !self.frames.is_empty()
    }
}

impl<Fut, S> Future for TrackedFuture<Fut, S>
where
    Fut: Future,
    S: Classify<Fut::Output>,
{
    type Output = Fut::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let _installed = Installed::new(&mut this.ctx);
        if !this.entered {
            this.entered = true;
            for frame in &mut this.frames {
                frame.push();
            }
        }

        let fut = &mut this.fut;
        match panic::catch_unwind(AssertUnwindSafe(|| fut.as_mut().poll(cx))) {
            Ok(Poll::Pending) => Poll::Pending,
            Ok(Poll::Ready(output)) => {
                let frames = mem::take(&mut this.frames);
                settle_all(frames, &S::classify(&output), true);
                Poll::Ready(output)
            }
            Err(payload) => {
                let frames = mem::take(&mut this.frames);
                let settlement = Settlement::Errored(panic_message(payload.as_ref()));
                settle_all(frames, &settlement, true);
                panic::resume_unwind(payload)
            }
        }
    }
}

impl<Fut, S> Drop for TrackedFuture<Fut, S> {
    fn drop(&mut self) {
        if self.frames.is_empty() {
            return;
        }
        let frames = mem::take(&mut self.frames);
        let settlement = Settlement::Errored(DROPPED_BEFORE_COMPLETION.to_string());
        self.ctx.run(|| settle_all(frames, &settlement, true));
    }
}
