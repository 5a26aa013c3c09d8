//! Synchronous wrapper that blocks a thread for the lifetime of a stream.

use crate::device::{Device, StopHandle};
use crate::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitState {
    Idle,
    Waiting,
    Released,
}

struct Waiter {
    state: Mutex<WaitState>,
    cond: Condvar,
}

impl Waiter {
    fn release(&self) {
        let mut state = self.state.lock();
        if *state == WaitState::Waiting {
            *state = WaitState::Released;
            self.cond.notify_all();
        }
    }
}

/// Borrows a [`Device`] and blocks in [`start_and_wait`](Self::start_and_wait)
/// until [`stop`](Self::stop) is called from another thread.
///
/// ```no_run
/// use melodify_io::{BlockingDevice, Callback, Device};
///
/// let mut device = Device::new();
/// device.setup(2, 48000, 0)?;
/// device.set_callback(Callback::output(|mut out| out.fill(0.0)))?;
///
/// let blocking = BlockingDevice::new(&mut device);
/// std::thread::scope(|s| {
///     s.spawn(|| {
///         std::thread::sleep(std::time::Duration::from_secs(1));
///         blocking.stop();
///     });
///     blocking.start_and_wait()
/// })?;
/// # Ok::<(), melodify_io::Error>(())
/// ```
pub struct BlockingDevice<'d> {
    device: Mutex<&'d mut Device>,
    waiter: Arc<Waiter>,
}

impl<'d> BlockingDevice<'d> {
    pub fn new(device: &'d mut Device) -> Self {
        Self {
            device: Mutex::new(device),
            waiter: Arc::new(Waiter {
                state: Mutex::new(WaitState::Idle),
                cond: Condvar::new(),
            }),
        }
    }

    /// The wrapped device, for setup before waiting.
    pub fn device(&mut self) -> &mut Device {
        self.device.get_mut()
    }

    /// Start the device and block until [`stop`](Self::stop) (or a
    /// [`BlockingStopHandle`]) releases the wait. The device is stopped when
    /// this returns.
    pub fn start_and_wait(&self) -> Result<()> {
        {
            let mut state = self.waiter.state.lock();
            if *state == WaitState::Waiting {
                return Err(Error::InvalidState("another thread is already waiting"));
            }
            *state = WaitState::Waiting;
        }

        if let Err(e) = self.device.lock().start() {
            *self.waiter.state.lock() = WaitState::Idle;
            return Err(e);
        }
        debug!("Blocking until stop");

        let mut state = self.waiter.state.lock();
        while *state == WaitState::Waiting {
            self.waiter.cond.wait(&mut state);
        }
        *state = WaitState::Idle;
        drop(state);

        self.device.lock().stop();
        debug!("Wait released");
        Ok(())
    }

    /// Stop the device and release a waiting thread, if any.
    pub fn stop(&self) {
        self.device.lock().stop();
        self.waiter.release();
    }

    /// Handle that ends the wait from any thread, including the render
    /// callback. It gates further callbacks without waiting; the blocked
    /// thread performs the full stop.
    pub fn stop_handle(&self) -> BlockingStopHandle {
        BlockingStopHandle {
            device: self.device.lock().stop_handle(),
            waiter: Arc::clone(&self.waiter),
        }
    }
}

#[derive(Clone)]
pub struct BlockingStopHandle {
    device: StopHandle,
    waiter: Arc<Waiter>,
}

impl BlockingStopHandle {
    pub fn stop(&self) {
        self.device.stop();
        self.waiter.release();
    }
}
