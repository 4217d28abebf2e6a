mod closed;
mod opened;

pub use closed::Closed;
pub use opened::{FrameStatus, Opened};

use crate::sensor::Sensor;

/// Kinect agent, `Closed` until its sensor has been opened.
pub struct Device<T> {
    inner: T,
}

impl<S: Sensor> Device<Closed<S>> {
    pub fn new(sensor: S) -> Self {
        Device {
            inner: Closed { sensor },
        }
    }
}
