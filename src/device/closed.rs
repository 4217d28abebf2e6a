use std::fmt::{self, Debug};

use log::{error, info};

use crate::{sensor::Sensor, Config, Error};

use super::{Device, Opened};

pub struct Closed<S: Sensor> {
    pub(super) sensor: S,
}

impl<S: Sensor> Device<Closed<S>> {
    /// Open the sensor. Streams still have to be initialized one by one.
    pub fn open(mut self, config: Config) -> Result<Device<Opened<S>>, Error> {
        info!("Connecting to kinect");

        if let Err(error) = self.inner.sensor.open() {
            error!("Open sensor failed: {error}");
            return Err(error);
        }

        Ok(Device {
            inner: Opened::new(self.inner.sensor, config),
        })
    }

    pub fn sensor(&self) -> &S {
        &self.inner.sensor
    }

    pub fn into_sensor(self) -> S {
        self.inner.sensor
    }
}

impl<S: Sensor> Debug for Device<Closed<S>> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device<Closed>").finish_non_exhaustive()
    }
}
