//! In-process driver, frames are pushed through [`MemoryFeed`] handles.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use crate::{
    sensor::{ColorFrame, DepthFrame, FrameDescription, FrameReader, FrameSource, Sensor},
    Error,
};

enum Entry<T> {
    Frame(T),
    Failure(String),
}

/// Producer side of a memory stream.
pub struct MemoryFeed<T> {
    queue: Arc<Mutex<VecDeque<Entry<T>>>>,
    open: Arc<AtomicBool>,
}

impl<T> Clone for MemoryFeed<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            open: self.open.clone(),
        }
    }
}

impl<T> MemoryFeed<T> {
    fn new(open: Arc<AtomicBool>) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            open,
        }
    }

    pub fn push_frame(&self, frame: T) {
        self.lock().push_back(Entry::Frame(frame));
    }

    /// The next acquisition reaching this entry fails with `message`.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.lock().push_back(Entry::Failure(message.into()));
    }

    /// Entries not yet consumed by a reader.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Whether the sensor feeding this stream is open.
    pub fn is_streaming(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Entry<T>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Older frames are dropped, a failure ends the drain.
    fn take_latest(&self) -> Result<Option<T>, Error> {
        let mut queue = self.lock();
        let mut latest = None;

        while let Some(entry) = queue.pop_front() {
            match entry {
                Entry::Frame(frame) => latest = Some(frame),
                Entry::Failure(message) => return Err(Error::Driver(message)),
            }
        }

        Ok(latest)
    }
}

pub struct MemoryReader<T> {
    feed: MemoryFeed<T>,
}

impl<T> FrameReader for MemoryReader<T> {
    type Frame = T;

    fn acquire_latest_frame(&mut self) -> Result<Option<T>, Error> {
        if !self.feed.is_streaming() {
            return Err(Error::SensorClosed);
        }

        self.feed.take_latest()
    }
}

pub struct MemorySource<T> {
    feed: MemoryFeed<T>,
    description: FrameDescription,
    reader_failure: Option<String>,
}

impl<T> FrameSource for MemorySource<T> {
    type Frame = T;
    type Reader = MemoryReader<T>;

    fn frame_description(&self) -> FrameDescription {
        self.description
    }

    fn open_reader(&mut self) -> Result<MemoryReader<T>, Error> {
        if let Some(message) = &self.reader_failure {
            return Err(Error::Driver(message.clone()));
        }

        Ok(MemoryReader {
            feed: self.feed.clone(),
        })
    }
}

pub struct MemorySensor {
    open: Arc<AtomicBool>,
    color: MemoryFeed<ColorFrame>,
    depth: MemoryFeed<DepthFrame>,
    color_description: FrameDescription,
    depth_description: FrameDescription,
    open_failure: Option<String>,
    reader_failure: Option<String>,
}

impl MemorySensor {
    pub fn new(color_description: FrameDescription, depth_description: FrameDescription) -> Self {
        let open = Arc::new(AtomicBool::new(false));

        Self {
            color: MemoryFeed::new(open.clone()),
            depth: MemoryFeed::new(open.clone()),
            open,
            color_description,
            depth_description,
            open_failure: None,
            reader_failure: None,
        }
    }

    /// Opening the sensor fails with `message`.
    pub fn with_open_failure(mut self, message: impl Into<String>) -> Self {
        self.open_failure = Some(message.into());
        self
    }

    /// Opening any reader fails with `message`.
    pub fn with_reader_failure(mut self, message: impl Into<String>) -> Self {
        self.reader_failure = Some(message.into());
        self
    }

    pub fn color_feed(&self) -> MemoryFeed<ColorFrame> {
        self.color.clone()
    }

    pub fn depth_feed(&self) -> MemoryFeed<DepthFrame> {
        self.depth.clone()
    }
}

impl Sensor for MemorySensor {
    type ColorSource = MemorySource<ColorFrame>;
    type DepthSource = MemorySource<DepthFrame>;

    fn open(&mut self) -> Result<(), Error> {
        if let Some(message) = &self.open_failure {
            return Err(Error::Driver(message.clone()));
        }

        self.open.store(true, Ordering::Release);

        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn close(&mut self) -> Result<(), Error> {
        self.open.store(false, Ordering::Release);

        Ok(())
    }

    fn color_frame_source(&mut self) -> Result<MemorySource<ColorFrame>, Error> {
        if !self.is_open() {
            return Err(Error::SensorClosed);
        }

        Ok(MemorySource {
            feed: self.color.clone(),
            description: self.color_description,
            reader_failure: self.reader_failure.clone(),
        })
    }

    fn depth_frame_source(&mut self) -> Result<MemorySource<DepthFrame>, Error> {
        if !self.is_open() {
            return Err(Error::SensorClosed);
        }

        Ok(MemorySource {
            feed: self.depth.clone(),
            description: self.depth_description,
            reader_failure: self.reader_failure.clone(),
        })
    }
}

impl Drop for MemorySensor {
    fn drop(&mut self) {
        self.open.store(false, Ordering::Release);
    }
}
