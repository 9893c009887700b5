//! Client-side capture and processing threads.
//!
//! The capture thread owns the stream and fills the raw queue. The processing
//! thread owns the vision service and the tracker, and publishes one
//! [`ProcessedFrame`] per analysed frame. Queues and the shutdown flag live in
//! a [`PipelineContext`]; there is no other shared state.

use std::io::{Read, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::client::StreamClient;
use crate::config::{QueueConfig, TrackerConfig};
use crate::error::Result;
use crate::frame::{Frame, Mask};
use crate::shared_queue::{SharedQueue, Shutdown};
use crate::vision::{Detections, VisionService};
use crate::{Detection, MotionTracker, Track};

/// Anything that yields whole frames, one per call.
pub trait FrameReader: Send {
    fn read_frame(&mut self) -> Result<Frame>;
}

impl<S: Read + Write + Send> FrameReader for StreamClient<S> {
    #[inline]
    fn read_frame(&mut self) -> Result<Frame> {
        StreamClient::read_frame(self)
    }
}

#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub frame: Frame,
    pub mask: Mask,
    pub detections: Vec<Detection>,
    /// Tracks that survived this cycle.
    pub tracks: Arc<[Track]>,
}

#[derive(Clone)]
pub struct PipelineContext {
    pub raw: Arc<SharedQueue<Frame>>,
    pub processed: Arc<SharedQueue<ProcessedFrame>>,
    pub shutdown: Shutdown,
}

impl PipelineContext {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            raw: Arc::new(SharedQueue::new(config)),
            processed: Arc::new(SharedQueue::new(config)),
            shutdown: Shutdown::new(),
        }
    }
}

/// Reads frames into `ctx.raw` until shutdown or until the stream ends.
///
/// A closed stream or a fatal error triggers the shutdown for everyone.
/// Transient errors are skipped.
pub fn run_capture<R>(reader: &mut R, ctx: &PipelineContext, flip: bool) -> Result<()>
where
    R: FrameReader + ?Sized,
{
    while !ctx.shutdown.is_triggered() {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(err) if err.is_peer_closed() => {
                log::info!("stream ended, stopping pipeline");
                ctx.shutdown.trigger();
                return Ok(());
            }
            Err(err) if err.is_fatal() => {
                log::error!("capture failed: {}", err);
                ctx.shutdown.trigger();
                return Err(err);
            }
            Err(_) => continue,
        };

        let frame = if flip { frame.flipped() } else { frame };

        if !ctx.raw.push_until(&frame, &ctx.shutdown) {
            break;
        }
    }

    Ok(())
}

/// Analyses frames from `ctx.raw` until shutdown.
///
/// Returns at the first loop iteration after shutdown; frames still queued
/// are left unanalysed. Results go to `ctx.processed` without waiting; when nobody consumes them
/// the newest ones are dropped.
pub fn run_processing<V>(ctx: &PipelineContext, vision: &mut V, tracker: &mut MotionTracker)
where
    V: VisionService + ?Sized,
{
    while let Some(frame) = ctx.raw.pop_until(&ctx.shutdown) {
        let Detections { mask, centroids } = vision.detect(&frame);
        let tracks = tracker.cycle(&centroids);

        log::debug!("{} detections, {} tracks", centroids.len(), tracks.len());

        let processed = ProcessedFrame {
            frame,
            mask,
            detections: centroids,
            tracks,
        };

        if !ctx.processed.try_push(&processed) {
            log::trace!("processed queue full, dropping result");
        }
    }
}

/// Owns the capture and processing threads of one stream.
pub struct Pipeline {
    ctx: PipelineContext,
    capture: Option<JoinHandle<Result<()>>>,
    processing: Option<JoinHandle<()>>,
}

impl Pipeline {
    pub fn start<R, V>(
        mut reader: R,
        mut vision: V,
        tracker_config: TrackerConfig,
        queue_config: QueueConfig,
        flip: bool,
    ) -> Self
    where
        R: FrameReader + 'static,
        V: VisionService + Send + 'static,
    {
        let ctx = PipelineContext::new(queue_config);

        let capture_ctx = ctx.clone();
        let capture = thread::spawn(move || run_capture(&mut reader, &capture_ctx, flip));

        let processing_ctx = ctx.clone();
        let processing = thread::spawn(move || {
            let mut tracker = MotionTracker::new(tracker_config);
            run_processing(&processing_ctx, &mut vision, &mut tracker);
        });

        Self {
            ctx,
            capture: Some(capture),
            processing: Some(processing),
        }
    }

    #[inline]
    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Oldest result not yet taken, if any.
    #[inline]
    pub fn try_recv(&self) -> Option<ProcessedFrame> {
        self.ctx.processed.try_pop()
    }

    /// `false` once stopped or once the stream has ended.
    #[inline]
    pub fn is_running(&self) -> bool {
        !self.ctx.shutdown.is_triggered()
    }

    /// Stops both threads and waits for them. Returns the capture error
    /// that ended the stream, if any.
    pub fn stop(&mut self) -> Result<()> {
        self.ctx.shutdown.trigger();

        let mut result = Ok(());

        if let Some(handle) = self.capture.take() {
            match handle.join() {
                Ok(res) => result = res,
                Err(_) => log::error!("capture thread panicked"),
            }
        }

        if let Some(handle) = self.processing.take() {
            if handle.join().is_err() {
                log::error!("processing thread panicked");
            }
        }

        result
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log::error!("pipeline stopped with error: {}", err);
        }
    }
}
