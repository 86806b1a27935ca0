// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The burst loop that applies a renderer over a destination rectangle.

use alloc::vec::Vec;
use core::fmt;

use quilt_core::chunk::{ChunkConfig, ChunkIterator};
use quilt_core::clock::Clock;
use quilt_core::rect::Rectangle;
use quilt_core::region::{Region, SpatialRegionSet};
#[cfg(feature = "trace-rich")]
use quilt_core::trace::ChunkEvent;
use quilt_core::trace::{
    ApplySummaryBuilder, CacheReuseEvent, PassBeginEvent, PassEndEvent, PassEndReason, Tracer,
};

use crate::buffer::PixelBuffer;
use crate::error::ApplyError;
use crate::progress::{CancelToken, Progress};
use crate::render::{Input, Renderer, Source};

/// Tile edge used when the builder is given no tile rect.
const DEFAULT_TILE_SIZE: i32 = 64;

/// Final outcome of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApplyStatus {
    /// Every pixel of the destination rectangle was rendered or reused.
    Completed,
    /// The cancel token was observed before the run finished.
    Cancelled,
}

/// Result of one [`IncrementalApplicator::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    /// The burst's time budget is spent. Yield to the event loop, then call
    /// `step` again.
    Yield,
    /// The run is over.
    Done(ApplyStatus),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Running,
    Done(ApplyStatus),
    /// The renderer failed on this chunk.
    Failed(Rectangle),
}

/// Configures an [`IncrementalApplicator`].
///
/// Only the destination, the clock and a renderer are required. By default
/// the whole destination extent is rendered with no input, on a 64×64 tile
/// grid anchored at the extent origin.
pub struct ApplicatorBuilder<'a, B, R, C> {
    dest: &'a mut B,
    clock: C,
    rect: Option<Rectangle>,
    source: Source<'a, B>,
    renderer: Option<R>,
    cache: Option<(&'a B, Vec<Rectangle>)>,
    tile_rect: Option<Rectangle>,
    priority_rect: Option<Rectangle>,
    config: ChunkConfig,
    progress: Option<&'a mut dyn Progress>,
    cancel: Option<CancelToken>,
    tracer: Tracer<'a>,
}

impl<B, R, C> fmt::Debug for ApplicatorBuilder<'_, B, R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicatorBuilder")
            .field("rect", &self.rect)
            .field("source", &self.source)
            .field("tile_rect", &self.tile_rect)
            .field("priority_rect", &self.priority_rect)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a, B, R, C> ApplicatorBuilder<'a, B, R, C>
where
    B: PixelBuffer,
    R: Renderer<B>,
    C: Clock,
{
    /// Starts configuring a run that writes into `dest`.
    #[must_use]
    pub fn new(dest: &'a mut B, clock: C) -> Self {
        Self {
            dest,
            clock,
            rect: None,
            source: Source::None,
            renderer: None,
            cache: None,
            tile_rect: None,
            priority_rect: None,
            config: ChunkConfig::DEFAULT,
            progress: None,
            cancel: None,
            tracer: Tracer::none(),
        }
    }

    /// Restricts rendering to `rect`, clipped to the destination extent.
    #[must_use]
    pub fn rect(mut self, rect: Rectangle) -> Self {
        self.rect = Some(rect);
        self
    }

    /// Sets where input pixels come from.
    #[must_use]
    pub fn source(mut self, source: Source<'a, B>) -> Self {
        self.source = source;
        self
    }

    /// Sets the renderer.
    #[must_use]
    pub fn renderer(mut self, renderer: R) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Supplies a cache whose `valid` rectangles already hold correct output.
    ///
    /// Those pixels are copied into the destination instead of rendered.
    /// The cache uses the destination's coordinates.
    #[must_use]
    pub fn cache(mut self, cache: &'a B, valid: impl IntoIterator<Item = Rectangle>) -> Self {
        self.cache = Some((cache, valid.into_iter().collect()));
        self
    }

    /// Sets the tile grid chunk edges snap to.
    #[must_use]
    pub fn tile_rect(mut self, rect: Rectangle) -> Self {
        self.tile_rect = Some(rect);
        self
    }

    /// Renders `rect` before anything else.
    #[must_use]
    pub fn priority_rect(mut self, rect: Rectangle) -> Self {
        self.priority_rect = Some(rect);
        self
    }

    /// Overrides the per-burst time budget, in seconds.
    #[must_use]
    pub fn interval(mut self, interval: f64) -> Self {
        self.config.interval = interval;
        self
    }

    /// Replaces the chunking configuration.
    #[must_use]
    pub fn config(mut self, config: ChunkConfig) -> Self {
        self.config = config;
        self
    }

    /// Reports progress to `progress`.
    #[must_use]
    pub fn progress(mut self, progress: &'a mut dyn Progress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Polls `cancel` once per burst.
    #[must_use]
    pub fn cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Sends pass and summary events to `tracer`.
    #[must_use]
    pub fn tracer(mut self, tracer: Tracer<'a>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Finishes configuration and consumes the cache.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::MissingRenderer`] if no renderer was set.
    ///
    /// # Panics
    ///
    /// Panics if the tile rect or priority rect is empty.
    pub fn build(self) -> Result<IncrementalApplicator<'a, B, R, C>, ApplyError<R::Error>> {
        let Self {
            dest,
            clock,
            rect,
            source,
            renderer,
            cache,
            tile_rect,
            priority_rect,
            config,
            mut progress,
            cancel,
            mut tracer,
        } = self;

        let Some(renderer) = renderer else {
            return Err(ApplyError::MissingRenderer);
        };

        let extent = dest.extent();
        let rect = rect.map_or(extent, |r| r.intersect(extent));
        let total = rect.area();

        // Reading neighbors from the buffer being written is a hazard.
        let uses_temp = !rect.is_empty()
            && matches!(source, Source::Aliased)
            && !renderer.kind().is_in_place_safe();
        let mut temp = uses_temp.then(|| dest.new_like(rect));

        let mut region = Region::from(rect);
        let mut summary = ApplySummaryBuilder::new(clock.now(), total);

        if let Some((cache, valid)) = cache {
            let output: &mut B = match &mut temp {
                Some(temp) => temp,
                None => &mut *dest,
            };
            for r in valid {
                let r = r.intersect(rect).intersect(cache.extent());
                if r.is_empty() {
                    continue;
                }
                output.copy_rect(cache, r, r);
                region.subtract_rect(r);
                tracer.cache_reuse(&CacheReuseEvent { rect: r });
            }

            let reused = total - region.area();
            if reused > 0 {
                summary.record_reuse(reused);
                if let Some(progress) = &mut progress {
                    progress.set_value(reused as f64 / total as f64);
                }
            }
        }

        let tile = tile_rect.unwrap_or(Rectangle::new(
            extent.x,
            extent.y,
            DEFAULT_TILE_SIZE,
            DEFAULT_TILE_SIZE,
        ));
        let mut iter = ChunkIterator::with_config(region, clock, config);
        iter.set_tile_rect(tile);
        iter.set_priority_rect(priority_rect);

        let phase = if rect.is_empty() {
            Phase::Done(ApplyStatus::Completed)
        } else {
            Phase::Running
        };

        Ok(IncrementalApplicator {
            iter,
            dest,
            source,
            renderer,
            temp,
            uses_temp,
            rect,
            progress,
            cancel,
            tracer,
            summary,
            pass_index: 0,
            phase,
        })
    }
}

/// Applies a [`Renderer`] over a destination rectangle in time-budgeted
/// bursts.
///
/// Each [`step`](Self::step) runs one burst and returns. The caller
/// interleaves steps with its own event handling until a step reports
/// [`Step::Done`]; [`run`](Self::run) does all steps back to back.
///
/// When the source is the destination itself and the renderer is not
/// in-place safe, chunks are rendered into a scratch buffer that is copied
/// over the destination only once the whole rectangle is done. A cancelled
/// run then leaves the destination untouched.
pub struct IncrementalApplicator<'a, B, R, C>
where
    B: PixelBuffer,
    R: Renderer<B>,
    C: Clock,
{
    iter: ChunkIterator<Region, C>,
    dest: &'a mut B,
    source: Source<'a, B>,
    renderer: R,
    temp: Option<B>,
    uses_temp: bool,
    rect: Rectangle,
    progress: Option<&'a mut dyn Progress>,
    cancel: Option<CancelToken>,
    tracer: Tracer<'a>,
    summary: ApplySummaryBuilder,
    pass_index: u64,
    phase: Phase,
}

impl<B, R, C> fmt::Debug for IncrementalApplicator<'_, B, R, C>
where
    B: PixelBuffer,
    R: Renderer<B>,
    C: Clock,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncrementalApplicator")
            .field("rect", &self.rect)
            .field("source", &self.source)
            .field("uses_temp", &self.uses_temp)
            .field("pass_index", &self.pass_index)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl<B, R, C> IncrementalApplicator<'_, B, R, C>
where
    B: PixelBuffer,
    R: Renderer<B>,
    C: Clock,
{
    /// The destination rectangle, clipped to the destination extent.
    #[must_use]
    pub fn rect(&self) -> Rectangle {
        self.rect
    }

    /// Final status, once the run is over.
    #[must_use]
    pub fn status(&self) -> Option<ApplyStatus> {
        match self.phase {
            Phase::Done(status) => Some(status),
            Phase::Running | Phase::Failed(_) => None,
        }
    }

    /// Fraction of the destination rectangle rendered or reused so far.
    #[must_use]
    pub fn fraction_done(&self) -> f64 {
        let total = self.rect.area();
        if total == 0 {
            return 1.0;
        }
        self.summary.done_pixels() as f64 / total as f64
    }

    /// Changes the area rendered first; see
    /// [`ChunkIterator::set_priority_rect`].
    pub fn set_priority_rect(&mut self, rect: Option<Rectangle>) {
        self.iter.set_priority_rect(rect);
    }

    /// Changes the per-burst time budget, in seconds.
    pub fn set_interval(&mut self, interval: f64) {
        self.iter.set_interval(interval);
    }

    /// Runs one burst.
    ///
    /// The cancel token is polled before and after the burst, never between
    /// chunks.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::Render`] with the renderer's error if a chunk
    /// fails, and [`ApplyError::Poisoned`] on every later call.
    pub fn step(&mut self) -> Result<Step, ApplyError<R::Error>> {
        match self.phase {
            Phase::Done(status) => return Ok(Step::Done(status)),
            Phase::Failed(_) => return Err(ApplyError::Poisoned),
            Phase::Running => {}
        }

        if self.is_cancelled() {
            return Ok(Step::Done(self.finish(ApplyStatus::Cancelled)));
        }
        if !self.iter.next_pass() {
            return Ok(Step::Done(self.finish(ApplyStatus::Completed)));
        }

        let pass_index = self.pass_index;
        self.pass_index += 1;
        self.tracer.pass_begin(&PassBeginEvent {
            pass_index,
            timestamp: self.iter.clock().now(),
            remaining_area: self.iter.remaining_area(),
            target_area: self.iter.target_area(),
        });

        let mut chunks = 0_u32;
        let mut area = 0_u64;
        while let Some(rect) = self.iter.get_rect() {
            #[cfg(feature = "trace-rich")]
            self.tracer.chunk(&ChunkEvent {
                pass_index,
                timestamp: self.iter.clock().now(),
                rect,
                target_area: self.iter.target_area(),
            });

            if let Err(e) = self.render_chunk(rect) {
                self.end_pass(pass_index, chunks, area, PassEndReason::Failed);
                self.phase = Phase::Failed(rect);
                return Err(ApplyError::Render(e));
            }
            chunks += 1;
            area += rect.area();

            if let Some(progress) = &mut self.progress {
                let done = self.summary.done_pixels() + area;
                progress.set_value(done as f64 / self.rect.area() as f64);
            }
        }

        if self.iter.is_exhausted() {
            self.end_pass(pass_index, chunks, area, PassEndReason::Exhausted);
            Ok(Step::Done(self.finish(ApplyStatus::Completed)))
        } else if self.is_cancelled() {
            self.end_pass(pass_index, chunks, area, PassEndReason::Cancelled);
            Ok(Step::Done(self.finish(ApplyStatus::Cancelled)))
        } else {
            self.end_pass(pass_index, chunks, area, PassEndReason::TimeBudget);
            Ok(Step::Yield)
        }
    }

    /// Runs bursts back to back until the run is over.
    ///
    /// # Errors
    ///
    /// Returns the first error [`step`](Self::step) reports.
    pub fn run(&mut self) -> Result<ApplyStatus, ApplyError<R::Error>> {
        loop {
            if let Step::Done(status) = self.step()? {
                return Ok(status);
            }
        }
    }

    /// Ends the run and returns the area whose pixels did not reach the
    /// destination.
    ///
    /// After completion this is empty. A chunk the renderer failed on is
    /// included. When rendering went through a scratch buffer and the run
    /// did not complete, nothing reached the destination and the whole
    /// rectangle is returned.
    #[must_use]
    pub fn into_remaining(self) -> Region {
        let completed = self.phase == Phase::Done(ApplyStatus::Completed);
        if self.uses_temp && !completed {
            return Region::from(self.rect);
        }

        let mut remaining = self.iter.stop(false).unwrap_or_default();
        if let Phase::Failed(rect) = self.phase {
            remaining.union_rect(rect);
        }
        remaining
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    fn render_chunk(&mut self, rect: Rectangle) -> Result<(), R::Error> {
        match &mut self.temp {
            Some(temp) => self.renderer.render(rect, Input::Buffer(&*self.dest), temp),
            None => {
                let input = match self.source {
                    Source::None => Input::None,
                    Source::Separate(buffer) => Input::Buffer(buffer),
                    Source::Aliased => Input::Output,
                };
                self.renderer.render(rect, input, &mut *self.dest)
            }
        }
    }

    fn end_pass(&mut self, pass_index: u64, chunks: u32, area: u64, reason: PassEndReason) {
        let event = PassEndEvent {
            pass_index,
            timestamp: self.iter.clock().now(),
            chunks,
            area,
            reason,
        };
        self.summary.record_pass(&event);
        self.tracer.pass_end(&event);
    }

    fn finish(&mut self, status: ApplyStatus) -> ApplyStatus {
        match status {
            ApplyStatus::Completed => {
                if let Some(temp) = self.temp.take() {
                    self.dest.copy_rect(&temp, self.rect, self.rect);
                }
            }
            ApplyStatus::Cancelled => self.temp = None,
        }
        self.phase = Phase::Done(status);

        let summary = self
            .summary
            .finish(self.iter.clock().now(), status == ApplyStatus::Cancelled);
        self.tracer.apply_summary(&summary);
        status
    }
}
