//! Invalidation entry points and session event ingestion.

use render_protocol::MapEvent;

use crate::{RenderError, TileRenderer};

impl TileRenderer {
    /// Marks the cells around tile `(x, y)` dirty. Coordinates wrap.
    pub fn invalidate_tile(&mut self, x: i64, y: i64) {
        self.cache_state.grid.invalidate_tile(x, y);
    }

    /// Marks the cells covering the rectangle plus a one-tile halo dirty.
    pub fn invalidate_rect(&mut self, x: i64, y: i64, width: u32, height: u32) {
        self.cache_state.grid.invalidate_rect(x, y, width, height);
    }

    pub fn invalidate_all(&mut self) {
        self.cache_state.grid.invalidate_all();
    }

    /// Applies every queued session event. Returns how many were applied.
    pub(crate) fn drain_events(&mut self) -> Result<usize, RenderError> {
        let mut applied = 0;
        while let Ok(event) = self.input_state.events_rx.try_recv() {
            self.apply_event(event)?;
            applied += 1;
        }
        if applied > 0 {
            tracing::debug!(events = applied, "applied session events");
        }
        Ok(applied)
    }

    fn apply_event(&mut self, event: MapEvent) -> Result<(), RenderError> {
        match event {
            MapEvent::TileChanged { x, y } => self.invalidate_tile(x as i64, y as i64),
            MapEvent::RectChanged {
                x,
                y,
                width,
                height,
            } => self.invalidate_rect(x, y, width, height),
            MapEvent::AllChanged => self.invalidate_all(),
            MapEvent::Resized { layout } => {
                if layout != self.cache_state.grid.layout().map() {
                    self.resize(layout)?;
                } else {
                    self.invalidate_all();
                }
            }
        }
        Ok(())
    }
}
