use super::ViewManager;
use crate::animation::Step;
use crate::surface::Surface;
use crate::virtualized::ScrollAnchor;
use std::time::{Duration, Instant};

impl ViewManager {
    fn list_px_width(&self) -> f64 {
        self.container_physical_space.width * self.live_widths().list
    }

    /// The most negative translate the list column may scroll to.
    fn min_list_translate(&self) -> f64 {
        (-(self.row_measurer.max() - self.list_px_width() + self.config.list_scroll_margin))
            .min(0.0)
    }

    fn set_list_translate(&mut self, translate: f64) {
        self.columns.list.translate[0] = translate.clamp(self.min_list_translate(), 0.0);
        self.request_draw();
    }

    /// Horizontal wheel over the list column. Every mounted list cell follows
    /// the new offset right away.
    pub fn on_list_wheel(&mut self, delta_x: f64, now: Instant, surface: &mut impl Surface) {
        self.list_scroll.cancel();
        self.set_list_translate(self.columns.list.translate[0] - delta_x);

        let translate = self.columns.list.translate[0];
        for (_, slot) in self.columns.list.refs.iter() {
            if let Some(style) = surface.style_mut(slot.element) {
                style.translate_x = translate;
            }
        }
        self.out_of_bounds.arm(now);
    }

    /// Brings the indentation of a row at `depth` into the list column. A
    /// zero duration applies immediately.
    pub fn scroll_row_into_view_horizontally(&mut self, depth: u32, duration: Duration, now: Instant) {
        let indent = f64::from(depth) * self.config.row_depth_padding;
        let target = (-(indent - self.config.bring_into_view_offset))
            .clamp(self.min_list_translate(), 0.0);

        if duration.is_zero() {
            self.list_scroll.cancel();
            self.set_list_translate(target);
            return;
        }
        let from = self.columns.list.translate[0];
        self.list_scroll.start(from, target, duration, now);
        self.request_draw();
    }

    pub(super) fn step_list_scroll(&mut self, now: Instant) {
        match self.list_scroll.step(now) {
            Some(Step::Frame(translate) | Step::Settled(translate)) => {
                self.set_list_translate(translate);
            }
            None => {}
        }
    }

    /// Runs once horizontal scrolling has been quiet for a while. The deepest
    /// visible row is scrolled back in when its content has left the column
    /// on the left or its indentation starts past the right edge.
    pub(super) fn check_list_out_of_bounds(&mut self, now: Instant) {
        let Some(row) = self
            .columns
            .list
            .refs
            .iter()
            .map(|(_, slot)| slot.data)
            .max_by_key(|row| row.depth)
        else {
            return;
        };
        let indent = f64::from(row.depth) * self.config.row_depth_padding;
        let width = self.row_measurer.get(row.node).unwrap_or(indent);
        let translate = self.columns.list.translate[0];
        if translate + width < 0.0 || indent + translate > self.list_px_width() {
            self.scroll_row_into_view_horizontally(row.depth, self.config.scroll_animation(), now);
        }
    }

    /// Vertical scroll of the row list, in px from the top.
    pub fn on_list_scroll(&mut self, scroll_top: f64, now: Instant) {
        self.list.set_scroll_top(scroll_top, now);
        self.rows_dirty = true;
        self.request_draw();
    }

    pub fn scroll_to_row(&mut self, index: usize, count: usize, anchor: ScrollAnchor, now: Instant) {
        self.list.scroll_to_row(index, count, anchor, now);
        self.rows_dirty = true;
        self.request_draw();
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ViewConfig;
    use crate::manager::{ListRow, ViewManager};
    use crate::surface::{RetainedSurface, Surface};
    use crate::tree::NodeId;
    use std::time::{Duration, Instant};

    fn manager_with_rows(surface: &mut RetainedSurface, depths: &[u32]) -> ViewManager {
        let rows: Vec<(u32, f64)> = depths.iter().map(|&depth| (depth, 600.0)).collect();
        manager_with_widths(surface, &rows)
    }

    fn manager_with_widths(surface: &mut RetainedSurface, rows: &[(u32, f64)]) -> ViewManager {
        let mut manager = ViewManager::new(ViewConfig::default());
        manager.initialize_trace_space(0.0, 1_000.0, 1.0);
        manager.initialize_physical_space(1_000.0, 480.0);
        manager.columns.list.refs.set_capacity(rows.len());
        for (index, &(depth, width)) in rows.iter().enumerate() {
            let element = surface.create(width);
            let node = NodeId(index as u32);
            let row = ListRow { index, node, depth };
            manager.register_list_row(index, Some((element, row)));
        }
        manager.row_measurer.drain(&*surface, 64);
        manager
    }

    #[test]
    fn list_wheel_is_clamped_and_applied_to_cells() {
        let mut surface = RetainedSurface::new();
        let mut manager = manager_with_rows(&mut surface, &[0, 1]);
        let now = Instant::now();

        // 600 px rows in a 300 px column with a 16 px margin.
        manager.on_list_wheel(1_000.0, now, &mut surface);
        assert_eq!(manager.columns().list.translate[0], -316.0);
        for (_, slot) in manager.columns().list.refs.iter() {
            assert_eq!(surface.style(slot.element).unwrap().translate_x, -316.0);
        }

        manager.on_list_wheel(-2_000.0, now, &mut surface);
        assert_eq!(manager.columns().list.translate[0], 0.0);
    }

    #[test]
    fn out_of_bounds_check_animates_back() {
        let mut surface = RetainedSurface::new();
        let mut manager = manager_with_widths(&mut surface, &[(0, 600.0), (3, 100.0)]);
        let t0 = Instant::now();

        manager.on_list_wheel(300.0, t0, &mut surface);
        assert_eq!(manager.columns().list.translate[0], -300.0);
        assert!(manager.out_of_bounds.fire(t0 + Duration::from_millis(300)));
        manager.check_list_out_of_bounds(t0 + Duration::from_millis(300));
        assert!(manager.list_scroll.is_active());

        manager.step_list_scroll(t0 + Duration::from_millis(1_000));
        // 3 * 22 px of indentation minus the 48 px offset.
        assert_eq!(manager.columns().list.translate[0], -18.0);
    }

    #[test]
    fn small_scroll_sticks_while_the_deepest_row_is_visible() {
        let mut surface = RetainedSurface::new();
        let mut manager = manager_with_rows(&mut surface, &[0, 5]);
        let t0 = Instant::now();

        manager.on_list_wheel(50.0, t0, &mut surface);
        let settled = t0 + Duration::from_millis(300);
        assert!(manager.out_of_bounds.fire(settled));
        manager.check_list_out_of_bounds(settled);
        assert!(!manager.list_scroll.is_active());
        manager.step_list_scroll(settled + Duration::from_millis(1_000));
        assert_eq!(manager.columns().list.translate[0], -50.0);
    }

    #[test]
    fn indentation_past_the_right_edge_is_brought_in() {
        let mut surface = RetainedSurface::new();
        // 14 * 22 = 308 px of indentation in a 300 px column.
        let mut manager = manager_with_rows(&mut surface, &[1, 14]);
        let t0 = Instant::now();
        manager.check_list_out_of_bounds(t0);
        assert!(manager.list_scroll.is_active());
        manager.step_list_scroll(t0 + Duration::from_millis(1_000));
        assert_eq!(manager.columns().list.translate[0], -(308.0 - 48.0));
    }

    #[test]
    fn rows_inside_the_band_are_left_alone() {
        let mut surface = RetainedSurface::new();
        let mut manager = manager_with_rows(&mut surface, &[1]);
        let t0 = Instant::now();
        manager.on_list_wheel(10.0, t0, &mut surface);
        manager.check_list_out_of_bounds(t0);
        assert!(!manager.list_scroll.is_active());
    }

    #[test]
    fn instant_bring_into_view_cancels_animation() {
        let mut surface = RetainedSurface::new();
        let mut manager = manager_with_rows(&mut surface, &[0]);
        let t0 = Instant::now();
        manager.scroll_row_into_view_horizontally(20, Duration::from_millis(600), t0);
        assert!(manager.list_scroll.is_active());
        manager.scroll_row_into_view_horizontally(10, Duration::ZERO, t0);
        assert!(!manager.list_scroll.is_active());
        assert_eq!(manager.columns().list.translate[0], -(220.0 - 48.0));
    }
}
