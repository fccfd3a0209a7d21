use std::time::Duration;

use eframe::egui::Context;

use crate::config::{FieldConfig, FrameCadence};

/// The host's way of getting the next frame scheduled.
pub(in crate::app) trait RepaintHost {
    fn request_next_repaint(&self);
    fn request_repaint_after(&self, delay: Duration);
}

impl RepaintHost for Context {
    fn request_next_repaint(&self) {
        self.request_repaint();
    }

    fn request_repaint_after(&self, delay: Duration) {
        Context::request_repaint_after(self, delay);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum NextFrame {
    Repaint,
    After(Duration),
}

/// Renders one frame per host callback and asks for the next one, so the
/// loop lasts as long as the host keeps calling back.
pub(in crate::app) struct AnimationDriver {
    next_frame: NextFrame,
    frames: u64,
}

impl AnimationDriver {
    pub(in crate::app) fn new(next_frame: NextFrame) -> Self {
        Self {
            next_frame,
            frames: 0,
        }
    }

    pub(in crate::app) fn from_config(config: &FieldConfig) -> Self {
        let next_frame = match config.frame_cadence {
            FrameCadence::NextRepaint => NextFrame::Repaint,
            FrameCadence::Interval => NextFrame::After(config.fallback_interval()),
        };
        Self::new(next_frame)
    }

    pub(in crate::app) fn drive<H, R>(&mut self, host: &H, render: impl FnOnce() -> R) -> R
    where
        H: RepaintHost + ?Sized,
    {
        let output = render();
        match self.next_frame {
            NextFrame::Repaint => host.request_next_repaint(),
            NextFrame::After(delay) => host.request_repaint_after(delay),
        }
        self.frames = self.frames.wrapping_add(1);
        output
    }

    pub(in crate::app) fn frames(&self) -> u64 {
        self.frames
    }

    pub(in crate::app) fn next_frame(&self) -> NextFrame {
        self.next_frame
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[derive(Default)]
    struct RecordingHost {
        events: RefCell<Vec<String>>,
    }

    impl RepaintHost for RecordingHost {
        fn request_next_repaint(&self) {
            self.events.borrow_mut().push("repaint".to_owned());
        }

        fn request_repaint_after(&self, delay: Duration) {
            self.events
                .borrow_mut()
                .push(format!("after {}", delay.as_millis()));
        }
    }

    #[test]
    fn renders_before_scheduling_the_next_frame() {
        let host = RecordingHost::default();
        let mut driver = AnimationDriver::new(NextFrame::Repaint);

        for frame in 0..3 {
            let value = driver.drive(&host, || {
                host.events.borrow_mut().push(format!("render {frame}"));
                frame * 2
            });
            assert_eq!(value, frame * 2);
        }

        assert_eq!(driver.frames(), 3);
        assert_eq!(
            *host.events.borrow(),
            vec![
                "render 0", "repaint", "render 1", "repaint", "render 2", "repaint"
            ]
        );
    }

    #[test]
    fn interval_cadence_uses_the_timer_fallback() {
        let config = FieldConfig {
            frame_cadence: FrameCadence::Interval,
            fallback_interval_ms: 20.0,
            ..FieldConfig::default()
        };
        let host = RecordingHost::default();
        let mut driver = AnimationDriver::from_config(&config);
        assert_eq!(driver.next_frame(), NextFrame::After(Duration::from_millis(20)));

        driver.drive(&host, || ());
        assert_eq!(*host.events.borrow(), vec!["after 20"]);
    }

    #[test]
    fn default_cadence_follows_display_repaints() {
        let driver = AnimationDriver::from_config(&FieldConfig::default());
        assert_eq!(driver.next_frame(), NextFrame::Repaint);
        assert_eq!(FieldConfig::default().fallback_interval().as_micros(), 16_667);
    }
}
