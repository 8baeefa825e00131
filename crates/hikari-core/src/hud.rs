//! Heads-up overlay visibility control
//!
//! The HUD shows on every transition into playing and on pointer movement,
//! then hides after a fixed idle interval while playback continues and the
//! pointer stays still. Pausing forces it visible and cancels the pending
//! hide. The timer is an explicit two-state machine driven by ticks, so a
//! quality switch can never be blocked behind it; pointer or play activity
//! simply rearms it.

use std::time::{Duration, Instant};

/// Idle-hide timer states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HudTimer {
    Disarmed,
    Armed { deadline: Instant },
}

/// HUD overlay state machine owned by the playback surface manager
#[derive(Debug)]
pub struct HudController {
    visible: bool,
    timer: HudTimer,
    playing: bool,
    idle_timeout: Duration,
}

impl HudController {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            visible: true,
            timer: HudTimer::Disarmed,
            playing: false,
            idle_timeout,
        }
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn timer(&self) -> HudTimer {
        self.timer
    }

    /// Pointer moved over the player: show and rearm
    pub fn on_pointer_moved(&mut self, now: Instant) {
        self.visible = true;
        self.arm(now);
    }

    /// Transition into playing: show and rearm
    pub fn on_play(&mut self, now: Instant) {
        self.playing = true;
        self.visible = true;
        self.arm(now);
    }

    /// Entering paused always forces the overlay visible and cancels the
    /// idle timer
    pub fn on_pause(&mut self) {
        self.playing = false;
        self.visible = true;
        self.timer = HudTimer::Disarmed;
    }

    /// Advance the timer. Hides the overlay once the idle deadline passes
    /// while still playing.
    pub fn tick(&mut self, now: Instant) {
        if let HudTimer::Armed { deadline } = self.timer {
            if now >= deadline {
                self.timer = HudTimer::Disarmed;
                if self.playing {
                    self.visible = false;
                }
            }
        }
    }

    fn arm(&mut self, now: Instant) {
        self.timer = HudTimer::Armed {
            deadline: now + self.idle_timeout,
        };
    }
}

/// Volume readout shown next to the volume control, in whole percent
pub fn volume_percent(volume: f64) -> u8 {
    (volume.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: Duration = Duration::from_secs(3);

    #[test]
    fn hides_after_idle_interval_while_playing() {
        let mut hud = HudController::new(IDLE);
        let start = Instant::now();

        hud.on_play(start);
        assert!(hud.visible());

        hud.tick(start + Duration::from_secs(1));
        assert!(hud.visible());

        hud.tick(start + IDLE);
        assert!(!hud.visible());
        assert_eq!(hud.timer(), HudTimer::Disarmed);
    }

    #[test]
    fn pointer_movement_rearms_the_timer() {
        let mut hud = HudController::new(IDLE);
        let start = Instant::now();

        hud.on_play(start);
        hud.on_pointer_moved(start + Duration::from_secs(2));

        // Original deadline has passed, but the rearm moved it
        hud.tick(start + IDLE);
        assert!(hud.visible());

        hud.tick(start + Duration::from_secs(2) + IDLE);
        assert!(!hud.visible());
    }

    #[test]
    fn pause_forces_visible_and_disarms() {
        let mut hud = HudController::new(IDLE);
        let start = Instant::now();

        hud.on_play(start);
        hud.tick(start + IDLE);
        assert!(!hud.visible());

        hud.on_pause();
        assert!(hud.visible());
        assert_eq!(hud.timer(), HudTimer::Disarmed);

        // No deadline can fire while paused
        hud.tick(start + Duration::from_secs(60));
        assert!(hud.visible());
    }

    #[test]
    fn pointer_while_paused_never_hides() {
        let mut hud = HudController::new(IDLE);
        let start = Instant::now();

        hud.on_pause();
        hud.on_pointer_moved(start);
        hud.tick(start + IDLE);
        // Armed deadline fired, but playback is paused
        assert!(hud.visible());
    }

    #[test]
    fn volume_readout_rounds_to_percent() {
        assert_eq!(volume_percent(0.0), 0);
        assert_eq!(volume_percent(0.05), 5);
        assert_eq!(volume_percent(0.754), 75);
        assert_eq!(volume_percent(1.0), 100);
        assert_eq!(volume_percent(1.7), 100);
    }
}
