//! Keyboard/transport control actions for the playback surface

/// User control actions the surface manager understands
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    PlayPause,
    SeekForward,
    SeekBackward,
    VolumeUp,
    VolumeDown,
}
