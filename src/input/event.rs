//! Raw input identifiers and the event shapes delivered by an input source.

/// Opaque identifier for one physical input (a key, a button, an axis
/// channel). Equality is exact identity, never semantic similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InputId(pub u32);

impl InputId {
    /// Human-readable label from the process-wide table, if one was installed.
    pub fn label(self) -> Option<&'static str> {
        super::labels::label_of(self)
    }
}

impl std::fmt::Display for InputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.label() {
            Some(label) => f.write_str(label),
            None => write!(f, "input#{}", self.0),
        }
    }
}

/// Broad class of device an axis sample came from, carried as payload so
/// listeners can scale deltas appropriately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Keyboard,
    MouseButton,
    MouseMotion,
    Gamepad,
    Touch,
    Gyro,
}

/// Sample attached to a continuous-input change notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisPayload {
    pub position: [f32; 2],
    pub delta: [f32; 2],
    pub device: DeviceClass,
}

impl AxisPayload {
    pub fn new(position: [f32; 2], delta: [f32; 2], device: DeviceClass) -> Self {
        Self {
            position,
            delta,
            device,
        }
    }
}

/// What happened to the input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputPhase {
    /// The input started being held (key down, button press, gesture start).
    Began,
    /// The input stopped being held.
    Ended,
    /// A continuous input produced a new sample (axis-only).
    Changed(AxisPayload),
}

/// One discrete notification from the input source.
///
/// `processed` mirrors the engine-level "already consumed by UI" flag; the
/// router compares it against the dispatcher's configured gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEvent {
    pub id: InputId,
    pub phase: InputPhase,
    pub processed: bool,
}

impl InputEvent {
    pub fn began(id: InputId) -> Self {
        Self {
            id,
            phase: InputPhase::Began,
            processed: false,
        }
    }

    pub fn ended(id: InputId) -> Self {
        Self {
            id,
            phase: InputPhase::Ended,
            processed: false,
        }
    }

    pub fn changed(id: InputId, payload: AxisPayload) -> Self {
        Self {
            id,
            phase: InputPhase::Changed(payload),
            processed: false,
        }
    }

    /// Mark the event as already consumed by an outer UI layer.
    pub fn processed(mut self, processed: bool) -> Self {
        self.processed = processed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_default_to_unprocessed() {
        let ev = InputEvent::began(InputId(4));
        assert_eq!(ev.phase, InputPhase::Began);
        assert!(!ev.processed);

        let ev = InputEvent::ended(InputId(4)).processed(true);
        assert!(ev.processed);
    }

    #[test]
    fn display_falls_back_to_numeric() {
        // Ids without a label render as input#N.
        let id = InputId(9_999_999);
        assert_eq!(id.to_string(), "input#9999999");
    }
}
