//! Render-toggle snapshot taken around overlay submission.

use crate::backend::{DeviceState, RenderToggle};

/// Saved values of a set of render toggles.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderStateSnapshot {
    saved: Vec<(RenderToggle, bool)>,
}

impl RenderStateSnapshot {
    pub fn capture(device: &dyn DeviceState, toggles: &[RenderToggle]) -> Self {
        Self {
            saved: toggles
                .iter()
                .map(|&toggle| (toggle, device.render_toggle(toggle)))
                .collect(),
        }
    }

    /// Write every saved toggle back, in capture order.
    pub fn restore(&self, device: &mut dyn DeviceState) {
        for &(toggle, enabled) in &self.saved {
            device.set_render_toggle(toggle, enabled);
        }
    }

    pub fn get(&self, toggle: RenderToggle) -> Option<bool> {
        self.saved
            .iter()
            .find(|(saved, _)| *saved == toggle)
            .map(|&(_, enabled)| enabled)
    }

    pub fn len(&self) -> usize {
        self.saved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeDevice {
        toggles: HashMap<RenderToggle, bool>,
        writes: usize,
    }

    impl DeviceState for FakeDevice {
        fn render_toggle(&self, toggle: RenderToggle) -> bool {
            self.toggles.get(&toggle).copied().unwrap_or(false)
        }

        fn set_render_toggle(&mut self, toggle: RenderToggle, enabled: bool) {
            self.toggles.insert(toggle, enabled);
            self.writes += 1;
        }
    }

    #[test]
    fn test_capture_and_restore() {
        let mut device = FakeDevice::default();
        device.set_render_toggle(RenderToggle::DepthTest, true);
        device.set_render_toggle(RenderToggle::Fog, true);

        let snapshot = RenderStateSnapshot::capture(&device, &RenderToggle::ALL);
        assert_eq!(snapshot.len(), RenderToggle::ALL.len());
        assert_eq!(snapshot.get(RenderToggle::DepthTest), Some(true));
        assert_eq!(snapshot.get(RenderToggle::AlphaBlend), Some(false));

        device.set_render_toggle(RenderToggle::DepthTest, false);
        device.set_render_toggle(RenderToggle::AlphaBlend, true);
        snapshot.restore(&mut device);

        assert!(device.render_toggle(RenderToggle::DepthTest));
        assert!(device.render_toggle(RenderToggle::Fog));
        assert!(!device.render_toggle(RenderToggle::AlphaBlend));
    }

    #[test]
    fn test_empty_snapshot_touches_nothing() {
        let mut device = FakeDevice::default();
        let snapshot = RenderStateSnapshot::capture(&device, &[]);
        assert!(snapshot.is_empty());
        snapshot.restore(&mut device);
        assert_eq!(device.writes, 0);
        assert_eq!(snapshot.get(RenderToggle::Lighting), None);
    }
}
