//! World <-> corridor-local coordinate remapping
//!
//! The corridor frame is (lateral, vertical, progress). Mapping is a pure
//! permutation of world components chosen by the travel axis:
//! - X: lateral = z, vertical = y, progress = x
//! - Y: lateral = x, vertical = z, progress = y
//! - Z: lateral = x, vertical = y, progress = z

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::Axis;

/// A position in the corridor frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LocalPos {
    pub lateral: f32,
    pub vertical: f32,
    pub progress: f32,
}

impl LocalPos {
    pub const fn new(lateral: f32, vertical: f32, progress: f32) -> Self {
        Self {
            lateral,
            vertical,
            progress,
        }
    }

    /// Squared distance in the lateral/progress plane
    #[inline]
    pub fn plane_distance_sq(&self, other: &LocalPos) -> f32 {
        let dl = self.lateral - other.lateral;
        let dp = self.progress - other.progress;
        dl * dl + dp * dp
    }
}

/// Maps between world and corridor coordinates for one travel axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisMapper {
    pub axis: Axis,
    /// +1 or -1, direction of travel along the axis
    pub sign: f32,
}

impl AxisMapper {
    pub fn new(axis: Axis, sign: f32) -> Self {
        Self {
            axis,
            sign: if sign < 0.0 { -1.0 } else { 1.0 },
        }
    }

    pub fn world_to_local(&self, p: Vec3) -> LocalPos {
        match self.axis {
            Axis::X => LocalPos::new(p.z, p.y, p.x),
            Axis::Y => LocalPos::new(p.x, p.z, p.y),
            Axis::Z => LocalPos::new(p.x, p.y, p.z),
        }
    }

    pub fn local_to_world(&self, l: LocalPos) -> Vec3 {
        match self.axis {
            Axis::X => Vec3::new(l.progress, l.vertical, l.lateral),
            Axis::Y => Vec3::new(l.lateral, l.progress, l.vertical),
            Axis::Z => Vec3::new(l.lateral, l.vertical, l.progress),
        }
    }

    /// Unit vector pointing from start toward goal
    pub fn forward(&self) -> Vec3 {
        let unit = match self.axis {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        };
        unit * self.sign
    }

    /// Unit vector along increasing lateral
    pub fn lateral_unit(&self) -> Vec3 {
        match self.axis {
            Axis::X => Vec3::Z,
            Axis::Y | Axis::Z => Vec3::X,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const AXES: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[test]
    fn test_axis_x_permutation() {
        let m = AxisMapper::new(Axis::X, 1.0);
        let l = m.world_to_local(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(l, LocalPos::new(3.0, 2.0, 1.0));
    }

    #[test]
    fn test_axis_y_permutation() {
        let m = AxisMapper::new(Axis::Y, 1.0);
        let l = m.world_to_local(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(l, LocalPos::new(1.0, 3.0, 2.0));
    }

    #[test]
    fn test_forward_is_signed() {
        assert_eq!(AxisMapper::new(Axis::Z, 1.0).forward(), Vec3::Z);
        assert_eq!(AxisMapper::new(Axis::X, -1.0).forward(), -Vec3::X);
        assert_eq!(AxisMapper::new(Axis::Y, -1.0).forward(), -Vec3::Y);
    }

    #[test]
    fn test_lateral_unit_matches_mapping() {
        for axis in AXES {
            let m = AxisMapper::new(axis, 1.0);
            let l = m.world_to_local(m.lateral_unit());
            assert_eq!(l, LocalPos::new(1.0, 0.0, 0.0));
            let f = m.world_to_local(m.forward());
            assert_eq!(f, LocalPos::new(0.0, 0.0, 1.0));
        }
    }

    proptest! {
        #[test]
        fn prop_local_world_roundtrip_is_exact(
            x in -1.0e4f32..1.0e4,
            y in -1.0e4f32..1.0e4,
            z in -1.0e4f32..1.0e4,
            axis_idx in 0usize..3,
            negative in any::<bool>(),
        ) {
            let m = AxisMapper::new(AXES[axis_idx], if negative { -1.0 } else { 1.0 });
            let p = Vec3::new(x, y, z);
            prop_assert_eq!(m.local_to_world(m.world_to_local(p)), p);
        }
    }
}
