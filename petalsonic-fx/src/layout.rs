//! Speaker layouts and ambisonic channel arithmetic

use crate::math::Vec3;
use std::f32::consts::{FRAC_1_SQRT_2, TAU};

/// Output speaker arrangement, derived from the host's output channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerLayout {
    Mono,
    Stereo,
    Quadraphonic,
    Surround5_1,
    Surround7_1,
    Custom(usize),
}

impl SpeakerLayout {
    pub fn for_channels(num_channels: usize) -> Self {
        match num_channels {
            1 => Self::Mono,
            2 => Self::Stereo,
            4 => Self::Quadraphonic,
            6 => Self::Surround5_1,
            8 => Self::Surround7_1,
            n => Self::Custom(n),
        }
    }

    pub fn num_speakers(&self) -> usize {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
            Self::Quadraphonic => 4,
            Self::Surround5_1 => 6,
            Self::Surround7_1 => 8,
            Self::Custom(n) => *n,
        }
    }

    /// Unit direction of speaker `index` in listener space (x right, y up, -z ahead).
    ///
    /// Returns `None` for the LFE channel, which carries no directional content.
    pub fn speaker_direction(&self, index: usize) -> Option<Vec3> {
        let d = FRAC_1_SQRT_2;
        let direction = match (self, index) {
            (Self::Mono, 0) => Vec3::NEG_Z,
            (Self::Stereo, 0) => Vec3::NEG_X,
            (Self::Stereo, 1) => Vec3::X,
            (Self::Quadraphonic, 0) => Vec3::new(-d, 0.0, -d),
            (Self::Quadraphonic, 1) => Vec3::new(d, 0.0, -d),
            (Self::Quadraphonic, 2) => Vec3::new(-d, 0.0, d),
            (Self::Quadraphonic, 3) => Vec3::new(d, 0.0, d),
            (Self::Surround5_1 | Self::Surround7_1, 0) => Vec3::new(-d, 0.0, -d),
            (Self::Surround5_1 | Self::Surround7_1, 1) => Vec3::new(d, 0.0, -d),
            (Self::Surround5_1 | Self::Surround7_1, 2) => Vec3::NEG_Z,
            (Self::Surround5_1 | Self::Surround7_1, 3) => return None,
            (Self::Surround5_1, 4) => Vec3::new(-d, 0.0, d),
            (Self::Surround5_1, 5) => Vec3::new(d, 0.0, d),
            (Self::Surround7_1, 4) => Vec3::new(-d, 0.0, d),
            (Self::Surround7_1, 5) => Vec3::new(d, 0.0, d),
            (Self::Surround7_1, 6) => Vec3::NEG_X,
            (Self::Surround7_1, 7) => Vec3::X,
            (Self::Custom(n), i) if i < *n => {
                let angle = TAU * i as f32 / *n as f32;
                Vec3::new(angle.sin(), 0.0, -angle.cos())
            }
            _ => return None,
        };
        Some(direction)
    }
}

/// Ambisonic order carried by `num_channels` channels.
pub fn order_for_channels(num_channels: usize) -> u32 {
    ((num_channels as f32).sqrt() as u32).saturating_sub(1)
}

/// Number of channels needed for an ambisonic field of `order`.
pub fn channels_for_order(order: u32) -> usize {
    let n = order as usize + 1;
    n * n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_for_channels() {
        assert_eq!(SpeakerLayout::for_channels(1), SpeakerLayout::Mono);
        assert_eq!(SpeakerLayout::for_channels(2), SpeakerLayout::Stereo);
        assert_eq!(SpeakerLayout::for_channels(4), SpeakerLayout::Quadraphonic);
        assert_eq!(SpeakerLayout::for_channels(6), SpeakerLayout::Surround5_1);
        assert_eq!(SpeakerLayout::for_channels(8), SpeakerLayout::Surround7_1);
        assert_eq!(SpeakerLayout::for_channels(3), SpeakerLayout::Custom(3));
        assert_eq!(SpeakerLayout::for_channels(3).num_speakers(), 3);
    }

    #[test]
    fn test_order_channel_conversions() {
        assert_eq!(order_for_channels(1), 0);
        assert_eq!(order_for_channels(4), 1);
        assert_eq!(order_for_channels(9), 2);
        assert_eq!(order_for_channels(16), 3);
        for order in 0..5 {
            assert_eq!(order_for_channels(channels_for_order(order)), order);
        }
    }

    #[test]
    fn test_lfe_has_no_direction() {
        assert!(SpeakerLayout::Surround5_1.speaker_direction(3).is_none());
        assert!(SpeakerLayout::Stereo.speaker_direction(2).is_none());
        assert_eq!(SpeakerLayout::Stereo.speaker_direction(1), Some(Vec3::X));
    }
}
