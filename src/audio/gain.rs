use std::sync::atomic::{AtomicU32, Ordering};

/// Number of volume steps (indices 0..=100)
pub const VOLUME_STEPS: usize = 101;

/// Highest volume index
pub const MAX_VOLUME: u8 = 100;

/// Gain value at which a 24-bit sample keeps full resolution
pub const UNITY_24BIT: i32 = 256;

/// Perceptual volume curve; entry 34 is the 24-bit unity unit, entry 100 full scale
const VOLUME_TABLE: [i32; VOLUME_STEPS] = [
    0, 4, 8, 12, 16, 20, 24, 27, 29, 31,
    34, 37, 40, 44, 48, 52, 57, 61, 67, 73,
    79, 86, 94, 102, 111, 120, 131, 142, 155, 168,
    183, 199, 217, 236, 256, 279, 303, 330, 359, 390,
    424, 462, 502, 546, 594, 646, 703, 764, 831, 904,
    983, 1069, 1163, 1265, 1376, 1496, 1627, 1770, 1925, 2094,
    2277, 2476, 2693, 2929, 3186, 3465, 3769, 4099, 4458, 4849,
    5274, 5736, 6239, 6785, 7380, 8026, 8730, 9495, 10327, 11232,
    12216, 13286, 14450, 15716, 17093, 18591, 20220, 21992, 23919, 26015,
    28294, 30773, 33470, 36403, 39592, 43061, 46835, 50938, 55402, 60256,
    65536,
];

/// Immutable volume index to gain multiplier lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GainTable {
    entries: &'static [i32; VOLUME_STEPS],
}

impl Default for GainTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl GainTable {
    pub const fn standard() -> Self {
        Self {
            entries: &VOLUME_TABLE,
        }
    }

    /// Gain multiplier for a volume index, clamped to 0..=100
    #[inline]
    pub fn gain(&self, volume: u8) -> i32 {
        self.entries[usize::from(volume.min(MAX_VOLUME))]
    }

    pub fn entries(&self) -> &[i32] {
        self.entries
    }

    /// Normalised 0..=1 level for a tick's mean squared amplitude
    ///
    /// The level is the first index whose gain exceeds twice the amplitude,
    /// divided by 100.
    pub fn level_from_mean_square(&self, mean_square: u32) -> f32 {
        let doubled = u64::from(mean_square) * 2;
        let index = self
            .entries
            .iter()
            .position(|&g| doubled < g as u64)
            .unwrap_or(VOLUME_STEPS);
        (index as f32 / 100.0).min(1.0)
    }
}

/// Per-channel displayed level with instant rise and step-limited fall
///
/// Written by the decode context, read by the control context.
#[derive(Debug)]
pub struct LevelMeter {
    left: AtomicU32,
    right: AtomicU32,
    fall_step: f32,
}

impl LevelMeter {
    pub fn new(fall_step: f32) -> Self {
        Self {
            left: AtomicU32::new(0f32.to_bits()),
            right: AtomicU32::new(0f32.to_bits()),
            fall_step,
        }
    }

    /// Feed one tick's raw levels through the ballistics
    pub fn update(&self, raw_left: f32, raw_right: f32) {
        Self::follow(&self.left, raw_left, self.fall_step);
        Self::follow(&self.right, raw_right, self.fall_step);
    }

    /// Force both channels to zero
    pub fn reset(&self) {
        self.left.store(0f32.to_bits(), Ordering::Relaxed);
        self.right.store(0f32.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> (f32, f32) {
        (
            f32::from_bits(self.left.load(Ordering::Relaxed)),
            f32::from_bits(self.right.load(Ordering::Relaxed)),
        )
    }

    fn follow(slot: &AtomicU32, raw: f32, step: f32) {
        let shown = f32::from_bits(slot.load(Ordering::Relaxed));
        let next = if shown - step > raw { shown - step } else { raw };
        slot.store(next.to_bits(), Ordering::Relaxed);
    }
}
