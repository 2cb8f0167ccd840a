/// Sampling rate and block size negotiated with the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSettings {
    pub sampling_rate: u32,
    /// Frames per processing block.
    pub frame_size: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sampling_rate: 48000,
            frame_size: 1024,
        }
    }
}

impl AudioSettings {
    pub fn new(sampling_rate: u32, frame_size: u32) -> Self {
        Self {
            sampling_rate,
            frame_size,
        }
    }

    /// Replaces zero fields with the values from `fallback`.
    ///
    /// Some hosts report a zero block size before the mixer has started.
    pub fn or(self, fallback: AudioSettings) -> Self {
        Self {
            sampling_rate: if self.sampling_rate == 0 {
                fallback.sampling_rate
            } else {
                self.sampling_rate
            },
            frame_size: if self.frame_size == 0 {
                fallback.frame_size
            } else {
                self.frame_size
            },
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size as usize
    }
}
