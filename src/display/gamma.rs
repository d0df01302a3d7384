// src/display/gamma.rs

//! Per-channel gamma translation tables.

/// Three 256-entry translation tables, one per color channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GammaRamp {
    pub red: [u16; 256],
    pub green: [u16; 256],
    pub blue: [u16; 256],
}

impl GammaRamp {
    /// The ramp that maps every input to itself (`i * 257`).
    pub fn identity() -> Self {
        let mut table = [0u16; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = (i as u16) * 257;
        }
        GammaRamp {
            red: table,
            green: table,
            blue: table,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == GammaRamp::identity()
    }
}

impl Default for GammaRamp {
    fn default() -> Self {
        GammaRamp::identity()
    }
}
