use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
/// Desired accuracy to request from the platform, ordered finest first
pub enum AccuracyTier {
    #[default]
    Best,
    NearestTenMeters,
    HundredMeters,
    /// Approximate location only, not available on every platform
    Reduced,
}

impl AccuracyTier {
    pub const ALL: [Self; 4] = [
        Self::Best,
        Self::NearestTenMeters,
        Self::HundredMeters,
        Self::Reduced,
    ];

    /// Map the channel's integer priority onto a tier, `None` when out of range
    pub fn from_priority(priority: i64) -> Option<Self> {
        match priority {
            0 => Some(Self::Best),
            1 => Some(Self::NearestTenMeters),
            2 => Some(Self::HundredMeters),
            3 => Some(Self::Reduced),
            _ => None,
        }
    }

    pub fn priority(self) -> i64 {
        match self {
            Self::Best => 0,
            Self::NearestTenMeters => 1,
            Self::HundredMeters => 2,
            Self::Reduced => 3,
        }
    }

    /// The tier to try next when this one isn't supported
    fn fallback(self) -> Option<Self> {
        match self {
            Self::Best => None,
            Self::NearestTenMeters => Some(Self::Best),
            Self::HundredMeters => Some(Self::NearestTenMeters),
            Self::Reduced => Some(Self::Best),
        }
    }

    /// Walk the fallback chain until a tier accepted by `supported` is found.
    /// Ends at [AccuracyTier::Best] if nothing in the chain is supported.
    pub fn resolve(self, supported: impl Fn(Self) -> bool) -> Self {
        let mut tier = self;
        loop {
            if supported(tier) {
                return tier;
            }
            match tier.fallback() {
                Some(next) => tier = next,
                None => return tier,
            }
        }
    }
}
