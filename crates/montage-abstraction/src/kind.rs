//! Identifiers for the supported video generation backends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A video generation backend.
///
/// Variants are declared in the default priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Zhipu CogVideoX-Flash (free tier).
    #[serde(rename = "cogvideox_flash")]
    CogVideoXFlash,
    /// Vheer browser-driven generator (free).
    Vheer,
    /// Doubao Seedance Pro (paid).
    DoubaoSeedancePro,
    /// Doubao Seedance Lite (paid).
    DoubaoSeedanceLite,
    /// PixVerse.
    #[serde(rename = "pixverse")]
    PixVerse,
    /// Stable Video Diffusion hosted on Replicate.
    ReplicateSvd,
    /// Haiper.
    Haiper,
    /// Runway ML.
    RunwayMl,
    /// Pika Labs.
    PikaLabs,
}

impl EngineKind {
    /// Every kind, in default priority order.
    pub const ALL: [Self; 9] = [
        Self::CogVideoXFlash,
        Self::Vheer,
        Self::DoubaoSeedancePro,
        Self::DoubaoSeedanceLite,
        Self::PixVerse,
        Self::ReplicateSvd,
        Self::Haiper,
        Self::RunwayMl,
        Self::PikaLabs,
    ];

    /// Stable identifier used in configuration files and on the command line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CogVideoXFlash => "cogvideox_flash",
            Self::Vheer => "vheer",
            Self::DoubaoSeedancePro => "doubao_seedance_pro",
            Self::DoubaoSeedanceLite => "doubao_seedance_lite",
            Self::PixVerse => "pixverse",
            Self::ReplicateSvd => "replicate_svd",
            Self::Haiper => "haiper",
            Self::RunwayMl => "runway_ml",
            Self::PikaLabs => "pika_labs",
        }
    }

    /// Human-readable name.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::CogVideoXFlash => "CogVideoX-Flash",
            Self::Vheer => "Vheer",
            Self::DoubaoSeedancePro => "Doubao Seedance Pro",
            Self::DoubaoSeedanceLite => "Doubao Seedance Lite",
            Self::PixVerse => "PixVerse",
            Self::ReplicateSvd => "Replicate SVD",
            Self::Haiper => "Haiper",
            Self::RunwayMl => "Runway ML",
            Self::PikaLabs => "Pika Labs",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown engine kind: {0}")]
pub struct ParseEngineKindError(pub String);

impl FromStr for EngineKind {
    type Err = ParseEngineKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseEngineKindError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("CogVideoX_Flash".parse::<EngineKind>(), Ok(EngineKind::CogVideoXFlash));
        assert_eq!("runway-ml".parse::<EngineKind>(), Ok(EngineKind::RunwayMl));
        assert!("sora".parse::<EngineKind>().is_err());
    }

    #[test]
    fn test_serde_names_match_display() {
        for kind in EngineKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }
}
