//! Default capability profiles for each engine kind.

use crate::simulated::SimulatedEngine;
use montage_abstraction::{EngineConstructor, EngineInfo, EngineKind, VideoEngine};
use serde_json::json;
use std::sync::Arc;

const SQUARE_TIERS: [(u32, u32); 3] = [(480, 480), (720, 720), (1080, 1080)];

/// Returns the published capability profile for `kind`.
pub fn default_info(kind: EngineKind) -> EngineInfo {
    let info = EngineInfo::new(kind);
    match kind {
        EngineKind::CogVideoXFlash => info
            .with_description("Zhipu AI free video model for image-to-video and text-to-video")
            .with_max_duration(10.0)
            .with_resolutions(vec![
                (720, 480),
                (1024, 1024),
                (1280, 960),
                (960, 1280),
                (1920, 1080),
                (1080, 1920),
                (2048, 1080),
                (3840, 2160),
            ])
            .with_fps(vec![30, 60])
            .with_rate_limit(60)
            .with_max_concurrent_tasks(3),
        EngineKind::Vheer => info
            .with_version("1.0.0")
            .with_description("Free image-to-video service driven through a browser session")
            .with_inputs(true, false)
            .with_resolutions(vec![(512, 512), (1024, 1024)])
            .with_fps(vec![24, 30])
            .with_rate_limit(60)
            .with_max_concurrent_tasks(1),
        EngineKind::DoubaoSeedancePro => info
            .with_description("Volcengine image-to-video model using a first frame plus a text prompt")
            .with_cost_per_second(0.02)
            .with_inputs(true, false)
            .with_resolutions(SQUARE_TIERS.to_vec())
            .with_fps(vec![30])
            .with_rate_limit(60)
            .with_max_concurrent_tasks(10),
        EngineKind::DoubaoSeedanceLite => info
            .with_description("Cost-optimized Seedance variant")
            .with_cost_per_second(0.013)
            .with_resolutions(SQUARE_TIERS.to_vec())
            .with_fps(vec![24])
            .with_rate_limit(600)
            .with_max_concurrent_tasks(5),
        EngineKind::PixVerse => info
            .with_description("PixVerse free tier")
            .with_max_duration(8.0)
            .with_resolutions(vec![(1280, 720), (720, 1280), (1024, 1024)])
            .with_fps(vec![24])
            .with_rate_limit(30),
        EngineKind::ReplicateSvd => info
            .with_description("Stable Video Diffusion hosted on Replicate")
            .with_cost_per_second(0.01)
            .with_inputs(true, false)
            .with_max_duration(4.0)
            .with_resolutions(vec![(1024, 576), (576, 1024)])
            .with_fps(vec![6, 14, 25])
            .with_max_concurrent_tasks(2),
        EngineKind::Haiper => info
            .with_description("Haiper free tier")
            .with_max_duration(6.0)
            .with_resolutions(vec![(1280, 720), (1024, 1024)])
            .with_fps(vec![24])
            .with_rate_limit(20),
        EngineKind::RunwayMl => info
            .with_description("Runway Gen-3 API")
            .with_cost_per_second(0.05)
            .with_resolutions(vec![(1280, 768), (768, 1280)])
            .with_fps(vec![24])
            .with_max_concurrent_tasks(2),
        EngineKind::PikaLabs => info
            .with_description("Pika Labs API")
            .with_cost_per_second(0.04)
            .with_max_duration(5.0)
            .with_resolutions(vec![(1280, 720), (1024, 1024)])
            .with_fps(vec![24]),
    }
}

/// Constructor that builds a [`SimulatedEngine`] for `kind` from its
/// configuration blob.
pub fn simulated_constructor(kind: EngineKind) -> EngineConstructor {
    Arc::new(move |params| {
        let engine = SimulatedEngine::from_config(kind, params)?;
        Ok(Arc::new(engine) as Arc<dyn VideoEngine>)
    })
}

/// Like [`simulated_constructor`], but the engine writes a placeholder file
/// for every clip unless the blob sets `write_artifact` itself.
pub fn writing_simulated_constructor(kind: EngineKind) -> EngineConstructor {
    Arc::new(move |params| {
        let mut params = if params.is_null() { json!({}) } else { params.clone() };
        if let Some(map) = params.as_object_mut() {
            map.entry("write_artifact").or_insert(json!(true));
        }
        let engine = SimulatedEngine::from_config(kind, &params)?;
        Ok(Arc::new(engine) as Arc<dyn VideoEngine>)
    })
}
