//! Native audio output — drives the engine's pull interface from a cpal
//! output stream. Only compiled with the `playback` feature.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use crate::engine::{CHANNELS, Engine, SAMPLE_RATE};
use crate::error::PlaybackError;

/// Open the default output device and start pulling from the engine.
///
/// The returned stream keeps playing until dropped; the engine itself stays
/// fully controllable from other threads while the callback runs.
pub fn start(engine: Arc<Engine>) -> Result<cpal::Stream, PlaybackError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(PlaybackError::NoOutputDevice)?;
    let supported = device
        .default_output_config()
        .map_err(|e| PlaybackError::Stream(e.to_string()))?;
    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(PlaybackError::UnsupportedFormat {
            format: format!("{:?}", supported.sample_format()),
        });
    }

    let config = cpal::StreamConfig {
        channels: CHANNELS as u16,
        sample_rate: cpal::SampleRate(SAMPLE_RATE as u32),
        buffer_size: cpal::BufferSize::Default,
    };

    info!(
        device = device.name().unwrap_or_else(|_| "unknown".to_string()),
        rate = SAMPLE_RATE,
        "starting output stream"
    );

    let err_fn = |err: cpal::StreamError| error!(%err, "output stream error");
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                engine.read(data);
            },
            err_fn,
            None,
        )
        .map_err(|e| PlaybackError::Stream(e.to_string()))?;
    stream
        .play()
        .map_err(|e| PlaybackError::Stream(e.to_string()))?;
    Ok(stream)
}
