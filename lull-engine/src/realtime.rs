//! Realtime output through CPAL.
//!
//! The stream callback owns the [`Renderer`]: it drains pending transactions at
//! the top of every device block, then pulls one stereo frame per device frame.
//! Mono devices get the folded mix; channels past the second repeat left/right.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use crate::backend::AudioBackend;
use crate::error::{EngineError, EngineResult};
use crate::graph::Renderer;

/// Names of every output device on the default host.
pub fn list_output_devices() -> EngineResult<Vec<String>> {
    let host = cpal::default_host();
    let devices = host.output_devices().map_err(|e| EngineError::unavailable(e.to_string()))?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

fn pick_device(name: Option<&str>) -> EngineResult<cpal::Device> {
    let host = cpal::default_host();
    if let Some(name) = name {
        let devices = host.output_devices().map_err(|e| EngineError::unavailable(e.to_string()))?;
        for d in devices {
            if d.name().is_ok_and(|n| n == name) {
                return Ok(d);
            }
        }
        return Err(EngineError::unavailable(format!("requested device not found: {name}")));
    }
    host.default_output_device()
        .ok_or_else(|| EngineError::unavailable("no default output device"))
}

fn choose_config(device: &cpal::Device, req_sr: Option<u32>) -> EngineResult<cpal::SupportedStreamConfig> {
    let Some(sr) = req_sr else {
        return device.default_output_config().map_err(|e| EngineError::unavailable(e.to_string()));
    };

    // Prefer a stereo range containing the requested rate, else the nearest one.
    let ranges = device.supported_output_configs().map_err(|e| EngineError::unavailable(e.to_string()))?;
    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in ranges {
        let lo = range.min_sample_rate().0;
        let hi = range.max_sample_rate().0;
        let sr_pen = if (lo..=hi).contains(&sr) { 0 } else { u64::from(lo.abs_diff(sr).min(hi.abs_diff(sr))) };
        let ch_pen = u64::from(range.channels().abs_diff(2));
        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or_else(|| EngineError::unavailable("no supported output configs"))?;
    let pick = sr.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
    Ok(range.with_sample_rate(cpal::SampleRate(pick)))
}

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut renderer: Renderer,
) -> EngineResult<cpal::Stream>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let channels = usize::from(cfg.channels).max(1);
    let err_fn = |e: cpal::StreamError| error!(error = %e, "output stream error");

    device
        .build_output_stream(
            cfg,
            move |output: &mut [T], _: &cpal::OutputCallbackInfo| {
                renderer.begin_block();
                for frame in output.chunks_mut(channels) {
                    let f = renderer.next_frame();
                    if channels == 1 {
                        frame[0] = T::from_sample((0.5 * (f[0] + f[1])).clamp(-1.0, 1.0));
                        continue;
                    }
                    for (c, s) in frame.iter_mut().enumerate() {
                        *s = T::from_sample(f[c % 2].clamp(-1.0, 1.0));
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| EngineError::unavailable(e.to_string()))
}

/// Backend driving the default (or a named) CPAL output device.
pub struct CpalBackend {
    device: Option<String>,
    sample_rate: Option<u32>,
    stream: Option<cpal::Stream>,
}

impl CpalBackend {
    /// `device = None` uses the host default; `sample_rate = None` the device default.
    pub fn new(device: Option<String>, sample_rate: Option<u32>) -> Self {
        Self { device, sample_rate, stream: None }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl AudioBackend for CpalBackend {
    fn launch(&mut self, renderer: Renderer) -> EngineResult<u32> {
        let device = pick_device(self.device.as_deref())?;
        let supported = choose_config(&device, self.sample_rate)?;
        let format = supported.sample_format();
        let cfg = supported.config();

        let stream = match format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &cfg, renderer)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &cfg, renderer)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &cfg, renderer)?,
            other => return Err(EngineError::unavailable(format!("unsupported device sample format: {other:?}"))),
        };
        stream.play().map_err(|e| EngineError::unavailable(e.to_string()))?;

        info!(
            device = %device.name().unwrap_or_else(|_| "<unnamed>".into()),
            sample_rate = cfg.sample_rate.0,
            channels = cfg.channels,
            format = ?format,
            "output stream started"
        );
        self.stream = Some(stream);
        Ok(cfg.sample_rate.0)
    }

    fn suspend(&mut self) -> EngineResult<()> {
        match &self.stream {
            Some(s) => s.pause().map_err(|e| EngineError::Stream(e.to_string())),
            None => Ok(()),
        }
    }

    fn resume(&mut self) -> EngineResult<()> {
        match &self.stream {
            Some(s) => s.play().map_err(|e| EngineError::Stream(e.to_string())),
            None => Ok(()),
        }
    }
}
