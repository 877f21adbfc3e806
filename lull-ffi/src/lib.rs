//! C ABI wrapper for the lull engine.
//!
//! Exposes functions to create/destroy an engine, drive its modes and read a
//! state snapshot. Offline engines can also be pulled for audio directly.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Opaque handle type: `LullEngine` (heap-allocated; you own/delete it).
//! - Every control call returns a status: 0 ok, 1 mode not active, 2 audio
//!   unavailable, 3 command queue full, 4 invalid parameter, 5 stream error,
//!   -1 null handle.
//! - Partial updates take NaN (floats) or -1 (enums) for "leave unchanged".
//! - Enums: mode 0 idle / 1 binaural / 2 noise; color 0 white / 1 pink /
//!   2 brown / 3 green; texture 0 none / 1 wind / 2 rain / 3 ocean.
//!
//! Threading
//! - The object is NOT thread-safe; call all functions from one control thread.
//!   Audio is rendered on the backend's own thread.

use tracing::warn;

use lull_engine::{
    AudioBackend, BinauralParams, BinauralUpdate, Engine, EngineConfig, EngineError, EngineResult, Mode, NoiseColor,
    NoiseParams, NoiseUpdate, OfflineTap, TextureKind,
};

pub const LULL_OK: i32 = 0;
pub const LULL_ERR_NULL: i32 = -1;

/// Opaque engine wrapper we hand to C.
pub struct LullEngine {
    inner: Engine<Box<dyn AudioBackend>>,
    /// Present for offline engines only.
    tap: Option<OfflineTap>,
}

/// Flat state snapshot filled by `lull_get_state`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct LullState {
    pub mode: i32,
    pub is_playing: bool,
    pub carrier: f32,
    pub beat: f32,
    pub binaural_volume: f32,
    pub color: i32,
    pub noise_volume: f32,
    pub texture: i32,
    pub texture_volume: f32,
}

fn config_for(sample_rate: u32, seed: i64) -> EngineConfig {
    EngineConfig {
        sample_rate: (sample_rate > 0).then_some(sample_rate),
        seed: u64::try_from(seed).ok(),
        ..EngineConfig::default()
    }
}

fn into_raw(engine: LullEngine) -> *mut LullEngine {
    Box::into_raw(Box::new(engine))
}

fn with_engine(engine: *mut LullEngine, f: impl FnOnce(&mut LullEngine) -> EngineResult<()>) -> i32 {
    // SAFETY: the caller passes a pointer from `lull_create*` that was not destroyed.
    let Some(e) = (unsafe { engine.as_mut() }) else { return LULL_ERR_NULL };
    match f(e) {
        Ok(()) => LULL_OK,
        Err(err) => {
            warn!(error = %err, "lull call failed");
            err.code()
        }
    }
}

fn color_from(code: i32) -> EngineResult<NoiseColor> {
    usize::try_from(code)
        .ok()
        .and_then(|i| NoiseColor::ALL.get(i).copied())
        .ok_or(EngineError::InvalidParameter { name: "color", value: code as f32 })
}

fn texture_from(code: i32) -> EngineResult<Option<TextureKind>> {
    match code {
        0 => Ok(None),
        _ => usize::try_from(code.saturating_sub(1))
            .ok()
            .and_then(|i| TextureKind::ALL.get(i).copied())
            .map(Some)
            .ok_or(EngineError::InvalidParameter { name: "texture", value: code as f32 }),
    }
}

fn color_code(color: NoiseColor) -> i32 {
    NoiseColor::ALL.iter().position(|&c| c == color).map_or(0, |i| i as i32)
}

fn texture_code(texture: Option<TextureKind>) -> i32 {
    texture
        .and_then(|t| TextureKind::ALL.iter().position(|&k| k == t))
        .map_or(0, |i| i as i32 + 1)
}

fn mode_code(mode: Mode) -> i32 {
    match mode {
        Mode::Idle => 0,
        Mode::Binaural => 1,
        Mode::Noise => 2,
    }
}

/// NaN means "unchanged".
fn opt(x: f32) -> Option<f32> {
    (!x.is_nan()).then_some(x)
}

// --- Creation / destruction -------------------------------------------------------

/// Create an engine on the default output device. The device opens lazily on
/// the first start call. `sample_rate = 0` takes the device default; a
/// negative `seed` seeds buffers from entropy.
#[no_mangle]
pub extern "C" fn lull_create(sample_rate: u32, seed: i64) -> *mut LullEngine {
    let config = config_for(sample_rate, seed);
    cfg_if::cfg_if! {
        if #[cfg(feature = "realtime")] {
            let backend = lull_engine::CpalBackend::new(None, config.sample_rate);
            into_raw(LullEngine { inner: Engine::new(config, Box::new(backend) as Box<dyn AudioBackend>), tap: None })
        } else {
            lull_create_offline(config.sample_rate.unwrap_or(48_000), seed)
        }
    }
}

/// Create an engine without a device; pull its audio with `lull_render_interleaved_f32`.
#[no_mangle]
pub extern "C" fn lull_create_offline(sample_rate: u32, seed: i64) -> *mut LullEngine {
    let backend = lull_engine::OfflineBackend::new(sample_rate.max(1));
    let tap = backend.tap();
    let engine = Engine::new(config_for(sample_rate, seed), Box::new(backend) as Box<dyn AudioBackend>);
    into_raw(LullEngine { inner: engine, tap: Some(tap) })
}

/// Destroy an engine previously returned by `lull_create*`.
#[no_mangle]
pub extern "C" fn lull_destroy(engine: *mut LullEngine) {
    if !engine.is_null() {
        // SAFETY: non-null pointers here come from `into_raw` and are destroyed once.
        unsafe { drop(Box::from_raw(engine)); }
    }
}

// --- Binaural --------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn lull_start_binaural(engine: *mut LullEngine, carrier: f32, beat: f32, volume: f32) -> i32 {
    with_engine(engine, |e| e.inner.start_binaural(BinauralParams::new(carrier, beat, volume)))
}

/// NaN leaves a field unchanged.
#[no_mangle]
pub extern "C" fn lull_update_binaural(engine: *mut LullEngine, carrier: f32, beat: f32, volume: f32) -> i32 {
    let update = BinauralUpdate { carrier: opt(carrier), beat: opt(beat), volume: opt(volume) };
    with_engine(engine, |e| e.inner.update_binaural(update))
}

#[no_mangle]
pub extern "C" fn lull_stop_binaural(engine: *mut LullEngine) -> i32 {
    with_engine(engine, |e| e.inner.stop_binaural())
}

// --- Noise -----------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn lull_start_noise(
    engine: *mut LullEngine,
    color: i32,
    volume: f32,
    texture: i32,
    texture_volume: f32,
) -> i32 {
    with_engine(engine, |e| {
        let params = NoiseParams {
            color: color_from(color)?,
            volume,
            texture: texture_from(texture)?,
            texture_volume,
        };
        e.inner.start_noise(params)
    })
}

/// -1 (enums) or NaN (floats) leaves a field unchanged; `texture = 0` removes the texture.
#[no_mangle]
pub extern "C" fn lull_update_noise(
    engine: *mut LullEngine,
    color: i32,
    volume: f32,
    texture: i32,
    texture_volume: f32,
) -> i32 {
    with_engine(engine, |e| {
        let update = NoiseUpdate {
            color: if color == -1 { None } else { Some(color_from(color)?) },
            volume: opt(volume),
            texture: if texture == -1 { None } else { Some(texture_from(texture)?) },
            texture_volume: opt(texture_volume),
        };
        e.inner.update_noise(update)
    })
}

#[no_mangle]
pub extern "C" fn lull_stop_noise(engine: *mut LullEngine) -> i32 {
    with_engine(engine, |e| e.inner.stop_noise())
}

// --- Lifecycle / state -----------------------------------------------------------

/// Stop whatever is playing. Safe in every state.
#[no_mangle]
pub extern "C" fn lull_stop(engine: *mut LullEngine) -> i32 {
    with_engine(engine, |e| e.inner.stop())
}

#[no_mangle]
pub extern "C" fn lull_interruption_began(engine: *mut LullEngine) -> i32 {
    with_engine(engine, |e| e.inner.interruption_began())
}

#[no_mangle]
pub extern "C" fn lull_interruption_ended(engine: *mut LullEngine) -> i32 {
    with_engine(engine, |e| e.inner.interruption_ended())
}

/// Fill `out` with the current state snapshot.
#[no_mangle]
pub extern "C" fn lull_get_state(engine: *const LullEngine, out: *mut LullState) -> i32 {
    // SAFETY: both pointers come from the caller and are checked for null.
    let (Some(e), Some(out)) = (unsafe { engine.as_ref() }, unsafe { out.as_mut() }) else {
        return LULL_ERR_NULL;
    };
    let s = e.inner.get_state();
    *out = LullState {
        mode: mode_code(s.mode),
        is_playing: s.is_playing,
        carrier: s.binaural.carrier,
        beat: s.binaural.beat,
        binaural_volume: s.binaural.volume,
        color: color_code(s.noise.color),
        noise_volume: s.noise.volume,
        texture: texture_code(s.noise.texture),
        texture_volume: s.noise.texture_volume,
    };
    LULL_OK
}

// --- Rendering -------------------------------------------------------------------

/// Render `frames` interleaved stereo f32 frames from an offline engine.
/// Returns the number of frames rendered (0 on error or for device-backed engines).
#[no_mangle]
pub extern "C" fn lull_render_interleaved_f32(engine: *mut LullEngine, out_interleaved: *mut f32, frames: u32) -> u32 {
    if engine.is_null() || out_interleaved.is_null() || frames == 0 {
        return 0;
    }
    // SAFETY: checked non-null above; a live handle from `lull_create*`.
    let e = unsafe { &mut *engine };
    let Some(tap) = &e.tap else { return 0 };
    // SAFETY: checked non-null above; the caller provides room for `frames * 2` samples.
    let out = unsafe { std::slice::from_raw_parts_mut(out_interleaved, (frames as usize) * 2) };
    out.copy_from_slice(&tap.render(frames as usize));
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn null_handle_is_reported() {
        assert_eq!(lull_stop(ptr::null_mut()), LULL_ERR_NULL);
        assert_eq!(lull_start_binaural(ptr::null_mut(), 400.0, 10.0, 0.5), LULL_ERR_NULL);
        let mut state = LullState::default();
        assert_eq!(lull_get_state(ptr::null(), &mut state), LULL_ERR_NULL);
    }

    #[test]
    fn binaural_partial_update_through_abi() {
        let e = lull_create_offline(8_000, 1);
        assert_eq!(lull_update_binaural(e, f32::NAN, 16.0, f32::NAN), 1);
        assert_eq!(lull_start_binaural(e, 400.0, 10.0, 0.5), LULL_OK);
        assert_eq!(lull_update_binaural(e, f32::NAN, 16.0, f32::NAN), LULL_OK);

        let mut state = LullState::default();
        assert_eq!(lull_get_state(e, &mut state), LULL_OK);
        assert_eq!((state.mode, state.carrier, state.beat, state.binaural_volume), (1, 400.0, 16.0, 0.5));
        assert!(state.is_playing);
        lull_destroy(e);
    }

    #[test]
    fn noise_codes_and_texture_removal() {
        let e = lull_create_offline(8_000, 2);
        assert_eq!(lull_start_noise(e, 9, 0.5, 0, 0.3), 4);
        assert_eq!(lull_start_noise(e, 1, 0.5, 2, 0.3), LULL_OK);
        assert_eq!(lull_update_noise(e, -1, f32::NAN, 0, f32::NAN), LULL_OK);

        let mut state = LullState::default();
        lull_get_state(e, &mut state);
        assert_eq!((state.mode, state.color, state.texture), (2, 1, 0));

        let mut buf = vec![0.0_f32; 2 * 256];
        assert_eq!(lull_render_interleaved_f32(e, buf.as_mut_ptr(), 256), 256);
        assert!(buf.iter().any(|&s| s != 0.0));

        assert_eq!(lull_stop(e), LULL_OK);
        assert_eq!(lull_stop(e), LULL_OK);
        lull_get_state(e, &mut state);
        assert_eq!(state.mode, 0);
        lull_destroy(e);
    }
}
