//! Integration tests for the engine facade driven through the offline backend.

use lull_engine::{
    BinauralParams, BinauralUpdate, BufferKind, Engine, EngineConfig, EngineError, Mode, NoiseColor, NoiseParams,
    NoiseUpdate, OfflineTap, TextureKind,
};
use pretty_assertions::assert_eq;

const SR: u32 = 8_000;

fn engine() -> (Engine<lull_engine::OfflineBackend>, OfflineTap) {
    let config = EngineConfig { noise_seconds: 0.25, texture_seconds: 0.5, ..EngineConfig::seeded(42) };
    Engine::offline(config, SR)
}

fn peak(samples: impl Iterator<Item = f32>) -> f32 {
    samples.fold(0.0, |m, s| m.max(s.abs()))
}

fn enter(engine: &mut Engine<lull_engine::OfflineBackend>, mode: Mode) {
    match mode {
        Mode::Idle => {}
        Mode::Binaural => engine.start_binaural(BinauralParams::new(400.0, 10.0, 0.5)).unwrap(),
        Mode::Noise => engine
            .start_noise(NoiseParams::new(NoiseColor::Brown, 0.5).with_texture(TextureKind::Ocean, 0.3))
            .unwrap(),
    }
}

#[test]
fn test_stop_from_every_state_leaves_idle_and_empty() {
    for mode in [Mode::Idle, Mode::Binaural, Mode::Noise] {
        let (mut engine, tap) = engine();
        enter(&mut engine, mode);
        tap.flush();

        engine.stop().unwrap();
        engine.stop().unwrap();
        tap.flush();

        assert_eq!(engine.mode(), Mode::Idle, "from {mode:?}");
        assert!(engine.live_nodes().is_empty(), "from {mode:?}");
        assert_eq!(tap.node_count(), 0, "from {mode:?}");
        assert!(!engine.get_state().is_playing);
    }
}

#[test]
fn test_color_change_leaves_texture_and_bus_alone() {
    let (mut engine, tap) = engine();
    engine
        .start_noise(NoiseParams::new(NoiseColor::White, 0.5).with_texture(TextureKind::Rain, 0.3))
        .unwrap();
    tap.flush();
    let texture = engine.texture_layer().unwrap();
    let bus = engine.mix_bus().unwrap();
    let old_color = engine.noise_layer().unwrap();
    assert_eq!(tap.with_graph(|g| g.is_running(texture.player)), Some(true));

    engine.update_noise(NoiseUpdate::color(NoiseColor::Pink)).unwrap();
    tap.flush();

    assert_eq!(engine.texture_layer(), Some(texture));
    assert_eq!(engine.mix_bus(), Some(bus));

    let new_color = engine.noise_layer().unwrap();
    assert_eq!(new_color.kind, BufferKind::Noise(NoiseColor::Pink));
    assert_ne!(new_color.player, old_color.player);

    let (old_gone, new_running, texture_running) = tap
        .with_graph(|g| (!g.contains(old_color.player), g.is_running(new_color.player), g.is_running(texture.player)))
        .unwrap();
    assert!(old_gone && new_running && texture_running);
    assert_eq!(tap.node_count(), 6);
}

#[test]
fn test_beat_update_moves_right_ear_only() {
    let (mut engine, tap) = engine();
    engine.start_binaural(BinauralParams::new(400.0, 10.0, 0.5)).unwrap();
    let voice = engine.binaural_voice().unwrap();

    engine.update_binaural(BinauralUpdate::beat(16.0)).unwrap();
    tap.flush();

    assert_eq!(engine.binaural_frequencies(), Some((400.0, 416.0)));
    assert_eq!(engine.binaural_voice(), Some(voice));
    let freqs = tap.with_graph(|g| (g.frequency(voice.left), g.frequency(voice.right))).unwrap();
    assert_eq!(freqs, (Some(400.0), Some(416.0)));
}

#[test]
fn test_same_color_restart_reuses_cached_buffer() {
    let (mut engine, _tap) = engine();
    engine.start_noise(NoiseParams::new(NoiseColor::Pink, 0.5)).unwrap();
    engine.stop_noise().unwrap();
    engine.start_noise(NoiseParams::new(NoiseColor::Pink, 0.5)).unwrap();
    assert_eq!(engine.cache().synthesis_count(), 1);
}

#[test]
fn test_updates_while_idle_are_reported() {
    let (mut engine, _tap) = engine();
    assert_eq!(
        engine.update_binaural(BinauralUpdate::beat(8.0)),
        Err(EngineError::NotActive { requested: Mode::Binaural, current: Mode::Idle })
    );
    engine.start_binaural(BinauralParams::default()).unwrap();
    assert_eq!(
        engine.update_noise(NoiseUpdate::volume(0.1)),
        Err(EngineError::NotActive { requested: Mode::Noise, current: Mode::Binaural })
    );
    assert_eq!(engine.mode(), Mode::Binaural);
}

#[test]
fn test_mode_switch_is_one_call() {
    let (mut engine, tap) = engine();
    engine.start_binaural(BinauralParams::default()).unwrap();
    engine.start_noise(NoiseParams::new(NoiseColor::Green, 0.4)).unwrap();
    tap.flush();
    assert_eq!(engine.mode(), Mode::Noise);
    assert_eq!(engine.binaural_voice(), None);
    assert_eq!(engine.live_nodes().len(), 4);
    assert_eq!(tap.node_count(), 4);
}

#[test]
fn test_binaural_renders_both_ears() {
    let (mut engine, tap) = engine();
    engine.start_binaural(BinauralParams::new(400.0, 10.0, 0.5)).unwrap();
    let out = tap.render(2_000);
    let left = peak(out.iter().copied().step_by(2));
    let right = peak(out.iter().copied().skip(1).step_by(2));
    assert!(left > 0.4 && left <= 0.5 + 1e-3, "left={left}");
    assert!(right > 0.4 && right <= 0.5 + 1e-3, "right={right}");
}

#[test]
fn test_noise_goes_silent_after_stop() {
    let (mut engine, tap) = engine();
    engine.start_noise(NoiseParams::new(NoiseColor::White, 0.8)).unwrap();
    assert!(peak(tap.render(1_000).into_iter()) > 0.1);
    engine.stop().unwrap();
    assert_eq!(peak(tap.render(1_000).into_iter()), 0.0);
}

#[test]
fn test_params_survive_stop_in_snapshot() {
    let (mut engine, _tap) = engine();
    engine.start_binaural(BinauralParams::new(320.0, 6.0, 0.7)).unwrap();
    engine.stop().unwrap();
    let state = engine.get_state();
    assert_eq!(state.mode, Mode::Idle);
    assert_eq!(state.binaural, BinauralParams::new(320.0, 6.0, 0.7));
}

#[test]
fn test_out_of_range_is_clamped_and_nan_rejected() {
    let (mut engine, _tap) = engine();
    engine.start_binaural(BinauralParams::new(1_000.0, 30.0, 2.0)).unwrap();
    assert_eq!(engine.get_state().binaural, BinauralParams::new(600.0, 20.0, 1.0));

    let err = engine.update_binaural(BinauralUpdate::volume(f32::NAN)).unwrap_err();
    assert!(matches!(err, EngineError::InvalidParameter { name: "volume", .. }));
    assert_eq!(engine.get_state().binaural.volume, 1.0);
}

#[test]
fn test_prewarm_then_start_does_not_resynthesize() {
    let (mut engine, _tap) = engine();
    let kinds = [BufferKind::Noise(NoiseColor::Brown), BufferKind::Texture(TextureKind::Wind)];
    let warmed = engine.prewarm(&kinds).unwrap();
    engine
        .start_noise(NoiseParams::new(NoiseColor::Brown, 0.5).with_texture(TextureKind::Wind, 0.2))
        .unwrap();
    assert_eq!(warmed.join().unwrap(), 2);
    assert_eq!(engine.cache().synthesis_count(), 2);
}

#[test]
fn test_stop_while_interrupted_after_many_updates() {
    let (mut engine, tap) = engine();
    engine.start_noise(NoiseParams::new(NoiseColor::Pink, 0.5)).unwrap();
    tap.flush();
    engine.interruption_began().unwrap();

    for i in 0..200 {
        engine.update_noise(NoiseUpdate::volume(0.2 + (i % 50) as f32 / 100.0)).unwrap();
    }
    engine.stop().unwrap();
    assert_eq!(engine.mode(), Mode::Idle);
    assert!(engine.live_nodes().is_empty());

    engine.interruption_ended().unwrap();
    tap.flush();
    assert_eq!(tap.node_count(), 0);
}

#[test]
fn test_retunes_while_interrupted_keep_the_last_value() {
    let (mut engine, tap) = engine();
    engine.start_binaural(BinauralParams::new(400.0, 10.0, 0.5)).unwrap();
    tap.flush();
    let voice = engine.binaural_voice().unwrap();
    engine.interruption_began().unwrap();

    for beat in (0..300).map(|i| 4.0 + (i % 16) as f32) {
        engine.update_binaural(BinauralUpdate::beat(beat)).unwrap();
    }
    engine.update_binaural(BinauralUpdate::beat(12.0)).unwrap();
    engine.interruption_ended().unwrap();
    assert!(!tap.is_suspended());

    tap.flush();
    let freqs = tap.with_graph(|g| (g.frequency(voice.left), g.frequency(voice.right))).unwrap();
    assert_eq!(freqs, (Some(400.0), Some(412.0)));
    assert_eq!(engine.binaural_frequencies(), Some((400.0, 412.0)));
}
