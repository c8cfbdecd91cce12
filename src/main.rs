//! Headless demo: renders the haptic drive into the default output (or a
//! WAV file) while a simulated balance plate streams through the CoP
//! pipeline, so the whole cancellation loop can be watched from the log.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vibrastance::audio::{AudioOutput, OutputGuard, OutputGuardMode, WavOutput};
use vibrastance::cancel::CancelConfig;
use vibrastance::config::AppConfig;
use vibrastance::haptic::{HapticSynth, PhaseCell, SharedParams, SignalType};
use vibrastance::pipeline::BalancePipeline;
use vibrastance::plate::{PlateGeometry, SensorFrame};
use vibrastance::sim::PlateSim;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SignalArg {
    Sine,
    BandNoise,
    Snow,
}

impl From<SignalArg> for SignalType {
    fn from(s: SignalArg) -> Self {
        match s {
            SignalArg::Sine => SignalType::Sine,
            SignalArg::BandNoise => SignalType::BandNoise,
            SignalArg::Snow => SignalType::Snow,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
struct Args {
    /// Play audio in realtime
    #[arg(long, default_value_t = true, num_args = 0..=1, default_missing_value = "true")]
    play: bool,

    /// Write the rendered drive signal to a wav file
    #[arg(long)]
    wav: Option<String>,

    /// Path to config TOML
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Run length in seconds
    #[arg(long, default_value_t = 12.0)]
    duration: f32,

    /// Override the configured signal type
    #[arg(long, value_enum)]
    signal: Option<SignalArg>,

    /// Override the configured drive frequency (Hz)
    #[arg(long)]
    frequency: Option<f32>,
}

fn main() -> anyhow::Result<()> {
    // Info default when RUST_LOG is unset; timestamps add nothing to a
    // short demo run.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .without_time()
        .try_init();

    let args = Args::parse();
    let mut config = AppConfig::load_or_default(&args.config);
    if let Some(freq) = args.frequency {
        config.haptic.frequency_hz = freq;
    }

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_for_ctrlc = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_for_ctrlc.store(true, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");

    let params = Arc::new(SharedParams::new(
        config.haptic.frequency_hz,
        config.haptic.amplitude,
    ));
    params.set_velocity(config.haptic.velocity);
    params.set_noise_bandwidth(config.haptic.noise_bandwidth_hz);
    match args.signal {
        Some(s) => params.set_signal(s.into()),
        None => params.set_signal(config.haptic.signal.clone().into()),
    }
    let phase_cell = Arc::new(PhaseCell::new());

    // Device output (optional) decides the render rate.
    let mut audio_out = None;
    let mut producer = None;
    let mut sample_rate = config.audio.sample_rate;
    if args.play {
        match AudioOutput::new(config.audio.latency_ms) {
            Ok((out, prod)) => {
                sample_rate = out.config.sample_rate.0;
                audio_out = Some(out);
                producer = Some(prod);
            }
            Err(err) => {
                info!("No audio device ({err:#}); rendering without playback");
            }
        }
    }

    let mut synth = HapticSynth::new(sample_rate as f32, params.clone(), phase_cell.clone());

    let (wav_tx, wav_handle) = match &args.wav {
        Some(path) => {
            let (tx, rx) = crossbeam_channel::unbounded::<Arc<[f32]>>();
            let handle = WavOutput::run(rx, path.clone(), sample_rate, OutputGuardMode::default());
            (Some(tx), Some(handle))
        }
        None => (None, None),
    };

    // Audio domain: render fixed blocks until told to stop.
    let render_stop = stop_flag.clone();
    let render_handle = std::thread::spawn(move || {
        const BLOCK_FRAMES: usize = 512;
        let mut block = vec![0.0f32; BLOCK_FRAMES * 2];
        let mut guard = OutputGuard::new(OutputGuardMode::default(), sample_rate);
        let block_period = Duration::from_secs_f32(BLOCK_FRAMES as f32 / sample_rate as f32);
        while !render_stop.load(Ordering::SeqCst) {
            synth.render(&mut block);
            guard.process_interleaved(&mut block, 2);
            if let Some(tx) = wav_tx.as_ref() {
                let _ = tx.send(Arc::from(block.as_slice()));
            }
            match producer.as_mut() {
                // The queue provides the pacing.
                Some(prod) => AudioOutput::push_samples(prod, &block),
                None => std::thread::sleep(block_period),
            }
        }
    });

    // Sensor domain: simulated plate frames at the configured rate.
    let sensor_rate = config.plate.sensor_rate_hz;
    let mut sim = PlateSim::new(PlateGeometry::default(), sensor_rate);
    sim.ripple_freq_hz = config.haptic.frequency_hz;
    let (frame_tx, frame_rx) = crossbeam_channel::bounded::<SensorFrame>(8);
    let sensor_stop = stop_flag.clone();
    let sensor_handle = std::thread::spawn(move || {
        let period = Duration::from_secs_f32(1.0 / sensor_rate);
        let mut n = 0u64;
        while !sensor_stop.load(Ordering::SeqCst) {
            if frame_tx.send(sim.frame(n)).is_err() {
                break;
            }
            n += 1;
            std::thread::sleep(period);
        }
    });

    let mut pipeline = BalancePipeline::new(
        PlateGeometry::default(),
        CancelConfig {
            sensor_rate_hz: sensor_rate,
            frequency_hz: config.haptic.frequency_hz,
            harmonics: config.compensation.harmonics,
            step_size: config.compensation.step_size,
            ..CancelConfig::default()
        },
        phase_cell.clone(),
        params.clone(),
    );
    pipeline.set_compensation_notch(config.compensation.use_notch);
    pipeline
        .estimator_mut()
        .set_on_calibration_complete(Box::new(|outcome| {
            info!(
                "calibration complete: offset=({:.2}, {:.2}) mm tare={:.1} kg",
                outcome.offset_x, outcome.offset_y, outcome.tare_kg
            );
        }));
    pipeline
        .estimator_mut()
        .set_on_calibration_failed(Box::new(|accepted| {
            info!("calibration failed: only {accepted} accepted samples");
        }));
    pipeline
        .canceller_mut()
        .set_on_converged(Box::new(|snr_db| {
            info!("canceller converged at {snr_db:.1} dB improvement");
        }));

    info!(
        "demo: {:.0} s, drive {:.0} Hz, {:?}",
        args.duration,
        config.haptic.frequency_hz,
        params.signal()
    );

    // Tare the simulated stance first; the drive engages afterwards.
    pipeline.start_calibration();

    let started = Instant::now();
    let base_amplitude = params.amplitude();
    let mut pulse_until: Option<Instant> = None;
    let mut last_report = Instant::now();
    while !stop_flag.load(Ordering::SeqCst) && started.elapsed().as_secs_f32() < args.duration {
        let frame = match frame_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(f) => f,
            Err(_) => continue,
        };
        let sample = pipeline.process(frame);

        if !params.is_playing() && !pipeline.estimator().calibration().in_progress() {
            info!("engaging haptic drive");
            params.set_playing(true);
        }

        // One short amplitude pulse mid-run: parameter cells are live, no
        // scheduling machinery required.
        let now = Instant::now();
        if params.is_playing() && pulse_until.is_none() && started.elapsed().as_secs_f32() > 6.0 {
            params.set_amplitude(base_amplitude * 1.5);
            pulse_until = Some(now + Duration::from_millis(300));
            info!("pulse: amplitude raised");
        }
        if let Some(deadline) = pulse_until {
            if now >= deadline && params.amplitude() != base_amplitude {
                params.set_amplitude(base_amplitude);
                info!("pulse: amplitude restored");
            }
        }

        if now.duration_since(last_report) >= Duration::from_secs(1) {
            last_report = now;
            let m = pipeline.metrics();
            info!(
                "cop=({:+6.2}, {:+6.2}) mm weight={:5.1} kg snr={:5.1} dB converged={}",
                sample.x, sample.y, sample.weight_kg, m.snr_improvement_estimate, m.converged
            );
        }
    }

    stop_flag.store(true, Ordering::SeqCst);
    drop(frame_rx);
    let _ = sensor_handle.join();
    let _ = render_handle.join();
    if let Some(handle) = wav_handle {
        let _ = handle.join();
    }
    if let Some(mut out) = audio_out {
        out.stop();
    }

    let m = pipeline.metrics();
    info!(
        "done: {} samples, snr {:.1} dB, converged={}",
        m.samples, m.snr_improvement_estimate, m.converged
    );
    Ok(())
}
