use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tilt_config::AppConfig;
use tilt_imu::fusion::{Algorithm, Gains, SensorFusion};
use tilt_imu::protocol::LineParser;
use tilt_imu::SampleSource;
use tilt_input::{dispatch, EventSink, GestureMapper, JsonLineSink, LogSink};
use tracing::{info, warn};

/// Turn a tilting IMU into arcade button presses.
///
/// Reads `A,ax,ay,az,gx,gy,gz` lines from a TCP bridge or stdin and writes
/// one JSON button event per line to stdout.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Config file. Defaults to the user config directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// `host:port` of a serial-to-TCP bridge. Overrides the config file.
    #[arg(long)]
    connect: Option<String>,

    /// Filter algorithm: madgwick or mahony.
    #[arg(long)]
    algorithm: Option<Algorithm>,

    /// Madgwick step size.
    #[arg(long)]
    beta: Option<f64>,

    /// Log button events instead of writing JSON to stdout.
    #[arg(long)]
    log_events: bool,

    /// Print the default config as TOML and exit.
    #[arg(long)]
    print_default_config: bool,
}

fn load_config(args: &Args) -> AppConfig {
    let loaded = match &args.config {
        Some(path) => tilt_config::load_config_from(path),
        None => tilt_config::load_config(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        warn!(?e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(address) = &args.connect {
        config.transport.address = Some(address.clone());
    }
    if let Some(algorithm) = args.algorithm {
        config.filter.algorithm = algorithm.to_string();
    }
    if let Some(beta) = args.beta {
        config.filter.beta = beta;
    }
    config
}

/// Never leave a button held down on the consumer side. A failure here is
/// logged so it does not mask the error that ended the stream.
fn release_held(sink: &mut dyn EventSink, mapper: &mut GestureMapper) {
    match dispatch(sink, mapper.release_all()) {
        Ok(0) => {}
        Ok(released) => info!(released, "Released held buttons"),
        Err(e) => warn!(?e, "Failed to release held buttons"),
    }
}

/// Release held buttons, then hand back how the stream ended.
fn shutdown<T>(
    outcome: Result<T>,
    sink: &mut dyn EventSink,
    mapper: &mut GestureMapper,
) -> Result<T> {
    release_held(sink, mapper);
    outcome
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", toml::to_string_pretty(&AppConfig::default())?);
        return Ok(());
    }

    // Initialize logging. Stdout carries button events, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tilt_arcade=info,tilt_imu=info,tilt_input=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Tilt arcade starting");

    let config = load_config(&args);
    let filter_config = config
        .filter
        .to_filter_config()
        .context("invalid filter settings")?;
    let thresholds = config
        .gestures
        .to_thresholds()
        .context("invalid gesture settings")?;

    match filter_config.gains {
        Gains::GradientDescent { beta } => info!(beta, "Using Madgwick filter"),
        Gains::Complementary { kp, ki } => info!(kp, ki, "Using Mahony filter"),
    }
    info!(
        roll_deg = thresholds.roll_deg,
        pitch_deg = thresholds.pitch_deg,
        "Gesture thresholds"
    );

    let mut fusion = SensorFusion::new(&filter_config)?;
    let mut parser = LineParser::new(config.transport.scale_factors());
    let mut mapper = GestureMapper::new(thresholds)?;
    let mut sink: Box<dyn EventSink> = if args.log_events {
        Box::new(LogSink)
    } else {
        Box::new(JsonLineSink::new(std::io::stdout()))
    };

    let source = match config.transport.address {
        Some(address) => SampleSource::Tcp(address),
        None => SampleSource::Stdin,
    };
    let reader = tilt_imu::open_source(&source).await?;

    let stream = tilt_imu::run_stream(reader, &mut parser, &mut fusion, |orientation| {
        dispatch(sink.as_mut(), mapper.evaluate(&orientation.angles))?;
        Ok(())
    });

    let result = tokio::select! {
        result = stream => result.map(Some),
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            Ok(None)
        }
    };

    if let Some(stats) = shutdown(result, sink.as_mut(), &mut mapper)? {
        info!(
            samples = stats.samples,
            skipped = stats.skipped_records,
            rejected = stats.rejected_samples,
            "Done"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilt_imu::orientation::EulerAngles;
    use tilt_input::{Button, ButtonEvent, GestureThresholds, VecSink};

    struct ClosedSink;

    impl EventSink for ClosedSink {
        fn send(&mut self, _event: ButtonEvent) -> Result<()> {
            anyhow::bail!("stdout closed")
        }
    }

    fn holding_right_and_a() -> GestureMapper {
        let mut mapper = GestureMapper::new(GestureThresholds::default()).unwrap();
        mapper.evaluate(&EulerAngles::from_degrees(0.0, 20.0, 20.0)).count();
        mapper
    }

    #[test]
    fn release_held_sends_releases() {
        let mut mapper = holding_right_and_a();
        let mut sink = VecSink::default();
        release_held(&mut sink, &mut mapper);
        assert_eq!(
            sink.events,
            vec![
                ButtonEvent::release(Button::A),
                ButtonEvent::release(Button::Right)
            ]
        );
    }

    #[test]
    fn release_failure_does_not_replace_stream_error() {
        let mut mapper = holding_right_and_a();
        let outcome: Result<()> = Err(anyhow::anyhow!("sample stream read failed"));

        let err = shutdown(outcome, &mut ClosedSink, &mut mapper).unwrap_err();

        assert_eq!(err.to_string(), "sample stream read failed");
        assert!(!mapper.is_pressed(Button::Right));
    }

    #[test]
    fn shutdown_passes_through_success() {
        let mut mapper = holding_right_and_a();
        let mut sink = VecSink::default();
        assert_eq!(shutdown(Ok(7), &mut sink, &mut mapper).unwrap(), 7);
        assert_eq!(sink.events.len(), 2);
    }
}
