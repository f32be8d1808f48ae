pub mod fusion;
pub mod math;
pub mod orientation;
pub mod protocol;
pub mod types;

use anyhow::{Context, Result};
use fusion::SensorFusion;
use protocol::LineParser;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use types::Orientation;

/// Where raw sample lines come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleSource {
    /// A bridge forwarding the device's serial lines over TCP (`host:port`).
    Tcp(String),
    /// Lines piped into the process.
    Stdin,
}

/// Counters reported when a stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Samples fused and handed to the handler.
    pub samples: u64,
    /// Lines that were not valid sample records.
    pub skipped_records: u64,
    /// Parsed samples the filter refused.
    pub rejected_samples: u64,
}

/// Open the byte stream for `source`.
pub async fn open_source(source: &SampleSource) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    match source {
        SampleSource::Tcp(addr) => {
            tracing::info!(%addr, "Connecting to sample bridge");
            let stream = TcpStream::connect(addr)
                .await
                .with_context(|| format!("failed to connect to {addr}"))?;
            tracing::info!("Connected to sample bridge");
            Ok(Box::new(stream))
        }
        SampleSource::Stdin => {
            tracing::info!("Reading samples from stdin");
            Ok(Box::new(tokio::io::stdin()))
        }
    }
}

/// Pump `reader` until EOF: parse lines, fuse each sample, then hand the
/// resulting orientation to `handler` before reading the next one.
///
/// Malformed lines and samples the filter rejects are logged and skipped.
/// Read errors and handler errors end the stream.
pub async fn run_stream<R, F>(
    mut reader: R,
    parser: &mut LineParser,
    fusion: &mut SensorFusion,
    mut handler: F,
) -> Result<StreamStats>
where
    R: AsyncRead + Unpin,
    F: FnMut(&Orientation) -> Result<()>,
{
    let mut stats = StreamStats::default();
    let mut buf = [0u8; 1024];

    loop {
        let n = reader
            .read(&mut buf)
            .await
            .context("sample stream read failed")?;
        if n == 0 {
            tracing::info!(
                samples = stats.samples,
                skipped = stats.skipped_records,
                rejected = stats.rejected_samples,
                "Sample stream closed"
            );
            return Ok(stats);
        }

        parser.push_data(&buf[..n]);

        // Drain all available samples.
        while let Some(result) = parser.next_sample() {
            let sample = match result {
                Ok(sample) => sample,
                Err(e) => {
                    tracing::trace!(%e, "Skipping non-sample record");
                    stats.skipped_records += 1;
                    continue;
                }
            };

            match fusion.update_nominal(&sample) {
                Ok(orientation) => {
                    stats.samples += 1;
                    handler(&orientation)?;
                }
                Err(e) => {
                    tracing::warn!(%e, "Sample rejected by filter");
                    stats.rejected_samples += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion::FilterConfig;

    #[tokio::test]
    async fn run_stream_processes_every_sample_in_order() {
        let input: &[u8] =
            b"Ready...\nA,0,0,819200,0,0,0\nA,0,0,819200,0,0,0\nB,97\nA,0,0,819200,0,0,0\n";
        let mut parser = LineParser::default();
        let mut fusion = SensorFusion::new(&FilterConfig::default()).unwrap();
        let mut seen = Vec::new();

        let stats = run_stream(input, &mut parser, &mut fusion, |orientation| {
            seen.push(*orientation);
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(stats.samples, 3);
        assert_eq!(stats.skipped_records, 2);
        assert_eq!(stats.rejected_samples, 0);
        assert_eq!(seen.len(), 3);
        assert_eq!(fusion.sample_count(), 3);
        for orientation in &seen {
            assert!((orientation.quaternion.norm() - 1.0).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn run_stream_stops_on_handler_error() {
        let input: &[u8] = b"A,0,0,819200,0,0,0\nA,0,0,819200,0,0,0\n";
        let mut parser = LineParser::default();
        let mut fusion = SensorFusion::new(&FilterConfig::default()).unwrap();
        let mut calls = 0;

        let result = run_stream(input, &mut parser, &mut fusion, |_| {
            calls += 1;
            anyhow::bail!("sink closed")
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
