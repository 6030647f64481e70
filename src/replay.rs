use anyhow::Result;
use headgesture_imu::protocol::RecordingParser;
use headgesture_imu::{SensorPublisher, SensorReading};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Played when no recording is configured: worn while facing 30 degrees,
/// a shake, a nod, a look up, then taken off.
pub const DEMO_RECORDING: &str = "\
# worn, facing 30 degrees
mag 0 -34.641 -20
acc 9.81 0 0
gyro 0 0.01 0.02 0.0
gyro 200000000 -1.6 0.2 0.1       # shake to right
gyro 400000000 1.7 -0.1 0.0       # shake back to left
gyro 1600000000 0.02 0.01 0.0     # pending gesture expires
gyro 1800000000 0.1 1.4 0.2       # look down
gyro 2000000000 -0.2 -1.5 0.1     # back up, reports 30 degrees
gyro 3400000000 0.0 0.0 0.0 low
gyro 3600000000 0.0 -1.3 0.0      # look up
gyro 3800000000 0.0 1.2 0.0       # back down
# rolled 60 degrees: no longer worn
acc 4.905 0 -8.496
gyro 5200000000 -1.5 0.0 0.0 unreliable
";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    /// Samples handed to a subscriber.
    pub delivered: u64,
    /// Samples with no subscriber for their kind.
    pub dropped: u64,
    /// Lines that failed to parse.
    pub malformed: u64,
}

/// Read a recording from `reader` and publish every sample.
///
/// With `realtime`, playback sleeps between gyroscope samples for the gap
/// between their timestamps.
pub async fn replay<R: AsyncRead + Unpin>(
    mut reader: R,
    publisher: &SensorPublisher,
    realtime: bool,
) -> Result<ReplayStats> {
    let mut parser = RecordingParser::new();
    let mut stats = ReplayStats::default();
    let mut last_gyro_ns: Option<u64> = None;
    let mut buf = [0u8; 4096];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            parser.finish();
        } else {
            parser.push_data(&buf[..n]);
        }

        while let Some(result) = parser.next_sample() {
            let sample = match result {
                Ok(sample) => sample,
                Err(e) => {
                    tracing::warn!(%e, "Skipping malformed recording line");
                    stats.malformed += 1;
                    continue;
                }
            };

            if let SensorReading::Gyroscope { timestamp_ns, .. } = sample.reading {
                if realtime {
                    if let Some(last) = last_gyro_ns {
                        let gap = timestamp_ns.saturating_sub(last);
                        tokio::time::sleep(Duration::from_nanos(gap)).await;
                    }
                }
                last_gyro_ns = Some(timestamp_ns);
            }

            match publisher.publish(sample) {
                Ok(true) => stats.delivered += 1,
                Ok(false) => stats.dropped += 1,
                Err(e) => {
                    tracing::warn!(%e, "Detector gone, ending replay");
                    return Ok(stats);
                }
            }
        }

        if n == 0 {
            break;
        }
    }

    tracing::info!(
        delivered = stats.delivered,
        dropped = stats.dropped,
        malformed = stats.malformed,
        "Replay finished"
    );
    Ok(stats)
}
