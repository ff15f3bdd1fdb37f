//! Run Orchestrator
//!
//! Drives one stress or benchmark run: selects a workload backend, starts the
//! telemetry collector, runs the paced render loop until the duration elapses
//! or the stop signal is raised, then computes the final results.
//!
//! Pacing: each frame is rendered, the remaining budget of the target frame
//! interval is slept, and the full period (work plus sleep) is recorded as the
//! frame time. A frame that overruns its budget is not followed by a sleep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::TestConfig;
use crate::frames::{FrameSample, RunningStatsSnapshot};
use crate::probe::ProbeChain;
use crate::report::{RunContext, TestResults};
use crate::signal::StopSignal;
use crate::telemetry::{SharedState, TelemetryCollector};
use crate::workload::{select_backend, FrameWorkload};
use crate::{CoreError, CoreResult};

/// A single configured run
pub struct StressTest {
    run_id: String,
    config: TestConfig,
    probes: Arc<ProbeChain>,
    state: Arc<SharedState>,
    started: AtomicBool,
}

impl StressTest {
    pub fn new(config: TestConfig, probes: ProbeChain) -> Self {
        let state = Arc::new(SharedState::new(&config));
        Self {
            run_id: ulid::Ulid::new().to_string(),
            config,
            probes: Arc::new(probes),
            state,
            started: AtomicBool::new(false),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    /// Shared buffers, for export and live display
    pub fn state(&self) -> Arc<SharedState> {
        Arc::clone(&self.state)
    }

    /// Lock-free running statistics
    pub fn live_status(&self) -> RunningStatsSnapshot {
        self.state.running_stats()
    }

    /// Executes the run. Each `StressTest` runs at most once.
    ///
    /// `candidates` are tried in order; the simulated backend is the fallback.
    pub async fn run(
        &self,
        stop: StopSignal,
        candidates: Vec<Box<dyn FrameWorkload>>,
    ) -> CoreResult<TestResults> {
        self.config.validate()?;
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(CoreError::Internal(format!(
                "run {} has already been executed",
                self.run_id
            )));
        }

        let config = self.config.clone();
        let workload = tokio::task::spawn_blocking(move || select_backend(candidates, &config))
            .await
            .map_err(|e| CoreError::Internal(format!("backend selection panicked: {e}")))??;
        let backend = workload.name().to_string();

        let started_at = Utc::now();
        info!(
            run_id = %self.run_id,
            mode = %self.config.mode,
            quality = %self.config.quality,
            resolution = %self.config.resolution,
            target_fps = self.config.target_fps,
            backend = %backend,
            "Run started"
        );

        let collector = TelemetryCollector::new(
            Arc::clone(&self.state),
            Arc::clone(&self.probes),
            self.config.telemetry_interval(),
        )
        .with_artifact_detection(self.config.artifact_detection)
        .spawn(stop.clone());

        let loop_result = self.render_loop(workload, &stop).await;

        stop.stop();
        if let Err(e) = collector.await {
            warn!("Telemetry collector task failed: {}", e);
        }
        loop_result?;

        let context = RunContext {
            run_id: self.run_id.clone(),
            started_at,
            finished_at: Utc::now(),
            backend,
            config: self.config.clone(),
        };
        let results = TestResults::from_state(context, &self.state).await;

        info!(
            run_id = %results.run_id,
            frames = results.frame_count,
            average_fps = results.average_fps,
            errors = results.error_count,
            stability = results.stability_score,
            benchmark = results.benchmark_score,
            "Run finished"
        );
        Ok(results)
    }

    async fn render_loop(
        &self,
        mut workload: Box<dyn FrameWorkload>,
        stop: &StopSignal,
    ) -> CoreResult<()> {
        let target_interval = self.config.target_frame_interval();
        let deadline = self.config.duration();
        let run_start = Instant::now();
        let mut frame_index: u64 = 0;

        loop {
            if stop.is_stopped() {
                debug!(frames = frame_index, "Stop signal observed");
                return Ok(());
            }
            if deadline.is_some_and(|d| run_start.elapsed() >= d) {
                debug!(frames = frame_index, "Run duration elapsed");
                return Ok(());
            }

            let frame_start = Instant::now();
            let (returned, result) = tokio::task::spawn_blocking(move || {
                let result = workload.render_frame(frame_index);
                (workload, result)
            })
            .await
            .map_err(|e| CoreError::Workload(format!("frame {frame_index} panicked: {e}")))?;
            workload = returned;

            if let Err(e) = result {
                warn!(frame = frame_index, "Frame failed: {}", e);
                self.state.record_error(Utc::now()).await;
            }

            let work = frame_start.elapsed();
            if let Some(remaining) = target_interval.checked_sub(work) {
                tokio::time::sleep(remaining).await;
            }

            let period_ms = frame_start.elapsed().as_secs_f64() * 1000.0;
            self.state.record_frame(FrameSample::new(period_ms)).await;
            frame_index += 1;
        }
    }
}

impl std::fmt::Debug for StressTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StressTest")
            .field("run_id", &self.run_id)
            .field("config", &self.config)
            .field("probes", &self.probes)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{QualityLevel, Resolution, TestMode};
    use crate::probe::tests::{snapshot_with_temp, FixedProbe};
    use std::time::Duration;

    fn quick_config() -> TestConfig {
        TestConfig {
            quality: QualityLevel::Low,
            resolution: Resolution::new(320, 240),
            target_fps: 200,
            duration_secs: 0,
            telemetry_interval_ms: 50,
            ..TestConfig::default()
        }
    }

    fn fixed_chain() -> ProbeChain {
        ProbeChain::new(vec![Box::new(FixedProbe::new(
            "fixed",
            Some(snapshot_with_temp("NVIDIA", 66)),
        ))])
    }

    fn stop_after(ms: u64) -> StopSignal {
        let stop = StopSignal::new();
        let trigger = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            trigger.stop();
        });
        stop
    }

    /// Fails every other frame
    struct FlakyBackend;

    impl FrameWorkload for FlakyBackend {
        fn name(&self) -> &str {
            "flaky"
        }

        fn initialize(&mut self, _config: &TestConfig) -> CoreResult<()> {
            Ok(())
        }

        fn render_frame(&mut self, frame_index: u64) -> CoreResult<()> {
            if frame_index % 2 == 1 {
                Err(CoreError::Workload("device lost".to_string()))
            } else {
                Ok(())
            }
        }
    }

    /// Each frame takes longer than a 100 fps budget
    struct SlowBackend {
        work: Duration,
    }

    impl FrameWorkload for SlowBackend {
        fn name(&self) -> &str {
            "slow"
        }

        fn initialize(&mut self, _config: &TestConfig) -> CoreResult<()> {
            Ok(())
        }

        fn render_frame(&mut self, _frame_index: u64) -> CoreResult<()> {
            std::thread::sleep(self.work);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stress_run_until_stopped() {
        let test = StressTest::new(quick_config(), fixed_chain());

        let results = test.run(stop_after(300), Vec::new()).await.unwrap();

        assert_eq!(results.backend, "simulated");
        assert_eq!(results.run_id, test.run_id());
        assert!(results.frame_count > 0);
        assert_eq!(results.frame_count, test.live_status().frame_count);
        assert!(results.min_fps <= results.max_fps);
        assert_eq!(results.max_temperature, Some(66));
        assert_eq!(results.probe.as_deref(), Some("NVIDIA"));
        let log = test.state().performance_log().await;
        assert!(!log.is_empty());
        // First collection happens one interval in, after frames exist
        assert!(log[0].fps > 0.0, "first log entry {:?}", log[0]);
        assert!((0.0..=100.0).contains(&results.stability_score));
    }

    #[tokio::test]
    async fn test_benchmark_run_stops_at_duration() {
        let config = TestConfig {
            mode: TestMode::Benchmark,
            duration_secs: 1,
            ..quick_config()
        };
        let test = StressTest::new(config, fixed_chain());

        let results = tokio::time::timeout(Duration::from_secs(5), test.run(StopSignal::new(), Vec::new()))
            .await
            .expect("benchmark should end on its own")
            .unwrap();

        assert!(results.duration_secs >= 1.0);
        assert!(results.frame_count > 10);
    }

    #[tokio::test]
    async fn test_frames_are_paced_to_target() {
        let config = TestConfig {
            target_fps: 50,
            ..quick_config()
        };
        let test = StressTest::new(config, ProbeChain::default());

        test.run(stop_after(250), Vec::new()).await.unwrap();

        let times = test.state().frame_times().await;
        assert!(!times.is_empty());
        assert!(times.iter().all(|t| *t >= 19.9), "frame times {times:?}");
        assert!(test.live_status().max_fps <= 50.5);
    }

    #[tokio::test]
    async fn test_overrunning_frame_is_not_followed_by_sleep() {
        let config = TestConfig {
            target_fps: 100,
            ..quick_config()
        };
        let test = StressTest::new(config, ProbeChain::default());
        let backend = SlowBackend {
            work: Duration::from_millis(30),
        };

        let results = test.run(stop_after(200), vec![Box::new(backend)]).await.unwrap();

        assert_eq!(results.backend, "slow");
        let times = test.state().frame_times().await;
        assert!(!times.is_empty());
        // A sleep after the overrun would add a further 10 ms budget
        assert!(
            times.iter().all(|t| (30.0..40.0).contains(t)),
            "frame times {times:?}"
        );
        assert!(test.live_status().max_fps < 100.0 / 3.0 + 0.5);
    }

    #[tokio::test]
    async fn test_frame_errors_are_counted_not_fatal() {
        let test = StressTest::new(quick_config(), ProbeChain::default());

        let results = test
            .run(stop_after(200), vec![Box::new(FlakyBackend)])
            .await
            .unwrap();

        assert_eq!(results.backend, "flaky");
        assert_eq!(results.error_count, results.frame_count / 2);
        assert!(results.frame_count >= 4);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_start() {
        let config = TestConfig {
            target_fps: 0,
            ..quick_config()
        };
        let test = StressTest::new(config, fixed_chain());

        let err = test.run(StopSignal::new(), Vec::new()).await.unwrap_err();

        assert!(err.is_config_error());
        assert_eq!(test.live_status().frame_count, 0);
        assert!(test.state().performance_log().await.is_empty());
    }

    #[tokio::test]
    async fn test_run_only_once() {
        let test = StressTest::new(quick_config(), ProbeChain::default());
        let stop = StopSignal::new();
        stop.stop();

        test.run(stop.clone(), Vec::new()).await.unwrap();
        let err = test.run(stop, Vec::new()).await.unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }

    #[tokio::test]
    async fn test_stop_before_first_frame() {
        let test = StressTest::new(quick_config(), fixed_chain());
        let stop = StopSignal::new();
        stop.stop();

        let results = test.run(stop, Vec::new()).await.unwrap();

        assert_eq!(results.frame_count, 0);
        assert_eq!(results.min_fps, 0.0);
        assert_eq!(results.stability_score, 100.0);
        assert_eq!(results.benchmark_score, 0);
    }
}
