//! Test fixtures and sample data

use std::time::Duration;

use runner::{LoadTestConfig, RunnerConfig};

pub struct TestFixtures;

impl TestFixtures {
    pub const HELPER_PID: u32 = 4242;
    pub const DEPLOYMENT: &'static str = "messaging-app";
    pub const SERVICE: &'static str = "messaging-app-service";

    /// Default configuration with no warm-up pause and a short load test
    pub fn config() -> RunnerConfig {
        RunnerConfig {
            load_test: LoadTestConfig {
                warmup: Duration::ZERO,
                duration: Duration::from_secs(1),
                threads: 1,
                connections: 1,
                local_port: 18000,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
