use rand::seq::SliceRandom;

// Common desktop user agents
const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Browser identity presented to the review site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Fingerprint {
    /// Random user agent with the configured window size.
    ///
    /// The listing layout depends on the viewport, so it is never randomized.
    #[must_use]
    pub fn for_config(config: &waypoint_core::BrowserConfig) -> Self {
        let mut rng = rand::thread_rng();
        let user_agent = USER_AGENTS
            .choose(&mut rng)
            .copied()
            .unwrap_or(USER_AGENTS[0]);

        Self {
            user_agent: user_agent.to_string(),
            viewport_width: config.window_width,
            viewport_height: config.window_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_keeps_viewport() {
        let config = waypoint_core::BrowserConfig {
            window_width: 1280,
            window_height: 720,
            ..Default::default()
        };
        let fp = Fingerprint::for_config(&config);
        assert_eq!((fp.viewport_width, fp.viewport_height), (1280, 720));
        assert!(USER_AGENTS.contains(&fp.user_agent.as_str()));
    }

    #[test]
    fn test_user_agent_variation() {
        let config = waypoint_core::BrowserConfig::default();
        let fingerprints: Vec<_> = (0..20).map(|_| Fingerprint::for_config(&config)).collect();

        // probabilistic, 3^-19 chance of a false failure
        let first = &fingerprints[0].user_agent;
        assert!(
            !fingerprints.iter().all(|f| &f.user_agent == first),
            "Expected variation in user agents"
        );
    }
}
