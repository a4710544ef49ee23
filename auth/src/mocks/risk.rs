//! Mock risk calculator for testing.

use std::future::Future;
use std::net::IpAddr;

use crate::actions::AuthLevel;
use crate::error::Result;
use crate::providers::risk::IpLocation;
use crate::providers::{LoginContext, RiskAssessment, RiskCalculator, RiskFactor, RiskLevel};

/// Mock risk calculator.
///
/// Returns a fixed [`RiskLevel`] for every login, for testing.
#[derive(Debug, Clone)]
pub struct MockRiskCalculator {
    /// Risk level to return.
    pub level: RiskLevel,
}

impl MockRiskCalculator {
    /// Create a new mock risk calculator that reports low risk.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            level: RiskLevel::Low,
        }
    }

    /// Create a mock that reports high risk.
    #[must_use]
    pub const fn high_risk() -> Self {
        Self {
            level: RiskLevel::High,
        }
    }
}

impl Default for MockRiskCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskCalculator for MockRiskCalculator {
    fn calculate_login_risk(
        &self,
        _context: &LoginContext,
    ) -> impl Future<Output = Result<RiskAssessment>> + Send {
        let level = self.level;

        async move {
            let recommended_auth_level = match level.effective() {
                RiskLevel::Low => AuthLevel::Basic,
                RiskLevel::Medium => AuthLevel::MultiFactor,
                RiskLevel::High | RiskLevel::Unknown => AuthLevel::HardwareBacked,
            };

            Ok(RiskAssessment {
                level,
                factors: vec![RiskFactor {
                    name: "mock_factor".to_string(),
                    description: "mock risk factor for testing".to_string(),
                }],
                alerts: Vec::new(),
                recommended_auth_level,
            })
        }
    }

    async fn is_ip_suspicious(&self, _ip_address: IpAddr) -> Result<bool> {
        Ok(matches!(self.level, RiskLevel::High | RiskLevel::Unknown))
    }

    async fn get_ip_location(&self, _ip_address: IpAddr) -> Result<IpLocation> {
        Ok(IpLocation {
            country: Some("US".to_string()),
            latitude: 37.7749,
            longitude: -122.4194,
        })
    }

    async fn detect_impossible_travel(
        &self,
        _from: (f64, f64),
        _to: (f64, f64),
        _time_delta: chrono::Duration,
    ) -> Result<bool> {
        Ok(matches!(self.level, RiskLevel::High))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn low_risk_mock_recommends_basic_auth() {
        let calc = MockRiskCalculator::new();
        let ctx = LoginContext {
            user_id: None,
            email: "user@example.com".to_string(),
            ip_address: "127.0.0.1".parse().unwrap(),
            user_agent: "test".to_string(),
            device_id: None,
            last_login_location: None,
            last_login_at: None,
            fingerprint: None,
        };
        let assessment = calc.calculate_login_risk(&ctx).await.unwrap();
        assert_eq!(assessment.level, RiskLevel::Low);
        assert_eq!(assessment.recommended_auth_level, AuthLevel::Basic);
    }

    #[tokio::test]
    async fn high_risk_mock_recommends_hardware_backed_auth() {
        let calc = MockRiskCalculator::high_risk();
        let ctx = LoginContext {
            user_id: None,
            email: "user@example.com".to_string(),
            ip_address: "127.0.0.1".parse().unwrap(),
            user_agent: "test".to_string(),
            device_id: None,
            last_login_location: None,
            last_login_at: None,
            fingerprint: None,
        };
        let assessment = calc.calculate_login_risk(&ctx).await.unwrap();
        assert_eq!(assessment.level, RiskLevel::High);
        assert_eq!(assessment.recommended_auth_level, AuthLevel::HardwareBacked);
    }
}
