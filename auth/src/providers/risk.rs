//! Risk calculator (C4): failed-login lockout support, geo/ASN/device
//! signal scoring, and impossible-travel detection.

use std::net::IpAddr;

use chrono::Utc;

use aegis_postgres::{DeviceFingerprintRepository, IpIntelRepository, RepositoryError};

use super::{DeviceFingerprint, LoginContext, RiskAssessment, RiskFactor, RiskLevel, SecurityAlert};
use crate::actions::AuthLevel;
use crate::config::RiskConfig;
use crate::error::Result;

/// Risk calculator.
///
/// Implementations assess a login attempt and return a discrete
/// [`RiskLevel`] plus the factors and alerts that led to it. A failed
/// external lookup (geo-IP, ASN) must never silently pass as low risk — fold
/// it into [`RiskLevel::Unknown`] and let [`RiskLevel::effective`] treat it
/// as high.
pub trait RiskCalculator: Send + Sync {
    /// Assess a login attempt.
    ///
    /// # Errors
    ///
    /// Returns an error only for a genuine repository failure; an
    /// unresolvable external signal is represented in the returned
    /// assessment, not as an `Err`.
    async fn calculate_login_risk(&self, context: &LoginContext) -> Result<RiskAssessment>;

    /// Whether `ip` looks like a VPN, hosting provider, or otherwise
    /// anonymizing network, based on ASN reputation.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository lookup fails for a reason other
    /// than "not found".
    async fn is_ip_suspicious(&self, ip_address: IpAddr) -> Result<bool>;

    /// Geolocate `ip_address`, resolving through the cache-then-external-API
    /// path an implementation chooses.
    ///
    /// # Errors
    ///
    /// Returns an error if no location can be resolved.
    async fn get_ip_location(&self, ip_address: IpAddr) -> Result<IpLocation>;

    /// Whether travelling between `from` and `to` within `time_delta` would
    /// require exceeding the configured speed threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the Haversine calculation cannot be performed
    /// (never, in practice — kept fallible for symmetry with the trait).
    async fn detect_impossible_travel(
        &self,
        from: (f64, f64),
        to: (f64, f64),
        time_delta: chrono::Duration,
    ) -> Result<bool>;
}

/// IP geolocation information.
#[derive(Debug, Clone, PartialEq)]
pub struct IpLocation {
    /// Country code (ISO 3166-1 alpha-2), if known.
    pub country: Option<String>,

    /// Latitude.
    pub latitude: f64,

    /// Longitude.
    pub longitude: f64,
}

/// Mean Earth radius in kilometres, for the Haversine formula.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two `(latitude, longitude)` points, in km.
#[must_use]
pub fn haversine_distance_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = from;
    let (lat2, lon2) = to;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// `IpIntelRepository`/`DeviceFingerprintRepository`-backed [`RiskCalculator`].
#[derive(Clone)]
pub struct DefaultRiskCalculator<I, D> {
    ip_intel: I,
    fingerprints: D,
    config: RiskConfig,
}

impl<I, D> DefaultRiskCalculator<I, D>
where
    I: IpIntelRepository + Clone,
    D: DeviceFingerprintRepository + Clone,
{
    /// Build a new risk calculator.
    #[must_use]
    pub const fn new(ip_intel: I, fingerprints: D, config: RiskConfig) -> Self {
        Self {
            ip_intel,
            fingerprints,
            config,
        }
    }

    fn fingerprint_hash(fingerprint: &DeviceFingerprint) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        if let Ok(encoded) = serde_json::to_vec(fingerprint) {
            hasher.update(&encoded);
        }
        format!("{:x}", hasher.finalize())
    }
}

impl<I, D> RiskCalculator for DefaultRiskCalculator<I, D>
where
    I: IpIntelRepository + Clone + Send + Sync,
    D: DeviceFingerprintRepository + Clone + Send + Sync,
{
    async fn calculate_login_risk(&self, context: &LoginContext) -> Result<RiskAssessment> {
        let mut factors = Vec::new();
        let mut alerts = Vec::new();
        let mut level = RiskLevel::Low;

        if self.ip_intel.is_blocklisted(context.ip_address).await.unwrap_or(false) {
            factors.push(RiskFactor {
                name: "blocklisted_ip".to_string(),
                description: "login attempt from a blocklisted IP address".to_string(),
            });
            return Ok(RiskAssessment {
                level: RiskLevel::High,
                factors,
                alerts,
                recommended_auth_level: AuthLevel::HardwareBacked,
            });
        }

        if self.ip_intel.is_whitelisted(context.ip_address).await.unwrap_or(false) {
            return Ok(RiskAssessment {
                level: RiskLevel::Low,
                factors,
                alerts,
                recommended_auth_level: AuthLevel::Basic,
            });
        }

        match self.get_ip_location(context.ip_address).await {
            Ok(location) => {
                if let Some(country) = &location.country {
                    if self.config.high_risk_countries.iter().any(|c| c == country) {
                        level = level.max(RiskLevel::Medium);
                        factors.push(RiskFactor {
                            name: "high_risk_country".to_string(),
                            description: format!("login from high-risk country {country}"),
                        });
                    }
                }

                if let Some((from_lat, from_lon)) = context.last_login_location {
                    if let Some(last_login_at) = context.last_login_at {
                        let elapsed = Utc::now() - last_login_at;
                        if elapsed > chrono::Duration::zero()
                            && self
                                .detect_impossible_travel(
                                    (from_lat, from_lon),
                                    (location.latitude, location.longitude),
                                    elapsed,
                                )
                                .await
                                .unwrap_or(false)
                        {
                            level = RiskLevel::High;
                            alerts.push(SecurityAlert {
                                kind: "impossible_travel".to_string(),
                                detail: format!(
                                    "implied travel speed exceeds {} km/h between consecutive logins",
                                    self.config.impossible_travel_speed_kmh
                                ),
                                raised_at: Utc::now(),
                            });
                        }
                    }
                }
            }
            Err(_) => {
                level = RiskLevel::Unknown;
                factors.push(RiskFactor {
                    name: "geo_lookup_failed".to_string(),
                    description: "could not resolve a location for the source IP".to_string(),
                });
            }
        }

        if self.is_ip_suspicious(context.ip_address).await.unwrap_or(true) {
            level = level.max(RiskLevel::Medium);
            factors.push(RiskFactor {
                name: "vpn_or_hosting_asn".to_string(),
                description: "source IP belongs to a VPN, proxy, or hosting ASN".to_string(),
            });
        }

        if let Some(fingerprint) = &context.fingerprint {
            if let Some(user_id) = context.user_id {
                let hash = Self::fingerprint_hash(fingerprint);
                match self.fingerprints.find_active(user_id.0, &hash).await {
                    Ok(row) if row.trusted => {}
                    Ok(_) => {
                        level = level.max(RiskLevel::Medium);
                        factors.push(RiskFactor {
                            name: "untrusted_device".to_string(),
                            description: "device fingerprint recognized but not yet trusted".to_string(),
                        });
                    }
                    Err(RepositoryError::NotFound) => {
                        level = level.max(RiskLevel::Medium);
                        factors.push(RiskFactor {
                            name: "new_device".to_string(),
                            description: "first login seen from this device fingerprint".to_string(),
                        });
                    }
                    Err(_) => {
                        level = RiskLevel::Unknown;
                    }
                }
            }
        } else {
            level = level.max(RiskLevel::Medium);
            factors.push(RiskFactor {
                name: "no_fingerprint".to_string(),
                description: "client did not provide a device fingerprint".to_string(),
            });
        }

        let recommended_auth_level = match level.effective() {
            RiskLevel::Low => AuthLevel::Basic,
            RiskLevel::Medium => AuthLevel::MultiFactor,
            RiskLevel::High | RiskLevel::Unknown => AuthLevel::HardwareBacked,
        };

        Ok(RiskAssessment {
            level,
            factors,
            alerts,
            recommended_auth_level,
        })
    }

    async fn is_ip_suspicious(&self, ip_address: IpAddr) -> Result<bool> {
        let metadata = match self.ip_intel.find_ip_metadata(ip_address).await {
            Ok(metadata) => metadata,
            Err(RepositoryError::NotFound) => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        let Some(asn) = metadata.asn else {
            return Ok(false);
        };
        match self.ip_intel.find_asn_entry(asn).await {
            Ok(entry) => Ok(entry.is_vpn
                || entry.is_hosting
                || entry.reputation_score < self.config.asn_reputation_threshold),
            Err(RepositoryError::NotFound) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn get_ip_location(&self, ip_address: IpAddr) -> Result<IpLocation> {
        let metadata = self.ip_intel.find_ip_metadata(ip_address).await?;
        let (Some(latitude), Some(longitude)) = (metadata.latitude, metadata.longitude) else {
            return Err(RepositoryError::NotFound.into());
        };
        Ok(IpLocation {
            country: metadata.country,
            latitude,
            longitude,
        })
    }

    async fn detect_impossible_travel(
        &self,
        from: (f64, f64),
        to: (f64, f64),
        time_delta: chrono::Duration,
    ) -> Result<bool> {
        let hours = time_delta.num_seconds() as f64 / 3600.0;
        if hours <= 0.0 {
            return Ok(true);
        }
        let distance_km = haversine_distance_km(from, to);
        let implied_speed_kmh = distance_km / hours;
        Ok(implied_speed_kmh > self.config.impossible_travel_speed_kmh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_same_point_is_zero() {
        let d = haversine_distance_km((51.5074, -0.1278), (51.5074, -0.1278));
        assert!(d < 0.001);
    }

    #[test]
    fn haversine_london_to_new_york_is_plausible() {
        // London to New York is ~5570 km great-circle distance.
        let d = haversine_distance_km((51.5074, -0.1278), (40.7128, -74.0060));
        assert!((5400.0..5750.0).contains(&d), "distance was {d}");
    }
}
