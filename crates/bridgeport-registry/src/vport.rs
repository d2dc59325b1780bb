//! Virtual port lookup

use bridgeport_api::{VirtualPort, is_valid_port};
use tracing::debug;

/// Resolve the virtual port for `host`.
///
/// A valid per-service override whose name matches `host` case-insensitively
/// wins; otherwise a valid default applies. `None` leaves the discovered port
/// untouched.
pub fn get_service_vport(host: &str, vport: Option<&VirtualPort>) -> Option<u32> {
    let vport = vport?;
    let host_lower = host.to_lowercase();
    if let Some(service) = vport
        .services
        .iter()
        .find(|s| s.name.to_lowercase() == host_lower && is_valid_port(s.value))
    {
        return Some(service.value);
    }
    if is_valid_port(vport.default) {
        debug!(
            "only the default vport applies to {}, using {}",
            host, vport.default
        );
        return Some(vport.default);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridgeport_api::VirtualPortService;

    fn vport(default: u32, services: &[(&str, u32)]) -> VirtualPort {
        VirtualPort {
            default,
            services: services
                .iter()
                .map(|(name, value)| VirtualPortService {
                    name: name.to_string(),
                    value: *value,
                })
                .collect(),
        }
    }

    #[test]
    fn test_service_override_wins() {
        let v = vport(8080, &[("svc-a", 9090)]);
        assert_eq!(get_service_vport("svc-a", Some(&v)), Some(9090));
        assert_eq!(get_service_vport("SVC-A", Some(&v)), Some(9090));
        assert_eq!(get_service_vport("svc-b", Some(&v)), Some(8080));
    }

    #[test]
    fn test_service_match_ignores_unicode_case() {
        let v = vport(8080, &[("Ünicode-Ωmega", 9090)]);
        assert_eq!(get_service_vport("ünicode-ωmega", Some(&v)), Some(9090));
        assert_eq!(get_service_vport("ÜNICODE-ΩMEGA", Some(&v)), Some(9090));
    }

    #[test]
    fn test_invalid_override_falls_back_to_default() {
        let v = vport(8080, &[("svc-a", 70000)]);
        assert_eq!(get_service_vport("svc-a", Some(&v)), Some(8080));
    }

    #[test]
    fn test_no_valid_port() {
        let v = vport(0, &[("svc-a", 0)]);
        assert_eq!(get_service_vport("svc-a", Some(&v)), None);
        assert_eq!(get_service_vport("svc-a", None), None);
    }
}
