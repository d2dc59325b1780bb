//! Registry credentials

/// Secret field holding the Nacos username
pub const AUTH_NACOS_USERNAME_KEY: &str = "nacos.auth.username";
/// Secret field holding the Nacos password
pub const AUTH_NACOS_PASSWORD_KEY: &str = "nacos.auth.password";
/// Secret field holding the Consul ACL token
pub const AUTH_CONSUL_TOKEN_KEY: &str = "consul.auth.token";
/// Secret field holding the etcd username
pub const AUTH_ETCD_USERNAME_KEY: &str = "etcd.auth.username";
/// Secret field holding the etcd password
pub const AUTH_ETCD_PASSWORD_KEY: &str = "etcd.auth.password";

/// Credentials resolved for one registry.
///
/// Built fresh every time a watcher is constructed and handed to that watcher
/// only. Absent fields are empty strings.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthOption {
    pub nacos_username: String,
    pub nacos_password: String,
    pub consul_token: String,
    pub etcd_username: String,
    pub etcd_password: String,
}

impl AuthOption {
    pub fn is_empty(&self) -> bool {
        self == &AuthOption::default()
    }
}

impl std::fmt::Debug for AuthOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &str| if v.is_empty() { "" } else { "******" };
        f.debug_struct("AuthOption")
            .field("nacos_username", &self.nacos_username)
            .field("nacos_password", &mask(&self.nacos_password))
            .field("consul_token", &mask(&self.consul_token))
            .field("etcd_username", &self.etcd_username)
            .field("etcd_password", &mask(&self.etcd_password))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_masks_secrets() {
        let auth = AuthOption {
            nacos_username: "nacos".to_string(),
            nacos_password: "s3cret".to_string(),
            ..Default::default()
        };
        let debug = format!("{:?}", auth);
        assert!(debug.contains("nacos"));
        assert!(!debug.contains("s3cret"));
        assert!(!auth.is_empty());
        assert!(AuthOption::default().is_empty());
    }
}
