use crate::error::ConfigError;
use crate::model::RuntimeVersion;

const VISION_ISSUE: &str = "https://github.com/pytorch/vision/issues/4153";

/// A `major.minor` release line that must not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeniedRelease {
    /// Runtime package name.
    pub package: String,
    /// Major version.
    pub major: u64,
    /// Minor version.
    pub minor: u64,
    /// Why the release line is denied.
    pub reason: String,
}

/// Runtime releases an estimator refuses to run on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPolicy {
    denied: Vec<DeniedRelease>,
}

impl Default for VersionPolicy {
    /// Deny `torch` 1.8, 1.9 and `torchvision` 0.9, 0.10.
    fn default() -> Self {
        Self::permissive()
            .with_denied("torch", 1, 8, VISION_ISSUE)
            .with_denied("torch", 1, 9, VISION_ISSUE)
            .with_denied("torchvision", 0, 9, VISION_ISSUE)
            .with_denied("torchvision", 0, 10, VISION_ISSUE)
    }
}

impl VersionPolicy {
    /// A policy that accepts every runtime.
    pub fn permissive() -> Self {
        Self { denied: Vec::new() }
    }

    /// Deny the `major.minor` release line of `package`.
    pub fn with_denied(
        mut self,
        package: impl Into<String>,
        major: u64,
        minor: u64,
        reason: impl Into<String>,
    ) -> Self {
        self.denied.push(DeniedRelease {
            package: package.into().to_lowercase(),
            major,
            minor,
            reason: reason.into(),
        });
        self
    }

    /// The denied release lines.
    pub fn denied(&self) -> &[DeniedRelease] {
        &self.denied
    }

    /// Check the runtimes reported by a model.
    ///
    /// Only versions of packages with a deny entry are parsed.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::InvalidRuntimeVersion`] if a relevant version string is
    ///   malformed.
    /// * [`ConfigError::UnsupportedRuntime`] if a runtime is on a denied line.
    pub fn check(&self, runtimes: &[RuntimeVersion]) -> Result<(), ConfigError> {
        for runtime in runtimes {
            let package = runtime.package.to_lowercase();
            let mut rules = self.denied.iter().filter(|d| d.package == package).peekable();
            if rules.peek().is_none() {
                continue;
            }

            let (major, minor) = parse_major_minor(&runtime.version).ok_or_else(|| {
                ConfigError::InvalidRuntimeVersion {
                    package: runtime.package.clone(),
                    version: runtime.version.clone(),
                }
            })?;

            if let Some(rule) = rules.find(|d| d.major == major && d.minor == minor) {
                return Err(ConfigError::UnsupportedRuntime {
                    package: runtime.package.clone(),
                    version: runtime.version.clone(),
                    reason: rule.reason.clone(),
                });
            }
            log::debug!("runtime {}=={} accepted", runtime.package, runtime.version);
        }
        Ok(())
    }
}

/// Parse `major.minor` from versions like `1.9.0`, `1.10.0+cu113` or `0.11`.
fn parse_major_minor(version: &str) -> Option<(u64, u64)> {
    let release = version.trim().to_lowercase();
    let release = release.split('+').next()?;
    let mut parts = release.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_major_minor() {
        assert_eq!(parse_major_minor("1.9.0"), Some((1, 9)));
        assert_eq!(parse_major_minor("1.10.0+cu113"), Some((1, 10)));
        assert_eq!(parse_major_minor("0.11"), Some((0, 11)));
        assert_eq!(parse_major_minor("2"), None);
        assert_eq!(parse_major_minor("nightly"), None);
    }

    #[test]
    fn test_default_policy() {
        let policy = VersionPolicy::default();
        assert_eq!(policy.denied().len(), 4);

        let ok = [
            RuntimeVersion::new("torch", "1.10.1+cu111"),
            RuntimeVersion::new("torchvision", "0.11.2"),
            RuntimeVersion::new("numpy", "not-a-version"),
        ];
        assert!(policy.check(&ok).is_ok());

        let torch = [RuntimeVersion::new("torch", "1.9.0+cu111")];
        assert!(matches!(
            policy.check(&torch),
            Err(ConfigError::UnsupportedRuntime { .. })
        ));

        let vision = [RuntimeVersion::new("TorchVision", "0.10.0")];
        assert!(matches!(
            policy.check(&vision),
            Err(ConfigError::UnsupportedRuntime { .. })
        ));

        let garbled = [RuntimeVersion::new("torch", "dev")];
        assert!(matches!(
            policy.check(&garbled),
            Err(ConfigError::InvalidRuntimeVersion { .. })
        ));
    }

    #[test]
    fn test_permissive_policy() {
        let runtimes = [RuntimeVersion::new("torch", "1.8.0")];
        assert!(VersionPolicy::permissive().check(&runtimes).is_ok());
    }
}
