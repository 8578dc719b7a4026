//! Required-environment checks for cloud access
//!
//! kops reads AWS credentials from the process environment; outside
//! development mode the client refuses to construct without them so
//! misconfiguration surfaces at startup instead of mid-provision.

use crate::error::KopsError;

/// Environment variables kops needs to reach AWS.
pub(crate) const REQUIRED_CLOUD_ENVS: &[&str] = &["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"];

/// Returns the subset of `required` with no entry among `present` keys.
pub(crate) fn missing_envs<'a>(
    required: &[&'a str],
    present: impl Iterator<Item = (String, String)>,
) -> Vec<&'a str> {
    let keys: Vec<String> = present.map(|(key, _)| key).collect();
    required
        .iter()
        .filter(|name| !keys.iter().any(|key| key == *name))
        .copied()
        .collect()
}

/// Fails with `KopsError::MissingEnv` when cloud credentials are absent.
pub(crate) fn check_cloud_envs() -> Result<(), KopsError> {
    let missing = missing_envs(REQUIRED_CLOUD_ENVS, std::env::vars());
    if missing.is_empty() {
        Ok(())
    } else {
        Err(KopsError::MissingEnv(missing.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn reports_all_missing_when_environment_empty() {
        let missing = missing_envs(REQUIRED_CLOUD_ENVS, vars(&[]).into_iter());
        assert_eq!(missing, REQUIRED_CLOUD_ENVS);
    }

    #[test]
    fn reports_only_absent_variables() {
        let present = vars(&[("AWS_ACCESS_KEY_ID", "AKIA123"), ("HOME", "/root")]);
        let missing = missing_envs(REQUIRED_CLOUD_ENVS, present.into_iter());
        assert_eq!(missing, vec!["AWS_SECRET_ACCESS_KEY"]);
    }

    #[test]
    fn empty_when_all_present() {
        let present = vars(&[
            ("AWS_ACCESS_KEY_ID", "AKIA123"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
        ]);
        let missing = missing_envs(REQUIRED_CLOUD_ENVS, present.into_iter());
        assert!(missing.is_empty());
    }
}
