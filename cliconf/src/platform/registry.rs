//! Registry of device-family profiles keyed by family and firmware version.

use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;

use super::definition::{ProfileSpec, TerminalProfile};
use super::vendors;
use crate::error::{ProfileError, Result};

/// Maps family name to version prefix to compiled profile.
///
/// Not global: each caller owns the registry it builds sessions from, so a
/// test can load firmware fixtures without affecting anything else.
#[derive(Debug, Default, Clone)]
pub struct ProfileRegistry {
    families: IndexMap<String, IndexMap<String, Arc<TerminalProfile>>>,
}

impl ProfileRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in profiles.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.insert(Arc::new(vendors::mpos::profile()));
        registry
    }

    /// Compile and register a profile.
    ///
    /// # Errors
    ///
    /// `ProfileError::AlreadyRegistered` if the family already has a profile
    /// for this exact version prefix, or `ProfileError::InvalidPattern`.
    pub fn register(&mut self, spec: ProfileSpec) -> Result<()> {
        if self.contains(&spec.family, &spec.version) {
            return Err(ProfileError::AlreadyRegistered {
                name: spec.family,
                version: spec.version,
            }
            .into());
        }
        let profile = TerminalProfile::from_spec(spec)?;
        self.insert(Arc::new(profile));
        Ok(())
    }

    /// Register every profile in a JSON array of [`ProfileSpec`]s.
    ///
    /// Returns the number registered. Stops at the first failure.
    pub fn load_json(&mut self, json: &str) -> Result<usize> {
        let specs: Vec<ProfileSpec> = serde_json::from_str(json).map_err(ProfileError::from)?;
        let count = specs.len();
        for spec in specs {
            debug!("loading profile {} {:?}", spec.family, spec.version);
            self.register(spec)?;
        }
        Ok(count)
    }

    /// Find the profile for `family`, preferring the longest version prefix
    /// that `version` starts with.
    ///
    /// Without a matching prefix the family default (empty version) is used,
    /// or failing that the first profile registered for the family.
    pub fn lookup(&self, family: &str, version: Option<&str>) -> Result<Arc<TerminalProfile>> {
        let versions = self
            .families
            .get(family)
            .ok_or_else(|| ProfileError::UnknownFamily {
                name: family.to_string(),
            })?;

        let by_prefix = version.and_then(|version| {
            versions
                .iter()
                .filter(|(prefix, _)| !prefix.is_empty() && version.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, profile)| profile)
        });

        by_prefix
            .or_else(|| versions.get(""))
            .or_else(|| versions.values().next())
            .cloned()
            .ok_or_else(|| {
                ProfileError::UnknownFamily {
                    name: family.to_string(),
                }
                .into()
            })
    }

    pub fn contains(&self, family: &str, version: &str) -> bool {
        self.families
            .get(family)
            .is_some_and(|versions| versions.contains_key(version))
    }

    /// Registered family names, in registration order.
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.families.keys().map(String::as_str)
    }

    fn insert(&mut self, profile: Arc<TerminalProfile>) {
        self.families
            .entry(profile.family().to_string())
            .or_default()
            .insert(profile.version().to_string(), profile);
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::error::Error;
    use crate::platform::vendors::mpos;

    fn fixture(version: &str, paging: &str) -> ProfileSpec {
        let mut spec = mpos::spec();
        spec.version = version.to_string();
        spec.paging_command = paging.to_string();
        spec
    }

    #[test]
    fn test_builtin_lookup() {
        let registry = ProfileRegistry::with_builtin();
        let profile = assert_ok!(registry.lookup("mpos", None));
        assert_eq!(profile.network_os(), "mpos");
        assert_eq!(registry.families().collect::<Vec<_>>(), vec!["mpos"]);
    }

    #[test]
    fn test_unknown_family() {
        let registry = ProfileRegistry::with_builtin();
        let err = assert_err!(registry.lookup("ios", None));
        assert!(matches!(
            err,
            Error::Profile(ProfileError::UnknownFamily { .. })
        ));
    }

    #[test]
    fn test_longest_version_prefix_wins() {
        let mut registry = ProfileRegistry::with_builtin();
        assert_ok!(registry.register(fixture("9", "more off")));
        assert_ok!(registry.register(fixture("9.1", "terminal length 0")));

        let pick = |v: Option<&str>| {
            registry
                .lookup("mpos", v)
                .map(|p| p.version().to_string())
                .unwrap()
        };
        assert_eq!(pick(Some("9.1.2")), "9.1");
        assert_eq!(pick(Some("9.2.0")), "9");
        assert_eq!(pick(Some("7.0")), "");
        assert_eq!(pick(None), "");
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = ProfileRegistry::with_builtin();
        let err = assert_err!(registry.register(mpos::spec()));
        assert!(matches!(
            err,
            Error::Profile(ProfileError::AlreadyRegistered { .. })
        ));
    }

    #[test]
    fn test_load_json() {
        let specs = vec![fixture("8", "more off")];
        let json = serde_json::to_string(&specs).unwrap();

        let mut registry = ProfileRegistry::new();
        assert_eq!(assert_ok!(registry.load_json(&json)), 1);
        // No family default: the only registered profile is used
        let profile = assert_ok!(registry.lookup("mpos", Some("7.5")));
        assert_eq!(profile.version(), "8");

        let err = assert_err!(registry.load_json("{not json"));
        assert!(matches!(err, Error::Profile(ProfileError::Parse(_))));
    }
}
