use crate::{Error, Result};
use regex::Regex;
use std::{collections::BTreeMap, fmt};

pub static LABEL_NAME: &str = "app.kubernetes.io/name";
pub static LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub static LABEL_VERSION: &str = "app.kubernetes.io/version";
pub static LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub static APP_NAME: &str = "PaperMC";
pub static MANAGER_NAME: &str = "paper-operator";

lazy_static::lazy_static! {
    static ref LABEL_VALUE: Regex = Regex::new(r"^([A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?)?$").unwrap();
}

/// A (version, build) pair. Two pairs only match when both fields do.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VersionBuild {
    pub version: String,
    pub build: i64,
}

impl VersionBuild {
    pub fn new(version: &str, build: i64) -> VersionBuild {
        VersionBuild {
            version: version.to_string(),
            build,
        }
    }

    /// Suffix used in object names: dots are not welcome there
    pub fn name_suffix(&self) -> String {
        format!("{}-{}", self.version.replace('.', "-"), self.build)
    }
}

/// Label value form, ie `1.19.2-307`
impl fmt::Display for VersionBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.version, self.build)
    }
}

pub fn version_object_name(instance: &str, vb: &VersionBuild) -> String {
    format!("{instance}-{}", vb.name_suffix())
}

/// Labels shared by every child of an instance
pub fn instance_labels(instance: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_NAME.to_string(), APP_NAME.to_string()),
        (LABEL_INSTANCE.to_string(), instance.to_string()),
        (LABEL_MANAGED_BY.to_string(), MANAGER_NAME.to_string()),
    ])
}

/// Labels of the children bound to a single version
pub fn version_labels(instance: &str, vb: &VersionBuild) -> BTreeMap<String, String> {
    let mut labels = instance_labels(instance);
    labels.insert(LABEL_VERSION.to_string(), vb.to_string());
    labels
}

/// Selector used to pick the pods of an instance (whatever their version)
pub fn instance_selector(instance: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_NAME.to_string(), APP_NAME.to_string()),
        (LABEL_INSTANCE.to_string(), instance.to_string()),
    ])
}

fn check_label_value(value: &str) -> Result<()> {
    if value.len() > 63 || !LABEL_VALUE.is_match(value) {
        return Err(Error::InvalidSelector(format!("'{value}' is not a valid label value")));
    }
    Ok(())
}

/// Selector matching version scoped children of `instance` that are not on `current`
pub fn orphan_selector(instance: &str, current: &VersionBuild) -> Result<String> {
    let version = current.to_string();
    check_label_value(instance)?;
    check_label_value(&version)?;
    Ok(format!(
        "{LABEL_NAME}={APP_NAME},{LABEL_INSTANCE}={instance},{LABEL_VERSION},{LABEL_VERSION}!={version}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_build_forms() {
        let vb = VersionBuild::new("1.19.2", 307);
        assert_eq!(vb.to_string(), "1.19.2-307");
        assert_eq!(vb.name_suffix(), "1-19-2-307");
        assert_eq!(version_object_name("survival", &vb), "survival-1-19-2-307");
    }

    #[test]
    fn version_build_equality_needs_both_fields() {
        let a = VersionBuild::new("1.19.2", 307);
        assert_eq!(a, VersionBuild::new("1.19.2", 307));
        assert_ne!(a, VersionBuild::new("1.19.2", 308));
        assert_ne!(a, VersionBuild::new("1.19.3", 307));
    }

    #[test]
    fn version_labels_extend_instance_labels() {
        let labels = version_labels("survival", &VersionBuild::new("1.19.2", 307));
        assert_eq!(labels[LABEL_NAME], "PaperMC");
        assert_eq!(labels[LABEL_INSTANCE], "survival");
        assert_eq!(labels[LABEL_VERSION], "1.19.2-307");
        assert!(!instance_labels("survival").contains_key(LABEL_VERSION));
    }

    #[test]
    fn orphan_selector_requires_the_version_label() {
        let sel = orphan_selector("survival", &VersionBuild::new("1.19.3", 310)).unwrap();
        assert_eq!(
            sel,
            "app.kubernetes.io/name=PaperMC,app.kubernetes.io/instance=survival,app.kubernetes.io/version,app.kubernetes.io/version!=1.19.3-310"
        );
    }

    #[test]
    fn orphan_selector_rejects_bad_values() {
        let long = "a".repeat(64);
        assert!(matches!(
            orphan_selector(&long, &VersionBuild::new("1.19.3", 310)),
            Err(Error::InvalidSelector(_))
        ));
        assert!(orphan_selector("survival", &VersionBuild::new("1.19.3 ", 310)).is_err());
    }
}
