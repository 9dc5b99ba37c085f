use super::Error;
use crate::common::RepoIdentifier;
use std::collections::BTreeMap;

/// The segment of a fully qualified class name that identifies the module it lives in, e.g.
/// `foundation` in `com.acme.foundation.CacheTest`.
const MODULE_SEGMENT: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct LinkSettings {
    pub repository: RepoIdentifier,
    pub branch: String,
    /// Module name to the folder, relative to the repository root, holding its test sources.
    pub folders: BTreeMap<String, String>,
}

/// Builds links to the source file of a test class on GitHub.
pub struct LinkAnnotator {
    base_url: String,
    folders: BTreeMap<String, String>,
}

impl LinkAnnotator {
    pub fn new(settings: LinkSettings) -> Self {
        let base_url = format!(
            "https://github.com/{}/tree/{}",
            settings.repository, settings.branch
        );
        Self {
            base_url,
            folders: settings.folders,
        }
    }

    /// Returns the link for `test_class`, or `None` if its module has no known folder.
    ///
    /// Class names with fewer than 3 segments carry no module and are rejected.
    pub fn link_for(&self, test_class: &str) -> Result<Option<String>, Error> {
        let module = test_class
            .split('.')
            .nth(MODULE_SEGMENT)
            .ok_or_else(|| Error::MalformedClassName(test_class.to_string()))?;
        let link = self.folders.get(module).map(|folder| {
            format!(
                "{}/{}/{}.java",
                self.base_url,
                folder,
                test_class.replace('.', "/")
            )
        });
        Ok(link)
    }
}
