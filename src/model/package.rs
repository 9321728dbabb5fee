use serde::{Deserialize, Serialize};

/// An installed package, identified by its name and version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: String,
}

impl Package {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Packages and OS version collected from an image's layers.
///
/// Packages are kept in layer order and never deduplicated: a package
/// reinstalled by a later layer appears once per layer that records it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub packages: Vec<Package>,
    /// Raw `VERSION_ID` from the last os-release file seen, empty if none.
    pub os_version: String,
}

impl Inventory {
    /// Folds one layer's findings into the inventory.
    ///
    /// Packages are appended. The OS version is replaced only when the layer
    /// contained an os-release file.
    pub fn merge(&mut self, packages: Vec<Package>, os_version: Option<String>) {
        self.packages.extend(packages);
        if let Some(version) = os_version {
            self.os_version = version;
        }
    }
}

/// A layer left out of the inventory, with the reason it could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedLayer {
    pub digest: String,
    pub reason: String,
}
