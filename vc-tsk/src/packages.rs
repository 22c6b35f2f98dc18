//  PACKAGES.rs
//    by Lut99
//
//  Created:
//    07 Oct 2026, 10:15:33
//  Last edited:
//    11 Oct 2026, 12:09:48
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines how components find the workload packages (i.e., the
//!   directories with the benchmark binaries) installed on this node.
//

use std::path::PathBuf;

use log::debug;


/***** TESTS *****/





/***** LIBRARY *****/
/// Something that knows where workload packages live.
pub trait PackageManager: Send + Sync {
    /// Returns the directory of the package with the given name, if it is installed.
    fn get_package(&self, name: &str) -> Option<PathBuf>;
}



/// A PackageManager that considers every subdirectory of a given directory a package.
#[derive(Clone, Debug)]
pub struct DirectoryPackageManager {
    /// The directory with all the packages.
    root : PathBuf,
}

impl DirectoryPackageManager {
    /// Constructor for the DirectoryPackageManager.
    #[inline]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root : root.into(),
        }
    }
}

impl PackageManager for DirectoryPackageManager {
    fn get_package(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || name.contains(|c: char| c == '/' || c == '\\') || name == "." || name == ".." { return None; }
        let path: PathBuf = self.root.join(name);
        if path.is_dir() {
            debug!("Found package '{}' at '{}'", name, path.display());
            Some(path)
        } else {
            None
        }
    }
}
