//! WordPress installation discovery.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Path component holding the customer login in `/home/<x>/<customer>/...`.
pub const DEFAULT_CUSTOMER_COMPONENT: usize = 3;

/// A document root that contains a WordPress installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WpSite {
    pub root: PathBuf,
    pub config: PathBuf,
    pub plugin_dir: PathBuf,
}

impl WpSite {
    /// Probe `root` for `wp-config.php` and `wp-content/plugins`.
    ///
    /// Both must be present: the config as a non-empty regular file, the
    /// plugin directory as a directory.
    pub fn probe(root: &Path) -> Option<WpSite> {
        let config = root.join("wp-config.php");
        let plugin_dir = root.join("wp-content").join("plugins");

        let config_meta = std::fs::metadata(&config).ok()?;
        if !config_meta.is_file() || config_meta.len() == 0 {
            return None;
        }
        if !std::fs::metadata(&plugin_dir).ok()?.is_dir() {
            return None;
        }

        Some(WpSite {
            root: root.to_path_buf(),
            config,
            plugin_dir,
        })
    }

    /// Customer login derived from the config path.
    pub fn customer(&self, component: usize) -> Option<String> {
        customer_from_path(&self.config, component)
    }
}

/// Keep the roots that hold a WordPress installation, in input order.
pub fn discover_sites<'a, I>(roots: I) -> Vec<WpSite>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    roots
        .into_iter()
        .filter_map(|root| WpSite::probe(root))
        .collect()
}

/// The `component`-th element of the `/`-separated path.
///
/// Component 0 is the empty string before the leading slash, so for
/// `/home/a/alice/site/wp-config.php` component 3 is `alice`.
pub fn customer_from_path(path: &Path, component: usize) -> Option<String> {
    let text = path.to_str()?;
    text.split('/')
        .nth(component)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
