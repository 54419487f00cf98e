use crate::{core::geo::TileKey, MapError, Result};

/// Trait representing anything that can produce tile URLs for a given key.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `key`. The column is already wrapped.
    fn url(&self, key: &TileKey) -> String;
}

/// URL template with `{s}`, `{x}`, `{y}` and `{z}` placeholders.
///
/// `{s}` cycles through the subdomains by `(x + y) mod n` so neighbouring
/// tiles spread across hosts.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlTemplate {
    template: String,
    subdomains: Vec<char>,
}

impl UrlTemplate {
    pub fn new(template: impl Into<String>, subdomains: &str) -> Result<Self> {
        let template = template.into();
        let subdomains: Vec<char> = subdomains.chars().collect();
        if template.contains("{s}") && subdomains.is_empty() {
            return Err(MapError::InvalidConfig(format!(
                "template '{template}' needs subdomains"
            )));
        }
        Ok(Self {
            template,
            subdomains,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    fn subdomain(&self, key: &TileKey) -> Option<char> {
        if self.subdomains.is_empty() {
            return None;
        }
        let idx = (key.wrapped_x() + key.y).rem_euclid(self.subdomains.len() as i64) as usize;
        self.subdomains.get(idx).copied()
    }
}

impl TileSource for UrlTemplate {
    fn url(&self, key: &TileKey) -> String {
        let mut url = self
            .template
            .replace("{x}", &key.wrapped_x().to_string())
            .replace("{y}", &key.y.to_string())
            .replace("{z}", &key.z.to_string());
        if let Some(sub) = self.subdomain(key) {
            url = url.replace("{s}", &sub.to_string());
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::OSM_URL_TEMPLATE;

    #[test]
    fn test_osm_urls() {
        let source = UrlTemplate::new(OSM_URL_TEMPLATE, "abc").unwrap();
        assert_eq!(
            source.url(&TileKey::new(3, 2, 4)),
            "https://c.tile.openstreetmap.org/4/3/2.png"
        );
        assert_eq!(
            source.url(&TileKey::new(0, 0, 1)),
            "https://a.tile.openstreetmap.org/1/0/0.png"
        );
    }

    #[test]
    fn test_wraps_column() {
        let source = UrlTemplate::new("{s}/{z}/{x}/{y}", "ab").unwrap();
        // x = -1 at z = 2 is column 3 of the neighbouring world copy
        assert_eq!(source.url(&TileKey::new(-1, 1, 2)), "a/2/3/1");
        assert_eq!(source.url(&TileKey::new(5, 0, 2)), "b/2/1/0");
    }

    #[test]
    fn test_missing_subdomains() {
        assert!(UrlTemplate::new("https://{s}.example/{z}/{x}/{y}", "").is_err());
        let plain = UrlTemplate::new("https://example/{z}/{x}/{y}", "").unwrap();
        assert_eq!(plain.url(&TileKey::new(1, 1, 1)), "https://example/1/1/1");
        assert_eq!(plain.template(), "https://example/{z}/{x}/{y}");
    }
}
