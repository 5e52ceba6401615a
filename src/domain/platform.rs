use serde::{Deserialize, Serialize};
use url::Url;

/// Supported storefronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Amazon,
    Flipkart,
    Zepto,
}

impl Platform {
    pub fn from_url(url: &Url) -> Option<Self> {
        let host = url.host_str()?.to_lowercase();
        Self::from_host(&host)
    }

    pub fn from_host(host: &str) -> Option<Self> {
        if host.contains("amazon.") {
            Some(Platform::Amazon)
        } else if host.contains("flipkart.") {
            Some(Platform::Flipkart)
        } else if host.contains("zepto") {
            Some(Platform::Zepto)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Amazon => "amazon",
            Platform::Flipkart => "flipkart",
            Platform::Zepto => "zepto",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Amazon => "Amazon",
            Platform::Flipkart => "Flipkart",
            Platform::Zepto => "Zepto",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_amazon_storefronts() {
        for url in ["https://www.amazon.in/dp/B0", "https://smile.amazon.com/s?k=atta"] {
            let url = Url::parse(url).unwrap();
            assert_eq!(Platform::from_url(&url), Some(Platform::Amazon));
        }
    }

    #[test]
    fn test_detects_stub_platforms() {
        let flipkart = Url::parse("https://www.flipkart.com/search?q=atta").unwrap();
        let zepto = Url::parse("https://www.zeptonow.com/search").unwrap();
        assert_eq!(Platform::from_url(&flipkart), Some(Platform::Flipkart));
        assert_eq!(Platform::from_url(&zepto), Some(Platform::Zepto));
    }

    #[test]
    fn test_unsupported_site() {
        let url = Url::parse("https://example.com/shop").unwrap();
        assert_eq!(Platform::from_url(&url), None);
    }
}
