use std::fmt;
use url::Url;

/// Scheme, host and port of a URL
///
/// Two URLs are same-origin when all three are equal. The port is the
/// effective one, so `https://a.test` and `https://a.test:443` match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl Origin {
    /// Extracts the origin of a URL
    ///
    /// Returns `None` for URLs without a host.
    ///
    /// # Examples
    ///
    /// ```
    /// use url::Url;
    /// use jsfinder::url::Origin;
    ///
    /// let a = Origin::of(&Url::parse("https://EXAMPLE.com/a").unwrap()).unwrap();
    /// let b = Origin::of(&Url::parse("https://example.com:443/b").unwrap()).unwrap();
    /// assert_eq!(a, b);
    /// ```
    pub fn of(url: &Url) -> Option<Self> {
        let host = url.host_str()?.to_lowercase();
        Some(Self {
            scheme: url.scheme().to_string(),
            host,
            port: url.port_or_known_default(),
        })
    }

    /// Returns true if `url` has this origin
    pub fn contains(&self, url: &Url) -> bool {
        Origin::of(url).as_ref() == Some(self)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}
