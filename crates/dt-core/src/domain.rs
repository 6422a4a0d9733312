//! Mapping URLs to the domain they are attributed to.

use url::Url;

use crate::types::DomainId;

/// Resolves a URL to its canonical domain.
///
/// Returns the host of a well-formed URL, without scheme, port or path.
/// Absent input, unparsable input and URLs without a host (`about:blank`,
/// `file:///tmp`, `data:` URLs) all resolve to `None`. Extension pages keep
/// their opaque host, so `moz-extension://<uuid>/` resolves to the UUID.
/// Never fails.
pub fn resolve(url: Option<&str>) -> Option<DomainId> {
    let parsed = Url::parse(url?).ok()?;
    let host = parsed.host_str()?;
    DomainId::new(host).ok()
}
