use std::convert::TryFrom;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use httparse::Header;

use crate::error::Error;

/// Converts httparse's raw headers into a [`HeaderMap`].
///
/// Values are appended, not inserted, so a part repeating a header name keeps
/// every value in order.
pub(crate) fn raw_headers_to_header_map(raw_headers: &[Header]) -> crate::Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(raw_headers.len());

    for raw_header in raw_headers {
        let name = HeaderName::try_from(raw_header.name).map_err(|err| Error::DecodeHeaderName {
            name: raw_header.name.to_owned(),
            cause: err.into(),
        })?;

        let value = HeaderValue::try_from(raw_header.value).map_err(|err| Error::DecodeHeaderValue {
            value: raw_header.value.to_owned(),
            cause: err.into(),
        })?;

        headers.append(name, value);
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_names_are_kept() {
        let raw = [
            Header { name: "x-tag", value: b"one" },
            Header { name: "x-tag", value: b"two" },
            Header { name: "content-type", value: b"plain/text" },
        ];

        let headers = raw_headers_to_header_map(&raw).unwrap();
        assert_eq!(headers.len(), 3);

        let tags: Vec<_> = headers.get_all("x-tag").iter().collect();
        assert_eq!(tags, [&"one", &"two"]);
        assert_eq!(headers["content-type"], "plain/text");
    }

    #[test]
    fn test_invalid_name_is_rejected() {
        let raw = [Header { name: "bad name", value: b"v" }];
        assert!(raw_headers_to_header_map(&raw).is_err());
    }
}
