//! The GraphiQL explorer page.

use bytes::Bytes;
use http::HeaderMap;
use http::HeaderValue;
use http::header::CONTENT_TYPE;
use mediatype::MediaType;
use mediatype::MediaTypeList;
use mediatype::names::HTML;
use mediatype::names::TEXT;

pub(super) fn prefers_html(headers: &HeaderMap) -> bool {
    let text_html = MediaType::new(TEXT, HTML);

    headers.get_all(&http::header::ACCEPT).iter().any(|value| {
        value
            .to_str()
            .map(|accept_str| {
                let mut list = MediaTypeList::new(accept_str);

                list.any(|mime| mime.as_ref() == Ok(&text_html))
            })
            .unwrap_or(false)
    })
}

pub(super) fn graphiql_page_content() -> Bytes {
    const TEMPLATE: &str = include_str!("../../templates/graphiql.html");
    Bytes::from(TEMPLATE.replace("{{GATEWAY_VERSION}}", std::env!("CARGO_PKG_VERSION")))
}

pub(super) fn html_content_type() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(mime::TEXT_HTML_UTF_8.as_ref()),
    );
    headers
}

#[cfg(test)]
mod tests {
    use http::header::ACCEPT;

    use super::*;

    fn accept(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn browsers_prefer_html() {
        assert!(prefers_html(&accept(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
        )));
        assert!(!prefers_html(&accept("application/json")));
        assert!(!prefers_html(&HeaderMap::new()));
    }

    #[test]
    fn the_page_carries_the_version() {
        let page = graphiql_page_content();
        let page = std::str::from_utf8(&page).unwrap();
        assert!(page.contains(std::env!("CARGO_PKG_VERSION")));
        assert!(!page.contains("{{GATEWAY_VERSION}}"));
    }
}
