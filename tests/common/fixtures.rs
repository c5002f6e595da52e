//! HTML fixtures and mock site helpers

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Bytes served as a PNG image
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\nsprite sheet bytes";

/// One catalog entry: title, detail href, optional icon src
pub struct CatalogItem<'a> {
    pub title: &'a str,
    pub href: &'a str,
    pub icon: Option<&'a str>,
}

impl<'a> CatalogItem<'a> {
    pub fn new(title: &'a str, href: &'a str) -> Self {
        Self {
            title,
            href,
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: &'a str) -> Self {
        self.icon = Some(icon);
        self
    }
}

/// Render a catalog page in the source site's layout
pub fn catalog_html(sections: &[(&str, Vec<CatalogItem<'_>>)]) -> String {
    let mut html = String::from("<html><body>\n");
    for (name, items) in sections {
        html.push_str(&format!(
            "<div class=\"section\"><div class=\"sect-name\" title=\"{name}\">{name}</div></div>\n"
        ));
        html.push_str("<div class=\"updatesheeticons\">\n");
        for item in items {
            let icon = item
                .icon
                .map(|src| format!("<div class=\"iconbody\"><img src=\"{src}\"></div>"))
                .unwrap_or_default();
            html.push_str(&format!(
                "<a href=\"{}\"><div class=\"iconcontainer\"><div class=\"iconheader\"><span class=\"iconheadertext\">{}</span></div>{}</div></a>\n",
                item.href, item.title, icon
            ));
        }
        html.push_str("</div>\n");
    }
    html.push_str("</body></html>");
    html
}

/// Detail page with a metadata table and arbitrary body markup
pub fn detail_html(submitter: &str, body: &str) -> String {
    format!(
        "<html><body>{body}<table><tr><td>Platform</td><td>DS</td></tr>\
         <tr><td>Submitter</td><td>{submitter}</td></tr></table></body></html>"
    )
}

/// Serve `body` as HTML at `route`
pub async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/html; charset=utf-8")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

/// Serve a PNG at `route`
pub async fn mount_image(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/png")
                .set_body_bytes(PNG),
        )
        .mount(server)
        .await;
}

/// Number of requests the server saw for `route`
pub async fn hits(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}
