//! `sitemap.xml`: home, every collection, every published post.

use crate::types::SiteContent;

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn render_sitemap(base_url: &str, content: &SiteContent) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");
    xml.push_str(&format!("  <url><loc>{}</loc></url>\n", xml_escape(base_url)));

    for collection in content.collections() {
        let loc = format!("{base_url}/{}", collection.slug);
        xml.push_str(&format!("  <url><loc>{}</loc></url>\n", xml_escape(&loc)));

        for post in &collection.posts {
            let loc = xml_escape(&format!("{base_url}{}", post.url));
            let entry = match post.last_modified() {
                Some(date) => format!(
                    "  <url><loc>{loc}</loc><lastmod>{}</lastmod></url>\n",
                    date.format("%Y-%m-%d")
                ),
                None => format!("  <url><loc>{loc}</loc></url>\n"),
            };
            xml.push_str(&entry);
        }
    }

    xml.push_str("</urlset>\n");
    xml
}
