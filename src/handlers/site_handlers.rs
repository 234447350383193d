//! Public presentation endpoints: RSS/Atom feeds, sitemaps and the
//! front-page blocks, plus the admin settings/activity surface.
//!
//! Feed and sitemap XML is assembled by hand; every interpolated value goes
//! through `xml_escape`.

use crate::{errors::AppError, state::AppState};
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;

/// GET `/api/frontpage` — CMS blocks from settings plus featured photos.
pub async fn frontpage(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let hero_title = state
        .settings
        .get_or("frontpage.hero_title", &state.cfg.site_title)
        .await
        .map_err(AppError::from)?;
    let hero_subtitle = state
        .settings
        .get("frontpage.hero_subtitle")
        .await
        .map_err(AppError::from)?;
    let about = state
        .settings
        .get("frontpage.about")
        .await
        .map_err(AppError::from)?;
    let featured = state.catalog.featured_photos(12).await?;
    Ok(Json(json!({
        "hero_title": hero_title,
        "hero_subtitle": hero_subtitle,
        "about": about,
        "featured_photos": featured,
    })))
}

/// GET `/feed.xml` — RSS 2.0 over published posts.
pub async fn rss_feed(State(state): State<AppState>) -> Result<Response, AppError> {
    let posts = state.blog.published_posts(50).await?;
    let base = &state.cfg.public_base_url;
    let description = state
        .settings
        .get_or("site.description", "Photography portfolio")
        .await
        .map_err(AppError::from)?;

    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel>"#);
    xml.push_str(&format!("<title>{}</title>", xml_escape(&state.cfg.site_title)));
    xml.push_str(&format!("<link>{}</link>", xml_escape(base)));
    xml.push_str(&format!("<description>{}</description>", xml_escape(&description)));
    xml.push_str(&format!(
        "<lastBuildDate>{}</lastBuildDate>",
        Utc::now().to_rfc2822()
    ));
    for post in &posts {
        let link = format!("{base}/blog/{}", post.slug);
        xml.push_str("<item>");
        xml.push_str(&format!("<title>{}</title>", xml_escape(&post.title)));
        xml.push_str(&format!("<link>{}</link>", xml_escape(&link)));
        xml.push_str(&format!("<guid>{}</guid>", xml_escape(&link)));
        if let Some(at) = post.published_at {
            xml.push_str(&format!("<pubDate>{}</pubDate>", at.to_rfc2822()));
        }
        let summary = post
            .excerpt
            .as_deref()
            .or(post.meta_description.as_deref())
            .unwrap_or("");
        xml.push_str(&format!("<description>{}</description>", xml_escape(summary)));
        xml.push_str("</item>");
    }
    xml.push_str("</channel></rss>");
    Ok(xml_response(xml, "application/rss+xml"))
}

/// GET `/atom.xml` — Atom over published posts.
pub async fn atom_feed(State(state): State<AppState>) -> Result<Response, AppError> {
    let posts = state.blog.published_posts(50).await?;
    let base = &state.cfg.public_base_url;

    let updated = posts
        .iter()
        .filter_map(|p| p.published_at)
        .max()
        .unwrap_or_else(Utc::now);

    let mut xml =
        String::from(r#"<?xml version="1.0" encoding="UTF-8"?><feed xmlns="http://www.w3.org/2005/Atom">"#);
    xml.push_str(&format!("<title>{}</title>", xml_escape(&state.cfg.site_title)));
    xml.push_str(&format!("<id>{}/</id>", xml_escape(base)));
    xml.push_str(&format!(r#"<link href="{}"/>"#, xml_escape(base)));
    xml.push_str(&format!(
        "<updated>{}</updated>",
        updated.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    for post in &posts {
        let link = format!("{base}/blog/{}", post.slug);
        xml.push_str("<entry>");
        xml.push_str(&format!("<title>{}</title>", xml_escape(&post.title)));
        xml.push_str(&format!("<id>{}</id>", xml_escape(&link)));
        xml.push_str(&format!(r#"<link href="{}"/>"#, xml_escape(&link)));
        if let Some(at) = post.published_at {
            xml.push_str(&format!(
                "<updated>{}</updated>",
                at.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }
        let summary = post
            .excerpt
            .as_deref()
            .or(post.meta_description.as_deref())
            .unwrap_or("");
        xml.push_str(&format!("<summary>{}</summary>", xml_escape(summary)));
        xml.push_str("</entry>");
    }
    xml.push_str("</feed>");
    Ok(xml_response(xml, "application/atom+xml"))
}

/// GET `/sitemap.xml` — published photos, categories, galleries and posts.
pub async fn sitemap(State(state): State<AppState>) -> Result<Response, AppError> {
    let base = &state.cfg.public_base_url;
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#,
    );
    push_url(&mut xml, &format!("{base}/"), None);

    for photo in state.catalog.published_photos().await? {
        push_url(
            &mut xml,
            &format!("{base}/photos/{}", photo.slug),
            Some(photo.updated_at),
        );
    }
    for category in state.catalog.list_categories(true).await? {
        push_url(&mut xml, &format!("{base}/categories/{}", category.slug), None);
    }
    for gallery in state.galleries.list(true).await? {
        push_url(
            &mut xml,
            &format!("{base}/galleries/{}", gallery.slug),
            Some(gallery.updated_at),
        );
    }
    for post in state.blog.published_posts(200).await? {
        push_url(
            &mut xml,
            &format!("{base}/blog/{}", post.slug),
            Some(post.updated_at),
        );
    }
    xml.push_str("</urlset>");
    Ok(xml_response(xml, "application/xml"))
}

/// GET `/sitemap-images.xml` — image sitemap over published photos.
pub async fn image_sitemap(State(state): State<AppState>) -> Result<Response, AppError> {
    let base = &state.cfg.public_base_url;
    let mut xml = String::from(concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9" "#,
        r#"xmlns:image="http://www.google.com/schemas/sitemap-image/1.1">"#
    ));
    for photo in state.catalog.published_photos().await? {
        xml.push_str("<url>");
        xml.push_str(&format!(
            "<loc>{}</loc>",
            xml_escape(&format!("{base}/photos/{}", photo.slug))
        ));
        xml.push_str("<image:image>");
        xml.push_str(&format!(
            "<image:loc>{}</image:loc>",
            xml_escape(&format!("{base}/api/photos/{}/image/optimized", photo.slug))
        ));
        xml.push_str(&format!("<image:title>{}</image:title>", xml_escape(&photo.title)));
        if let Some(alt) = &photo.alt_text {
            xml.push_str(&format!("<image:caption>{}</image:caption>", xml_escape(alt)));
        }
        xml.push_str("</image:image></url>");
    }
    xml.push_str("</urlset>");
    Ok(xml_response(xml, "application/xml"))
}

fn push_url(xml: &mut String, loc: &str, lastmod: Option<chrono::DateTime<Utc>>) {
    xml.push_str("<url>");
    xml.push_str(&format!("<loc>{}</loc>", xml_escape(loc)));
    if let Some(at) = lastmod {
        xml.push_str(&format!(
            "<lastmod>{}</lastmod>",
            at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }
    xml.push_str("</url>");
}

fn xml_response(xml: String, content_type: &'static str) -> Response {
    let mut response = Response::new(Body::from(xml));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

pub(crate) fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

// --- Admin surface ---

/// GET `/api/admin/settings`
pub async fn list_settings(
    State(state): State<AppState>,
) -> Result<Json<std::collections::HashMap<String, String>>, AppError> {
    Ok(Json(state.settings.all().await.map_err(AppError::from)?))
}

#[derive(Debug, Deserialize)]
pub struct PutSettingRequest {
    pub value: String,
}

/// PUT `/api/admin/settings/{key}`
pub async fn put_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<PutSettingRequest>,
) -> Result<StatusCode, AppError> {
    state
        .settings
        .set(&key, &req.value)
        .await
        .map_err(AppError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE `/api/admin/settings/{key}`
pub async fn delete_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .settings
        .remove(&key)
        .await
        .map_err(AppError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

/// GET `/api/admin/activity`
pub async fn list_activity(
    State(state): State<AppState>,
    Query(q): Query<RecentQuery>,
) -> Result<Json<Vec<crate::models::activity::ActivityEntry>>, AppError> {
    Ok(Json(
        state
            .activity
            .recent(q.limit.unwrap_or(100))
            .await
            .map_err(AppError::from)?,
    ))
}

/// GET `/api/admin/inquiries`
pub async fn list_inquiries(
    State(state): State<AppState>,
    Query(q): Query<RecentQuery>,
) -> Result<Json<Vec<crate::models::post::Inquiry>>, AppError> {
    Ok(Json(state.inquiries.list(q.limit.unwrap_or(100)).await?))
}

#[cfg(test)]
mod tests {
    use super::xml_escape;

    #[test]
    fn escapes_all_markup_characters() {
        assert_eq!(
            xml_escape(r#"<Dunes & "Dust">"#),
            "&lt;Dunes &amp; &quot;Dust&quot;&gt;"
        );
        assert_eq!(xml_escape("it's"), "it&apos;s");
    }
}
