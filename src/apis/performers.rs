use crate::apis::{ListingApi, PageRequest};
use crate::config::{Credentials, UpstreamSettings};
use crate::constants::API_KEY_HEADER;
use crate::error::{Result, SyncError};
use crate::types::RawPerformer;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, instrument};

/// reqwest-backed client for the performers listing API
pub struct PerformersApi {
    client: reqwest::Client,
    settings: UpstreamSettings,
    credentials: Credentials,
}

impl PerformersApi {
    /// Build the client. The URL template is checked here so a broken one
    /// fails the run before any request is made.
    pub fn new(settings: UpstreamSettings, credentials: Credentials) -> Result<Self> {
        render_url(
            &settings.url_template,
            &credentials.api_token,
            &["check"],
            1,
            1,
            &settings.sort,
        )?;
        let client = reqwest::Client::builder()
            .user_agent(credentials.user_agent.clone())
            .connect_timeout(settings.connect_timeout)
            .build()?;
        Ok(Self {
            client,
            settings,
            credentials,
        })
    }

    pub fn page_url(&self, request: &PageRequest) -> Result<Url> {
        render_url(
            &self.settings.url_template,
            &self.credentials.api_token,
            &[request.brand.as_str()],
            request.page,
            request.per_page,
            &self.settings.sort,
        )
    }
}

#[async_trait::async_trait]
impl ListingApi for PerformersApi {
    #[instrument(skip(self, request), fields(brand = %request.brand, page = request.page))]
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawPerformer>> {
        let url = self.page_url(request)?;
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.credentials.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Upstream {
                status: status.as_u16(),
                brand: request.brand.clone(),
                page: request.page,
            });
        }

        let body = response.text().await?;
        let payload: Value = serde_json::from_str(&body)?;
        let records = extract_records(payload);
        debug!("Received {} records", records.len());
        Ok(records)
    }
}

/// Fill the URL template's `{token}`, `{brands}`, `{page}`, `{per_page}` and
/// `{sort}` placeholders in one pass. Values are percent-encoded; brands are
/// encoded individually and joined with a literal comma.
pub fn render_url(
    template: &str,
    token: &str,
    brands: &[&str],
    page: u32,
    per_page: u32,
    sort: &str,
) -> Result<Url> {
    let brand_filter = brands
        .iter()
        .map(|b| urlencoding::encode(b).into_owned())
        .collect::<Vec<_>>()
        .join(",");
    let values = [
        ("token", urlencoding::encode(token).into_owned()),
        ("brands", brand_filter),
        ("page", page.to_string()),
        ("per_page", per_page.to_string()),
        ("sort", urlencoding::encode(sort).into_owned()),
    ];

    let mut rendered = String::with_capacity(template.len() + 64);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let tail = &rest[open..];
        let filled = tail.find('}').and_then(|close| {
            let name = &tail[1..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (close, value))
        });
        match filled {
            Some((close, value)) => {
                rendered.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                rendered.push('{');
                rest = &tail[1..];
            }
        }
    }
    rendered.push_str(rest);

    Url::parse(&rendered)
        .map_err(|e| SyncError::Config(format!("Invalid upstream URL template: {}", e)))
}

/// Pull the record list out of a listing response: `performers` or `data`
/// under an object, or a bare array.
pub fn extract_records(payload: Value) -> Vec<RawPerformer> {
    match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => ["performers", "data"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_all_placeholders() {
        let url = render_url(
            "https://api.test/v1/list?token={token}&brands={brands}&page={page}&limit={per_page}&sort={sort}",
            "tok",
            &["stripchat", "bongacams"],
            3,
            50,
            "popular",
        )
        .unwrap();
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("token".into(), "tok".into())));
        assert!(query.contains(&("brands".into(), "stripchat,bongacams".into())));
        assert!(query.contains(&("page".into(), "3".into())));
        assert!(query.contains(&("limit".into(), "50".into())));
        assert!(query.contains(&("sort".into(), "popular".into())));
    }

    #[test]
    fn bad_template_is_a_config_error() {
        let err = render_url("not a url {page}", "t", &["x"], 1, 10, "s").unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn reserved_characters_in_values_stay_inside_their_parameter() {
        let url = render_url(
            "https://api.test/list?token={token}&brands={brands}&page={page}&sort={sort}",
            "ab&page=99#x",
            &["a b", "c"],
            1,
            10,
            "{page}",
        )
        .unwrap();
        assert_eq!(url.fragment(), None);
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            query,
            vec![
                ("token".to_string(), "ab&page=99#x".to_string()),
                ("brands".to_string(), "a b,c".to_string()),
                ("page".to_string(), "1".to_string()),
                ("sort".to_string(), "{page}".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_placeholders_are_left_alone() {
        let url = render_url("https://api.test/{other}?p={page}", "t", &["x"], 2, 1, "s").unwrap();
        assert_eq!(url.query(), Some("p=2"));
        assert!(url.path().contains("other"));
    }

    #[test]
    fn client_rejects_a_broken_template_up_front() {
        let settings = UpstreamSettings {
            url_template: "not a url {page}".to_string(),
            sort: "popular".to_string(),
            connect_timeout: std::time::Duration::from_secs(1),
        };
        let credentials = Credentials {
            api_key: "k".to_string(),
            api_token: "t".to_string(),
            user_agent: "test".to_string(),
        };
        assert!(matches!(
            PerformersApi::new(settings, credentials),
            Err(SyncError::Config(_))
        ));
    }

    #[test]
    fn extracts_from_performers_or_data() {
        let records = extract_records(json!({"performers": [{"id": 1}], "data": [{"id": 2}]}));
        assert_eq!(records, vec![json!({"id": 1})]);

        let records = extract_records(json!({"data": [{"id": 2}], "total": 1}));
        assert_eq!(records, vec![json!({"id": 2})]);

        let records = extract_records(json!([{"id": 3}]));
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn unexpected_shapes_are_empty_pages() {
        assert!(extract_records(json!({"performers": "none"})).is_empty());
        assert!(extract_records(json!({"error": "quota"})).is_empty());
        assert!(extract_records(json!(null)).is_empty());
    }
}
