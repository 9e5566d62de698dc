//! `PageStore` implementation speaking the MediaWiki `api.php` protocol.
//!
//! Fetches go through `action=query` with `prop=revisions&rvslots=main`;
//! listings through `list=categorymembers` / `list=backlinks`, following
//! `cmcontinue`/`blcontinue` so results are complete; saves through
//! `action=query&meta=tokens` plus `action=edit`. API error codes map onto
//! the store error taxonomy, and transport failures surface as `Transient`
//! so the batch driver can retry them.

use std::env;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::StoreError;
use crate::store::PageStore;

const USER_AGENT: &str = concat!("wiktbot/", env!("CARGO_PKG_VERSION"));

/// `action=query&prop=revisions` response, `formatversion=2` shape. Pages
/// that do not exist carry `"missing": true` and no revisions.
#[derive(Debug, Deserialize)]
struct RevisionQuery {
    query: RevisionQueryBody,
}

#[derive(Debug, Deserialize)]
struct RevisionQueryBody {
    #[serde(default)]
    pages: Vec<RevisionPage>,
}

#[derive(Debug, Deserialize)]
struct RevisionPage {
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    revisions: Vec<Revision>,
}

#[derive(Debug, Deserialize)]
struct Revision {
    slots: RevisionSlots,
}

#[derive(Debug, Deserialize)]
struct RevisionSlots {
    main: MainSlot,
}

#[derive(Debug, Deserialize)]
struct MainSlot {
    content: String,
}

pub struct MediaWikiStore {
    client: reqwest::blocking::Client,
    api_url: Url,
    username: Option<String>,
    password: Option<String>,
    logged_in: bool,
}

impl MediaWikiStore {
    pub fn new(api_url: &str) -> Result<Self, StoreError> {
        let api_url = Url::parse(api_url).map_err(|e| StoreError::BadResponse {
            message: format!("bad api url {:?}: {}", api_url, e),
        })?;
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(transient)?;
        Ok(MediaWikiStore {
            client,
            api_url,
            username: None,
            password: None,
            logged_in: false,
        })
    }

    /// Endpoint and optional bot credentials from `WIKI_API_URL`,
    /// `WIKI_BOT_USERNAME`, `WIKI_BOT_PASSWORD`.
    pub fn from_env() -> Result<Self, StoreError> {
        let api_url = env::var("WIKI_API_URL").map_err(|_| StoreError::BadResponse {
            message: "WIKI_API_URL is not set".to_string(),
        })?;
        let mut store = Self::new(&api_url)?;
        store.username = env::var("WIKI_BOT_USERNAME").ok();
        store.password = env::var("WIKI_BOT_PASSWORD").ok();
        Ok(store)
    }

    /// Base query URL; every read request builds on this.
    fn query_url(&self) -> Url {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("format", "json")
            .append_pair("formatversion", "2")
            .finish();
        url
    }

    fn get_json(&self, url: Url) -> Result<Value, StoreError> {
        self.get_parsed(url)
    }

    fn get_parsed<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, StoreError> {
        log::debug!("GET {}", url);
        let response = self.client.get(url).send().map_err(transient)?;
        let response = response.error_for_status().map_err(transient)?;
        response.json::<T>().map_err(|e| StoreError::BadResponse {
            message: e.to_string(),
        })
    }

    fn post_json(&self, form: &[(&str, &str)]) -> Result<Value, StoreError> {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("formatversion", "2")
            .finish();
        log::debug!("POST {} action={:?}", url, form.first());
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .map_err(transient)?
            .error_for_status()
            .map_err(transient)?;
        response.json::<Value>().map_err(|e| StoreError::BadResponse {
            message: e.to_string(),
        })
    }

    /// First page object of a `query` response.
    fn first_page<'a>(&self, body: &'a Value) -> Result<&'a Value, StoreError> {
        body["query"]["pages"]
            .get(0)
            .ok_or_else(|| StoreError::BadResponse {
                message: format!("no pages in response: {}", body),
            })
    }

    fn fetch_token(&self, token_type: &str) -> Result<String, StoreError> {
        let mut url = self.query_url();
        url.query_pairs_mut()
            .append_pair("meta", "tokens")
            .append_pair("type", token_type)
            .finish();
        let body = self.get_json(url)?;
        body["query"]["tokens"][format!("{}token", token_type)]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| StoreError::BadResponse {
                message: format!("no {} token in response", token_type),
            })
    }

    fn ensure_login(&mut self) -> Result<(), StoreError> {
        if self.logged_in {
            return Ok(());
        }
        let (Some(username), Some(password)) = (self.username.clone(), self.password.clone())
        else {
            // anonymous edits are allowed on test wikis
            return Ok(());
        };
        let token = self.fetch_token("login")?;
        let body = self.post_json(&[
            ("action", "login"),
            ("lgname", &username),
            ("lgpassword", &password),
            ("lgtoken", &token),
        ])?;
        let result = body["login"]["result"].as_str().unwrap_or("");
        if result != "Success" {
            return Err(StoreError::BadResponse {
                message: format!("login failed: {}", result),
            });
        }
        log::info!("logged in as {}", username);
        self.logged_in = true;
        Ok(())
    }

    /// One page of category members / backlinks, returning the titles and
    /// the continuation cursor if there is more.
    fn list_page(
        &self,
        list: &str,
        params: &[(&str, &str)],
        cont_key: &str,
        cont: Option<&str>,
    ) -> Result<(Vec<String>, Option<String>), StoreError> {
        let mut url = self.query_url();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("list", list);
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
            if let Some(cont) = cont {
                pairs.append_pair(cont_key, cont);
            }
            pairs.finish();
        }
        let body = self.get_json(url)?;
        let titles = body["query"][list]
            .as_array()
            .map(|members| {
                members
                    .iter()
                    .filter_map(|m| m["title"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let next = body["continue"][cont_key].as_str().map(str::to_string);
        Ok((titles, next))
    }

    fn list_all(
        &self,
        list: &str,
        params: &[(&str, &str)],
        cont_key: &str,
    ) -> Result<Vec<String>, StoreError> {
        let mut titles = Vec::new();
        let mut cont: Option<String> = None;
        loop {
            let (mut batch, next) = self.list_page(list, params, cont_key, cont.as_deref())?;
            titles.append(&mut batch);
            match next {
                Some(next) => cont = Some(next),
                None => return Ok(titles),
            }
        }
    }
}

impl PageStore for MediaWikiStore {
    fn get_text(&mut self, title: &str) -> Result<String, StoreError> {
        let mut url = self.query_url();
        url.query_pairs_mut()
            .append_pair("prop", "revisions")
            .append_pair("titles", title)
            .append_pair("rvprop", "content")
            .append_pair("rvslots", "main")
            .finish();
        let body: RevisionQuery = self.get_parsed(url)?;
        let page = body
            .query
            .pages
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::BadResponse {
                message: format!("no pages in response for {:?}", title),
            })?;
        if page.missing {
            return Err(StoreError::NotFound {
                title: title.to_string(),
            });
        }
        page.revisions
            .into_iter()
            .next()
            .map(|r| r.slots.main.content)
            .ok_or_else(|| StoreError::BadResponse {
                message: format!("no revision content for {:?}", title),
            })
    }

    fn save_text(&mut self, title: &str, new_text: &str, comment: &str) -> Result<(), StoreError> {
        self.ensure_login()?;
        let token = self.fetch_token("csrf")?;
        let body = self.post_json(&[
            ("action", "edit"),
            ("title", title),
            ("text", new_text),
            ("summary", comment),
            ("bot", "1"),
            ("token", &token),
        ])?;
        if body["edit"]["result"].as_str() == Some("Success") {
            return Ok(());
        }
        let code = body["error"]["code"].as_str().unwrap_or("");
        let info = body["error"]["info"].as_str().unwrap_or("");
        Err(map_api_error(code, info, title))
    }

    fn list_category_members(&mut self, category: &str) -> Result<Vec<String>, StoreError> {
        let cmtitle = format!("Category:{}", category);
        self.list_all(
            "categorymembers",
            &[("cmtitle", cmtitle.as_str()), ("cmlimit", "500")],
            "cmcontinue",
        )
    }

    fn list_pages_referencing(&mut self, target: &str) -> Result<Vec<String>, StoreError> {
        self.list_all(
            "backlinks",
            &[("bltitle", target), ("bllimit", "500")],
            "blcontinue",
        )
    }

    fn page_exists(&mut self, title: &str) -> Result<bool, StoreError> {
        let mut url = self.query_url();
        url.query_pairs_mut().append_pair("titles", title).finish();
        let body = self.get_json(url)?;
        let page = self.first_page(&body)?;
        Ok(!page["missing"].as_bool().unwrap_or(false))
    }
}

fn transient(e: reqwest::Error) -> StoreError {
    StoreError::Transient {
        message: e.to_string(),
    }
}

/// Map a MediaWiki API error code onto the store taxonomy. Everything not
/// recognized as permanent becomes a generic save failure.
fn map_api_error(code: &str, info: &str, title: &str) -> StoreError {
    let title = title.to_string();
    match code {
        "missingtitle" => StoreError::NotFound { title },
        "protectedpage" | "permissiondenied" | "cascadeprotected" | "customcssjsprotected" => {
            StoreError::PermissionDenied { title }
        }
        "titleblacklist-forbidden" => StoreError::TitleBlacklisted { title },
        "blocked" | "autoblocked" | "pagelocked" => StoreError::Locked { title },
        _ => StoreError::Save {
            title,
            message: format!("{}: {}", code, info),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_response_parsing() {
        let body = r#"{"query":{"pages":[{"title":"cat",
            "revisions":[{"slots":{"main":{"content":"==English==\n"}}}]}]}}"#;
        let parsed: RevisionQuery = serde_json::from_str(body).unwrap();
        let page = parsed.query.pages.into_iter().next().unwrap();
        assert!(!page.missing);
        assert_eq!(page.revisions[0].slots.main.content, "==English==\n");

        let body = r#"{"query":{"pages":[{"title":"ghost","missing":true}]}}"#;
        let parsed: RevisionQuery = serde_json::from_str(body).unwrap();
        let page = parsed.query.pages.into_iter().next().unwrap();
        assert!(page.missing);
        assert!(page.revisions.is_empty());
    }

    #[test]
    fn test_api_error_mapping() {
        assert!(matches!(
            map_api_error("missingtitle", "", "x"),
            StoreError::NotFound { .. }
        ));
        assert!(matches!(
            map_api_error("protectedpage", "", "x"),
            StoreError::PermissionDenied { .. }
        ));
        assert!(matches!(
            map_api_error("titleblacklist-forbidden", "", "x"),
            StoreError::TitleBlacklisted { .. }
        ));
        assert!(matches!(
            map_api_error("blocked", "", "x"),
            StoreError::Locked { .. }
        ));
        assert!(matches!(
            map_api_error("editconflict", "conflict", "x"),
            StoreError::Save { .. }
        ));
    }
}
