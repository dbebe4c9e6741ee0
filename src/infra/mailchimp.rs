//! Mailing-list directory backed by the Mailchimp members API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;

use crate::{
    application::newsletter::{DirectoryError, SubscriberDirectory},
    config::MailingListSettings,
};

use super::error::InfraError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DETAIL_LIMIT: usize = 512;

#[derive(Serialize)]
struct NewMember<'a> {
    email_address: &'a str,
    status: &'static str,
}

#[derive(Debug, Clone)]
pub struct MailchimpDirectory {
    http: Client,
    members_url: Url,
    api_key: String,
}

impl MailchimpDirectory {
    pub fn new(api_base: &Url, list: &MailingListSettings) -> Result<Self, InfraError> {
        let members_url = api_base
            .join(&format!("lists/{}/members/", list.list_id))
            .map_err(|err| InfraError::configuration(format!("newsletter list URL: {err}")))?;
        let http = Client::builder()
            .user_agent(concat!("mondrian/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| InfraError::configuration(format!("newsletter client: {err}")))?;

        Ok(Self {
            http,
            members_url,
            api_key: list.api_key.clone(),
        })
    }
}

#[async_trait]
impl SubscriberDirectory for MailchimpDirectory {
    async fn add_subscriber(&self, email: &str) -> Result<(), DirectoryError> {
        let response = self
            .http
            .post(self.members_url.clone())
            .basic_auth("x", Some(&self.api_key))
            .json(&NewMember {
                email_address: email,
                status: "subscribed",
            })
            .send()
            .await
            .map_err(|err| DirectoryError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let mut detail = response.text().await.unwrap_or_default();
        if detail.len() > DETAIL_LIMIT {
            let mut end = DETAIL_LIMIT;
            while !detail.is_char_boundary(end) {
                end -= 1;
            }
            detail.truncate(end);
        }
        Err(DirectoryError::Rejected {
            status: status.as_u16(),
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;

    use super::*;

    fn directory(server: &MockServer) -> MailchimpDirectory {
        let base = Url::parse(&server.url("/3.0/")).unwrap();
        MailchimpDirectory::new(
            &base,
            &MailingListSettings {
                list_id: "5753c2dd8c".into(),
                api_key: "key-us17".into(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn posts_new_member_with_basic_auth() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path("/3.0/lists/5753c2dd8c/members/")
                    // base64("x:key-us17")
                    .header("authorization", "Basic eDprZXktdXMxNw==")
                    .json_body_includes(
                        r#"{"email_address":"ada@example.com","status":"subscribed"}"#,
                    );
                then.status(200)
                    .header("content-type", "application/json")
                    .body("{}");
            })
            .await;

        directory(&server)
            .add_subscriber("ada@example.com")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_members_surface_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("POST");
                then.status(400).body(r#"{"title":"Member Exists"}"#);
            })
            .await;

        let err = directory(&server)
            .add_subscriber("ada@example.com")
            .await
            .unwrap_err();
        match err {
            DirectoryError::Rejected { status, detail } => {
                assert_eq!(status, 400);
                assert!(detail.contains("Member Exists"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
