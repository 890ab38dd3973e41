//! A `mockito` server speaking the slice of Drive v3 the suite uses.

#![allow(dead_code)]

use mockito::{Matcher, Mock, ServerGuard};
use serde_json::json;

use printcheck::{DriveClient, DriveEndpoints, Distributor};

use super::{ACCESS_TOKEN, FOLDER_ID};

pub struct MockDrive {
    pub server: ServerGuard,
}

impl MockDrive {
    pub async fn start() -> Self {
        Self {
            server: mockito::Server::new_async().await,
        }
    }

    pub fn endpoints(&self) -> DriveEndpoints {
        DriveEndpoints::with_base(&self.server.url())
    }

    pub fn folder_url(&self) -> String {
        format!("{}/drive/folders/{}", self.server.url(), FOLDER_ID)
    }

    pub fn distributor(&self) -> Distributor {
        let client = DriveClient::new(self.endpoints()).expect("Failed to build Drive client");
        Distributor::new(client, FOLDER_ID)
    }

    fn bearer() -> String {
        format!("Bearer {}", ACCESS_TOKEN)
    }

    /// Multipart create answering with `file_id`.
    pub async fn expect_upload(&mut self, file_name: &str, file_id: &str) -> Mock {
        self.server
            .mock("POST", "/upload/drive/v3/files")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("uploadType".into(), "multipart".into()),
                Matcher::UrlEncoded("fields".into(), "id".into()),
            ]))
            .match_header("authorization", Self::bearer().as_str())
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/related; boundary=".to_string()),
            )
            .match_body(Matcher::Regex(format!(
                r#""name":"{}","parents":\["{}"\]"#,
                regex_escape(file_name),
                FOLDER_ID
            )))
            .with_header("content-type", "application/json")
            .with_body(json!({ "id": file_id }).to_string())
            .create_async()
            .await
    }

    pub async fn expect_share(&mut self, file_id: &str) -> Mock {
        self.server
            .mock("POST", format!("/drive/v3/files/{}/permissions", file_id).as_str())
            .match_query(Matcher::Any)
            .match_header("authorization", Self::bearer().as_str())
            .match_body(Matcher::Json(json!({ "role": "reader", "type": "anyone" })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"anyoneWithLink"}"#)
            .create_async()
            .await
    }

    /// First page of the folder listing (request without `pageToken`).
    pub async fn expect_first_page(&mut self, files: &[(&str, &str)], next: Option<&str>) -> Mock {
        self.listing(Matcher::Regex("spaces=drive$".to_string()), files, next)
            .await
    }

    /// The page requested with `pageToken=token`.
    pub async fn expect_page(&mut self, token: &str, files: &[(&str, &str)], next: Option<&str>) -> Mock {
        self.listing(
            Matcher::UrlEncoded("pageToken".into(), token.into()),
            files,
            next,
        )
        .await
    }

    async fn listing(&mut self, page: Matcher, files: &[(&str, &str)], next: Option<&str>) -> Mock {
        let files: Vec<_> = files
            .iter()
            .map(|(id, name)| json!({ "id": id, "name": name }))
            .collect();
        let mut body = json!({ "files": files });
        if let Some(next) = next {
            body["nextPageToken"] = json!(next);
        }

        self.server
            .mock("GET", "/drive/v3/files")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded(
                    "q".into(),
                    format!("'{}' in parents and trashed = false", FOLDER_ID),
                ),
                Matcher::UrlEncoded("fields".into(), "nextPageToken, files(id, name)".into()),
                page,
            ]))
            .match_header("authorization", Self::bearer().as_str())
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    pub async fn expect_delete(&mut self, file_id: &str, status: usize) -> Mock {
        self.server
            .mock("DELETE", format!("/drive/v3/files/{}", file_id).as_str())
            .match_query(Matcher::Any)
            .match_header("authorization", Self::bearer().as_str())
            .with_status(status)
            .with_body(if status < 300 { "" } else { r#"{"error":{"message":"boom"}}"# })
            .create_async()
            .await
    }
}

fn regex_escape(text: &str) -> String {
    text.chars()
        .flat_map(|c| {
            if "\\.+*?()|[]{}^$".contains(c) {
                vec!['\\', c]
            } else {
                vec![c]
            }
        })
        .collect()
}
