//! Provider UI table.
//!
//! Every selector the retrieval flow touches lives here so a provider UI
//! change (or a different account locale) is a config edit, not a code edit.
//! The defaults match the Google Drive viewer as served to the accounts the
//! suite runs under, which is why some labels are Arabic.

use serde::{Deserialize, Serialize};

use super::locator::Locator;

/// A download-button label in one UI language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedLabel {
    pub locale: String,
    pub label: String,
}

impl LocalizedLabel {
    pub fn new(locale: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiLabels {
    /// Password field shown by the viewer for protected PDFs.
    pub password_input: Locator,
    /// Control that submits the password; enabled once a password is typed.
    pub password_submit: Locator,
    /// Element present only once the viewer rendered document pages.
    pub viewer_content: Locator,
    /// Download control in the viewer after a password was accepted.
    pub protected_download: Locator,
    /// Download control labels for unprotected documents, matched by substring.
    pub download_labels: Vec<LocalizedLabel>,
    /// Confirmation shown when the provider cannot virus-scan the file.
    pub download_anyway: Locator,
}

impl Default for UiLabels {
    fn default() -> Self {
        Self {
            password_input: Locator::css("input[type=\"password\"]"),
            password_submit: Locator::attribute_equals("div", "aria-label", "إرسال كلمة المرور"),
            viewer_content: Locator::css("div.ndfHFb-c4YZDc-cYSp0e-DARUcf-PLDbbf"),
            protected_download: Locator::css("div[role=\"button\"][aria-label=\"تنزيل\"]"),
            download_labels: vec![
                LocalizedLabel::new("en", "Download"),
                LocalizedLabel::new("ar", "تنزيل"),
                LocalizedLabel::new("he", "הורדה"),
            ],
            download_anyway: Locator::text_contains("Download anyway"),
        }
    }
}

impl UiLabels {
    /// Download control for unprotected documents: any `div` whose
    /// `aria-label` contains one of the localized labels.
    pub fn download_control(&self) -> Locator {
        Locator::attribute_contains_any(
            "div",
            "aria-label",
            self.download_labels.iter().map(|l| l.label.as_str()),
        )
    }

    /// The folder listing entry for a file, matched by its exact name.
    pub fn file_entry(&self, file_name: &str) -> Locator {
        Locator::text(file_name)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.download_labels.is_empty() {
            return Err("ui.downloadLabels must contain at least one label".to_string());
        }
        if let Some(label) = self.download_labels.iter().find(|l| l.label.trim().is_empty()) {
            return Err(format!(
                "ui.downloadLabels entry for locale '{}' has an empty label",
                label.locale
            ));
        }
        Ok(())
    }
}
