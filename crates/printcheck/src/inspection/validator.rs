use std::path::Path;

use lopdf::encryption::DecryptionError;
use lopdf::{Document, Object, Permissions};
use secrecy::{ExposeSecret, SecretString};
use tracing::info_span;

use super::error::{InspectionError, Result};
use super::permissions::PermissionSet;
use crate::sanitize;

/// Reads the permission flags of a PDF, authenticating when the document
/// is password protected.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfPermissionValidator;

impl PdfPermissionValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn get_permissions(
        &self,
        path: &Path,
        password: Option<&SecretString>,
    ) -> Result<PermissionSet> {
        let _span = info_span!("inspection", file = %sanitize::redact_path(path)).entered();

        let bytes = std::fs::read(path).map_err(|e| InspectionError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let permissions = self.permissions_from_bytes(&bytes, password)?;
        tracing::info!(
            unrestricted = permissions.is_unrestricted(),
            can_print = permissions.can_print(),
            "Permissions read"
        );
        Ok(permissions)
    }

    pub fn permissions_from_bytes(
        &self,
        bytes: &[u8],
        password: Option<&SecretString>,
    ) -> Result<PermissionSet> {
        let doc = Document::load_mem(bytes).map_err(|e| InspectionError::Parse(e.to_string()))?;

        // The loader decrypts on its own when the empty user password opens
        // the document, and keeps the handler state around.
        if !doc.is_encrypted() {
            return Ok(match &doc.encryption_state {
                Some(state) => {
                    tracing::debug!("Opened with the empty user password");
                    PermissionSet::from_p_value(p_value(state.permissions()))
                }
                None => {
                    tracing::debug!("No security handler, document is unrestricted");
                    PermissionSet::unrestricted()
                }
            });
        }

        match doc.authenticate_password("") {
            Ok(()) => {}
            Err(e) if !is_wrong_password(&e) => {
                return Err(InspectionError::UnsupportedSecurity(e.to_string()));
            }
            Err(_) => {
                let password = password.ok_or(InspectionError::PasswordRequired)?;
                doc.authenticate_password(password.expose_secret())
                    .map_err(|e| {
                        if is_wrong_password(&e) {
                            InspectionError::IncorrectPassword
                        } else {
                            InspectionError::UnsupportedSecurity(e.to_string())
                        }
                    })?;
                tracing::debug!("Security handler authenticated");
            }
        }

        let p = doc
            .get_encrypted()
            .and_then(|dict| dict.get(b"P"))
            .and_then(Object::as_i64)
            .map_err(|e| InspectionError::MalformedEncryption(e.to_string()))?;
        // /P is a 32-bit field; some writers store it unsigned.
        Ok(PermissionSet::from_p_value(p as i32))
    }
}

fn p_value(permissions: Permissions) -> i32 {
    permissions.bits() as u32 as i32
}

fn is_wrong_password(e: &lopdf::Error) -> bool {
    matches!(
        e,
        lopdf::Error::InvalidPassword
            | lopdf::Error::Decryption(DecryptionError::IncorrectPassword)
            | lopdf::Error::Decryption(DecryptionError::Padding)
    )
}
