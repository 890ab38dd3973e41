//! Builders for PDF fixtures.
//!
//! Encrypted documents go through lopdf's Standard security handler
//! (128-bit RC4), so strings and streams are encrypted as a real writer
//! would leave them.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::{
    dictionary, Document, EncryptionState, EncryptionVersion, Object, Permissions, Stream,
    StringFormat,
};
use printcheck::PermissionFlag;

/// `/P` value granting exactly `flags`; reserved bits set as required.
pub fn p_value(flags: &[PermissionFlag]) -> i32 {
    let reserved: u32 = 0xFFFF_F0C0;
    flags.iter().fold(reserved, |p, f| p | f.bit()) as i32
}

/// Builder for one-page PDFs, optionally protected.
pub struct PdfBuilder {
    text: String,
    security: Option<Security>,
}

struct Security {
    user_password: String,
    owner_password: String,
    permissions: i32,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            text: "printcheck fixture".to_string(),
            security: None,
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    /// Protects the document. An empty `user_password` opens without a
    /// prompt but still restricts to `flags`.
    pub fn encrypted(mut self, user_password: &str, owner_password: &str, flags: &[PermissionFlag]) -> Self {
        self.security = Some(Security {
            user_password: user_password.to_string(),
            owner_password: owner_password.to_string(),
            permissions: p_value(flags),
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", self.text);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if let Some(security) = &self.security {
            let id0 = b"printcheck-id-00".to_vec();
            doc.trailer.set(
                "ID",
                vec![
                    Object::String(id0.clone(), StringFormat::Hexadecimal),
                    Object::String(id0, StringFormat::Hexadecimal),
                ],
            );
            let state = EncryptionState::try_from(EncryptionVersion::V2 {
                document: &doc,
                owner_password: &security.owner_password,
                user_password: &security.user_password,
                key_length: 128,
                permissions: Permissions::from_bits_retain(security.permissions as u32 as u64),
            })
            .expect("Failed to set up the security handler");
            doc.encrypt(&state).expect("Failed to encrypt PDF");
        }

        let mut out = Vec::new();
        doc.save_to(&mut out).expect("Failed to serialize PDF");
        out
    }

    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).expect("Failed to write PDF fixture");
        path
    }
}
