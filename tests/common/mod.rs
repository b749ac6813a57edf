//! Small PDF builder for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use md5::{Digest, Md5};
use rc4::{KeyInit, Rc4, StreamCipher};

/// Resource names of the fonts every fixture page can use.
pub const SANS: &str = "F1";
pub const SANS_BOLD: &str = "F2";
pub const MONO: &str = "F3";

/// Something drawn on a fixture page.
#[derive(Debug, Clone)]
pub enum Item {
    Text {
        font: &'static str,
        size: f32,
        x: f32,
        y: f32,
        text: String,
        color: Option<(f32, f32, f32)>,
    },
    /// The shared 2x2 gray image, scaled to `w` by `h` at (`x`, `y`).
    Image { x: f32, y: f32, w: f32, h: f32 },
}

pub fn text(font: &'static str, size: f32, x: f32, y: f32, s: &str) -> Item {
    Item::Text {
        font,
        size,
        x,
        y,
        text: s.to_string(),
        color: None,
    }
}

pub fn colored(font: &'static str, size: f32, x: f32, y: f32, s: &str, rgb: (f32, f32, f32)) -> Item {
    Item::Text {
        font,
        size,
        x,
        y,
        text: s.to_string(),
        color: Some(rgb),
    }
}

pub fn image(x: f32, y: f32, w: f32, h: f32) -> Item {
    Item::Image { x, y, w, h }
}

/// Body lines at 12pt, 14pt apart, starting at `top`.
pub fn body_lines(x: f32, top: f32, lines: &[&str]) -> Vec<Item> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| text(SANS, 12.0, x, top - 14.0 * i as f32, line))
        .collect()
}

#[derive(Debug, Default)]
pub struct TestPdf {
    pages: Vec<Vec<Item>>,
    title: Option<String>,
    author: Option<String>,
    user_password: Option<String>,
}

impl TestPdf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, items: Vec<Item>) -> Self {
        self.pages.push(items);
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    /// Protect the file with RC4 40-bit encryption (revision 2).
    pub fn encrypted(mut self, user_password: &str) -> Self {
        self.user_password = Some(user_password.to_string());
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut doc = self.build();
        let mut out = Vec::new();
        doc.save_to(&mut out).expect("save fixture");
        out
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.to_bytes()).expect("write fixture");
        path
    }

    fn build(&self) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font = |base: &str| {
            dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base,
            }
        };
        let sans = doc.add_object(font("Helvetica"));
        let sans_bold = doc.add_object(font("Helvetica-Bold"));
        let mono = doc.add_object(font("Courier"));

        let mut streams: Vec<ObjectId> = Vec::new();
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 2,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0, 255, 255, 0],
        ));
        streams.push(image_id);

        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                SANS => sans,
                SANS_BOLD => sans_bold,
                MONO => mono,
            },
            "XObject" => dictionary! {
                "Im1" => image_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for items in &self.pages {
            let ops: Vec<Operation> = items.iter().flat_map(operations).collect();
            let content = Content { operations: ops };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("encode content"),
            ));
            streams.push(content_id);
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let page_count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let security = self.user_password.as_deref().map(Security::new);
        let info_id = doc.new_object_id();
        let mut info = dictionary! {};
        for (key, value) in [("Title", &self.title), ("Author", &self.author)] {
            if let Some(value) = value {
                let mut bytes = value.as_bytes().to_vec();
                if let Some(ref security) = security {
                    security.apply(info_id, &mut bytes);
                }
                info.set(key, Object::String(bytes, StringFormat::Literal));
            }
        }
        doc.objects.insert(info_id, Object::Dictionary(info));
        doc.trailer.set("Info", info_id);

        if let Some(security) = security {
            security.seal(&mut doc, &streams);
        }
        doc
    }
}

fn operations(item: &Item) -> Vec<Operation> {
    match item {
        Item::Text {
            font,
            size,
            x,
            y,
            text,
            color,
        } => {
            let mut ops = Vec::new();
            if let Some((r, g, b)) = color {
                ops.push(Operation::new("rg", vec![(*r).into(), (*g).into(), (*b).into()]));
            }
            ops.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![(*font).into(), (*size).into()]),
                Operation::new("Td", vec![(*x).into(), (*y).into()]),
                Operation::new("Tj", vec![Object::string_literal(text.as_str())]),
                Operation::new("ET", vec![]),
            ]);
            if color.is_some() {
                ops.push(Operation::new("rg", vec![0.into(), 0.into(), 0.into()]));
            }
            ops
        }
        Item::Image { x, y, w, h } => vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    (*w).into(),
                    0.into(),
                    0.into(),
                    (*h).into(),
                    (*x).into(),
                    (*y).into(),
                ],
            ),
            Operation::new("Do", vec!["Im1".into()]),
            Operation::new("Q", vec![]),
        ],
    }
}

const PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

const OWNER_PASSWORD: &str = "owner";
const PERMISSIONS: i32 = -4;
const FILE_ID: &[u8; 16] = b"pdfnote-fixture!";

fn padded(password: &str) -> [u8; 32] {
    let mut out = PAD;
    let bytes = password.as_bytes();
    let n = bytes.len().min(32);
    out[..n].copy_from_slice(&bytes[..n]);
    out[n..].copy_from_slice(&PAD[..32 - n]);
    out
}

fn rc4_apply(key: &[u8], data: &mut [u8]) {
    Rc4::new_from_slice(key)
        .expect("RC4 key length")
        .apply_keystream(data);
}

/// Standard security handler, revision 2, 40-bit key.
struct Security {
    key: Vec<u8>,
    o: [u8; 32],
    u: [u8; 32],
}

impl Security {
    fn new(user_password: &str) -> Self {
        let owner_key = Md5::digest(padded(OWNER_PASSWORD));
        let mut o = padded(user_password);
        rc4_apply(&owner_key[..5], &mut o);

        let mut hasher = Md5::new();
        hasher.update(padded(user_password));
        hasher.update(o);
        hasher.update(PERMISSIONS.to_le_bytes());
        hasher.update(FILE_ID);
        let key = hasher.finalize()[..5].to_vec();

        let mut u = PAD;
        rc4_apply(&key, &mut u);
        Self { key, o, u }
    }

    /// Encrypt (or decrypt) the strings and streams of object `id`.
    fn apply(&self, id: ObjectId, data: &mut [u8]) {
        let mut hasher = Md5::new();
        hasher.update(&self.key);
        hasher.update(&id.0.to_le_bytes()[..3]);
        hasher.update(&id.1.to_le_bytes()[..2]);
        rc4_apply(&hasher.finalize()[..10], data);
    }

    /// Encrypt `streams` and add the encryption dictionary and file ID.
    fn seal(&self, doc: &mut Document, streams: &[ObjectId]) {
        for &id in streams {
            if let Ok(Object::Stream(stream)) = doc.get_object_mut(id) {
                let mut data = stream.content.clone();
                self.apply(id, &mut data);
                stream.set_content(data);
            }
        }

        let encrypt_id = doc.add_object(dictionary! {
            "Filter" => "Standard",
            "V" => 1,
            "R" => 2,
            "O" => Object::String(self.o.to_vec(), StringFormat::Hexadecimal),
            "U" => Object::String(self.u.to_vec(), StringFormat::Hexadecimal),
            "P" => PERMISSIONS as i64,
        });
        doc.trailer.set("Encrypt", encrypt_id);
        let file_id = Object::String(FILE_ID.to_vec(), StringFormat::Hexadecimal);
        doc.trailer.set("ID", vec![file_id.clone(), file_id]);
    }
}
