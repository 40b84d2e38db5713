//! Fixture PDFs for integration tests, generated with lopdf.

#![allow(dead_code)]

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::path::Path;

/// Field flag bits used by the fixtures.
pub const FF_READ_ONLY: i64 = 1;
pub const FF_MULTILINE: i64 = 1 << 12;

#[derive(Debug, Clone)]
struct FieldSpec {
    name: String,
    value: Vec<u8>,
    flags: i64,
    page: usize,
}

#[derive(Debug, Clone)]
struct GroupSpec {
    parent: String,
    kids: Vec<String>,
    page: usize,
}

/// Builder for a small AcroForm PDF.
#[derive(Debug, Clone)]
pub struct FormPdf {
    pages: usize,
    form: bool,
    fields: Vec<FieldSpec>,
    groups: Vec<GroupSpec>,
    signed: bool,
    signed_kid: bool,
    checkbox: bool,
}

impl FormPdf {
    /// One page with an AcroForm and no fields yet.
    pub fn new() -> Self {
        Self {
            pages: 1,
            form: true,
            fields: Vec::new(),
            groups: Vec::new(),
            signed: false,
            signed_kid: false,
            checkbox: false,
        }
    }

    /// A one-page PDF without any form.
    pub fn without_form() -> Self {
        Self {
            form: false,
            ..Self::new()
        }
    }

    pub fn pages(mut self, pages: usize) -> Self {
        self.pages = pages;
        self
    }

    pub fn text(self, name: &str, value: &str) -> Self {
        self.field(name, value.as_bytes(), 0, 1)
    }

    /// A text field whose `/V` holds exactly `value`.
    pub fn text_bytes(self, name: &str, value: &[u8]) -> Self {
        self.field(name, value, 0, 1)
    }

    pub fn multiline(self, name: &str, value: &str) -> Self {
        self.field(name, value.as_bytes(), FF_MULTILINE, 1)
    }

    pub fn read_only(self, name: &str, value: &str) -> Self {
        self.field(name, value.as_bytes(), FF_READ_ONLY, 1)
    }

    pub fn text_on_page(self, name: &str, value: &str, page: usize) -> Self {
        self.field(name, value.as_bytes(), 0, page)
    }

    /// A non-terminal field `parent` with one text kid per name.
    pub fn group(mut self, parent: &str, kids: &[&str]) -> Self {
        self.groups.push(GroupSpec {
            parent: parent.to_string(),
            kids: kids.iter().map(|k| k.to_string()).collect(),
            page: 1,
        });
        self
    }

    /// Add a signed signature field.
    pub fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    /// Add a signed kid whose `/FT /Sig` comes from its parent field.
    pub fn signed_kid(mut self) -> Self {
        self.signed_kid = true;
        self
    }

    /// Add a checkbox, which must never show up in a schema.
    pub fn with_checkbox(mut self) -> Self {
        self.checkbox = true;
        self
    }

    fn field(mut self, name: &str, value: &[u8], flags: i64, page: usize) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            value: value.to_vec(),
            flags,
            page,
        });
        self
    }

    /// Serialize the fixture.
    pub fn build(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut page_ids = Vec::new();
        for number in 1..=self.pages {
            let content = format!("BT /F1 18 Tf 72 740 Td (Page {}) Tj ET", number);
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => [0, 0, 612, 792].iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
                "Contents" => content_id,
            });
            page_ids.push(page_id);
        }

        let mut roots: Vec<Object> = Vec::new();
        let mut annots: Vec<Vec<Object>> = vec![Vec::new(); self.pages];
        let mut y = 700i64;

        for spec in &self.fields {
            let page = page_ids.get(spec.page - 1).copied();
            let mut field = widget(page, next_rect(&mut y));
            field.set("T", Object::string_literal(spec.name.as_str()));
            field.set("FT", "Tx");
            field.set("V", Object::String(spec.value.clone(), StringFormat::Literal));
            if spec.flags != 0 {
                field.set("Ff", Object::Integer(spec.flags));
            }
            let id = doc.add_object(field);
            roots.push(id.into());
            if page.is_some() {
                annots[spec.page - 1].push(id.into());
            }
        }

        for group in &self.groups {
            let parent_id = doc.new_object_id();
            let page = page_ids.get(group.page - 1).copied();
            let mut kids = Vec::new();
            for name in &group.kids {
                let mut kid = widget(page, next_rect(&mut y));
                kid.set("T", Object::string_literal(name.as_str()));
                kid.set("Parent", parent_id);
                let kid_id = doc.add_object(kid);
                kids.push(Object::Reference(kid_id));
                annots[group.page - 1].push(kid_id.into());
            }
            doc.objects.insert(
                parent_id,
                Object::Dictionary(dictionary! {
                    "T" => Object::string_literal(group.parent.as_str()),
                    "FT" => "Tx",
                    "Kids" => kids,
                }),
            );
            roots.push(parent_id.into());
        }

        if self.checkbox {
            let mut check = widget(page_ids.first().copied(), next_rect(&mut y));
            check.set("T", Object::string_literal("Agree"));
            check.set("FT", "Btn");
            check.set("V", "Off");
            let id = doc.add_object(check);
            roots.push(id.into());
            annots[0].push(id.into());
        }

        if self.signed {
            let sig_value = doc.add_object(signature_value());
            let mut sig = widget(page_ids.first().copied(), [0, 0, 0, 0]);
            sig.set("T", Object::string_literal("Signature1"));
            sig.set("FT", "Sig");
            sig.set("V", sig_value);
            let id = doc.add_object(sig);
            roots.push(id.into());
            annots[0].push(id.into());
        }

        if self.signed_kid {
            let parent_id = doc.new_object_id();
            let sig_value = doc.add_object(signature_value());
            let mut kid = widget(page_ids.first().copied(), [0, 0, 0, 0]);
            kid.set("T", Object::string_literal("k"));
            kid.set("Parent", parent_id);
            kid.set("V", sig_value);
            let kid_id = doc.add_object(kid);
            doc.objects.insert(
                parent_id,
                Object::Dictionary(dictionary! {
                    "T" => Object::string_literal("Sig"),
                    "FT" => "Sig",
                    "Kids" => vec![Object::Reference(kid_id)],
                }),
            );
            roots.push(parent_id.into());
            annots[0].push(kid_id.into());
        }

        for (page_id, page_annots) in page_ids.iter().zip(annots) {
            if !page_annots.is_empty() {
                if let Ok(page) = doc.get_dictionary_mut(*page_id) {
                    page.set("Annots", page_annots);
                }
            }
        }

        let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(self.pages as i64),
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if self.form {
            let mut acroform = dictionary! {
                "Fields" => roots,
                "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
            };
            if self.signed || self.signed_kid {
                acroform.set("SigFlags", Object::Integer(3));
            }
            catalog.set("AcroForm", acroform);
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    /// Build and write to `path`.
    pub fn write(&self, path: &Path) {
        std::fs::write(path, self.build()).unwrap();
    }
}

fn signature_value() -> Dictionary {
    dictionary! {
        "Type" => "Sig",
        "Filter" => "Adobe.PPKLite",
        "SubFilter" => "adbe.pkcs7.detached",
        "Contents" => Object::string_literal("0000"),
    }
}

fn next_rect(y: &mut i64) -> [i64; 4] {
    let rect = [72, *y, 372, *y + 20];
    *y -= 40;
    rect
}

fn widget(page: Option<ObjectId>, rect: [i64; 4]) -> Dictionary {
    let mut dict = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Rect" => rect.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
    };
    if let Some(page) = page {
        dict.set("P", page);
    }
    dict
}

/// Load a PDF from disk.
pub fn load(path: &Path) -> Document {
    Document::load(path).unwrap()
}

/// The dictionary of the field whose partial name `/T` is `name`.
pub fn field<'a>(doc: &'a Document, name: &str) -> &'a Dictionary {
    doc.objects
        .values()
        .filter_map(|obj| obj.as_dict().ok())
        .find(|dict| match dict.get(b"T") {
            Ok(Object::String(bytes, _)) => bytes.as_slice() == name.as_bytes(),
            _ => false,
        })
        .unwrap_or_else(|| panic!("no field named {}", name))
}

/// Raw `/V` bytes of the field named `name`.
pub fn field_bytes(doc: &Document, name: &str) -> Option<Vec<u8>> {
    match field(doc, name).get(b"V").ok()? {
        Object::String(bytes, _) => Some(bytes.clone()),
        _ => None,
    }
}

/// `/V` of the field named `name`, decoded as a PDF text string.
pub fn field_value(doc: &Document, name: &str) -> Option<String> {
    match field(doc, name).get(b"V").ok()? {
        Object::String(bytes, _) => Some(decode(bytes)),
        _ => None,
    }
}

fn decode(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// The AcroForm dictionary of `doc`.
pub fn acroform(doc: &Document) -> &Dictionary {
    let root = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
    let catalog = doc.get_dictionary(root).unwrap();
    match catalog.get(b"AcroForm").unwrap() {
        Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
        Object::Dictionary(dict) => dict,
        other => panic!("unexpected /AcroForm {:?}", other),
    }
}
