//! AcroForm codec backed by `lopdf`.
//!
//! Text fields are discovered by walking the AcroForm `/Fields` hierarchy
//! (ISO 32000-1:2008, Section 12.7.3). Names are fully qualified with `.`
//! separators; `/FT`, `/Ff` and `/V` are inherited from parent fields.
//!
//! A PDF carries at most one AcroForm, so [`LopdfCodec`] reports either zero
//! forms (no `/AcroForm` in the catalog) or exactly one.

use super::encoding::{decode_text_string, encode_text_string};
use super::{FieldFlags, FormCodec, RawField, RawForm, TextAppearance};
use crate::config::{FillConfig, ValidationMode};
use crate::error::{Error, Result};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::Path;

/// A parsed PDF owned by one pipeline run.
#[derive(Debug)]
pub struct LopdfHandle {
    doc: Document,
}

impl LopdfHandle {
    /// Wrap an already loaded document.
    pub fn new(doc: Document) -> Self {
        Self { doc }
    }

    /// Access the underlying lopdf document.
    pub fn document(&self) -> &Document {
        &self.doc
    }
}

/// AcroForm text field codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfCodec;

impl FormCodec for LopdfCodec {
    type Handle = LopdfHandle;

    fn open_and_validate(&self, path: &Path, config: &FillConfig) -> Result<LopdfHandle> {
        let bytes = fs::read(path).map_err(|source| Error::NotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let mut doc = Document::load_mem(&bytes)?;

        if doc.trailer.has(b"Encrypt") {
            return Err(Error::InvalidDocument(
                "encrypted documents are not supported".to_string(),
            ));
        }

        if config.optimize {
            let pruned = doc.prune_objects();
            if !pruned.is_empty() {
                log::debug!("Pruned {} unreferenced objects from {}", pruned.len(), path.display());
            }
        }

        validate_document(&doc, config.validation)?;
        log::debug!("Opened {} ({} pages)", path.display(), doc.get_pages().len());
        Ok(LopdfHandle { doc })
    }

    fn page_count(&self, handle: &LopdfHandle) -> usize {
        handle.doc.get_pages().len()
    }

    fn export_form_fields(&self, handle: &LopdfHandle) -> Result<Vec<RawForm>> {
        let doc = &handle.doc;
        let acroform = match acroform(doc)? {
            Some(dict) => dict,
            None => return Ok(Vec::new()),
        };

        let roots: Vec<ObjectId> = acroform
            .get(b"Fields")
            .ok()
            .and_then(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_array().ok())
            .map(|fields| fields.iter().filter_map(|f| f.as_reference().ok()).collect())
            .unwrap_or_default();

        let mut walker = FieldWalker::new(doc);
        for root in roots {
            walker.visit(root, &Inherited::default());
        }

        log::debug!("Exported {} text fields", walker.fields.len());
        Ok(vec![RawForm {
            text_fields: walker.fields,
        }])
    }

    fn remove_signature(&self, handle: &mut LopdfHandle) -> usize {
        let signed: Vec<ObjectId> = {
            let doc = &handle.doc;
            doc.objects
                .iter()
                .filter_map(|(id, obj)| match obj {
                    Object::Dictionary(dict)
                        if dict.has(b"V") && is_signature_field(doc, dict) =>
                    {
                        Some(*id)
                    },
                    _ => None,
                })
                .collect()
        };

        let doc = &mut handle.doc;
        for id in &signed {
            if let Ok(dict) = doc.get_dictionary_mut(*id) {
                dict.remove(b"V");
            }
        }

        match acroform_mut(doc) {
            Ok(Some(acroform)) => {
                acroform.remove(b"SigFlags");
            },
            Ok(None) => {},
            Err(e) => log::warn!("Could not clear /SigFlags: {}", e),
        }
        if let Ok(root) = catalog_id(doc) {
            if let Ok(catalog) = doc.get_dictionary_mut(root) {
                catalog.remove(b"Perms");
            }
        }

        if !signed.is_empty() {
            log::info!("Removed {} digital signature value(s)", signed.len());
        }
        signed.len()
    }

    fn fill_form_fields(&self, handle: &mut LopdfHandle, form: &RawForm) -> Result<usize> {
        let mut written = 0;
        for field in &form.text_fields {
            if field.locked {
                log::debug!("Skipping read-only field '{}'", field.name);
                continue;
            }
            let id = parse_field_id(&field.id).ok_or_else(|| {
                Error::InvalidDocument(format!("unknown field id '{}'", field.id))
            })?;
            let current = handle
                .doc
                .get_dictionary(id)?
                .get(b"V")
                .ok()
                .and_then(|obj| text_value(&handle.doc, obj));
            // An unchanged value keeps its original bytes
            if current.as_deref() != Some(field.value.as_str()) {
                handle
                    .doc
                    .get_dictionary_mut(id)?
                    .set("V", encode_text_string(&field.value));
            }
            log::debug!("field: {}, locked: {}, pages: {:?}", field.name, field.locked, field.pages);
            written += 1;
        }
        Ok(written)
    }

    fn rebuild_page_tree(&self, handle: &mut LopdfHandle, form: &RawForm) -> Result<()> {
        rebuild_widgets(&mut handle.doc, form).map_err(|err| match err {
            Error::RebuildFailed(_) => err,
            other => Error::RebuildFailed(other.to_string()),
        })
    }

    fn validate(&self, handle: &LopdfHandle, mode: ValidationMode) -> Result<()> {
        validate_document(&handle.doc, mode)
    }

    fn serialize(&self, handle: &mut LopdfHandle, mut sink: &mut dyn Write) -> Result<()> {
        handle
            .doc
            .save_to(&mut sink)
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
        sink.flush()?;
        Ok(())
    }
}

/// Properties a field inherits from its ancestors.
#[derive(Debug, Clone, Default)]
struct Inherited {
    name: String,
    field_type: Option<String>,
    flags: u32,
    value: Option<String>,
}

/// Depth-first walk over the field hierarchy collecting terminal text fields.
struct FieldWalker<'a> {
    doc: &'a Document,
    pages: PageIndex,
    visited: HashSet<ObjectId>,
    fields: Vec<RawField>,
}

impl<'a> FieldWalker<'a> {
    fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            pages: PageIndex::build(doc),
            visited: HashSet::new(),
            fields: Vec::new(),
        }
    }

    fn visit(&mut self, id: ObjectId, parent: &Inherited) {
        if !self.visited.insert(id) {
            log::warn!("Skipping cyclic field reference {} {} R", id.0, id.1);
            return;
        }

        let doc = self.doc;
        let dict = match doc.get_dictionary(id) {
            Ok(d) => d,
            Err(_) => return,
        };

        let partial_name = dict.get(b"T").ok().and_then(|obj| text_value(doc, obj));
        let name = match partial_name {
            Some(partial) if parent.name.is_empty() => partial,
            Some(partial) => format!("{}.{}", parent.name, partial),
            None => parent.name.clone(),
        };

        let node = Inherited {
            name,
            field_type: dict
                .get(b"FT")
                .ok()
                .and_then(|obj| name_value(doc, obj))
                .or_else(|| parent.field_type.clone()),
            flags: dict
                .get(b"Ff")
                .ok()
                .and_then(|obj| int_value(doc, obj))
                .map(|v| v as u32)
                .unwrap_or(parent.flags),
            value: dict
                .get(b"V")
                .ok()
                .and_then(|obj| text_value(doc, obj))
                .or_else(|| parent.value.clone()),
        };

        let kids = kid_ids(doc, dict);
        let child_fields: Vec<ObjectId> =
            kids.iter().copied().filter(|kid| is_field_node(doc, *kid)).collect();
        if !child_fields.is_empty() {
            for child in child_fields {
                self.visit(child, &node);
            }
            return;
        }

        if node.field_type.as_deref() != Some("Tx") {
            return;
        }

        let flags = FieldFlags::from_bits_truncate(node.flags);
        let widgets = if kids.is_empty() { vec![id] } else { kids };
        let mut pages: Vec<usize> = widgets
            .iter()
            .filter_map(|widget| self.pages.page_of(doc, *widget))
            .filter_map(|page| self.pages.number_of(page))
            .collect();
        pages.sort_unstable();
        pages.dedup();

        self.fields.push(RawField {
            id: format_field_id(id),
            name: node.name,
            value: node.value.unwrap_or_default(),
            multiline: flags.contains(FieldFlags::MULTILINE),
            locked: flags.contains(FieldFlags::READ_ONLY),
            pages,
        });
    }
}

/// Page numbers and which page lists each annotation.
struct PageIndex {
    numbers: HashMap<ObjectId, usize>,
    annotations: HashMap<ObjectId, ObjectId>,
}

impl PageIndex {
    fn build(doc: &Document) -> Self {
        let mut numbers = HashMap::new();
        let mut annotations = HashMap::new();
        for (number, page_id) in doc.get_pages() {
            numbers.insert(page_id, number as usize);
            let annots = doc
                .get_dictionary(page_id)
                .ok()
                .and_then(|page| page.get(b"Annots").ok())
                .and_then(|obj| resolve(doc, obj))
                .and_then(|obj| obj.as_array().ok());
            if let Some(annots) = annots {
                for annot in annots {
                    if let Object::Reference(annot_id) = annot {
                        annotations.entry(*annot_id).or_insert(page_id);
                    }
                }
            }
        }
        Self {
            numbers,
            annotations,
        }
    }

    /// Page holding `widget`: the page listing it in `/Annots`, else its `/P`.
    fn page_of(&self, doc: &Document, widget: ObjectId) -> Option<ObjectId> {
        if let Some(page) = self.annotations.get(&widget) {
            return Some(*page);
        }
        doc.get_dictionary(widget)
            .ok()?
            .get(b"P")
            .ok()?
            .as_reference()
            .ok()
            .filter(|page| self.numbers.contains_key(page))
    }

    fn number_of(&self, page: ObjectId) -> Option<usize> {
        self.numbers.get(&page).copied()
    }
}

fn rebuild_widgets(doc: &mut Document, form: &RawForm) -> Result<()> {
    let pages = PageIndex::build(doc);
    let form_da = acroform(doc)?
        .and_then(|af| af.get(b"DA").ok())
        .and_then(|obj| text_value(doc, obj));
    let (mut resources, mut fonts) = resource_dictionaries(doc)?;
    let mut helvetica: Option<ObjectId> = None;
    let mut rebuilt = 0usize;

    for field in form.text_fields.iter().filter(|f| !f.locked) {
        let field_id = parse_field_id(&field.id)
            .ok_or_else(|| Error::RebuildFailed(format!("unknown field id '{}'", field.id)))?;
        let field_da = doc
            .get_dictionary(field_id)?
            .get(b"DA")
            .ok()
            .and_then(|obj| text_value(doc, obj))
            .or_else(|| form_da.clone());

        for widget_id in widget_ids(doc, field_id) {
            let widget = doc.get_dictionary(widget_id)?;
            let rect = match widget
                .get(b"Rect")
                .ok()
                .and_then(|obj| resolve(doc, obj))
                .and_then(rect_of)
            {
                Some(rect) => rect,
                None => {
                    log::warn!("Widget of field '{}' has no usable /Rect", field.name);
                    continue;
                },
            };
            let da = widget
                .get(b"DA")
                .ok()
                .and_then(|obj| text_value(doc, obj))
                .or_else(|| field_da.clone());

            let layout = TextAppearance::new(
                rect[2] - rect[0],
                rect[3] - rect[1],
                da.as_deref(),
                field.multiline,
            );
            if !fonts.has(layout.font_name.as_bytes()) {
                let font_id = *helvetica.get_or_insert_with(|| doc.add_object(helvetica_font()));
                fonts.set(layout.font_name.clone(), Object::Reference(font_id));
            }

            let bbox = vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::from(layout.width),
                Object::from(layout.height),
            ];
            let appearance = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => bbox,
                    "Resources" => dictionary! { "Font" => fonts.clone() },
                },
                layout.content(&field.value),
            );
            let appearance_id = doc.add_object(appearance);
            doc.get_dictionary_mut(widget_id)?
                .set("AP", dictionary! { "N" => appearance_id });

            match pages.page_of(doc, widget_id) {
                Some(page_id) => ensure_annotation(doc, page_id, widget_id)?,
                None => log::warn!("Widget of field '{}' is not attached to any page", field.name),
            }
            rebuilt += 1;
        }
    }

    resources.set("Font", fonts);
    if let Some(acroform) = acroform_mut(doc)? {
        acroform.set("NeedAppearances", true);
        acroform.set("DR", resources);
    }
    log::debug!("Rebuilt {} widget appearance(s)", rebuilt);
    Ok(())
}

fn ensure_annotation(doc: &mut Document, page_id: ObjectId, widget_id: ObjectId) -> Result<()> {
    let listed = |annots: &[Object]| {
        annots
            .iter()
            .any(|obj| matches!(obj, Object::Reference(id) if *id == widget_id))
    };

    let annots = doc.get_dictionary(page_id)?.get(b"Annots").ok().cloned();
    match annots {
        None => {
            doc.get_dictionary_mut(page_id)?
                .set("Annots", vec![Object::Reference(widget_id)]);
        },
        Some(Object::Array(mut annots)) => {
            if !listed(annots.as_slice()) {
                annots.push(Object::Reference(widget_id));
                doc.get_dictionary_mut(page_id)?.set("Annots", annots);
            }
        },
        Some(Object::Reference(array_id)) => match doc.get_object_mut(array_id)? {
            Object::Array(annots) => {
                if !listed(annots.as_slice()) {
                    annots.push(Object::Reference(widget_id));
                }
            },
            _ => {
                return Err(Error::RebuildFailed(format!(
                    "/Annots of page {} {} R is not an array",
                    page_id.0, page_id.1
                )))
            },
        },
        Some(_) => {
            return Err(Error::RebuildFailed(format!(
                "/Annots of page {} {} R is not an array",
                page_id.0, page_id.1
            )))
        },
    }
    Ok(())
}

/// AcroForm `/DR` (cloned) and its `/Font` sub-dictionary.
fn resource_dictionaries(doc: &Document) -> Result<(Dictionary, Dictionary)> {
    let resources = acroform(doc)?
        .and_then(|af| af.get(b"DR").ok())
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);
    let fonts = resources
        .get(b"Font")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);
    Ok((resources, fonts))
}

fn helvetica_font() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    }
}

fn validate_document(doc: &Document, mode: ValidationMode) -> Result<()> {
    if !mode.is_enabled() {
        return Ok(());
    }

    let catalog = doc
        .get_dictionary(catalog_id(doc)?)
        .map_err(|e| Error::InvalidDocument(format!("catalog: {}", e)))?;
    let pages_id = catalog
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| Error::InvalidDocument("catalog has no /Pages reference".to_string()))?;
    let pages = doc
        .get_dictionary(pages_id)
        .map_err(|e| Error::InvalidDocument(format!("page tree: {}", e)))?;
    let has_kids = pages
        .get(b"Kids")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .map(|obj| obj.as_array().is_ok())
        .unwrap_or(false);
    if !has_kids {
        return Err(Error::InvalidDocument("page tree root has no /Kids array".to_string()));
    }

    if let Some(acroform) = acroform(doc)? {
        if let Ok(fields) = acroform.get(b"Fields") {
            if resolve(doc, fields).and_then(|obj| obj.as_array().ok()).is_none() {
                return Err(Error::InvalidDocument("/AcroForm /Fields is not an array".to_string()));
            }
        }
    }

    if mode == ValidationMode::Strict {
        check_references(doc)?;
    }
    Ok(())
}

/// Every indirect reference must point at an existing object.
fn check_references(doc: &Document) -> Result<()> {
    fn visit(doc: &Document, obj: &Object, owner: ObjectId) -> Result<()> {
        match obj {
            Object::Reference(id) if !doc.objects.contains_key(id) => {
                Err(Error::InvalidDocument(format!(
                    "object {} {} R referenced from {} {} R does not exist",
                    id.0, id.1, owner.0, owner.1
                )))
            },
            Object::Array(items) => items.iter().try_for_each(|item| visit(doc, item, owner)),
            Object::Dictionary(dict) => dict.iter().try_for_each(|(_, v)| visit(doc, v, owner)),
            Object::Stream(stream) => {
                stream.dict.iter().try_for_each(|(_, v)| visit(doc, v, owner))
            },
            _ => Ok(()),
        }
    }

    for (id, obj) in &doc.objects {
        visit(doc, obj, *id)?;
    }
    doc.trailer
        .iter()
        .try_for_each(|(_, v)| visit(doc, v, (0, 0)))
}

fn catalog_id(doc: &Document) -> Result<ObjectId> {
    doc.trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| Error::InvalidDocument("trailer has no /Root catalog".to_string()))
}

fn acroform(doc: &Document) -> Result<Option<&Dictionary>> {
    let catalog = doc.get_dictionary(catalog_id(doc)?)?;
    Ok(catalog
        .get(b"AcroForm")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok()))
}

fn acroform_mut(doc: &mut Document) -> Result<Option<&mut Dictionary>> {
    let root = catalog_id(doc)?;
    let indirect = match doc.get_dictionary(root)?.get(b"AcroForm") {
        Ok(Object::Reference(id)) => Some(*id),
        Ok(Object::Dictionary(_)) => None,
        _ => return Ok(None),
    };
    match indirect {
        Some(id) => Ok(Some(doc.get_dictionary_mut(id)?)),
        None => match doc.get_dictionary_mut(root)?.get_mut(b"AcroForm") {
            Ok(Object::Dictionary(dict)) => Ok(Some(dict)),
            _ => Ok(None),
        },
    }
}

/// Follow one level of indirection.
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn kid_ids(doc: &Document, dict: &Dictionary) -> Vec<ObjectId> {
    dict.get(b"Kids")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_array().ok())
        .map(|kids| kids.iter().filter_map(|kid| kid.as_reference().ok()).collect())
        .unwrap_or_default()
}

/// A node with a partial name is a field; one without is a bare widget.
fn is_field_node(doc: &Document, id: ObjectId) -> bool {
    doc.get_dictionary(id).map(|dict| dict.has(b"T")).unwrap_or(false)
}

/// Widget annotations of a terminal field (the field itself when merged).
fn widget_ids(doc: &Document, field_id: ObjectId) -> Vec<ObjectId> {
    let kids = match doc.get_dictionary(field_id) {
        Ok(dict) => kid_ids(doc, dict),
        Err(_) => return Vec::new(),
    };
    if kids.is_empty() {
        vec![field_id]
    } else {
        kids.into_iter().filter(|kid| !is_field_node(doc, *kid)).collect()
    }
}

/// `/FT` of a field node, inherited through its `/Parent` chain.
fn field_type(doc: &Document, dict: &Dictionary) -> Option<String> {
    let mut node = dict;
    let mut seen = HashSet::new();
    loop {
        if let Some(ft) = node.get(b"FT").ok().and_then(|obj| name_value(doc, obj)) {
            return Some(ft);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        if !seen.insert(parent) {
            return None;
        }
        node = doc.get_dictionary(parent).ok()?;
    }
}

fn is_signature_field(doc: &Document, dict: &Dictionary) -> bool {
    field_type(doc, dict).as_deref() == Some("Sig")
}

fn text_value(doc: &Document, obj: &Object) -> Option<String> {
    match resolve(doc, obj)? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn name_value(doc: &Document, obj: &Object) -> Option<String> {
    match resolve(doc, obj)? {
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn int_value(doc: &Document, obj: &Object) -> Option<i64> {
    match resolve(doc, obj)? {
        Object::Integer(i) => Some(*i),
        _ => None,
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Normalized `[llx, lly, urx, ury]`.
fn rect_of(obj: &Object) -> Option<[f32; 4]> {
    let items = obj.as_array().ok()?;
    if items.len() != 4 {
        return None;
    }
    let (x1, y1, x2, y2) = (
        number(&items[0])?,
        number(&items[1])?,
        number(&items[2])?,
        number(&items[3])?,
    );
    Some([x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)])
}

fn format_field_id(id: ObjectId) -> String {
    if id.1 == 0 {
        id.0.to_string()
    } else {
        format!("{}.{}", id.0, id.1)
    }
}

fn parse_field_id(id: &str) -> Option<ObjectId> {
    match id.split_once('.') {
        Some((number, generation)) => Some((number.parse().ok()?, generation.parse().ok()?)),
        None => Some((id.parse().ok()?, 0)),
    }
}
