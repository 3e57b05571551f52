//! Page and resource lookups on top of lopdf's page-tree helpers.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::errors::AppError;

/// Effective `/Resources` of a page: its own dictionary, else the nearest
/// one inherited through `/Parent`.
pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let (direct, referenced) = doc.get_page_resources(page_id).ok()?;
    direct.or_else(|| referenced.iter().find_map(|id| doc.get_dictionary(*id).ok()))
}

/// Decoded content of every stream on the page, one stream per line.
///
/// `Document::get_page_content` joins streams without a separator, which
/// glues operators together when a stream does not end in whitespace.
pub(crate) fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>, AppError> {
    let mut content = Vec::new();
    for id in doc.get_page_contents(page_id) {
        let stream = doc.get_object(id)?.as_stream()?;
        content.extend(stream.get_plain_content()?);
        content.push(b'\n');
    }
    Ok(content)
}

/// Form XObject registered under `key`; image XObjects yield `None`.
pub(crate) fn form_xobject<'a>(doc: &'a Document, resources: &'a Dictionary, key: &[u8]) -> Option<&'a Stream> {
    let stream = doc
        .get_dict_in_dict(resources, b"XObject")
        .ok()?
        .get_deref(key, doc)
        .ok()?
        .as_stream()
        .ok()?;
    let subtype = stream.dict.get(b"Subtype").and_then(Object::as_name).ok()?;
    (subtype == b"Form").then_some(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::test_support::{build_pdf, form_pdf, text_ops};

    #[test]
    fn test_inherited_resources_are_found() {
        let pdf = build_pdf(vec![text_ops(&[("Java", 72.0, 700.0)])], None);
        let doc = Document::load_mem(&pdf).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let resources = page_resources(&doc, page_id).unwrap();
        assert!(doc.get_dict_in_dict(resources, b"Font").is_ok());
    }

    #[test]
    fn test_form_xobject_lookup() {
        let pdf = form_pdf("Skills: Java", [1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let doc = Document::load_mem(&pdf).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let resources = page_resources(&doc, page_id).unwrap();
        assert!(form_xobject(&doc, resources, b"Fm0").is_some());
        assert!(form_xobject(&doc, resources, b"Im0").is_none());
    }
}
