//! In-memory PDFs for tests.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, xobject, Document, Object, Stream};

/// `(text, x, baseline_y)` lines shown in Helvetica 11pt (`/F1`).
pub(crate) fn text_ops(lines: &[(&str, f32, f32)]) -> Vec<Operation> {
    lines
        .iter()
        .flat_map(|(text, x, y)| {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 11.into()]),
                Operation::new("Td", vec![(*x).into(), (*y).into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        })
        .collect()
}

/// One page per operation list. `/F1` is Helvetica, `/F2` Times-Roman; the
/// font resources live on the page tree root and are inherited. An optional
/// URI link is attached to the first page.
pub(crate) fn build_pdf(pages: Vec<Vec<Operation>>, link: Option<(&str, [f32; 4])>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let helvetica = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let times = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });
    let resources = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => helvetica, "F2" => times },
    });

    let mut kids = Vec::new();
    for (i, operations) in pages.into_iter().enumerate() {
        let content = Content { operations };
        let bytes = content.encode().expect("encode test content");
        let content_id = doc.add_object(Stream::new(dictionary! {}, bytes));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        if let (0, Some((uri, rect))) = (i, link) {
            let annot = doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
                "Rect" => rect.iter().map(|v| Object::from(*v)).collect::<Vec<_>>(),
                "A" => dictionary! {
                    "S" => "URI",
                    "URI" => Object::string_literal(uri),
                },
            });
            page.set("Annots", vec![Object::Reference(annot)]);
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save test pdf");
    out
}

/// One page whose only content is `/Fm0 Do`. The form XObject shows `text`
/// at (72, 700) in its own space in Helvetica 11pt, from its own resources,
/// and carries `matrix` as its `/Matrix`.
pub(crate) fn form_pdf(text: &str, matrix: [f32; 6]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let helvetica = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let form_content = Content {
        operations: text_ops(&[(text, 72.0, 700.0)]),
    }
    .encode()
    .expect("encode form content");
    let mut form = xobject::form(vec![0.0, 0.0, 612.0, 792.0], matrix.to_vec(), form_content);
    form.dict.set("Resources", dictionary! { "Font" => dictionary! { "F1" => helvetica } });
    let form_id = doc.add_object(form);

    let page_ops = vec![
        Operation::new("q", vec![]),
        Operation::new("Do", vec!["Fm0".into()]),
        Operation::new("Q", vec![]),
    ];
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        Content { operations: page_ops }.encode().expect("encode page content"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! { "XObject" => dictionary! { "Fm0" => form_id } },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save test pdf");
    out
}
