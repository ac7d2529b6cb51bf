//! Restrict strategy
//!
//! Copy every page of the source into a fresh document, then encrypt it with
//! an empty user password and a fixed owner password. Readers open the result
//! without prompting; compliant viewers refuse editing, copying, annotating,
//! form filling and page assembly.
//!
//! Only compliant viewers honour the permission bits. The content itself is
//! readable by anyone holding the file.

use std::io::{BufWriter, Write};
use std::path::Path;

use lopdf::{dictionary, Document, EncryptionState, EncryptionVersion, Object, ObjectId, Permissions, StringFormat};

use super::error::PipelineError;
use super::types::{CancelFlag, Transformed};
use crate::storage::ArtifactStore;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against malformed, cyclic page trees
const MAX_TREE_DEPTH: usize = 64;

/// RC4 key length in bits
const KEY_LENGTH: usize = 128;

/// Operations left open to readers of a protected document
pub fn allowed_permissions() -> Permissions {
    Permissions::PRINTABLE | Permissions::PRINTABLE_IN_HIGH_QUALITY | Permissions::COPYABLE_FOR_ACCESSIBILITY
}

/// Inputs of one restrict run
pub struct RestrictJob<'a> {
    pub source: &'a Path,
    pub output_name: &'a str,
    pub owner_password: &'a str,
}

/// Run the restrict strategy to completion.
///
/// Blocking; call from `spawn_blocking`.
pub fn restrict(store: &ArtifactStore, job: &RestrictJob<'_>, cancel: &CancelFlag) -> Result<Transformed, PipelineError> {
    let source = Document::load(job.source).map_err(|e| PipelineError::Decode(e.to_string()))?;
    if source.is_encrypted() {
        return Err(PipelineError::AlreadyEncrypted);
    }

    let mut doc = copy_pages(source)?;
    let pages = doc.get_pages().len();
    if pages == 0 {
        return Err(PipelineError::NoPages);
    }
    tracing::debug!(source = %job.source.display(), pages, "Pages copied");

    encrypt(&mut doc, job.owner_password)?;

    cancel.check()?;

    let staged = store.stage()?;
    {
        let mut writer = BufWriter::new(staged.as_file());
        doc.save_to(&mut writer)
            .map_err(|e| PipelineError::Assemble(e.to_string()))?;
        writer.flush()?;
    }

    cancel.commit()?;

    let artifact = store.publish(staged, job.output_name)?;

    Ok(Transformed { artifact, pages })
}

/// Build a new document holding the pages of `source` in their original order.
///
/// Page objects and everything they reference keep their ids; the old
/// catalog and page tree are dropped and replaced by a flat one.
fn copy_pages(mut source: Document) -> Result<Document, PipelineError> {
    let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();

    // Bake inherited attributes into each page before the old tree goes away
    for &page_id in &page_ids {
        let inherited = inherited_attributes(&source, page_id);
        let page = source
            .get_dictionary_mut(page_id)
            .map_err(|e| PipelineError::Decode(format!("page object {:?}: {}", page_id, e)))?;
        for (key, value) in inherited {
            page.set(key, value);
        }
    }

    let version = if source.version.as_str() < "1.4" {
        "1.4".to_string()
    } else {
        source.version.clone()
    };
    let mut doc = Document::with_version(version);
    doc.max_id = source.max_id;
    doc.objects = std::mem::take(&mut source.objects)
        .into_iter()
        .filter(|(_, object)| !is_tree_node(object))
        .collect();

    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(page_ids.len());
    for &page_id in &page_ids {
        if let Ok(page) = doc.get_dictionary_mut(page_id) {
            page.set("Parent", pages_id);
            kids.push(Object::from(page_id));
        }
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let pruned = doc.prune_objects();
    tracing::trace!(pruned = pruned.len(), "Unreferenced objects dropped");

    Ok(doc)
}

/// Attributes `page_id` inherits and does not define itself, nearest ancestor first
fn inherited_attributes(doc: &Document, page_id: ObjectId) -> Vec<(&'static [u8], Object)> {
    let mut found: Vec<(&'static [u8], Object)> = Vec::new();
    let Ok(page) = doc.get_dictionary(page_id) else {
        return found;
    };

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(node_id) = parent {
        depth += 1;
        if depth > MAX_TREE_DEPTH {
            break;
        }
        let Ok(node) = doc.get_dictionary(node_id) else {
            break;
        };

        for key in INHERITABLE {
            if page.has(key) || found.iter().any(|(k, _)| *k == key) {
                continue;
            }
            if let Ok(value) = node.get(key) {
                found.push((key, value.clone()));
            }
        }

        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    found
}

/// Catalog or intermediate page tree node of the source document
fn is_tree_node(object: &Object) -> bool {
    matches!(object.type_name(), Ok(b"Catalog") | Ok(b"Pages"))
}

fn encrypt(doc: &mut Document, owner_password: &str) -> Result<(), PipelineError> {
    // The key derivation needs a file identifier
    let id = uuid::Uuid::new_v4().as_bytes().to_vec();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );

    let version = EncryptionVersion::V2 {
        document: &*doc,
        owner_password,
        user_password: "",
        key_length: KEY_LENGTH,
        permissions: allowed_permissions(),
    };
    let state = EncryptionState::try_from(version).map_err(|e| PipelineError::Encrypt(e.to_string()))?;

    doc.encrypt(&state)
        .map_err(|e| PipelineError::Encrypt(e.to_string()))
}
