//! # Reference Resolution
//!
//! Helpers turning a `$ref` into a JSON Pointer into the current document.
//!
//! Nothing is ever fetched: a reference is local when it is a bare fragment, or when
//! its document part resolves to the document's own `$id`.

use percent_encoding::percent_decode_str;
use std::path::Path;
use url::Url;

/// Returns the (percent-decoded) JSON Pointer a `$ref` targets inside the current
/// document, or `None` for external references. The root is the empty pointer.
pub(crate) fn local_pointer(reference: &str, self_id: Option<&str>) -> Option<String> {
    let (document, fragment) = match reference.split_once('#') {
        Some((doc, frag)) => (doc, frag),
        None => (reference, ""),
    };

    if !document.is_empty() {
        let self_id = self_id?;
        if !same_document(document, self_id) {
            return None;
        }
    }

    Some(percent_decode_str(fragment).decode_utf8_lossy().into_owned())
}

/// The last segment of a pointer with `~1`/`~0` unescaped; `None` for the root.
pub(crate) fn pointer_name(pointer: &str) -> Option<String> {
    let last = pointer.rsplit('/').next()?;
    if last.is_empty() {
        return None;
    }
    Some(last.replace("~1", "/").replace("~0", "~"))
}

fn same_document(document: &str, self_id: &str) -> bool {
    if document == self_id {
        return true;
    }

    if let Ok(mut base) = Url::parse(self_id) {
        base.set_fragment(None);
        return match base.join(document) {
            Ok(mut target) => {
                target.set_fragment(None);
                target == base
            }
            Err(_) => false,
        };
    }

    // `$id` is itself relative: compare raw paths.
    !document.contains("://") && Path::new(document) == Path::new(self_id)
}
