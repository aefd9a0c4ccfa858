//! Post image decoding
//!
//! Images arrive either as an inline data URI inside a JSON body
//! (`data:image/png;base64,...`) or as a file part of a multipart upload.
//! Both end up as an [`ImageBlob`] named `posts/<uuid>.<ext>`.
use base64::{engine::general_purpose::STANDARD, Engine};
use mime::Mime;
use uuid::Uuid;

use crate::error::{AppError, ValidationReason};
use crate::models::ImageBlob;

const DATA_URI_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

fn invalid_image() -> AppError {
    AppError::validation(ValidationReason::InvalidImage)
}

/// Decode a `data:image/<subtype>;base64,<payload>` string.
///
/// The file extension comes from the declared MIME subtype; the payload must
/// still look like an image.
pub fn decode_data_uri(value: &str) -> Result<ImageBlob, AppError> {
    let rest = value
        .trim()
        .strip_prefix(DATA_URI_PREFIX)
        .ok_or_else(invalid_image)?;
    let (declared, payload) = rest.split_once(BASE64_MARKER).ok_or_else(invalid_image)?;

    let content_type: Mime = declared.parse().map_err(|_| invalid_image())?;
    if content_type.type_() != mime::IMAGE {
        return Err(invalid_image());
    }

    let data = STANDARD
        .decode(payload.trim())
        .map_err(|_| invalid_image())?;

    build_blob(content_type.subtype().as_str(), content_type.essence_str(), data)
}

/// Build a blob from an uploaded file part.
///
/// A declared `image/*` content type supplies the extension; otherwise it is
/// taken from the detected format.
pub fn from_upload(content_type: Option<&Mime>, data: Vec<u8>) -> Result<ImageBlob, AppError> {
    match content_type.filter(|ct| ct.type_() == mime::IMAGE) {
        Some(ct) => build_blob(ct.subtype().as_str(), ct.essence_str(), data),
        None => {
            let format = ::image::guess_format(&data).map_err(|_| invalid_image())?;
            let ext = format
                .extensions_str()
                .first()
                .copied()
                .ok_or_else(invalid_image)?;
            let content_type = format!("image/{}", ext);
            build_blob(ext, &content_type, data)
        }
    }
}

fn build_blob(ext: &str, content_type: &str, data: Vec<u8>) -> Result<ImageBlob, AppError> {
    if data.is_empty() || ::image::guess_format(&data).is_err() {
        return Err(invalid_image());
    }

    let ext = ext.to_ascii_lowercase();
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '+') {
        return Err(invalid_image());
    }

    Ok(ImageBlob {
        name: format!("posts/{}.{}", Uuid::new_v4(), ext),
        content_type: content_type.to_string(),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG
    const PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn png_bytes() -> Vec<u8> {
        STANDARD.decode(PNG_BASE64).unwrap()
    }

    #[test]
    fn data_uri_extension_follows_declared_subtype() {
        let blob = decode_data_uri(&format!("data:image/png;base64,{}", PNG_BASE64)).unwrap();

        assert!(blob.name.starts_with("posts/"));
        assert!(blob.name.ends_with(".png"));
        assert_eq!(blob.content_type, "image/png");
        assert_eq!(blob.data, png_bytes());
    }

    #[test]
    fn each_decode_gets_a_fresh_name() {
        let uri = format!("data:image/png;base64,{}", PNG_BASE64);
        let first = decode_data_uri(&uri).unwrap();
        let second = decode_data_uri(&uri).unwrap();
        assert_ne!(first.name, second.name);
    }

    #[test]
    fn rejects_non_image_data_uris() {
        for bad in [
            "not a data uri",
            "data:text/plain;base64,aGVsbG8=",
            "data:image/png,iVBORw0KGgo=",
            "data:image/png;base64,!!!not-base64!!!",
            // valid base64, but not an image
            "data:image/png;base64,aGVsbG8gd29ybGQ=",
        ] {
            let err = decode_data_uri(bad).unwrap_err();
            assert_eq!(err.reason(), "invalid-image", "input: {bad}");
        }
    }

    #[test]
    fn upload_without_content_type_uses_detected_format() {
        let blob = from_upload(None, png_bytes()).unwrap();
        assert!(blob.name.ends_with(".png"));
        assert_eq!(blob.content_type, "image/png");

        let octet: Mime = "application/octet-stream".parse().unwrap();
        let blob = from_upload(Some(&octet), png_bytes()).unwrap();
        assert!(blob.name.ends_with(".png"));
    }

    #[test]
    fn upload_of_arbitrary_bytes_is_rejected() {
        let err = from_upload(Some(&mime::IMAGE_PNG), b"plain text".to_vec()).unwrap_err();
        assert_eq!(err.reason(), "invalid-image");
        assert!(from_upload(None, Vec::new()).is_err());
    }
}
